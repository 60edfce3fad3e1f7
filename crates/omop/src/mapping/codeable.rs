//! Conversion between concept rows and codeable concepts.

use crate::core::ConceptLookup;
use crate::mapping::code_system::CodeSystemTranslator;
use crate::types::{CodeableConcept, Coding, Concept, NO_MATCHING_CONCEPT, Quantity};

/// A codeable concept for a concept row.
///
/// An unmapped vocabulary still yields a coding, without a system, so the
/// code and display are not lost.
pub fn codeable_from_concept(concept: &Concept, codes: &CodeSystemTranslator) -> CodeableConcept {
    let system = concept
        .vocabulary_id
        .as_deref()
        .and_then(|v| codes.uri_from_vocabulary(v))
        .map(str::to_string);

    CodeableConcept {
        coding: vec![Coding {
            system,
            code: concept.concept_code.clone(),
            display: concept.concept_name.clone(),
        }],
        text: None,
    }
}

/// A codeable concept for a concept row, only when its vocabulary is mapped.
pub fn mapped_codeable(concept: &Concept, codes: &CodeSystemTranslator) -> Option<CodeableConcept> {
    let system = codes.uri_from_vocabulary(concept.vocabulary_id.as_deref()?)?;
    Some(CodeableConcept {
        coding: vec![Coding {
            system: Some(system.to_string()),
            code: concept.concept_code.clone(),
            display: concept.concept_name.clone(),
        }],
        text: None,
    })
}

/// Resolves a codeable concept to a concept row.
///
/// Codings are tried in order; the first one whose system maps to a
/// vocabulary and whose code exists in the concept table wins. Otherwise the
/// first coding is carried over as a "no matching concept" row so its code
/// survives.
pub fn concept_from_codeable(
    codeable: &CodeableConcept,
    codes: &CodeSystemTranslator,
    concepts: &dyn ConceptLookup,
) -> Option<Concept> {
    for coding in &codeable.coding {
        let (Some(system), Some(code)) = (coding.system.as_deref(), coding.code.as_deref()) else {
            continue;
        };
        if let Some(vocabulary) = codes.vocabulary_from_uri(system) {
            if let Some(concept) = concepts.by_vocabulary_code(vocabulary, code) {
                return Some(concept);
            }
        }
    }

    let first = codeable.coding.first()?;
    Some(Concept {
        id: NO_MATCHING_CONCEPT,
        concept_name: first.display.clone(),
        vocabulary_id: first
            .system
            .as_deref()
            .and_then(|s| codes.vocabulary_from_uri(s))
            .map(str::to_string),
        concept_code: first.code.clone(),
    })
}

/// A quantity whose unit comes from a unit source string.
///
/// When the unit string is a known concept code in a mapped vocabulary, the
/// quantity carries the concept's name, system and code. A known concept in
/// an unmapped vocabulary leaves the unit off. An unknown string becomes the
/// plain unit text.
pub fn quantity_with_unit(
    value: Option<f64>,
    unit_source: Option<&str>,
    codes: &CodeSystemTranslator,
    concepts: &dyn ConceptLookup,
) -> Option<Quantity> {
    let mut quantity = Quantity {
        value,
        ..Default::default()
    };

    if let Some(unit) = unit_source.filter(|u| !u.is_empty()) {
        match concepts.by_code(unit) {
            Some(concept) => {
                if let Some(system) = concept
                    .vocabulary_id
                    .as_deref()
                    .and_then(|v| codes.uri_from_vocabulary(v))
                {
                    quantity.unit = concept.concept_name.clone();
                    quantity.system = Some(system.to_string());
                    quantity.code = concept.concept_code.clone();
                }
            }
            None => quantity.unit = Some(unit.to_string()),
        }
    }

    (!quantity.is_empty()).then_some(quantity)
}

/// The unit source string to store for a quantity.
pub fn unit_source_from_quantity(quantity: &Quantity) -> Option<String> {
    quantity.code.clone().or_else(|| quantity.unit.clone())
}
