//! Translator, predicate and record-mapper properties.

mod common;

use std::sync::Arc;

use helios_omop::config::CodingStrictness;
use helios_omop::core::{ConceptSet, NoTerminology, ValueSetCompose};
use helios_omop::mapping::{
    CodeSystemTranslator, IdentifierTranslator, IdentityTranslator, MedicationAdministrationMapping,
    MedicationDispenseMapping, NameBuilder, ResourceMapping, TableTranslator, VocabularyMap,
    person_display,
};
use helios_omop::search::{TokenHandler, ValueSetHandler};
use helios_omop::types::{
    DrugExposure, FPerson, InternalId, Literal, Operator, PredicateNode, Provider, Relationship,
    ResourceKind, SearchValue, TokenParam, VisitOccurrence,
};
use serde_json::json;

use common::*;

const KINDS: [ResourceKind; 5] = [
    ResourceKind::MedicationAdministration,
    ResourceKind::MedicationDispense,
    ResourceKind::Patient,
    ResourceKind::Encounter,
    ResourceKind::Practitioner,
];

fn example_codes() -> CodeSystemTranslator {
    let mut vocabularies = VocabularyMap::new();
    vocabularies.insert("http://example/sys", "SYS");
    CodeSystemTranslator::new(Arc::new(vocabularies), Arc::new(NoTerminology))
}

fn assert_aligned(node: &PredicateNode) {
    let conditions = node.conditions().len();
    assert!(conditions > 0);
    assert_eq!(node.field_paths().len(), conditions);
    assert_eq!(node.operators().len(), conditions);
    assert_eq!(node.values().len(), conditions);
}

#[test]
fn test_identity_translator_round_trip() {
    let ids = IdentityTranslator;
    for kind in KINDS {
        for raw in [1, 42, 9_000_000_001] {
            let internal = InternalId::new(raw);
            let external = ids.external_from_internal(internal, kind).unwrap();
            assert_eq!(ids.internal_from_external(external, kind), Some(internal));
        }
    }
}

#[test]
fn test_table_translator_round_trip_per_kind() {
    let ids = TableTranslator::new();
    for kind in KINDS {
        for raw in [7, 8, 9] {
            ids.assign(InternalId::new(raw), kind);
        }
    }
    for kind in KINDS {
        for raw in [7, 8, 9] {
            let internal = InternalId::new(raw);
            let external = ids.external_from_internal(internal, kind).unwrap();
            assert_eq!(ids.internal_from_external(external, kind), Some(internal));
        }
    }
    // the same external number resolves independently per kind
    let external = ids
        .external_from_internal(InternalId::new(7), ResourceKind::Patient)
        .unwrap();
    assert_eq!(
        ids.external_from_internal(InternalId::new(7), ResourceKind::Encounter)
            .unwrap(),
        external
    );
}

#[test]
fn test_vocabulary_round_trip() {
    let vocabularies = VocabularyMap::standard();
    assert!(!vocabularies.is_empty());
    for (uri, vocabulary) in vocabularies.entries() {
        assert_eq!(vocabularies.uri_from_vocabulary(vocabulary), Some(uri));
        assert_eq!(vocabularies.vocabulary_from_uri(uri), Some(vocabulary));
    }
    assert_eq!(vocabularies.vocabulary_from_uri("http://example/unknown"), None);
    assert_eq!(vocabularies.uri_from_vocabulary("NOPE"), None);
}

#[test]
fn test_coded_token_with_system_and_code() {
    let node = TokenHandler::build(
        "code",
        &TokenParam::new("http://example/sys", "123"),
        "drugConcept.vocabularyId",
        "drugConcept.conceptCode",
        &example_codes(),
        CodingStrictness::Lenient,
        false,
    )
    .unwrap()
    .unwrap();

    assert_aligned(&node);
    assert_eq!(node.conditions().len(), 2);
    assert_eq!(node.inner_relationship(), Relationship::And);
    assert_eq!(node.values()[0], &Literal::text("SYS"));
}

#[test]
fn test_coded_token_with_unmapped_system() {
    let node = TokenHandler::build(
        "code",
        &TokenParam::new("http://example/other", "123"),
        "drugConcept.vocabularyId",
        "drugConcept.conceptCode",
        &example_codes(),
        CodingStrictness::Lenient,
        false,
    )
    .unwrap()
    .unwrap();

    assert_aligned(&node);
    assert_eq!(node.field_paths(), vec!["drugConcept.conceptCode"]);
    assert_eq!(node.operators(), vec![Operator::Like]);
}

#[test]
fn test_coded_token_without_constraints() {
    let node = TokenHandler::build(
        "code",
        &TokenParam::default(),
        "drugConcept.vocabularyId",
        "drugConcept.conceptCode",
        &example_codes(),
        CodingStrictness::Strict,
        false,
    )
    .unwrap();
    assert!(node.is_none());
}

#[tokio::test]
async fn test_value_set_node_shape() {
    let mut vocabularies = VocabularyMap::standard();
    vocabularies.insert("http://example/sys", "SYS");
    let terminology = StubTerminology::new().with_value_set(
        ANALGESICS,
        ValueSetCompose {
            include: vec![
                ConceptSet::new(RXNORM, ["197806"]),
                ConceptSet::new("http://example/sys", ["1", "2"]),
            ],
            exclude: vec![ConceptSet::new(RXNORM, ["313782"])],
        },
    );
    let codes = CodeSystemTranslator::new(Arc::new(vocabularies), Arc::new(terminology));

    let nodes = ValueSetHandler::build(
        "code",
        ANALGESICS,
        "drugConcept.vocabularyId",
        "drugConcept.conceptCode",
        &codes,
    )
    .await
    .unwrap();

    assert_eq!(nodes.len(), 3);
    nodes.iter().for_each(assert_aligned);
    assert_eq!(nodes[0].outer_relationship(), Relationship::Or);
    assert_eq!(nodes[1].outer_relationship(), Relationship::Or);
    assert_eq!(nodes[2].outer_relationship(), Relationship::And);
    assert_eq!(nodes[0].operators(), vec![Operator::Eq, Operator::In]);
    assert_eq!(nodes[2].operators(), vec![Operator::Ne, Operator::Out]);
}

#[tokio::test]
async fn test_every_parameter_builds_aligned_nodes() {
    let context = context();
    let mapping = MedicationAdministrationMapping;
    let cases: Vec<(&str, SearchValue)> = vec![
        ("_id", "4".into()),
        ("code", TokenParam::new(RXNORM, "197806").into()),
        ("code", TokenParam::value_set(ANALGESICS).into()),
        ("context", "Encounter/3".into()),
        ("effective-time", "le2024-01-01".into()),
        ("Patient:_id", "1".into()),
        ("Patient:name", "Smith".into()),
        ("Patient:identifier", "MRN-001".into()),
    ];
    for (name, value) in cases {
        let nodes = mapping
            .map_parameter(&context, name, &value, true)
            .await
            .unwrap();
        assert!(!nodes.is_empty(), "{name}");
        nodes.iter().for_each(assert_aligned);
    }
}

#[test]
fn test_name_composition() {
    assert_eq!(
        NameBuilder::new()
            .family(Some("Smith"))
            .given(Some("Jane"))
            .given(Some(""))
            .build()
            .as_deref(),
        Some("Smith, Jane")
    );
    assert_eq!(
        NameBuilder::new()
            .family(Some(""))
            .given(Some("Jane"))
            .given(Some("Q"))
            .build()
            .as_deref(),
        Some("Jane")
    );
    assert_eq!(
        NameBuilder::new()
            .family(None)
            .given(Some(""))
            .given(None)
            .build(),
        None
    );

    let nameless = FPerson::with_id(InternalId::new(1));
    assert_eq!(person_display(&nameless), None);
}

fn full_exposure() -> DrugExposure {
    DrugExposure {
        id: Some(InternalId::new(9)),
        visit_occurrence: Some(VisitOccurrence {
            id: InternalId::new(100),
        }),
        drug_exposure_end_date: Some(date(2024, 1, 14)),
        stop_reason: Some("completed course".to_string()),
        provider: Some(Provider {
            id: InternalId::new(21),
            provider_name: Some("Dr. House".to_string()),
        }),
        ..exposure(
            person(1, "Smith", "Jane", "MRN-001"),
            ibuprofen(),
            date(2024, 1, 10),
        )
    }
}

#[test]
fn test_administration_round_trip() {
    let context = context();
    let mapping = MedicationAdministrationMapping;
    let entity = full_exposure();

    let resource = mapping
        .to_canonical(&context, InternalId::new(9), &entity)
        .unwrap();
    let back = mapping.to_entity(&context, Some(InternalId::new(9)), &resource);

    assert_eq!(back.id, entity.id);
    assert_eq!(back.f_person.as_ref().map(|p| p.id), Some(InternalId::new(1)));
    assert_eq!(back.visit_occurrence, entity.visit_occurrence);
    assert_eq!(back.drug_concept, entity.drug_concept);
    assert_eq!(back.drug_exposure_start_date, entity.drug_exposure_start_date);
    assert_eq!(back.drug_exposure_end_date, entity.drug_exposure_end_date);
    assert_eq!(back.quantity, entity.quantity);
    assert_eq!(back.dose_unit_source_value, entity.dose_unit_source_value);
    assert_eq!(back.route_concept, entity.route_concept);
    assert_eq!(back.sig, entity.sig);
    assert_eq!(back.stop_reason, entity.stop_reason);
}

#[test]
fn test_dispense_round_trip() {
    let context = context();
    let mapping = MedicationDispenseMapping;
    let entity = full_exposure();

    let resource = mapping
        .to_canonical(&context, InternalId::new(9), &entity)
        .unwrap();
    let back = mapping.to_entity(&context, Some(InternalId::new(9)), &resource);

    assert_eq!(back.id, entity.id);
    assert_eq!(back.visit_occurrence, entity.visit_occurrence);
    assert_eq!(back.drug_concept, entity.drug_concept);
    assert_eq!(back.drug_exposure_start_date, entity.drug_exposure_start_date);
    assert_eq!(back.quantity, entity.quantity);
    assert_eq!(back.dose_unit_source_value, entity.dose_unit_source_value);
    assert_eq!(back.route_concept, entity.route_concept);
    assert_eq!(back.sig, entity.sig);
    assert_eq!(back.stop_reason, entity.stop_reason);
    assert_eq!(back.provider, entity.provider);
}

#[test]
fn test_status_depends_only_on_stop_reason() {
    let context = context();
    let mapping = MedicationAdministrationMapping;
    let stopped = full_exposure();
    let active = DrugExposure {
        stop_reason: None,
        ..full_exposure()
    };

    let status = |entity: &DrugExposure| {
        mapping
            .to_canonical(&context, InternalId::new(9), entity)
            .unwrap()
            .status
    };
    assert_eq!(status(&stopped), status(&stopped));
    assert_ne!(status(&stopped), status(&active));

    let other_fields = DrugExposure {
        sig: None,
        quantity: None,
        ..full_exposure()
    };
    assert_eq!(status(&stopped), status(&other_fields));
}

#[test]
fn test_canonical_json_shape() {
    let context = context();
    let resource = MedicationAdministrationMapping
        .to_canonical(&context, InternalId::new(9), &full_exposure())
        .unwrap();
    let value = serde_json::to_value(&resource).unwrap();

    assert_eq!(value["resourceType"], json!("MedicationAdministration"));
    assert_eq!(value["id"], json!("9"));
    assert_eq!(value["status"], json!("stopped"));
    assert_eq!(value["subject"]["reference"], json!("Patient/1"));
    assert_eq!(value["subject"]["display"], json!("Smith, Jane"));
    assert_eq!(
        value["medicationCodeableConcept"]["coding"][0]["system"],
        json!(RXNORM)
    );
    assert_eq!(value["effectivePeriod"]["start"], json!("2024-01-10"));
    assert_eq!(value["dosage"]["dose"]["value"], json!(600.0));
    assert_eq!(value["note"][0]["text"], json!("completed course"));

    let sparse = MedicationAdministrationMapping
        .to_canonical(&context, InternalId::new(2), &DrugExposure::default())
        .unwrap();
    let value = serde_json::to_value(&sparse).unwrap();
    let object = value.as_object().unwrap();
    for absent in ["subject", "context", "effectivePeriod", "dosage", "note"] {
        assert!(!object.contains_key(absent), "{absent}");
    }
}
