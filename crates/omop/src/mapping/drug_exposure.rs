//! Conversions shared by the kinds backed by `drug_exposure`.

use crate::context::EngineContext;
use crate::error::OmopResult;
use crate::mapping::display::person_display;
use crate::search::{FieldSpec, patient_chain_field};
use crate::types::{
    Annotation, FPerson, InternalId, MedicationStatus, Provider, Reference, ResourceKind,
    VisitOccurrence,
};

pub(crate) const START_DATE: &str = "drugExposureStartDate";

/// Parameters every drug exposure kind accepts.
pub(crate) fn common_search_field(name: &str) -> Option<FieldSpec> {
    match name {
        "_id" => Some(FieldSpec::Id),
        "code" => Some(FieldSpec::Coded {
            vocabulary_path: "drugConcept.vocabularyId",
            code_path: "drugConcept.conceptCode",
        }),
        "context" => Some(FieldSpec::Reference {
            path: "visitOccurrence.id",
            target: ResourceKind::Encounter,
        }),
        _ => patient_chain_field(name),
    }
}

/// `stopped` when a stop reason is recorded, `otherwise` when not.
pub(crate) fn derived_status(
    stop_reason: Option<&str>,
    otherwise: MedicationStatus,
) -> MedicationStatus {
    match stop_reason.filter(|r| !r.is_empty()) {
        Some(_) => MedicationStatus::Stopped,
        None => otherwise,
    }
}

pub(crate) fn stop_reason_notes(stop_reason: Option<&str>) -> Vec<Annotation> {
    stop_reason
        .filter(|r| !r.is_empty())
        .map(|text| Annotation {
            text: text.to_string(),
        })
        .into_iter()
        .collect()
}

pub(crate) fn stop_reason_from_notes(notes: &[Annotation]) -> Option<String> {
    notes
        .iter()
        .map(|n| n.text.as_str())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

pub(crate) fn subject_reference(context: &EngineContext, person: &FPerson) -> OmopResult<Reference> {
    let id = context
        .ids()
        .external_from_internal(person.id, ResourceKind::Patient)?;
    Ok(Reference::to(ResourceKind::Patient, id).with_display(person_display(person)))
}

pub(crate) fn encounter_reference(
    context: &EngineContext,
    visit: &VisitOccurrence,
) -> OmopResult<Reference> {
    let id = context
        .ids()
        .external_from_internal(visit.id, ResourceKind::Encounter)?;
    Ok(Reference::to(ResourceKind::Encounter, id))
}

pub(crate) fn practitioner_reference(
    context: &EngineContext,
    provider: &Provider,
) -> OmopResult<Reference> {
    let id = context
        .ids()
        .external_from_internal(provider.id, ResourceKind::Practitioner)?;
    Ok(Reference::to(ResourceKind::Practitioner, id).with_display(provider.provider_name.clone()))
}

/// The internal key a reference points at, if it targets `kind` and resolves.
///
/// A bare numeric reference is read as targeting `kind`.
pub(crate) fn resolve_reference(
    context: &EngineContext,
    reference: &Reference,
    kind: ResourceKind,
) -> Option<InternalId> {
    if reference.target_type().is_some_and(|t| t != kind.as_str()) {
        return None;
    }
    let external = match reference.target_id() {
        Some(id) => id,
        None => reference.reference.as_deref()?.parse().ok()?,
    };
    context.ids().internal_from_external(external, kind)
}

pub(crate) fn person_from_reference(
    context: &EngineContext,
    reference: &Reference,
) -> Option<FPerson> {
    resolve_reference(context, reference, ResourceKind::Patient).map(FPerson::with_id)
}

pub(crate) fn visit_from_reference(
    context: &EngineContext,
    reference: &Reference,
) -> Option<VisitOccurrence> {
    resolve_reference(context, reference, ResourceKind::Encounter).map(|id| VisitOccurrence { id })
}

pub(crate) fn provider_from_reference(
    context: &EngineContext,
    reference: &Reference,
) -> Option<Provider> {
    resolve_reference(context, reference, ResourceKind::Practitioner).map(|id| Provider {
        id,
        provider_name: reference.display.clone(),
    })
}
