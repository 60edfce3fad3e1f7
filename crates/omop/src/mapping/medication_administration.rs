//! `MedicationAdministration` ↔ `drug_exposure`.
//!
//! | Resource element | Entity column |
//! |------------------|---------------|
//! | `subject` | `f_person` |
//! | `context` | `visit_occurrence` |
//! | `medicationCodeableConcept` | `drug_concept` |
//! | `effectivePeriod.start` / `.end` | `drug_exposure_start_date` / `_end_date` |
//! | `dosage.dose` | `quantity`, `dose_unit_source_value` |
//! | `dosage.route` | `route_concept` |
//! | `dosage.text` | `sig` |
//! | `note` | `stop_reason` |
//! | `status` | derived: `stopped` with a stop reason, else `in-progress` |

use crate::context::EngineContext;
use crate::error::OmopResult;
use crate::mapping::ResourceMapping;
use crate::mapping::codeable::{
    codeable_from_concept, concept_from_codeable, mapped_codeable, quantity_with_unit,
    unit_source_from_quantity,
};
use crate::mapping::drug_exposure::{
    START_DATE, common_search_field, derived_status, encounter_reference, person_from_reference,
    stop_reason_from_notes, stop_reason_notes, subject_reference, visit_from_reference,
};
use crate::search::FieldSpec;
use crate::types::{
    AdministrationDosage, DrugExposure, ID_FIELD, InternalId, MedicationAdministration,
    MedicationStatus, Period, ResourceKind,
};

/// Maps `MedicationAdministration` onto `drug_exposure`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedicationAdministrationMapping;

impl ResourceMapping for MedicationAdministrationMapping {
    type Resource = MedicationAdministration;
    type Entity = DrugExposure;

    fn kind(&self) -> ResourceKind {
        ResourceKind::MedicationAdministration
    }

    fn to_canonical(
        &self,
        context: &EngineContext,
        id: InternalId,
        entity: &DrugExposure,
    ) -> OmopResult<MedicationAdministration> {
        let codes = context.codes();
        let external = context.ids().external_from_internal(id, self.kind())?;

        let subject = entity
            .f_person
            .as_ref()
            .map(|person| subject_reference(context, person))
            .transpose()?;
        let encounter = entity
            .visit_occurrence
            .as_ref()
            .map(|visit| encounter_reference(context, visit))
            .transpose()?;

        let period = Period {
            start: entity.drug_exposure_start_date,
            end: entity.drug_exposure_end_date,
        };

        let dosage = AdministrationDosage {
            text: entity.sig.clone(),
            route: entity
                .route_concept
                .as_ref()
                .and_then(|route| mapped_codeable(route, codes)),
            dose: quantity_with_unit(
                entity.quantity,
                entity.dose_unit_source_value.as_deref(),
                codes,
                context.concepts(),
            ),
        };

        Ok(MedicationAdministration {
            id: Some(external.to_string()),
            status: Some(derived_status(
                entity.stop_reason.as_deref(),
                MedicationStatus::InProgress,
            )),
            subject,
            context: encounter,
            medication_codeable_concept: entity
                .drug_concept
                .as_ref()
                .map(|concept| codeable_from_concept(concept, codes)),
            effective_period: (!period.is_empty()).then_some(period),
            dosage: (!dosage.is_empty()).then_some(dosage),
            note: stop_reason_notes(entity.stop_reason.as_deref()),
        })
    }

    fn to_entity(
        &self,
        context: &EngineContext,
        id: Option<InternalId>,
        resource: &MedicationAdministration,
    ) -> DrugExposure {
        let codes = context.codes();
        let period = resource.effective_period.as_ref();
        let dosage = resource.dosage.as_ref();
        let dose = dosage.and_then(|d| d.dose.as_ref());

        DrugExposure {
            id,
            f_person: resource
                .subject
                .as_ref()
                .and_then(|subject| person_from_reference(context, subject)),
            visit_occurrence: resource
                .context
                .as_ref()
                .and_then(|encounter| visit_from_reference(context, encounter)),
            drug_concept: resource
                .medication_codeable_concept
                .as_ref()
                .and_then(|medication| concept_from_codeable(medication, codes, context.concepts())),
            drug_exposure_start_date: period.and_then(|p| p.start),
            drug_exposure_end_date: period.and_then(|p| p.end),
            quantity: dose.and_then(|q| q.value),
            dose_unit_source_value: dose.and_then(unit_source_from_quantity),
            route_concept: dosage
                .and_then(|d| d.route.as_ref())
                .and_then(|route| concept_from_codeable(route, codes, context.concepts())),
            sig: dosage.and_then(|d| d.text.clone()),
            stop_reason: stop_reason_from_notes(&resource.note),
            provider: None,
        }
    }

    fn carry_unmodelled(&self, stored: &DrugExposure, entity: &mut DrugExposure) {
        entity.provider = stored.provider.clone();
    }

    fn search_field(&self, name: &str) -> Option<FieldSpec> {
        match name {
            "effective-time" => Some(FieldSpec::Date { path: START_DATE }),
            _ => common_search_field(name),
        }
    }

    fn sort_path(&self, parameter: &str) -> Option<&'static str> {
        match parameter {
            "_id" => Some(ID_FIELD),
            "effective-time" => Some(START_DATE),
            _ => None,
        }
    }
}
