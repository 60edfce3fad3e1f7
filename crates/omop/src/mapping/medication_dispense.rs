//! `MedicationDispense` ↔ `drug_exposure`.
//!
//! | Resource element | Entity column |
//! |------------------|---------------|
//! | `subject` | `f_person` |
//! | `context` | `visit_occurrence` |
//! | `medicationCodeableConcept` | `drug_concept` |
//! | `whenHandedOver` | `drug_exposure_start_date` |
//! | `quantity` | `quantity`, `dose_unit_source_value` |
//! | `dosageInstruction.text` / `.route` | `sig` / `route_concept` |
//! | `performer.actor` | `provider` |
//! | `note` | `stop_reason` |
//! | `status` | derived: `stopped` with a stop reason, else `completed` |

use crate::context::EngineContext;
use crate::error::OmopResult;
use crate::mapping::ResourceMapping;
use crate::mapping::codeable::{
    codeable_from_concept, concept_from_codeable, mapped_codeable, quantity_with_unit,
    unit_source_from_quantity,
};
use crate::mapping::drug_exposure::{
    START_DATE, common_search_field, derived_status, encounter_reference, person_from_reference,
    practitioner_reference, provider_from_reference, stop_reason_from_notes, stop_reason_notes,
    subject_reference, visit_from_reference,
};
use crate::search::FieldSpec;
use crate::types::{
    DispensePerformer, Dosage, DrugExposure, ID_FIELD, InternalId, MedicationDispense,
    MedicationStatus, ResourceKind,
};

/// Maps `MedicationDispense` onto `drug_exposure`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedicationDispenseMapping;

impl ResourceMapping for MedicationDispenseMapping {
    type Resource = MedicationDispense;
    type Entity = DrugExposure;

    fn kind(&self) -> ResourceKind {
        ResourceKind::MedicationDispense
    }

    fn to_canonical(
        &self,
        context: &EngineContext,
        id: InternalId,
        entity: &DrugExposure,
    ) -> OmopResult<MedicationDispense> {
        let codes = context.codes();
        let external = context.ids().external_from_internal(id, self.kind())?;

        let mut performer = Vec::new();
        if let Some(provider) = &entity.provider {
            performer.push(DispensePerformer {
                actor: practitioner_reference(context, provider)?,
            });
        }

        let instruction = Dosage {
            text: entity.sig.clone(),
            route: entity
                .route_concept
                .as_ref()
                .and_then(|route| mapped_codeable(route, codes)),
        };
        let dosage_instruction = if instruction.text.is_some() || instruction.route.is_some() {
            vec![instruction]
        } else {
            Vec::new()
        };

        Ok(MedicationDispense {
            id: Some(external.to_string()),
            status: Some(derived_status(
                entity.stop_reason.as_deref(),
                MedicationStatus::Completed,
            )),
            subject: entity
                .f_person
                .as_ref()
                .map(|person| subject_reference(context, person))
                .transpose()?,
            context: entity
                .visit_occurrence
                .as_ref()
                .map(|visit| encounter_reference(context, visit))
                .transpose()?,
            medication_codeable_concept: entity
                .drug_concept
                .as_ref()
                .map(|concept| codeable_from_concept(concept, codes)),
            when_handed_over: entity.drug_exposure_start_date,
            quantity: quantity_with_unit(
                entity.quantity,
                entity.dose_unit_source_value.as_deref(),
                codes,
                context.concepts(),
            ),
            dosage_instruction,
            performer,
            note: stop_reason_notes(entity.stop_reason.as_deref()),
        })
    }

    fn to_entity(
        &self,
        context: &EngineContext,
        id: Option<InternalId>,
        resource: &MedicationDispense,
    ) -> DrugExposure {
        let codes = context.codes();
        let instruction = resource.dosage_instruction.first();
        let quantity = resource.quantity.as_ref();

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
            drug_exposure_start_date: resource.when_handed_over,
            drug_exposure_end_date: None,
            quantity: quantity.and_then(|q| q.value),
            dose_unit_source_value: quantity.and_then(unit_source_from_quantity),
            route_concept: instruction
                .and_then(|d| d.route.as_ref())
                .and_then(|route| concept_from_codeable(route, codes, context.concepts())),
            sig: instruction.and_then(|d| d.text.clone()),
            stop_reason: stop_reason_from_notes(&resource.note),
            provider: resource
                .performer
                .first()
                .and_then(|p| provider_from_reference(context, &p.actor)),
        }
    }

    fn carry_unmodelled(&self, stored: &DrugExposure, entity: &mut DrugExposure) {
        entity.drug_exposure_end_date = stored.drug_exposure_end_date;
    }

    fn search_field(&self, name: &str) -> Option<FieldSpec> {
        match name {
            "whenhandedover" => Some(FieldSpec::Date { path: START_DATE }),
            "performer" => Some(FieldSpec::Reference {
                path: "provider.id",
                target: ResourceKind::Practitioner,
            }),
            _ => common_search_field(name),
        }
    }

    fn sort_path(&self, parameter: &str) -> Option<&'static str> {
        match parameter {
            "_id" => Some(ID_FIELD),
            "whenhandedover" => Some(START_DATE),
            _ => None,
        }
    }
}
