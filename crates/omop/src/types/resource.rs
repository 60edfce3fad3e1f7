//! Canonical FHIR resource records.
//!
//! These are the externally visible shapes. They are built fresh from an
//! entity on every read and hold external identifiers only. Absent fields are
//! omitted on serialization rather than written as empty structures.

// Resource fields are named after their FHIR elements
#![allow(missing_docs)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::ids::{ExternalId, ResourceKind};

/// A reference to another resource, e.g. `Patient/12`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Literal reference, `Type/id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Text alternative for the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    /// A reference to `kind/id`.
    pub fn to(kind: ResourceKind, id: ExternalId) -> Self {
        Self {
            reference: Some(format!("{}/{}", kind, id)),
            display: None,
        }
    }

    /// Sets the display text.
    pub fn with_display(mut self, display: Option<String>) -> Self {
        self.display = display;
        self
    }

    /// The target type name, if the reference is literal.
    pub fn target_type(&self) -> Option<&str> {
        let reference = self.reference.as_deref()?;
        let (resource_type, _) = reference.rsplit_once('/')?;
        Some(resource_type.rsplit('/').next().unwrap_or(resource_type))
    }

    /// The target id, if it is numeric.
    pub fn target_id(&self) -> Option<ExternalId> {
        let reference = self.reference.as_deref()?;
        let (_, id) = reference.rsplit_once('/')?;
        id.parse().ok()
    }
}

/// A code defined by a code system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coding {
    /// Coding system URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Symbol in the system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Representation defined by the system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A concept with codings and free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeableConcept {
    /// Codings for the concept.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    /// Plain text representation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Returns true if the concept carries no code at all.
    pub fn has_code(&self) -> bool {
        self.coding
            .iter()
            .any(|c| c.code.as_deref().is_some_and(|code| !code.is_empty()))
    }
}

/// A time range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Starting time, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,

    /// End time, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl Period {
    /// Returns true if neither bound is set.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// A measured amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Numerical value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    /// Unit representation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// System that defines the coded unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Coded form of the unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Quantity {
    /// Returns true if no part is set.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.unit.is_none() && self.system.is_none() && self.code.is_none()
    }
}

/// A text note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// The note text.
    pub text: String,
}

/// Medication status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationStatus {
    /// Administration is ongoing.
    InProgress,
    /// Dispense completed.
    Completed,
    /// Stopped before completion.
    Stopped,
}

/// How a medication was administered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdministrationDosage {
    /// Free-text instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Route of administration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<CodeableConcept>,

    /// Amount administered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose: Option<Quantity>,
}

impl AdministrationDosage {
    /// Returns true if no part is set.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.route.is_none() && self.dose.is_none()
    }
}

/// Dosage instructions for a dispense.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dosage {
    /// Free-text instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Route of administration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<CodeableConcept>,
}

/// Who performed a dispense.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispensePerformer {
    /// The performing practitioner.
    pub actor: Reference,
}

/// A medication administration event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename_all = "camelCase")]
pub struct MedicationAdministration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MedicationStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication_codeable_concept: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_period: Option<Period>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<AdministrationDosage>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
}

/// A medication dispense event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType", rename_all = "camelCase")]
pub struct MedicationDispense {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MedicationStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication_codeable_concept: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub when_handed_over: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Quantity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_instruction: Vec<Dosage>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub performer: Vec<DispensePerformer>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
}

/// Access to the fields every mapped resource shares.
pub trait CanonicalResource: Clone + Send + Sync + 'static {
    /// The resource id, as text.
    fn id(&self) -> Option<&str>;

    /// Replaces the resource id.
    fn set_id(&mut self, id: Option<ExternalId>);

    /// The subject reference.
    fn subject(&self) -> Option<&Reference>;

    /// The coded medication.
    fn medication(&self) -> Option<&CodeableConcept>;
}

impl CanonicalResource for MedicationAdministration {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<ExternalId>) {
        self.id = id.map(|id| id.to_string());
    }

    fn subject(&self) -> Option<&Reference> {
        self.subject.as_ref()
    }

    fn medication(&self) -> Option<&CodeableConcept> {
        self.medication_codeable_concept.as_ref()
    }
}

impl CanonicalResource for MedicationDispense {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<ExternalId>) {
        self.id = id.map(|id| id.to_string());
    }

    fn subject(&self) -> Option<&Reference> {
        self.subject.as_ref()
    }

    fn medication(&self) -> Option<&CodeableConcept> {
        self.medication_codeable_concept.as_ref()
    }
}
