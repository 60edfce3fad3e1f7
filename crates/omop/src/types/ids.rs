//! Resource kinds and the two identifier spaces.
//!
//! [`ExternalId`] is the id exposed to API clients. [`InternalId`] is the
//! relational surrogate key. The two are distinct types so one can never be
//! passed where the other is expected; converting between them goes through an
//! [`IdentifierTranslator`](crate::mapping::IdentifierTranslator).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Resource kinds the engine knows about.
///
/// Each kind owns an independent identifier namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Backed by `drug_exposure`.
    MedicationAdministration,
    /// Backed by `drug_exposure`.
    MedicationDispense,
    /// Backed by `f_person`.
    Patient,
    /// Backed by `visit_occurrence`.
    Encounter,
    /// Backed by `provider`.
    Practitioner,
}

impl ResourceKind {
    /// The FHIR resource type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::MedicationAdministration => "MedicationAdministration",
            ResourceKind::MedicationDispense => "MedicationDispense",
            ResourceKind::Patient => "Patient",
            ResourceKind::Encounter => "Encounter",
            ResourceKind::Practitioner => "Practitioner",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MedicationAdministration" => Ok(ResourceKind::MedicationAdministration),
            "MedicationDispense" => Ok(ResourceKind::MedicationDispense),
            "Patient" => Ok(ResourceKind::Patient),
            "Encounter" => Ok(ResourceKind::Encounter),
            "Practitioner" => Ok(ResourceKind::Practitioner),
            _ => Err(format!("unknown resource kind: {}", s)),
        }
    }
}

/// Identifier exposed across the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(i64);

impl ExternalId {
    /// Wraps a raw external id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExternalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Relational surrogate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalId(i64);

impl InternalId {
    /// Wraps a raw surrogate key.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
