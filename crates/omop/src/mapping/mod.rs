//! Translation between the canonical and relational models.
//!
//! - [`IdentifierTranslator`] - external ids ↔ internal surrogate keys
//! - [`CodeSystemTranslator`] - coding-system URIs ↔ vocabulary ids, plus
//!   value-set expansion
//! - [`ResourceMapping`] - per-kind record mappers
//! - [`NameBuilder`] - display names from sparse name parts

pub mod codeable;
mod code_system;
mod display;
mod drug_exposure;
mod id_mapping;
mod medication_administration;
mod medication_dispense;
mod resource_mapping;
mod vocabulary;

pub use code_system::CodeSystemTranslator;
pub use display::{NameBuilder, person_display};
pub use id_mapping::{IdentifierTranslator, IdentityTranslator, TableTranslator};
pub use medication_administration::MedicationAdministrationMapping;
pub use medication_dispense::MedicationDispenseMapping;
pub use resource_mapping::ResourceMapping;
pub use vocabulary::{VocabularyEntry, VocabularyMap};
