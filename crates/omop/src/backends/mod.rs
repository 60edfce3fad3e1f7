//! Collaborator implementations.
//!
//! | Implementation | Trait | Description |
//! |----------------|-------|-------------|
//! | [`MemoryStore`] | `EntityStorage` | In-process entity storage with a predicate evaluator |
//! | [`ConceptTable`] | `ConceptLookup` | In-process concept table |
//! | [`HttpTerminologyClient`] | `TerminologyClient` | FHIR terminology server over HTTP |
//!
//! # Example
//!
//! ```
//! use helios_omop::backends::{ConceptTable, MemoryStore};
//! use helios_omop::types::{Concept, DrugExposure};
//!
//! let store: MemoryStore<DrugExposure> = MemoryStore::new();
//! let concepts = ConceptTable::from_concepts(vec![Concept::new(
//!     8576, "UCUM", "mg", "milligram",
//! )]);
//! assert!(store.is_empty());
//! assert_eq!(concepts.len(), 1);
//! ```

pub mod memory;
mod terminology_http;

pub use memory::{ConceptTable, MemoryStore};
pub use terminology_http::{HttpTerminologyClient, parse_value_set_compose};
