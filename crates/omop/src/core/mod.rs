//! Collaborator traits.
//!
//! The engine depends on three collaborators, specified here only at their
//! interface boundary:
//!
//! - [`EntityStorage`] - persistence of entity snapshots, predicate evaluation
//! - [`ConceptLookup`] - read access to the concept table
//! - [`TerminologyClient`] - value-set expansion
//!
//! In-memory and HTTP implementations live in [`crate::backends`].

mod storage;
mod terminology;

pub use storage::{ConceptLookup, EntityStorage};
pub use terminology::{ConceptSet, NoTerminology, TerminologyClient, ValueSetCompose};
