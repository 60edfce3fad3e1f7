//! Predicate building.
//!
//! Turns typed search values into [`PredicateNode`]s. Each resource mapping
//! declares a [`FieldSpec`] per accepted parameter name; the
//! [`PredicateBuilder`] dispatches on it to the handler for that parameter
//! type:
//!
//! | Field | Handler | Columns |
//! |-------|---------|---------|
//! | `Id` | [`IdHandler`] | `id` |
//! | `Coded` | [`TokenHandler`], [`ValueSetHandler`] for `:in` | vocabulary id, concept code |
//! | `Date` | [`DateHandler`] | one date column |
//! | `Reference` | [`ReferenceHandler`] | one foreign key |
//! | `PatientChain` | [`PatientChainHandler`] | `fPerson.*` |
//!
//! [`PredicateNode`]: crate::types::PredicateNode

mod builder;
mod fields;
pub mod handlers;

pub use builder::PredicateBuilder;
pub use fields::{FieldSpec, PatientChain, patient_chain_field};
pub use handlers::{
    DateHandler, IdHandler, PatientChainHandler, ReferenceHandler, TokenHandler, ValueSetHandler,
};
