//! Parameter-specific predicate handlers.
//!
//! Each handler knows how to turn one value of its parameter type into
//! predicate nodes.

mod chain;
mod date;
mod id;
mod reference;
mod token;
mod value_set;

pub use chain::PatientChainHandler;
pub use date::DateHandler;
pub use id::IdHandler;
pub use reference::ReferenceHandler;
pub use token::TokenHandler;
pub use value_set::ValueSetHandler;
