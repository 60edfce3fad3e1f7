//! Resource providers.
//!
//! A [`ResourceProvider`] ties one record mapper to one storage
//! collaborator and exposes the create, read, update, delete and search
//! operations a transport layer dispatches to. Searches return
//! [`SearchResults`], which count and fetch lazily.

mod resource;
mod results;

pub use resource::{MethodOutcome, OutcomeStatus, ResourceProvider};
pub use results::SearchResults;
