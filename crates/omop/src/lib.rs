//! # helios-omop - FHIR over an OMOP relational store
//!
//! This crate translates between FHIR-style canonical resources and rows of
//! an OMOP common data model. It is the core a FHIR endpoint sits on when its
//! data lives in OMOP tables: the transport layer parses requests into typed
//! values, and this crate turns them into backend-agnostic predicates, maps
//! entities to resources and back, and pages through results.
//!
//! ## Components
//!
//! - **Identifier translation** - external resource ids ↔ internal surrogate
//!   keys, one namespace per resource kind
//! - **Code system translation** - coding-system URIs ↔ OMOP vocabulary ids,
//!   plus value-set expansion through a terminology service
//! - **Predicate building** - typed search values → [`PredicateList`]
//! - **Record mapping** - `MedicationAdministration` and `MedicationDispense`
//!   ↔ `drug_exposure`
//! - **Paginated results** - a total counted once per search and windowed,
//!   deterministically ordered fetches
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helios_omop::{EngineConfig, EngineContext, init_logging};
//! use helios_omop::backends::{ConceptTable, MemoryStore};
//! use helios_omop::mapping::MedicationAdministrationMapping;
//! use helios_omop::provider::ResourceProvider;
//! use helios_omop::types::{SearchParameter, SearchRequest, TokenParam};
//!
//! #[tokio::main]
//! async fn main() -> helios_omop::OmopResult<()> {
//!     let config = EngineConfig::from_env();
//!     init_logging(&config.log_level);
//!
//!     let context = EngineContext::from_config(config, Arc::new(ConceptTable::new()))?;
//!     let provider = ResourceProvider::new(
//!         Arc::new(context),
//!         MedicationAdministrationMapping,
//!         Arc::new(MemoryStore::new()),
//!     );
//!
//!     let request = SearchRequest::new().with_parameter(SearchParameter::new(
//!         "code",
//!         TokenParam::new("http://www.nlm.nih.gov/research/umls/rxnorm", "197806"),
//!     ));
//!     let results = provider.search(&request).await?;
//!     println!("{} matches", results.total().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types and the status-code mapping
//! - [`config`] - Engine configuration (CLI flags and `OMOP_*` variables)
//! - [`context`] - The engine context shared by mappers and providers
//! - [`types`] - Predicates, search values, windows, resources and entities
//! - [`core`] - Collaborator traits (storage, concept lookup, terminology)
//! - [`mapping`] - Identifier, code-system and record translation
//! - [`search`] - The predicate builder and its parameter handlers
//! - [`provider`] - CRUD and search providers
//! - [`backends`] - In-memory storage, concept table, HTTP terminology client

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod mapping;
pub mod provider;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use config::{CodingStrictness, EngineConfig, IdMappingMode};
pub use context::EngineContext;
pub use error::{OmopError, OmopResult};
pub use provider::{ResourceProvider, SearchResults};
pub use types::{PredicateList, PredicateNode};

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("helios_omop={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
