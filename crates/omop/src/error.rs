//! Error types for the OMOP translation engine.
//!
//! This module defines all error types used by the engine, following a
//! hierarchy that separates resource lookup errors, validation errors, search
//! translation errors, terminology collaborator errors and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all engine operations.
///
/// Every recoverable failure the engine can produce is one of these variants,
/// so callers can branch on the outcome without inspecting messages.
#[derive(Error, Debug)]
pub enum OmopError {
    /// Resource lookup errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Search translation errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Data integrity errors
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Predicate construction errors
    #[error(transparent)]
    Predicate(#[from] PredicateError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Invalid engine configuration
    #[error("invalid configuration: {}", .0.join("; "))]
    Configuration(Vec<String>),
}

impl OmopError {
    /// Returns the status code a transport layer should answer with.
    ///
    /// Not-found maps to 404, request-level rejections (validation failures,
    /// unmapped coding systems, value-set failures) map to 422, an unreachable
    /// terminology service maps to 503 and everything else to 500.
    pub fn http_status(&self) -> u16 {
        match self {
            OmopError::Resource(ResourceError::NotFound { .. }) => 404,
            OmopError::Validation(_) => 422,
            OmopError::Search(SearchError::Terminology(TerminologyError::Unavailable { .. })) => {
                503
            }
            OmopError::Search(_) => 422,
            OmopError::Integrity(_)
            | OmopError::Predicate(_)
            | OmopError::Backend(_)
            | OmopError::Configuration(_) => 500,
        }
    }

    /// Returns true if this is a not-found outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OmopError::Resource(ResourceError::NotFound { .. }))
    }
}

/// Errors related to resource lookup.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested resource was not found.
    #[error("resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },
}

/// Errors related to resource and request validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The resource failed validation.
    #[error("invalid resource: {message}")]
    InvalidResource { message: String },

    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// The search parameter is invalid.
    #[error("invalid search parameter {parameter}: {message}")]
    InvalidSearchParameter { parameter: String, message: String },

    /// Invalid reference format or target type.
    #[error("invalid reference {reference}: {message}")]
    InvalidReference { reference: String, message: String },
}

/// Errors raised while translating a search request into predicates.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A coding system URI has no vocabulary mapping.
    #[error("unmapped coding system '{system}' in {parameter}")]
    UnmappedSystem { system: String, parameter: String },

    /// The parameter is not searchable on this resource kind.
    #[error("unsupported search parameter '{parameter}' for {resource_type}")]
    UnsupportedParameter {
        parameter: String,
        resource_type: String,
    },

    /// The sort key is not supported on this resource kind.
    #[error("unsupported sort parameter '{parameter}' for {resource_type}")]
    UnsupportedSort {
        parameter: String,
        resource_type: String,
    },

    /// A value-set reference could not be expanded.
    #[error("cannot process value-set reference: {0}")]
    Terminology(#[from] TerminologyError),
}

/// Errors returned by the terminology collaborator.
#[derive(Error, Debug)]
pub enum TerminologyError {
    /// No terminology service is configured or it could not be reached.
    #[error("terminology service unavailable: {message}")]
    Unavailable { message: String },

    /// The value set does not exist on the terminology service.
    #[error("value set not found: {url}")]
    ValueSetNotFound { url: String },

    /// The terminology service answered with something that is not a value set.
    #[error("invalid terminology response for {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Transport failure.
    #[error("terminology request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Data integrity faults detected while building results.
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// An internal key has no external identifier assigned.
    #[error("no external id for internal key {internal_id} of {resource_type}")]
    MissingExternalId {
        resource_type: String,
        internal_id: i64,
    },

    /// An external id is already bound to a different internal key.
    #[error("external id {external_id} of {resource_type} already maps to internal key {existing}")]
    ConflictingMapping {
        resource_type: String,
        external_id: i64,
        existing: i64,
    },
}

/// Predicate construction errors.
///
/// These indicate an internal contract violation rather than a bad request.
#[derive(Error, Debug)]
pub enum PredicateError {
    /// Field paths, operators and values differ in length.
    #[error("misaligned predicate node: {paths} paths, {operators} operators, {values} values")]
    Misaligned {
        paths: usize,
        operators: usize,
        values: usize,
    },

    /// A predicate node needs at least one condition.
    #[error("predicate node has no conditions")]
    Empty,
}

/// Errors originating from the persistence collaborator.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// A predicate referenced a field the backend does not know.
    #[error("unknown field '{field}' in {backend_name}")]
    UnknownField { backend_name: String, field: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for engine operations.
pub type OmopResult<T> = Result<T, OmopError>;

/// Result type alias for terminology operations.
pub type TerminologyResult<T> = Result<T, TerminologyError>;

impl From<TerminologyError> for OmopError {
    fn from(err: TerminologyError) -> Self {
        OmopError::Search(SearchError::Terminology(err))
    }
}

impl From<serde_json::Error> for OmopError {
    fn from(err: serde_json::Error) -> Self {
        OmopError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Internal {
            backend_name: "unknown".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = OmopError::Resource(ResourceError::NotFound {
            resource_type: "MedicationAdministration".to_string(),
            id: "42".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "resource not found: MedicationAdministration/42"
        );
        assert!(err.is_not_found());
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn test_validation_is_unprocessable() {
        let err: OmopError = ValidationError::MissingRequiredField {
            field: "medicationCodeableConcept".to_string(),
        }
        .into();
        assert_eq!(err.http_status(), 422);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_unmapped_system_display() {
        let err = SearchError::UnmappedSystem {
            system: "http://example.org/unknown".to_string(),
            parameter: "code:in".to_string(),
        };
        assert!(err.to_string().contains("http://example.org/unknown"));
        assert_eq!(OmopError::from(err).http_status(), 422);
    }

    #[test]
    fn test_terminology_error_conversion() {
        let err: OmopError = TerminologyError::ValueSetNotFound {
            url: "http://example.org/vs".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            OmopError::Search(SearchError::Terminology(_))
        ));
        assert!(err.to_string().starts_with("cannot process value-set reference"));
        assert_eq!(err.http_status(), 422);

        let err: OmopError = TerminologyError::Unavailable {
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(err.http_status(), 503);
    }

    #[test]
    fn test_internal_errors_are_server_errors() {
        let err: OmopError = PredicateError::Misaligned {
            paths: 2,
            operators: 1,
            values: 2,
        }
        .into();
        assert_eq!(err.http_status(), 500);

        let err: OmopError = IntegrityError::MissingExternalId {
            resource_type: "Patient".to_string(),
            internal_id: 7,
        }
        .into();
        assert_eq!(err.http_status(), 500);
        assert!(err.to_string().contains("internal key 7"));
    }

    #[test]
    fn test_configuration_error_lists_problems() {
        let err = OmopError::Configuration(vec![
            "Preferred page size cannot be 0".to_string(),
            "Terminology timeout cannot be 0".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: Preferred page size cannot be 0; Terminology timeout cannot be 0"
        );
        assert_eq!(err.http_status(), 500);
    }
}
