//! Terminology collaborator trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TerminologyResult;

/// Codes from one coding system inside a value-set partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSet {
    /// Coding system URI.
    pub system: String,
    /// Codes listed for the system.
    pub codes: Vec<String>,
}

impl ConceptSet {
    /// Creates a concept set.
    pub fn new<S: Into<String>>(system: impl Into<String>, codes: impl IntoIterator<Item = S>) -> Self {
        Self {
            system: system.into(),
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }
}

/// The include and exclude partitions of a value set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSetCompose {
    /// Concept sets that are members.
    pub include: Vec<ConceptSet>,
    /// Concept sets that are excluded.
    pub exclude: Vec<ConceptSet>,
}

/// External value-set expansion service.
///
/// Calls are network-bound from the caller's perspective. There is no retry:
/// a failure or timeout surfaces immediately as a [`TerminologyError`]
/// and aborts the predicate-building step that triggered it.
///
/// [`TerminologyError`]: crate::error::TerminologyError
#[async_trait]
pub trait TerminologyClient: Send + Sync {
    /// Resolves a value set by canonical URL into its include/exclude parts.
    ///
    /// # Errors
    ///
    /// * `TerminologyError::Unavailable` - If the service cannot be reached
    /// * `TerminologyError::ValueSetNotFound` - If no value set has this URL
    /// * `TerminologyError::InvalidResponse` - If the answer cannot be read
    async fn expand_value_set(&self, url: &str) -> TerminologyResult<ValueSetCompose>;
}

/// Client used when no terminology service is configured.
///
/// Every expansion fails with `Unavailable`, so `:in` searches are rejected
/// instead of silently matching nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerminology;

#[async_trait]
impl TerminologyClient for NoTerminology {
    async fn expand_value_set(&self, url: &str) -> TerminologyResult<ValueSetCompose> {
        Err(crate::error::TerminologyError::Unavailable {
            message: format!("no terminology service configured to expand {}", url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerminologyError;

    #[tokio::test]
    async fn test_no_terminology_is_unavailable() {
        let err = NoTerminology
            .expand_value_set("http://example.org/vs")
            .await
            .unwrap_err();
        assert!(matches!(err, TerminologyError::Unavailable { .. }));
        assert!(err.to_string().contains("http://example.org/vs"));
    }
}
