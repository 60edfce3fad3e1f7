//! Code system translation.
//!
//! [`CodeSystemTranslator`] pairs the static [`VocabularyMap`] with the
//! terminology collaborator used for value-set expansion.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{TerminologyClient, ValueSetCompose};
use crate::error::TerminologyResult;
use crate::mapping::vocabulary::VocabularyMap;

/// Translates coding systems and expands value sets.
#[derive(Clone)]
pub struct CodeSystemTranslator {
    vocabularies: Arc<VocabularyMap>,
    terminology: Arc<dyn TerminologyClient>,
}

impl CodeSystemTranslator {
    /// Creates a translator over a vocabulary table and terminology client.
    pub fn new(vocabularies: Arc<VocabularyMap>, terminology: Arc<dyn TerminologyClient>) -> Self {
        Self {
            vocabularies,
            terminology,
        }
    }

    /// Replaces the terminology collaborator, keeping the vocabulary table.
    pub fn with_terminology(mut self, terminology: Arc<dyn TerminologyClient>) -> Self {
        self.terminology = terminology;
        self
    }

    /// The vocabulary id for a coding-system URI, or `None` if unmapped.
    pub fn vocabulary_from_uri(&self, uri: &str) -> Option<&str> {
        self.vocabularies.vocabulary_from_uri(uri)
    }

    /// The coding-system URI for a vocabulary id, or `None` if unmapped.
    pub fn uri_from_vocabulary(&self, vocabulary: &str) -> Option<&str> {
        self.vocabularies.uri_from_vocabulary(vocabulary)
    }

    /// Expands a value set through the terminology collaborator.
    ///
    /// Failures are logged and returned; they are never retried.
    pub async fn expand_value_set(&self, url: &str) -> TerminologyResult<ValueSetCompose> {
        match self.terminology.expand_value_set(url).await {
            Ok(compose) => {
                debug!(
                    url,
                    include = compose.include.len(),
                    exclude = compose.exclude.len(),
                    "Expanded value set"
                );
                Ok(compose)
            }
            Err(e) => {
                warn!(url, error = %e, "Value set expansion failed");
                Err(e)
            }
        }
    }

    /// The underlying vocabulary table.
    pub fn vocabularies(&self) -> &VocabularyMap {
        &self.vocabularies
    }
}

impl std::fmt::Debug for CodeSystemTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeSystemTranslator")
            .field("vocabularies", &self.vocabularies.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConceptSet, NoTerminology};
    use crate::error::TerminologyError;
    use async_trait::async_trait;

    struct FixedTerminology;

    #[async_trait]
    impl TerminologyClient for FixedTerminology {
        async fn expand_value_set(&self, url: &str) -> TerminologyResult<ValueSetCompose> {
            if url == "http://example.org/vs/known" {
                Ok(ValueSetCompose {
                    include: vec![ConceptSet::new("http://loinc.org", ["1234-5"])],
                    exclude: vec![],
                })
            } else {
                Err(TerminologyError::ValueSetNotFound {
                    url: url.to_string(),
                })
            }
        }
    }

    fn translator(terminology: Arc<dyn TerminologyClient>) -> CodeSystemTranslator {
        CodeSystemTranslator::new(Arc::new(VocabularyMap::standard()), terminology)
    }

    #[test]
    fn test_vocabulary_lookups_both_ways() {
        let translator = translator(Arc::new(NoTerminology));
        let vocabulary = translator
            .vocabulary_from_uri("http://www.nlm.nih.gov/research/umls/rxnorm")
            .unwrap();
        assert_eq!(vocabulary, "RxNorm");
        assert_eq!(
            translator.vocabulary_from_uri(translator.uri_from_vocabulary(vocabulary).unwrap()),
            Some("RxNorm")
        );
        assert_eq!(translator.vocabulary_from_uri("http://example/unknown"), None);
    }

    #[tokio::test]
    async fn test_expand_delegates_to_collaborator() {
        let translator = translator(Arc::new(FixedTerminology));
        let compose = translator
            .expand_value_set("http://example.org/vs/known")
            .await
            .unwrap();
        assert_eq!(compose.include.len(), 1);
        assert_eq!(compose.include[0].codes, vec!["1234-5".to_string()]);
    }

    #[tokio::test]
    async fn test_expand_propagates_failure() {
        let translator = translator(Arc::new(FixedTerminology));
        let err = translator
            .expand_value_set("http://example.org/vs/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, TerminologyError::ValueSetNotFound { .. }));
    }
}
