//! The engine context.
//!
//! An [`EngineContext`] is built once at startup and handed to mappers and
//! providers. It owns the process-lifetime, read-mostly state: the vocabulary
//! table, the identifier translator, the concept lookup and the terminology
//! client.
//!
//! ```
//! use std::sync::Arc;
//! use helios_omop::backends::ConceptTable;
//! use helios_omop::config::EngineConfig;
//! use helios_omop::context::EngineContext;
//!
//! let context = EngineContext::from_config(
//!     EngineConfig::for_testing(),
//!     Arc::new(ConceptTable::new()),
//! )
//! .unwrap();
//! assert_eq!(context.codes().vocabulary_from_uri("http://loinc.org"), Some("LOINC"));
//! ```

use std::sync::Arc;

use tracing::info;

use crate::backends::HttpTerminologyClient;
use crate::config::{CodingStrictness, EngineConfig, IdMappingMode};
use crate::core::{ConceptLookup, NoTerminology, TerminologyClient};
use crate::error::{OmopError, OmopResult};
use crate::mapping::{
    CodeSystemTranslator, IdentifierTranslator, IdentityTranslator, TableTranslator,
    VocabularyMap,
};

/// Shared state for one engine instance.
#[derive(Clone)]
pub struct EngineContext {
    config: EngineConfig,
    ids: Arc<dyn IdentifierTranslator>,
    codes: CodeSystemTranslator,
    concepts: Arc<dyn ConceptLookup>,
}

impl EngineContext {
    /// Creates a context from explicit parts.
    pub fn new(
        config: EngineConfig,
        ids: Arc<dyn IdentifierTranslator>,
        codes: CodeSystemTranslator,
        concepts: Arc<dyn ConceptLookup>,
    ) -> Self {
        Self {
            config,
            ids,
            codes,
            concepts,
        }
    }

    /// Builds a context from configuration.
    ///
    /// Loads the vocabulary map file when one is configured, picks the
    /// identifier translator named by `id_mapping` and connects the HTTP
    /// terminology client when a terminology URL is set.
    ///
    /// # Errors
    ///
    /// * `OmopError::Configuration` - If the configuration does not validate
    /// * `OmopError::Backend` - If the vocabulary map file cannot be read
    pub fn from_config(
        config: EngineConfig,
        concepts: Arc<dyn ConceptLookup>,
    ) -> OmopResult<Self> {
        config.validate().map_err(OmopError::Configuration)?;

        let vocabularies = match &config.vocabulary_map {
            Some(path) => VocabularyMap::load(path)?,
            None => VocabularyMap::standard(),
        };

        let ids: Arc<dyn IdentifierTranslator> = match config.id_mapping {
            IdMappingMode::Identity => Arc::new(IdentityTranslator),
            IdMappingMode::Table => Arc::new(TableTranslator::new()),
        };

        let terminology: Arc<dyn TerminologyClient> = match &config.terminology_url {
            Some(url) => Arc::new(HttpTerminologyClient::new(
                url.clone(),
                config.terminology_timeout(),
            )?),
            None => Arc::new(NoTerminology),
        };

        info!(
            vocabularies = vocabularies.len(),
            id_mapping = %config.id_mapping,
            coding_strictness = %config.coding_strictness,
            terminology = config.terminology_url.as_deref().unwrap_or("none"),
            "Engine context initialized"
        );

        Ok(Self::new(
            config,
            ids,
            CodeSystemTranslator::new(Arc::new(vocabularies), terminology),
            concepts,
        ))
    }

    /// Replaces the identifier translator.
    pub fn with_identifier_translator(mut self, ids: Arc<dyn IdentifierTranslator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replaces the terminology collaborator.
    pub fn with_terminology(mut self, terminology: Arc<dyn TerminologyClient>) -> Self {
        self.codes = self.codes.with_terminology(terminology);
        self
    }

    /// The configuration the context was built from.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The identifier translator.
    pub fn ids(&self) -> &dyn IdentifierTranslator {
        self.ids.as_ref()
    }

    /// The code system translator.
    pub fn codes(&self) -> &CodeSystemTranslator {
        &self.codes
    }

    /// The concept lookup.
    pub fn concepts(&self) -> &dyn ConceptLookup {
        self.concepts.as_ref()
    }

    /// Handling of unmapped coding systems in searches.
    pub fn coding_strictness(&self) -> CodingStrictness {
        self.config.coding_strictness
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .field("codes", &self.codes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ConceptTable;
    use crate::types::{ExternalId, InternalId, ResourceKind};
    use std::io::Write;

    fn concepts() -> Arc<dyn ConceptLookup> {
        Arc::new(ConceptTable::new())
    }

    #[test]
    fn test_from_default_config() {
        let context = EngineContext::from_config(EngineConfig::default(), concepts()).unwrap();
        assert_eq!(context.coding_strictness(), CodingStrictness::Lenient);
        // Identity mapping
        assert_eq!(
            context
                .ids()
                .internal_from_external(ExternalId::new(3), ResourceKind::Patient),
            Some(InternalId::new(3))
        );
    }

    #[test]
    fn test_table_mapping_mode() {
        let config = EngineConfig {
            id_mapping: IdMappingMode::Table,
            ..Default::default()
        };
        let context = EngineContext::from_config(config, concepts()).unwrap();
        assert_eq!(
            context
                .ids()
                .internal_from_external(ExternalId::new(3), ResourceKind::Patient),
            None
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig {
            preferred_page_size: 0,
            ..Default::default()
        };
        let err = EngineContext::from_config(config, concepts()).unwrap_err();
        assert!(matches!(err, OmopError::Configuration(_)));
    }

    #[test]
    fn test_vocabulary_map_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"system": "http://example/sys", "vocabulary": "SYS"}}]"#
        )
        .unwrap();
        let config = EngineConfig {
            vocabulary_map: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let context = EngineContext::from_config(config, concepts()).unwrap();
        assert_eq!(
            context.codes().vocabulary_from_uri("http://example/sys"),
            Some("SYS")
        );
    }
}
