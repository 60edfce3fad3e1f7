//! Engine configuration.
//!
//! Supports programmatic configuration, command line arguments and
//! environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OMOP_PREFERRED_PAGE_SIZE` | 30 | Page size offered to clients |
//! | `OMOP_MAX_PAGE_SIZE` | 500 | Largest window a single fetch may span |
//! | `OMOP_CODING_STRICTNESS` | lenient | `lenient` or `strict` handling of unmapped coding systems |
//! | `OMOP_ID_MAPPING` | identity | `identity` or `table` identifier translation |
//! | `OMOP_TERMINOLOGY_URL` | (none) | Base URL of the terminology server |
//! | `OMOP_TERMINOLOGY_TIMEOUT` | 30 | Terminology request timeout (seconds) |
//! | `OMOP_VOCABULARY_MAP` | (none) | JSON file extending the vocabulary table |
//! | `OMOP_LOG_LEVEL` | info | Log level |
//!
//! # Example
//!
//! ```rust
//! use helios_omop::config::{CodingStrictness, EngineConfig};
//!
//! let config = EngineConfig {
//!     coding_strictness: CodingStrictness::Strict,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

/// Handling of coding systems missing from the vocabulary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodingStrictness {
    /// Fall back to a code-only match when a code is present.
    #[default]
    Lenient,
    /// Reject the request.
    Strict,
}

impl fmt::Display for CodingStrictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodingStrictness::Lenient => write!(f, "lenient"),
            CodingStrictness::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for CodingStrictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(CodingStrictness::Lenient),
            "strict" => Ok(CodingStrictness::Strict),
            _ => Err(format!("unknown coding strictness: {}", s)),
        }
    }
}

/// Identifier translation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdMappingMode {
    /// External ids equal internal keys.
    #[default]
    Identity,
    /// External ids come from a per-kind mapping table.
    Table,
}

impl fmt::Display for IdMappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdMappingMode::Identity => write!(f, "identity"),
            IdMappingMode::Table => write!(f, "table"),
        }
    }
}

impl FromStr for IdMappingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identity" => Ok(IdMappingMode::Identity),
            "table" => Ok(IdMappingMode::Table),
            _ => Err(format!("unknown id mapping mode: {}", s)),
        }
    }
}

/// Configuration for the translation engine.
#[derive(Debug, Clone, Parser)]
#[command(name = "omop-engine")]
#[command(about = "FHIR search and resource mapping over an OMOP store")]
pub struct EngineConfig {
    /// Page size offered to clients.
    #[arg(long, env = "OMOP_PREFERRED_PAGE_SIZE", default_value = "30")]
    pub preferred_page_size: usize,

    /// Largest page size a client may request.
    #[arg(long, env = "OMOP_MAX_PAGE_SIZE", default_value = "500")]
    pub max_page_size: usize,

    /// Handling of unmapped coding systems (lenient, strict).
    #[arg(long, env = "OMOP_CODING_STRICTNESS", default_value = "lenient")]
    pub coding_strictness: CodingStrictness,

    /// Identifier translation (identity, table).
    #[arg(long, env = "OMOP_ID_MAPPING", default_value = "identity")]
    pub id_mapping: IdMappingMode,

    /// Base URL of the terminology server.
    #[arg(long, env = "OMOP_TERMINOLOGY_URL")]
    pub terminology_url: Option<String>,

    /// Terminology request timeout in seconds.
    #[arg(long, env = "OMOP_TERMINOLOGY_TIMEOUT", default_value = "30")]
    pub terminology_timeout: u64,

    /// JSON file of `{system, vocabulary}` entries extending the built-in table.
    #[arg(long, env = "OMOP_VOCABULARY_MAP")]
    pub vocabulary_map: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "OMOP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preferred_page_size: 30,
            max_page_size: 500,
            coding_strictness: CodingStrictness::Lenient,
            id_mapping: IdMappingMode::Identity,
            terminology_url: None,
            terminology_timeout: 30,
            vocabulary_map: None,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration from environment variables.
    ///
    /// Parses environment variables without requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse_from(["omop-engine"]).unwrap_or_default()
    }

    /// The terminology request timeout.
    pub fn terminology_timeout(&self) -> Duration {
        Duration::from_secs(self.terminology_timeout)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.preferred_page_size == 0 {
            errors.push("Preferred page size cannot be 0".to_string());
        }

        if self.preferred_page_size > self.max_page_size {
            errors.push("Preferred page size cannot exceed max page size".to_string());
        }

        if self.terminology_timeout == 0 {
            errors.push("Terminology timeout cannot be 0".to_string());
        }

        if let Some(url) = &self.terminology_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!("Terminology URL must be http(s): {}", url));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Small pages so pagination is exercised with few rows.
    pub fn for_testing() -> Self {
        Self {
            preferred_page_size: 5,
            max_page_size: 50,
            terminology_timeout: 5,
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.preferred_page_size, 30);
        assert_eq!(config.coding_strictness, CodingStrictness::Lenient);
        assert_eq!(config.id_mapping, IdMappingMode::Identity);
        assert!(config.terminology_url.is_none());
    }

    #[test]
    fn test_parse_from_args() {
        let config = EngineConfig::try_parse_from([
            "omop-engine",
            "--coding-strictness",
            "strict",
            "--id-mapping",
            "table",
            "--terminology-url",
            "http://tx.example.org/fhir",
        ])
        .unwrap();
        assert_eq!(config.coding_strictness, CodingStrictness::Strict);
        assert_eq!(config.id_mapping, IdMappingMode::Table);
        assert_eq!(
            config.terminology_url.as_deref(),
            Some("http://tx.example.org/fhir")
        );
        assert_eq!(config.preferred_page_size, 30);
    }

    #[test]
    fn test_parse_rejects_unknown_strictness() {
        assert!(
            EngineConfig::try_parse_from(["omop-engine", "--coding-strictness", "loose"]).is_err()
        );
    }

    #[test]
    fn test_validate_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_page_sizes() {
        let config = EngineConfig {
            preferred_page_size: 100,
            max_page_size: 50,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("exceed")));
    }

    #[test]
    fn test_validate_terminology_url() {
        let config = EngineConfig {
            terminology_url: Some("ftp://tx.example.org".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_terminology_timeout() {
        assert_eq!(
            EngineConfig::default().terminology_timeout(),
            Duration::from_secs(30)
        );
    }
}
