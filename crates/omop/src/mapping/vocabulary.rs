//! Static table between coding-system URIs and OMOP vocabulary ids.
//!
//! The table is built once at startup and shared read-only. Lookups are
//! exact and case-sensitive in both directions; `None` is the "unmapped"
//! sentinel.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BackendError, OmopResult};

/// Built-in `(coding system URI, vocabulary id)` pairs.
const STANDARD_ENTRIES: &[(&str, &str)] = &[
    ("http://snomed.info/sct", "SNOMED"),
    ("http://loinc.org", "LOINC"),
    ("http://www.nlm.nih.gov/research/umls/rxnorm", "RxNorm"),
    ("http://hl7.org/fhir/sid/ndc", "NDC"),
    ("http://hl7.org/fhir/sid/icd-9-cm", "ICD9CM"),
    ("http://hl7.org/fhir/sid/icd-10-cm", "ICD10CM"),
    ("http://hl7.org/fhir/sid/icd-10", "ICD10"),
    ("http://unitsofmeasure.org", "UCUM"),
    ("http://www.ama-assn.org/go/cpt", "CPT4"),
    ("http://hl7.org/fhir/sid/cvx", "CVX"),
    ("http://www.whocc.no/atc", "ATC"),
    ("http://www.cms.gov/Medicare/Coding/HCPCSReleaseCodeSets", "HCPCS"),
];

/// One table entry, as read from a vocabulary map file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    /// Coding system URI.
    pub system: String,
    /// OMOP vocabulary id.
    pub vocabulary: String,
}

/// Bidirectional URI / vocabulary table.
#[derive(Debug, Clone, Default)]
pub struct VocabularyMap {
    by_uri: HashMap<String, String>,
    by_vocabulary: HashMap<String, String>,
}

impl VocabularyMap {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding the built-in entries.
    pub fn standard() -> Self {
        let mut map = Self::new();
        for (uri, vocabulary) in STANDARD_ENTRIES {
            map.insert(*uri, *vocabulary);
        }
        map
    }

    /// Adds or replaces an entry, keeping both directions consistent.
    pub fn insert(&mut self, uri: impl Into<String>, vocabulary: impl Into<String>) {
        let uri = uri.into();
        let vocabulary = vocabulary.into();

        if let Some(old_vocabulary) = self.by_uri.remove(&uri) {
            self.by_vocabulary.remove(&old_vocabulary);
        }
        if let Some(old_uri) = self.by_vocabulary.remove(&vocabulary) {
            self.by_uri.remove(&old_uri);
        }

        self.by_uri.insert(uri.clone(), vocabulary.clone());
        self.by_vocabulary.insert(vocabulary, uri);
    }

    /// Adds entries parsed from a JSON array of `{system, vocabulary}`.
    pub fn extend_from_json(&mut self, json: &str) -> OmopResult<usize> {
        let entries: Vec<VocabularyEntry> = serde_json::from_str(json)?;
        let count = entries.len();
        for entry in entries {
            if self.by_uri.contains_key(&entry.system) {
                warn!(system = %entry.system, "Vocabulary entry overrides an existing mapping");
            }
            self.insert(entry.system, entry.vocabulary);
        }
        Ok(count)
    }

    /// Builds the standard table extended with the entries of a JSON file.
    pub fn load(path: &Path) -> OmopResult<Self> {
        let json = std::fs::read_to_string(path).map_err(BackendError::from)?;
        let mut map = Self::standard();
        let count = map.extend_from_json(&json)?;
        debug!(path = %path.display(), entries = count, "Loaded vocabulary map");
        Ok(map)
    }

    /// The vocabulary id for a coding-system URI.
    pub fn vocabulary_from_uri(&self, uri: &str) -> Option<&str> {
        self.by_uri.get(uri).map(String::as_str)
    }

    /// The coding-system URI for a vocabulary id.
    pub fn uri_from_vocabulary(&self, vocabulary: &str) -> Option<&str> {
        self.by_vocabulary.get(vocabulary).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.by_uri.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_uri.is_empty()
    }

    /// All entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_uri.iter().map(|(u, v)| (u.as_str(), v.as_str()))
    }
}
