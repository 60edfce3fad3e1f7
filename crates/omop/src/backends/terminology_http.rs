//! HTTP terminology client.
//!
//! Resolves a value set by canonical URL with a FHIR search
//! (`GET {base}/ValueSet?url=...`) and reads the enumerated concepts of its
//! `compose.include` and `compose.exclude` elements. A server answering with
//! a bare `ValueSet` instead of a search `Bundle` is accepted as well.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{ConceptSet, TerminologyClient, ValueSetCompose};
use crate::error::{TerminologyError, TerminologyResult};

/// Terminology collaborator backed by a FHIR terminology server.
#[derive(Debug, Clone)]
pub struct HttpTerminologyClient {
    client: Client,
    base_url: String,
}

impl HttpTerminologyClient {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> TerminologyResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// The server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TerminologyClient for HttpTerminologyClient {
    async fn expand_value_set(&self, url: &str) -> TerminologyResult<ValueSetCompose> {
        let endpoint = format!("{}/ValueSet", self.base_url);
        debug!(endpoint = %endpoint, url, "Requesting value set");

        let response = self
            .client
            .get(&endpoint)
            .query(&[("url", url)])
            .header("Accept", "application/fhir+json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    TerminologyError::Unavailable {
                        message: e.to_string(),
                    }
                } else {
                    TerminologyError::Http(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TerminologyError::ValueSetNotFound {
                url: url.to_string(),
            });
        }
        if status.is_server_error() {
            warn!(status = %status, url, "Terminology server error");
            return Err(TerminologyError::Unavailable {
                message: format!("terminology server answered {}", status),
            });
        }
        if !status.is_success() {
            return Err(TerminologyError::InvalidResponse {
                url: url.to_string(),
                message: format!("unexpected status {}", status),
            });
        }

        let body: Value = response.json().await?;
        parse_value_set_compose(url, &body)
    }
}

/// Reads the include/exclude partitions out of a search `Bundle` or a
/// `ValueSet`.
///
/// An include or exclude element naming only a system yields a concept set
/// with no codes, meaning "every code of the system". Elements selecting
/// codes by `filter` or by another `valueSet` cannot be enumerated here and
/// are rejected rather than widened to the whole system.
pub fn parse_value_set_compose(url: &str, body: &Value) -> TerminologyResult<ValueSetCompose> {
    let invalid = |message: &str| TerminologyError::InvalidResponse {
        url: url.to_string(),
        message: message.to_string(),
    };

    let value_set = match body.get("resourceType").and_then(Value::as_str) {
        Some("ValueSet") => body,
        Some("Bundle") => body
            .get("entry")
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
            .and_then(|entry| entry.get("resource"))
            .ok_or_else(|| TerminologyError::ValueSetNotFound {
                url: url.to_string(),
            })?,
        _ => return Err(invalid("expected a ValueSet or Bundle")),
    };

    let compose = value_set
        .get("compose")
        .ok_or_else(|| invalid("value set has no compose element"))?;

    Ok(ValueSetCompose {
        include: concept_sets(compose.get("include"), &invalid)?,
        exclude: concept_sets(compose.get("exclude"), &invalid)?,
    })
}

fn concept_sets(
    section: Option<&Value>,
    invalid: &dyn Fn(&str) -> TerminologyError,
) -> TerminologyResult<Vec<ConceptSet>> {
    let Some(section) = section else {
        return Ok(Vec::new());
    };
    let entries = section
        .as_array()
        .ok_or_else(|| invalid("compose section is not an array"))?;

    let mut sets = Vec::with_capacity(entries.len());
    for entry in entries {
        let system = entry
            .get("system")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("compose entry without system"))?;
        if entry.get("filter").is_some() || entry.get("valueSet").is_some() {
            return Err(invalid("compose entry selects codes by filter or nested value set"));
        }
        let codes: Vec<&str> = match entry.get("concept") {
            None => Vec::new(),
            Some(concepts) => {
                let codes: Vec<&str> = concepts
                    .as_array()
                    .map(|concepts| {
                        concepts
                            .iter()
                            .filter_map(|c| c.get("code").and_then(Value::as_str))
                            .collect()
                    })
                    .unwrap_or_default();
                if codes.is_empty() {
                    return Err(invalid("compose entry lists no concept codes"));
                }
                codes
            }
        };
        sets.push(ConceptSet::new(system, codes));
    }
    Ok(sets)
}
