//! Typed FHIR search values.
//!
//! The transport layer parses wire-format parameters into these types; the
//! predicate builder consumes them.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::predicate::Operator;

/// Search modifiers understood by the engine.
///
/// Only `:in` changes how a value is translated; any other modifier makes the
/// parameter unsupported.
///
/// See: https://build.fhir.org/search.html#modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchModifier {
    /// Match codes in a value set (token parameters).
    In,
}

impl fmt::Display for SearchModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchModifier::In => write!(f, "in"),
        }
    }
}

impl SearchModifier {
    /// Parses a modifier string, returning None for unsupported modifiers.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in" => Some(SearchModifier::In),
            _ => None,
        }
    }
}

/// Comparison prefixes for search parameters.
///
/// See: https://build.fhir.org/search.html#prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchPrefix {
    /// Equal (default).
    #[default]
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
    /// Starts after.
    Sa,
    /// Ends before.
    Eb,
    /// Approximately equal.
    Ap,
}

impl fmt::Display for SearchPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchPrefix::Eq => write!(f, "eq"),
            SearchPrefix::Ne => write!(f, "ne"),
            SearchPrefix::Gt => write!(f, "gt"),
            SearchPrefix::Lt => write!(f, "lt"),
            SearchPrefix::Ge => write!(f, "ge"),
            SearchPrefix::Le => write!(f, "le"),
            SearchPrefix::Sa => write!(f, "sa"),
            SearchPrefix::Eb => write!(f, "eb"),
            SearchPrefix::Ap => write!(f, "ap"),
        }
    }
}

impl FromStr for SearchPrefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" => Ok(SearchPrefix::Eq),
            "ne" => Ok(SearchPrefix::Ne),
            "gt" => Ok(SearchPrefix::Gt),
            "lt" => Ok(SearchPrefix::Lt),
            "ge" => Ok(SearchPrefix::Ge),
            "le" => Ok(SearchPrefix::Le),
            "sa" => Ok(SearchPrefix::Sa),
            "eb" => Ok(SearchPrefix::Eb),
            "ap" => Ok(SearchPrefix::Ap),
            _ => Err(format!("unknown search prefix: {}", s)),
        }
    }
}

impl SearchPrefix {
    /// Extracts a prefix from the beginning of a value string.
    ///
    /// Returns the prefix and the remaining value.
    pub fn extract(value: &str) -> (Self, &str) {
        if value.len() >= 2 && value.is_char_boundary(2) {
            let prefix = &value[..2];
            if let Ok(p) = prefix.parse() {
                return (p, &value[2..]);
            }
        }
        (SearchPrefix::Eq, value)
    }

    /// The relational operator for a single-valued date column.
    ///
    /// `sa`/`eb` collapse to strict comparisons and `ap` to equality, since
    /// entity dates carry no range.
    pub fn to_operator(self) -> Operator {
        match self {
            SearchPrefix::Gt | SearchPrefix::Sa => Operator::Gt,
            SearchPrefix::Ge => Operator::Ge,
            SearchPrefix::Lt | SearchPrefix::Eb => Operator::Lt,
            SearchPrefix::Le => Operator::Le,
            SearchPrefix::Ne => Operator::Ne,
            SearchPrefix::Eq | SearchPrefix::Ap => Operator::Eq,
        }
    }
}

/// A token value: `[system]|[code]` plus an optional modifier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenParam {
    /// Coding system URI.
    pub system: Option<String>,
    /// Code, or the value-set URL when the modifier is `:in`.
    pub code: Option<String>,
    /// Modifier, if any.
    pub modifier: Option<SearchModifier>,
}

impl TokenParam {
    /// Creates a token with both parts.
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            modifier: None,
        }
    }

    /// Creates a code-only token.
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Default::default()
        }
    }

    /// Creates a `:in` token referencing a value set.
    pub fn value_set(url: impl Into<String>) -> Self {
        Self {
            code: Some(url.into()),
            modifier: Some(SearchModifier::In),
            ..Default::default()
        }
    }

    /// Parses `system|code`, `|code`, `system|` or `code`.
    ///
    /// Empty parts become `None`.
    pub fn parse(s: &str) -> Self {
        let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_string());
        match s.split_once('|') {
            Some((system, code)) => Self {
                system: non_empty(system),
                code: non_empty(code),
                modifier: None,
            },
            None => Self {
                system: None,
                code: non_empty(s),
                modifier: None,
            },
        }
    }

    /// Sets the modifier.
    pub fn with_modifier(mut self, modifier: SearchModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Returns true for a value-set (`:in`) token.
    pub fn is_value_set(&self) -> bool {
        self.modifier == Some(SearchModifier::In)
    }

    /// Returns true if neither system nor code is present.
    pub fn is_empty(&self) -> bool {
        self.system.is_none() && self.code.is_none()
    }
}

/// A date value with a comparison prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParam {
    /// The comparison prefix.
    pub prefix: SearchPrefix,
    /// The date compared against.
    pub value: NaiveDate,
}

impl DateParam {
    /// Creates a date value.
    pub fn new(prefix: SearchPrefix, value: NaiveDate) -> Self {
        Self { prefix, value }
    }

    /// Parses `[prefix]YYYY-MM-DD`. A time part, if present, is ignored.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (prefix, rest) = SearchPrefix::extract(s);
        let date_part = rest.split('T').next().unwrap_or(rest);
        let value = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{}': {}", rest, e))?;
        Ok(Self { prefix, value })
    }
}

/// A reference value, optionally chained (`subject.name=Smith`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceParam {
    /// Target resource type, when given.
    pub resource_type: Option<String>,
    /// The referenced id, or the chained value when `chain` is set.
    pub value: String,
    /// Chained parameter on the referenced resource.
    pub chain: Option<String>,
}

impl ReferenceParam {
    /// Creates a typed reference.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: Some(resource_type.into()),
            value: id.into(),
            chain: None,
        }
    }

    /// Creates a chained reference.
    pub fn chained(
        resource_type: Option<String>,
        chain: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            value: value.into(),
            chain: Some(chain.into()),
        }
    }

    /// Parses `Type/id` or a bare `id`.
    pub fn parse(s: &str) -> Self {
        match s.rsplit_once('/') {
            Some((resource_type, id)) if !resource_type.is_empty() => {
                // Absolute URLs keep only the final type segment.
                let resource_type = resource_type.rsplit('/').next().unwrap_or(resource_type);
                Self {
                    resource_type: Some(resource_type.to_string()),
                    value: id.to_string(),
                    chain: None,
                }
            }
            _ => Self {
                resource_type: None,
                value: s.to_string(),
                chain: None,
            },
        }
    }
}

/// One typed search value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchValue {
    /// Token value.
    Token(TokenParam),
    /// Date value.
    Date(DateParam),
    /// Reference value.
    Reference(ReferenceParam),
    /// Plain string value.
    String(String),
}

impl From<TokenParam> for SearchValue {
    fn from(value: TokenParam) -> Self {
        SearchValue::Token(value)
    }
}

impl From<DateParam> for SearchValue {
    fn from(value: DateParam) -> Self {
        SearchValue::Date(value)
    }
}

impl From<ReferenceParam> for SearchValue {
    fn from(value: ReferenceParam) -> Self {
        SearchValue::Reference(value)
    }
}

impl From<&str> for SearchValue {
    fn from(value: &str) -> Self {
        SearchValue::String(value.to_string())
    }
}

/// A named search parameter with its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParameter {
    /// The parameter name (e.g., "code", "Patient:name").
    pub name: String,

    /// The search value(s). Multiple values are ORed.
    pub values: Vec<SearchValue>,
}

impl SearchParameter {
    /// Creates a parameter with one value.
    pub fn new(name: impl Into<String>, value: impl Into<SearchValue>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// Creates a parameter with several OR-combined values.
    pub fn any_of<V: Into<SearchValue>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Sort direction for _sort parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

/// A sort directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// The parameter to sort by.
    pub parameter: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Parses a sort parameter value (e.g., "-effective-time" for descending).
    pub fn parse(s: &str) -> Self {
        if let Some(stripped) = s.strip_prefix('-') {
            Self {
                parameter: stripped.to_string(),
                direction: SortDirection::Descending,
            }
        } else {
            Self {
                parameter: s.to_string(),
                direction: SortDirection::Ascending,
            }
        }
    }
}

/// A complete search request for one resource kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search parameters, AND-combined.
    pub parameters: Vec<SearchParameter>,

    /// Sort directives.
    pub sort: Vec<SortDirective>,
}

impl SearchRequest {
    /// Creates an empty request (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn with_parameter(mut self, param: SearchParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Adds a sort directive.
    pub fn with_sort(mut self, sort: SortDirective) -> Self {
        self.sort.push(sort);
        self
    }
}
