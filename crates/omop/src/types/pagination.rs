//! Result windows and ordering.
//!
//! A [`Window`] is a half-open `[from, to)` range over an ordered result set.
//! An [`OrderSpec`] is always resolved to a stable total order before it
//! reaches a backend: the surrogate key is appended ascending as the final
//! tie-breaker, so overlapping or adjacent windows agree with each other.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::search_params::SortDirection;

/// Relational path of the surrogate key.
pub const ID_FIELD: &str = "id";

/// A half-open `[from, to)` window over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// First index, inclusive.
    pub from: usize,
    /// Last index, exclusive.
    pub to: usize,
}

impl Window {
    /// Creates a window. A reversed range is normalized to an empty window.
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            from,
            to: to.max(from),
        }
    }

    /// The window for a zero-based page of the given size.
    pub fn page(page: usize, size: usize) -> Self {
        let from = page.saturating_mul(size);
        Self::new(from, from.saturating_add(size))
    }

    /// Number of positions covered.
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    /// Returns true if the window covers nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

/// One ordering key on a relational field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    /// Relational field path.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl OrderKey {
    /// Ascending key.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending key.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Ordering for a windowed fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    keys: Vec<OrderKey>,
}

impl OrderSpec {
    /// Creates an empty spec (surrogate key ascending once resolved).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key.
    pub fn then(mut self, key: OrderKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Keys as given by the caller.
    pub fn keys(&self) -> &[OrderKey] {
        &self.keys
    }

    /// Returns true if the caller gave no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys with the surrogate-key tie-breaker appended when missing.
    pub fn resolved(&self) -> Vec<OrderKey> {
        let mut keys = self.keys.clone();
        if !keys.iter().any(|k| k.field == ID_FIELD) {
            keys.push(OrderKey::asc(ID_FIELD));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_normalizes_reversed_range() {
        let window = Window::new(10, 5);
        assert!(window.is_empty());
        assert_eq!(window.from, 10);
    }

    #[test]
    fn test_window_page() {
        assert_eq!(Window::page(0, 30), Window::new(0, 30));
        assert_eq!(Window::page(2, 30), Window::new(60, 90));
        assert_eq!(Window::page(2, 30).len(), 30);
    }

    #[test]
    fn test_default_order_is_id_ascending() {
        assert_eq!(OrderSpec::new().resolved(), vec![OrderKey::asc("id")]);
    }

    #[test]
    fn test_order_appends_tie_breaker() {
        let spec = OrderSpec::new().then(OrderKey::desc("drugExposureStartDate"));
        assert_eq!(
            spec.resolved(),
            vec![OrderKey::desc("drugExposureStartDate"), OrderKey::asc("id")]
        );
    }

    #[test]
    fn test_order_keeps_explicit_id_key() {
        let spec = OrderSpec::new().then(OrderKey::desc("id"));
        assert_eq!(spec.resolved(), vec![OrderKey::desc("id")]);
    }
}
