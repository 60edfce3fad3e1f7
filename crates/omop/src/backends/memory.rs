//! In-memory persistence collaborator.
//!
//! [`MemoryStore`] keeps entity snapshots in a `BTreeMap` keyed by surrogate
//! key and evaluates a [`PredicateList`] against each row. `like` follows
//! SQLite semantics: `%` and `_` wildcards, case-insensitive.
//!
//! [`ConceptTable`] serves concept lookups from two hash indexes.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;

use crate::core::{ConceptLookup, EntityStorage};
use crate::error::{BackendError, OmopResult, ResourceError};
use crate::types::{
    Concept, Condition, Entity, FieldValue, InternalId, Literal, Operator, OrderSpec,
    PredicateList, PredicateNode, SortDirection, Window,
};

const BACKEND_NAME: &str = "memory";

/// Entity storage held in process memory.
pub struct MemoryStore<E: Entity> {
    rows: RwLock<BTreeMap<i64, E>>,
    next_id: AtomicI64,
}

impl<E: Entity> Debug for MemoryStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("table", &E::TABLE)
            .field("rows", &self.rows.read().len())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<E: Entity> MemoryStore<E> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a row directly, keeping its surrogate key when it has one.
    ///
    /// Later `create` calls never reuse a key loaded this way.
    pub fn insert(&self, mut entity: E) -> E {
        let id = match entity.id() {
            Some(id) => {
                self.next_id
                    .fetch_max(id.value() + 1, AtomicOrdering::SeqCst);
                id
            }
            None => {
                let id = InternalId::new(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
                entity.set_id(id);
                id
            }
        };
        self.rows.write().insert(id.value(), entity.clone());
        entity
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if no rows are stored.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn matching(&self, filter: &PredicateList) -> OmopResult<Vec<E>> {
        let patterns = LikePatterns::compile(filter)?;
        let rows = self.rows.read();
        let mut matches = Vec::new();
        for row in rows.values() {
            if filter.evaluate(|node| node_matches(row, node, &patterns))? {
                matches.push(row.clone());
            }
        }
        Ok(matches)
    }
}

#[async_trait]
impl<E: Entity> EntityStorage<E> for MemoryStore<E> {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn create(&self, mut entity: E) -> OmopResult<E> {
        let id = InternalId::new(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
        entity.set_id(id);
        self.rows.write().insert(id.value(), entity.clone());
        debug!(table = E::TABLE, id = id.value(), "Created row");
        Ok(entity)
    }

    async fn update(&self, entity: E) -> OmopResult<E> {
        let id = entity.id().ok_or_else(|| BackendError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message: format!("update of a {} row without surrogate key", E::TABLE),
            source: None,
        })?;

        let mut rows = self.rows.write();
        match rows.get_mut(&id.value()) {
            Some(row) => {
                *row = entity.clone();
                debug!(table = E::TABLE, id = id.value(), "Updated row");
                Ok(entity)
            }
            None => Err(ResourceError::NotFound {
                resource_type: E::TABLE.to_string(),
                id: id.to_string(),
            }
            .into()),
        }
    }

    async fn read(&self, id: InternalId) -> OmopResult<Option<E>> {
        Ok(self.rows.read().get(&id.value()).cloned())
    }

    async fn count(&self, filter: &PredicateList) -> OmopResult<u64> {
        let count = self.matching(filter)?.len() as u64;
        debug!(table = E::TABLE, %filter, count, "Counted rows");
        Ok(count)
    }

    async fn find(
        &self,
        filter: &PredicateList,
        window: Window,
        order: &OrderSpec,
    ) -> OmopResult<Vec<E>> {
        let keys = order.resolved();
        let mut keyed = Vec::new();
        for row in self.matching(filter)? {
            let mut sort_values = Vec::with_capacity(keys.len());
            for key in &keys {
                sort_values.push(field(&row, &key.field)?);
            }
            keyed.push((sort_values, row));
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for (key, (left, right)) in keys.iter().zip(a.iter().zip(b.iter())) {
                let ordering = match key.direction {
                    SortDirection::Ascending => compare_fields(left, right),
                    SortDirection::Descending => compare_fields(right, left),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let rows: Vec<E> = keyed
            .into_iter()
            .skip(window.from)
            .take(window.len())
            .map(|(_, row)| row)
            .collect();
        debug!(table = E::TABLE, %window, returned = rows.len(), "Fetched window");
        Ok(rows)
    }

    async fn delete_by_id(&self, id: InternalId) -> OmopResult<u64> {
        let removed = self.rows.write().remove(&id.value()).is_some();
        Ok(u64::from(removed))
    }
}

/// Compiled `like` patterns for one filter.
struct LikePatterns {
    compiled: HashMap<String, Regex>,
}

impl LikePatterns {
    fn compile(filter: &PredicateList) -> OmopResult<Self> {
        let mut compiled = HashMap::new();
        for condition in filter.nodes().flat_map(|n| n.conditions()) {
            if let (Operator::Like, Literal::Text(pattern)) = (condition.operator, &condition.value)
            {
                if compiled.contains_key(pattern) {
                    continue;
                }
                let regex = Regex::new(&like_to_regex(pattern)).map_err(|e| {
                    BackendError::Internal {
                        backend_name: BACKEND_NAME.to_string(),
                        message: format!("invalid like pattern '{}'", pattern),
                        source: Some(Box::new(e)),
                    }
                })?;
                compiled.insert(pattern.clone(), regex);
            }
        }
        Ok(Self { compiled })
    }

    fn is_match(&self, pattern: &str, value: &str) -> bool {
        self.compiled
            .get(pattern)
            .is_some_and(|regex| regex.is_match(value))
    }
}

fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::from("(?is)^");
    let mut buf = [0u8; 4];
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => {
                // a trailing escape matches a literal backslash
                let literal = chars.next().unwrap_or('\\');
                regex.push_str(&regex::escape(literal.encode_utf8(&mut buf)));
            }
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    regex.push('$');
    regex
}

fn field<E: Entity>(row: &E, path: &str) -> OmopResult<FieldValue> {
    row.field_value(path).ok_or_else(|| {
        BackendError::UnknownField {
            backend_name: BACKEND_NAME.to_string(),
            field: format!("{}.{}", E::TABLE, path),
        }
        .into()
    })
}

fn node_matches<E: Entity>(
    row: &E,
    node: &PredicateNode,
    patterns: &LikePatterns,
) -> OmopResult<bool> {
    let mut result: Option<bool> = None;
    for condition in node.conditions() {
        let matched = condition_matches(row, condition, patterns)?;
        result = Some(match result {
            Some(acc) => node.inner_relationship().combine(acc, matched),
            None => matched,
        });
    }
    Ok(result.unwrap_or(true))
}

fn condition_matches<E: Entity>(
    row: &E,
    condition: &Condition,
    patterns: &LikePatterns,
) -> OmopResult<bool> {
    // Null never satisfies a comparison, as in SQL.
    let FieldValue::Value(actual) = field(row, &condition.path)? else {
        return Ok(false);
    };

    let mismatch = || BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message: format!("cannot evaluate {} against {:?}", condition, actual),
        source: None,
    };

    let matched = match (condition.operator, &condition.value, &actual) {
        (Operator::In, Literal::Set(set), Literal::Text(v)) => set.contains(v),
        (Operator::Out, Literal::Set(set), Literal::Text(v)) => !set.contains(v),
        (Operator::Like, Literal::Text(pattern), Literal::Text(v)) => patterns.is_match(pattern, v),
        (Operator::In | Operator::Out | Operator::Like, _, _) => return Err(mismatch().into()),
        (operator, expected, actual) => {
            let ordering = compare_literals(actual, expected).ok_or_else(mismatch)?;
            match operator {
                Operator::Eq => ordering == Ordering::Equal,
                Operator::Ne => ordering != Ordering::Equal,
                Operator::Gt => ordering == Ordering::Greater,
                Operator::Ge => ordering != Ordering::Less,
                Operator::Lt => ordering == Ordering::Less,
                Operator::Le => ordering != Ordering::Greater,
                Operator::In | Operator::Out | Operator::Like => false,
            }
        }
    };
    Ok(matched)
}

fn compare_literals(left: &Literal, right: &Literal) -> Option<Ordering> {
    match (left, right) {
        (Literal::Integer(a), Literal::Integer(b)) => Some(a.cmp(b)),
        (Literal::Text(a), Literal::Text(b)) => Some(a.cmp(b)),
        (Literal::Date(a), Literal::Date(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// Nulls sort first ascending.
fn compare_fields(left: &FieldValue, right: &FieldValue) -> Ordering {
    match (left, right) {
        (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
        (FieldValue::Null, FieldValue::Value(_)) => Ordering::Less,
        (FieldValue::Value(_), FieldValue::Null) => Ordering::Greater,
        (FieldValue::Value(a), FieldValue::Value(b)) => {
            compare_literals(a, b).unwrap_or(Ordering::Equal)
        }
    }
}

/// An in-memory `concept` table.
#[derive(Debug, Clone, Default)]
pub struct ConceptTable {
    by_code: HashMap<String, Concept>,
    by_vocabulary_code: HashMap<(String, String), Concept>,
}

impl ConceptTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding the given concepts.
    pub fn from_concepts(concepts: impl IntoIterator<Item = Concept>) -> Self {
        let mut table = Self::new();
        for concept in concepts {
            table.insert(concept);
        }
        table
    }

    /// Adds a concept. Concepts without a code are not indexed.
    ///
    /// For a code present in several vocabularies, `by_code` answers with
    /// the first one inserted.
    pub fn insert(&mut self, concept: Concept) {
        let Some(code) = concept.concept_code.clone() else {
            return;
        };
        if let Some(vocabulary) = concept.vocabulary_id.clone() {
            self.by_vocabulary_code
                .insert((vocabulary, code.clone()), concept.clone());
        }
        self.by_code.entry(code).or_insert(concept);
    }

    /// Number of indexed codes.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl ConceptLookup for ConceptTable {
    fn by_code(&self, concept_code: &str) -> Option<Concept> {
        self.by_code.get(concept_code).cloned()
    }

    fn by_vocabulary_code(&self, vocabulary_id: &str, concept_code: &str) -> Option<Concept> {
        self.by_vocabulary_code
            .get(&(vocabulary_id.to_string(), concept_code.to_string()))
            .cloned()
    }
}
