//! Backend-agnostic predicate algebra.
//!
//! A [`PredicateNode`] is one filter unit: an ordered set of
//! `(field path, operator, value)` conditions joined by the node's inner
//! relationship. A [`PredicateList`] is the filter for a whole search request.
//!
//! The list is made of [`Clause`]s, AND-combined, so OR-combined values of
//! one search parameter can never capture the nodes of another parameter. A
//! clause holds one node sequence per parameter value and OR-combines them.
//! Nodes inside a sequence fold strictly left to right, each node joining the
//! running result with its own outer relationship (the first node's outer
//! relationship is ignored). A list with a single one-sequence clause is
//! exactly the flat left-to-right fold.
//!
//! An empty list means "no filter, return all".

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PredicateError;

/// Comparison operator applied to one relational field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    Eq,
    /// SQL `like` with `%` and `_` wildcards; `\` escapes the next character.
    Like,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `!=`
    Ne,
    /// Membership in a set literal.
    In,
    /// Non-membership in a set literal.
    Out,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::Like => write!(f, "like"),
            Operator::Gt => write!(f, ">"),
            Operator::Ge => write!(f, ">="),
            Operator::Lt => write!(f, "<"),
            Operator::Le => write!(f, "<="),
            Operator::Ne => write!(f, "!="),
            Operator::In => write!(f, "in"),
            Operator::Out => write!(f, "out"),
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "=" => Ok(Operator::Eq),
            "like" => Ok(Operator::Like),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            "!=" => Ok(Operator::Ne),
            "in" => Ok(Operator::In),
            "out" => Ok(Operator::Out),
            _ => Err(format!("unknown operator: {}", s)),
        }
    }
}

/// How conditions or nodes combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Relationship {
    /// Both sides must hold.
    #[default]
    And,
    /// Either side may hold.
    Or,
}

impl Relationship {
    /// `Or` when the caller asked for OR-combination, `And` otherwise.
    pub fn from_or_flag(is_or: bool) -> Self {
        if is_or {
            Relationship::Or
        } else {
            Relationship::And
        }
    }

    /// Combines two boolean outcomes.
    pub fn combine(self, left: bool, right: bool) -> bool {
        match self {
            Relationship::And => left && right,
            Relationship::Or => left || right,
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::And => write!(f, "and"),
            Relationship::Or => write!(f, "or"),
        }
    }
}

/// Semantic type of a node's values, controlling literal formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Numeric surrogate key.
    Id,
    /// Free text or code.
    String,
    /// Calendar date.
    Date,
    /// Vocabulary plus a set of codes.
    CodedSet,
}

/// Escapes `%`, `_` and `\` so `value` matches itself under [`Operator::Like`].
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A literal value compared against a relational field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Integer value, used for surrogate keys.
    Integer(i64),
    /// Text value.
    Text(String),
    /// Date value.
    Date(NaiveDate),
    /// Set of text values, used with `in` and `out`.
    Set(Vec<String>),
}

impl Literal {
    /// Creates a text literal.
    pub fn text(value: impl Into<String>) -> Self {
        Literal::Text(value.into())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Text(v) => write!(f, "'{}'", v),
            Literal::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Literal::Set(values) => write!(f, "({})", values.join(", ")),
        }
    }
}

/// One `(field path, operator, value)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Relational field path, e.g. `drugConcept.vocabularyId`.
    pub path: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Right-hand literal.
    pub value: Literal,
}

impl Condition {
    /// Creates a condition.
    pub fn new(path: impl Into<String>, operator: Operator, value: Literal) -> Self {
        Self {
            path: path.into(),
            operator,
            value,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.operator, self.value)
    }
}

/// One unit of the query algebra.
///
/// Paths, operators and values are stored as [`Condition`] triples, so the
/// three sequences exposed by [`field_paths`](Self::field_paths),
/// [`operators`](Self::operators) and [`values`](Self::values) always have the
/// same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateNode {
    conditions: Vec<Condition>,
    value_type: ValueType,
    inner: Relationship,
    outer: Relationship,
}

impl PredicateNode {
    /// Creates a node with a single condition.
    pub fn single(
        value_type: ValueType,
        path: impl Into<String>,
        operator: Operator,
        value: Literal,
    ) -> Self {
        Self {
            conditions: vec![Condition::new(path, operator, value)],
            value_type,
            inner: Relationship::And,
            outer: Relationship::And,
        }
    }

    /// Creates a node from parallel sequences.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::Misaligned`] if the sequences differ in length
    /// and [`PredicateError::Empty`] if they are empty.
    pub fn try_from_parts(
        value_type: ValueType,
        paths: Vec<String>,
        operators: Vec<Operator>,
        values: Vec<Literal>,
    ) -> Result<Self, PredicateError> {
        if paths.len() != operators.len() || paths.len() != values.len() {
            return Err(PredicateError::Misaligned {
                paths: paths.len(),
                operators: operators.len(),
                values: values.len(),
            });
        }
        if paths.is_empty() {
            return Err(PredicateError::Empty);
        }

        let conditions = paths
            .into_iter()
            .zip(operators)
            .zip(values)
            .map(|((path, operator), value)| Condition {
                path,
                operator,
                value,
            })
            .collect();

        Ok(Self {
            conditions,
            value_type,
            inner: Relationship::And,
            outer: Relationship::And,
        })
    }

    /// A node no row can satisfy: surrogate keys are never negative.
    pub fn match_nothing() -> Self {
        Self::single(ValueType::Id, "id", Operator::Lt, Literal::Integer(0))
    }

    /// Adds another condition to this node.
    pub fn with_condition(
        mut self,
        path: impl Into<String>,
        operator: Operator,
        value: Literal,
    ) -> Self {
        self.conditions.push(Condition::new(path, operator, value));
        self
    }

    /// Sets how this node's conditions combine.
    pub fn with_inner(mut self, relationship: Relationship) -> Self {
        self.inner = relationship;
        self
    }

    /// Sets how this node combines with the preceding node.
    pub fn with_outer(mut self, relationship: Relationship) -> Self {
        self.outer = relationship;
        self
    }

    /// The conditions of this node.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Field paths, in condition order.
    pub fn field_paths(&self) -> Vec<&str> {
        self.conditions.iter().map(|c| c.path.as_str()).collect()
    }

    /// Operators, in condition order.
    pub fn operators(&self) -> Vec<Operator> {
        self.conditions.iter().map(|c| c.operator).collect()
    }

    /// Values, in condition order.
    pub fn values(&self) -> Vec<&Literal> {
        self.conditions.iter().map(|c| &c.value).collect()
    }

    /// Semantic type of the values.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Relationship between conditions inside this node.
    pub fn inner_relationship(&self) -> Relationship {
        self.inner
    }

    /// Relationship between this node and the preceding one.
    pub fn outer_relationship(&self) -> Relationship {
        self.outer
    }
}

impl fmt::Display for PredicateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joiner = format!(" {} ", self.inner);
        let parts: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
        write!(f, "({})", parts.join(&joiner))
    }
}

/// One AND-combined clause of a [`PredicateList`].
///
/// A clause holds one or more alternatives, OR-combined with each other.
/// Each alternative folds its nodes left to right by their outer
/// relationship, so a value-set expansion stays self-contained when several
/// value sets are searched at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    alternatives: Vec<Vec<PredicateNode>>,
}

impl Clause {
    /// The node sequences of this clause.
    pub fn alternatives(&self) -> &[Vec<PredicateNode>] {
        &self.alternatives
    }

    /// All nodes of all alternatives, in order.
    pub fn nodes(&self) -> impl Iterator<Item = &PredicateNode> {
        self.alternatives.iter().flatten()
    }

    fn evaluate<E, F>(&self, eval: &mut F) -> Result<bool, E>
    where
        F: FnMut(&PredicateNode) -> Result<bool, E>,
    {
        for alternative in &self.alternatives {
            let mut nodes = alternative.iter();
            let Some(first) = nodes.next() else {
                continue;
            };
            let mut result = eval(first)?;
            for node in nodes {
                result = node.outer_relationship().combine(result, eval(node)?);
            }
            if result {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alternatives: Vec<String> = self
            .alternatives
            .iter()
            .map(|alternative| {
                let mut text = String::new();
                for (i, node) in alternative.iter().enumerate() {
                    if i > 0 {
                        text.push_str(&format!(" {} ", node.outer_relationship()));
                    }
                    text.push_str(&node.to_string());
                }
                text
            })
            .collect();
        if alternatives.len() == 1 {
            write!(f, "[{}]", alternatives[0])
        } else {
            let wrapped: Vec<String> = alternatives.iter().map(|a| format!("{{{}}}", a)).collect();
            write!(f, "[{}]", wrapped.join(" or "))
        }
    }
}

/// The filter for one search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateList {
    clauses: Vec<Clause>,
}

impl PredicateList {
    /// Creates an empty list (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a single-clause list from nodes.
    pub fn from_nodes(nodes: Vec<PredicateNode>) -> Self {
        let mut list = Self::new();
        list.and_group(nodes);
        list
    }

    /// Appends a node to the current node sequence.
    pub fn push(&mut self, node: PredicateNode) {
        let last = self
            .clauses
            .last_mut()
            .and_then(|clause| clause.alternatives.last_mut());
        match last {
            Some(alternative) => alternative.push(node),
            None => self.and_group(vec![node]),
        }
    }

    /// Appends nodes as a new clause, AND-combined with everything before it.
    ///
    /// An empty group is dropped, so absent parameters add no filter.
    pub fn and_group(&mut self, nodes: Vec<PredicateNode>) {
        self.or_group(vec![nodes]);
    }

    /// Appends a clause whose node sequences are OR-combined, one sequence per
    /// value of a multi-valued parameter.
    ///
    /// Empty sequences are dropped; a clause left with none adds no filter.
    pub fn or_group(&mut self, alternatives: Vec<Vec<PredicateNode>>) {
        let alternatives: Vec<_> = alternatives.into_iter().filter(|a| !a.is_empty()).collect();
        if !alternatives.is_empty() {
            self.clauses.push(Clause { alternatives });
        }
    }

    /// Appends every clause of another list.
    pub fn append(&mut self, other: PredicateList) {
        self.clauses.extend(other.clauses);
    }

    /// All nodes in order.
    pub fn nodes(&self) -> impl Iterator<Item = &PredicateNode> {
        self.clauses.iter().flat_map(Clause::nodes)
    }

    /// Clauses in order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    /// Returns true if this list filters nothing.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates the list given a node-level evaluator.
    ///
    /// Backends supply the evaluator; this method owns the combination rule.
    pub fn evaluate<E, F>(&self, mut eval: F) -> Result<bool, E>
    where
        F: FnMut(&PredicateNode) -> Result<bool, E>,
    {
        for clause in &self.clauses {
            if !clause.evaluate(&mut eval)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for PredicateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<all>");
        }
        let clauses: Vec<String> = self.clauses.iter().map(Clause::to_string).collect();
        write!(f, "{}", clauses.join(" and "))
    }
}
