//! Chained `Patient` parameter handler.
//!
//! Chained parameters filter on the joined `f_person` row rather than on the
//! searched entity's own columns.

use crate::mapping::IdentifierTranslator;
use crate::search::PatientChain;
use crate::types::{
    Literal, Operator, PredicateNode, Relationship, ResourceKind, ValueType, escape_like,
};

use super::IdHandler;

const PERSON_ID: &str = "fPerson.id";
const PERSON_SOURCE_VALUE: &str = "fPerson.personSourceValue";
const PERSON_NAME_PARTS: &[&str] = &[
    "fPerson.familyName",
    "fPerson.givenName1",
    "fPerson.givenName2",
    "fPerson.prefixName",
    "fPerson.suffixName",
];

/// Handles `Patient:_id`, `Patient:name` and `Patient:identifier`.
pub struct PatientChainHandler;

impl PatientChainHandler {
    /// Builds the node for one chained value.
    ///
    /// - `_id` resolves the patient id and matches nothing when unknown
    /// - `name` matches any name part containing the value
    /// - `identifier` matches the person source value case-insensitively
    ///
    /// `%` and `_` in the value are matched literally, not as wildcards.
    pub fn build(
        chain: PatientChain,
        value: &str,
        ids: &dyn IdentifierTranslator,
        is_or: bool,
    ) -> PredicateNode {
        let node = match chain {
            PatientChain::Id => {
                IdHandler::build_for_path(PERSON_ID, ResourceKind::Patient, value, ids)
            }
            PatientChain::Name => {
                let pattern = format!("%{}%", escape_like(value));
                let first = PredicateNode::single(
                    ValueType::String,
                    PERSON_NAME_PARTS[0],
                    Operator::Like,
                    Literal::text(pattern.clone()),
                );
                PERSON_NAME_PARTS[1..]
                    .iter()
                    .fold(first, |node, path| {
                        node.with_condition(*path, Operator::Like, Literal::text(pattern.clone()))
                    })
                    .with_inner(Relationship::Or)
            }
            PatientChain::Identifier => PredicateNode::single(
                ValueType::String,
                PERSON_SOURCE_VALUE,
                Operator::Like,
                Literal::text(escape_like(value)),
            ),
        };
        node.with_outer(Relationship::from_or_flag(is_or))
    }
}
