//! `_id` parameter handler.

use tracing::debug;

use crate::mapping::IdentifierTranslator;
use crate::types::{
    ExternalId, ID_FIELD, Literal, Operator, PredicateNode, Relationship, ResourceKind, ValueType,
};

/// Handles `_id` predicates of the searched kind.
pub struct IdHandler;

impl IdHandler {
    /// Builds the node matching one external id.
    ///
    /// An id that is not numeric or has no internal key yields a node that
    /// matches no rows.
    pub fn build(
        kind: ResourceKind,
        raw_id: &str,
        ids: &dyn IdentifierTranslator,
        is_or: bool,
    ) -> PredicateNode {
        Self::build_for_path(ID_FIELD, kind, raw_id, ids).with_outer(Relationship::from_or_flag(is_or))
    }

    /// Builds an id equality on `path` after translating `raw_id` for `kind`.
    pub(crate) fn build_for_path(
        path: &str,
        kind: ResourceKind,
        raw_id: &str,
        ids: &dyn IdentifierTranslator,
    ) -> PredicateNode {
        let internal = raw_id
            .trim()
            .parse::<ExternalId>()
            .ok()
            .and_then(|external| ids.internal_from_external(external, kind));

        match internal {
            Some(internal) => PredicateNode::single(
                ValueType::Id,
                path,
                Operator::Eq,
                Literal::Integer(internal.value()),
            ),
            None => {
                debug!(resource_type = %kind, id = raw_id, "Unresolved id matches nothing");
                PredicateNode::match_nothing()
            }
        }
    }
}
