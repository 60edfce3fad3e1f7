//! `:in` value-set handler for coded columns.

use tracing::debug;

use crate::error::{OmopResult, SearchError};
use crate::mapping::CodeSystemTranslator;
use crate::types::{Literal, Operator, PredicateNode, Relationship, ValueType};

/// Handles `code:in=<value set url>` predicates.
pub struct ValueSetHandler;

impl ValueSetHandler {
    /// Expands the value set and builds one node per compose entry.
    ///
    /// Include entries become `vocabulary = V AND code in (...)` nodes,
    /// OR-combined with each other. Exclude entries become
    /// `vocabulary != V OR code out (...)` nodes, AND-combined so each one
    /// vetoes its codes on its own. An entry without enumerated codes stands
    /// for its whole vocabulary. A value set without include entries matches
    /// no rows.
    ///
    /// An exclude node is the negation of the matching include shape rather
    /// than the include shape with `in` swapped for `out`. The swapped form,
    /// `vocabulary = V AND code out (...)`, would also reject every row from
    /// any other vocabulary, including rows a second include entry matched.
    /// The negated form rejects exactly the rows whose vocabulary and code
    /// both fall in the excluded entry.
    ///
    /// # Errors
    ///
    /// * `SearchError::Terminology` - If the expansion fails
    /// * `SearchError::UnmappedSystem` - If an entry's system has no vocabulary
    pub async fn build(
        parameter: &str,
        url: &str,
        vocabulary_path: &str,
        code_path: &str,
        codes: &CodeSystemTranslator,
    ) -> OmopResult<Vec<PredicateNode>> {
        let compose = codes.expand_value_set(url).await?;

        if compose.include.is_empty() {
            debug!(url, "Value set has no include entries");
            return Ok(vec![PredicateNode::match_nothing()]);
        }

        let vocabulary = |system: &str| -> OmopResult<String> {
            codes
                .vocabulary_from_uri(system)
                .map(str::to_string)
                .ok_or_else(|| {
                    SearchError::UnmappedSystem {
                        system: system.to_string(),
                        parameter: parameter.to_string(),
                    }
                    .into()
                })
        };

        let mut nodes = Vec::with_capacity(compose.include.len() + compose.exclude.len());

        for set in &compose.include {
            let node = PredicateNode::single(
                ValueType::CodedSet,
                vocabulary_path,
                Operator::Eq,
                Literal::Text(vocabulary(&set.system)?),
            );
            let node = if set.codes.is_empty() {
                node
            } else {
                node.with_condition(code_path, Operator::In, Literal::Set(set.codes.clone()))
            };
            nodes.push(
                node.with_inner(Relationship::And)
                    .with_outer(Relationship::Or),
            );
        }

        for set in &compose.exclude {
            let node = PredicateNode::single(
                ValueType::CodedSet,
                vocabulary_path,
                Operator::Ne,
                Literal::Text(vocabulary(&set.system)?),
            );
            let node = if set.codes.is_empty() {
                node
            } else {
                node.with_condition(code_path, Operator::Out, Literal::Set(set.codes.clone()))
            };
            nodes.push(node.with_inner(Relationship::Or).with_outer(Relationship::And));
        }

        debug!(
            parameter,
            url,
            include = compose.include.len(),
            exclude = compose.exclude.len(),
            "Expanded value-set predicate"
        );
        Ok(nodes)
    }
}
