//! Date parameter handler.

use crate::types::{DateParam, Literal, PredicateNode, Relationship, ValueType};

/// Handles date parameter predicates.
pub struct DateHandler;

impl DateHandler {
    /// Builds the node comparing `path` with a prefixed date.
    ///
    /// The prefix picks the operator: `gt`/`sa` become `>`, `lt`/`eb`
    /// become `<`, `ge`, `le` and `ne` map directly and `eq`/`ap` become `=`.
    pub fn build(path: &str, date: &DateParam, is_or: bool) -> PredicateNode {
        PredicateNode::single(
            ValueType::Date,
            path,
            date.prefix.to_operator(),
            Literal::Date(date.value),
        )
        .with_outer(Relationship::from_or_flag(is_or))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operator;

    #[test]
    fn test_prefix_selects_operator() {
        let cases = [
            ("2024-01-15", Operator::Eq),
            ("ge2024-01-15", Operator::Ge),
            ("lt2024-01-15", Operator::Lt),
            ("sa2024-01-15", Operator::Gt),
            ("eb2024-01-15", Operator::Lt),
        ];
        for (raw, operator) in cases {
            let date = DateParam::parse(raw).unwrap();
            let node = DateHandler::build("drugExposureStartDate", &date, false);
            assert_eq!(node.operators(), vec![operator], "{}", raw);
            assert_eq!(node.field_paths(), vec!["drugExposureStartDate"]);
            assert_eq!(node.value_type(), ValueType::Date);
        }
    }

    #[test]
    fn test_or_flag() {
        let date = DateParam::parse("2024-01-15").unwrap();
        assert_eq!(
            DateHandler::build("drugExposureStartDate", &date, true).outer_relationship(),
            Relationship::Or
        );
    }
}
