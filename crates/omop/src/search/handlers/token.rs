//! Token parameter handler for coded columns.

use tracing::debug;

use crate::config::CodingStrictness;
use crate::error::{OmopResult, SearchError};
use crate::mapping::CodeSystemTranslator;
use crate::types::{
    Literal, Operator, PredicateNode, Relationship, TokenParam, ValueType, escape_like,
};

/// Handles token predicates on a vocabulary/code column pair.
pub struct TokenHandler;

impl TokenHandler {
    /// Builds the node for one token value.
    ///
    /// Token values can be:
    /// - `system|code` - vocabulary and code, AND-combined
    /// - `system|` - vocabulary only
    /// - `code` - code only, any vocabulary
    ///
    /// Both columns use `like`, with wildcards in the code escaped so it
    /// matches literally. When the system does not map to a
    /// vocabulary, `Lenient` drops it and keeps the code (or matches
    /// nothing if there is no code), `Strict` fails the request.
    ///
    /// Returns `None` for an empty token, which adds no filter.
    ///
    /// # Errors
    ///
    /// * `SearchError::UnmappedSystem` - Unmapped system under `Strict`
    pub fn build(
        parameter: &str,
        token: &TokenParam,
        vocabulary_path: &str,
        code_path: &str,
        codes: &CodeSystemTranslator,
        strictness: CodingStrictness,
        is_or: bool,
    ) -> OmopResult<Option<PredicateNode>> {
        let code = token.code.as_deref().filter(|c| !c.is_empty());

        let vocabulary = match token.system.as_deref() {
            None => None,
            Some(system) => match codes.vocabulary_from_uri(system) {
                Some(vocabulary) => Some(vocabulary),
                None if strictness == CodingStrictness::Strict => {
                    return Err(SearchError::UnmappedSystem {
                        system: system.to_string(),
                        parameter: parameter.to_string(),
                    }
                    .into());
                }
                None => {
                    debug!(parameter, system, "Unmapped coding system, matching on code alone");
                    if code.is_none() {
                        return Ok(Some(
                            PredicateNode::match_nothing()
                                .with_outer(Relationship::from_or_flag(is_or)),
                        ));
                    }
                    None
                }
            },
        };

        let node = match (vocabulary, code) {
            (Some(vocabulary), Some(code)) => PredicateNode::single(
                ValueType::String,
                vocabulary_path,
                Operator::Like,
                Literal::text(vocabulary),
            )
            .with_condition(code_path, Operator::Like, Literal::text(escape_like(code))),
            (Some(vocabulary), None) => PredicateNode::single(
                ValueType::String,
                vocabulary_path,
                Operator::Like,
                Literal::text(vocabulary),
            ),
            (None, Some(code)) => PredicateNode::single(
                ValueType::String,
                code_path,
                Operator::Like,
                Literal::text(escape_like(code)),
            ),
            (None, None) => return Ok(None),
        };

        Ok(Some(
            node.with_inner(Relationship::And)
                .with_outer(Relationship::from_or_flag(is_or)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NoTerminology;
    use crate::mapping::VocabularyMap;
    use std::sync::Arc;

    const VOCABULARY: &str = "drugConcept.vocabularyId";
    const CODE: &str = "drugConcept.conceptCode";

    fn codes() -> CodeSystemTranslator {
        let mut map = VocabularyMap::standard();
        map.insert("http://example/sys", "SYS");
        CodeSystemTranslator::new(Arc::new(map), Arc::new(NoTerminology))
    }

    fn build(token: TokenParam, strictness: CodingStrictness) -> OmopResult<Option<PredicateNode>> {
        TokenHandler::build("code", &token, VOCABULARY, CODE, &codes(), strictness, false)
    }

    #[test]
    fn test_mapped_system_and_code() {
        let node = build(TokenParam::new("http://example/sys", "123"), CodingStrictness::Lenient)
            .unwrap()
            .unwrap();
        assert_eq!(node.field_paths(), vec![VOCABULARY, CODE]);
        assert_eq!(node.operators(), vec![Operator::Like, Operator::Like]);
        assert_eq!(
            node.values(),
            vec![&Literal::text("SYS"), &Literal::text("123")]
        );
        assert_eq!(node.inner_relationship(), Relationship::And);
    }

    #[test]
    fn test_unmapped_system_falls_back_to_code() {
        let node = build(TokenParam::new("http://example/other", "123"), CodingStrictness::Lenient)
            .unwrap()
            .unwrap();
        assert_eq!(node.field_paths(), vec![CODE]);
        assert_eq!(node.operators(), vec![Operator::Like]);
    }

    #[test]
    fn test_code_only() {
        let node = build(TokenParam::code("123"), CodingStrictness::Lenient)
            .unwrap()
            .unwrap();
        assert_eq!(node.field_paths(), vec![CODE]);
    }

    #[test]
    fn test_system_only() {
        let node = build(TokenParam::parse("http://example/sys|"), CodingStrictness::Lenient)
            .unwrap()
            .unwrap();
        assert_eq!(node.field_paths(), vec![VOCABULARY]);
    }

    #[test]
    fn test_unmapped_system_without_code_matches_nothing() {
        let node = build(TokenParam::parse("http://example/other|"), CodingStrictness::Lenient)
            .unwrap()
            .unwrap();
        assert_eq!(node, PredicateNode::match_nothing());
    }

    #[test]
    fn test_empty_token_adds_nothing() {
        assert!(build(TokenParam::default(), CodingStrictness::Lenient)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_strict_rejects_unmapped_system() {
        let err = build(TokenParam::new("http://example/other", "123"), CodingStrictness::Strict)
            .unwrap_err();
        assert!(err.to_string().contains("http://example/other"));
        assert!(build(TokenParam::new("http://example/sys", "123"), CodingStrictness::Strict).is_ok());
    }
}
