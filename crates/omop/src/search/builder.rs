//! Dispatch from typed search values to parameter handlers.

use tracing::trace;

use crate::config::CodingStrictness;
use crate::context::EngineContext;
use crate::error::{OmopResult, ValidationError};
use crate::mapping::{CodeSystemTranslator, IdentifierTranslator};
use crate::search::fields::FieldSpec;
use crate::search::handlers::{
    DateHandler, IdHandler, PatientChainHandler, ReferenceHandler, TokenHandler, ValueSetHandler,
};
use crate::types::{
    DateParam, PredicateNode, ReferenceParam, ResourceKind, SearchParameter, SearchValue,
    TokenParam,
};

/// Builds predicate nodes for one resource kind.
///
/// The builder is request-scoped and holds only borrowed, read-only state.
pub struct PredicateBuilder<'a> {
    kind: ResourceKind,
    ids: &'a dyn IdentifierTranslator,
    codes: &'a CodeSystemTranslator,
    strictness: CodingStrictness,
}

impl<'a> PredicateBuilder<'a> {
    /// Creates a builder for `kind` over the context's translators.
    pub fn new(kind: ResourceKind, context: &'a EngineContext) -> Self {
        Self {
            kind,
            ids: context.ids(),
            codes: context.codes(),
            strictness: context.coding_strictness(),
        }
    }

    /// Overrides the coding strictness for this builder.
    pub fn with_strictness(mut self, strictness: CodingStrictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Builds the nodes for one value of one parameter.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name, used in errors and logs
    /// * `spec` - How the parameter maps onto columns
    /// * `value` - The typed value
    /// * `is_or` - Whether the nodes OR-combine with their predecessor
    ///
    /// # Returns
    ///
    /// Zero or more nodes. An empty token yields none.
    ///
    /// # Errors
    ///
    /// * `ValidationError::InvalidSearchParameter` - If the value type does
    ///   not fit the parameter
    /// * `SearchError` - For unmapped systems and value-set failures
    pub async fn build_value(
        &self,
        name: &str,
        spec: &FieldSpec,
        value: &SearchValue,
        is_or: bool,
    ) -> OmopResult<Vec<PredicateNode>> {
        trace!(parameter = name, ?value, is_or, "Building predicate");

        let nodes = match spec {
            FieldSpec::Id => {
                let id = id_text(name, value)?;
                vec![IdHandler::build(self.kind, &id, self.ids, is_or)]
            }
            FieldSpec::Coded {
                vocabulary_path,
                code_path,
            } => {
                let token = token(name, value)?;
                if token.is_value_set() {
                    let url = token.code.as_deref().unwrap_or_default();
                    ValueSetHandler::build(name, url, vocabulary_path, code_path, self.codes)
                        .await?
                } else {
                    TokenHandler::build(
                        name,
                        &token,
                        vocabulary_path,
                        code_path,
                        self.codes,
                        self.strictness,
                        is_or,
                    )?
                    .into_iter()
                    .collect()
                }
            }
            FieldSpec::Date { path } => {
                let date = date(name, value)?;
                vec![DateHandler::build(path, &date, is_or)]
            }
            FieldSpec::Reference { path, target } => {
                let reference = reference(name, value)?;
                vec![ReferenceHandler::build(
                    path, *target, &reference, self.ids, is_or,
                )?]
            }
            FieldSpec::PatientChain(chain) => {
                let text = id_text(name, value)?;
                vec![PatientChainHandler::build(*chain, &text, self.ids, is_or)]
            }
        };
        Ok(nodes)
    }

    /// Builds the nodes for every value of a parameter, one sequence per
    /// value, for [`crate::types::PredicateList::or_group`].
    ///
    /// Several values are OR-combined; a single value uses AND.
    pub async fn build_parameter(
        &self,
        parameter: &SearchParameter,
        spec: &FieldSpec,
    ) -> OmopResult<Vec<Vec<PredicateNode>>> {
        let is_or = parameter.values.len() > 1;
        let mut alternatives = Vec::with_capacity(parameter.values.len());
        for value in &parameter.values {
            alternatives.push(
                self.build_value(&parameter.name, spec, value, is_or)
                    .await?,
            );
        }
        Ok(alternatives)
    }
}

fn invalid(name: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidSearchParameter {
        parameter: name.to_string(),
        message: message.into(),
    }
}

fn id_text(name: &str, value: &SearchValue) -> OmopResult<String> {
    match value {
        SearchValue::String(s) => Ok(s.clone()),
        SearchValue::Token(token) if token.system.is_none() => {
            token.code.clone().ok_or_else(|| invalid(name, "empty value").into())
        }
        SearchValue::Reference(reference) => Ok(reference.value.clone()),
        _ => Err(invalid(name, "expected a plain value").into()),
    }
}

fn token(name: &str, value: &SearchValue) -> OmopResult<TokenParam> {
    match value {
        SearchValue::Token(token) => Ok(token.clone()),
        SearchValue::String(s) => Ok(TokenParam::parse(s)),
        _ => Err(invalid(name, "expected a token").into()),
    }
}

fn date(name: &str, value: &SearchValue) -> OmopResult<DateParam> {
    match value {
        SearchValue::Date(date) => Ok(*date),
        SearchValue::String(s) => DateParam::parse(s).map_err(|e| invalid(name, e).into()),
        _ => Err(invalid(name, "expected a date").into()),
    }
}

fn reference(name: &str, value: &SearchValue) -> OmopResult<ReferenceParam> {
    match value {
        SearchValue::Reference(reference) if reference.chain.is_none() => Ok(reference.clone()),
        SearchValue::String(s) => Ok(ReferenceParam::parse(s)),
        SearchValue::Token(token) if token.system.is_none() => token
            .code
            .as_deref()
            .map(ReferenceParam::parse)
            .ok_or_else(|| invalid(name, "empty value").into()),
        _ => Err(invalid(name, "expected a reference").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ConceptTable;
    use crate::config::EngineConfig;
    use crate::error::OmopError;
    use crate::types::{Literal, Operator, Relationship, SearchPrefix};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn context() -> EngineContext {
        EngineContext::from_config(EngineConfig::for_testing(), Arc::new(ConceptTable::new()))
            .unwrap()
    }

    const CODED: FieldSpec = FieldSpec::Coded {
        vocabulary_path: "drugConcept.vocabularyId",
        code_path: "drugConcept.conceptCode",
    };

    #[tokio::test]
    async fn test_string_values_are_parsed() {
        let context = context();
        let builder = PredicateBuilder::new(ResourceKind::MedicationAdministration, &context);

        let nodes = builder
            .build_value(
                "effective-time",
                &FieldSpec::Date {
                    path: "drugExposureStartDate",
                },
                &SearchValue::from("ge2024-01-01"),
                false,
            )
            .await
            .unwrap();
        assert_eq!(nodes[0].operators(), vec![Operator::Ge]);

        let nodes = builder
            .build_value(
                "code",
                &CODED,
                &SearchValue::from("http://www.nlm.nih.gov/research/umls/rxnorm|197806"),
                false,
            )
            .await
            .unwrap();
        assert_eq!(nodes[0].values()[0], &Literal::text("RxNorm"));
    }

    #[tokio::test]
    async fn test_empty_token_yields_no_nodes() {
        let context = context();
        let builder = PredicateBuilder::new(ResourceKind::MedicationAdministration, &context);
        let nodes = builder
            .build_value("code", &CODED, &SearchValue::Token(TokenParam::default()), false)
            .await
            .unwrap();
        assert!(nodes.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_values_are_or_combined() {
        let context = context();
        let builder = PredicateBuilder::new(ResourceKind::MedicationAdministration, &context);
        let parameter = SearchParameter::any_of(
            "code",
            [TokenParam::code("197806"), TokenParam::code("310965")],
        );
        let alternatives = builder.build_parameter(&parameter, &CODED).await.unwrap();
        assert_eq!(alternatives.len(), 2);
        assert!(
            alternatives
                .iter()
                .flatten()
                .all(|n| n.outer_relationship() == Relationship::Or)
        );

        let parameter = SearchParameter::new("code", TokenParam::code("197806"));
        let alternatives = builder.build_parameter(&parameter, &CODED).await.unwrap();
        assert_eq!(alternatives[0][0].outer_relationship(), Relationship::And);
    }

    #[tokio::test]
    async fn test_value_type_mismatch() {
        let context = context();
        let builder = PredicateBuilder::new(ResourceKind::MedicationAdministration, &context);
        let date = DateParam::new(
            SearchPrefix::Eq,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let err = builder
            .build_value("code", &CODED, &SearchValue::Date(date), false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OmopError::Validation(ValidationError::InvalidSearchParameter { .. })
        ));

        let err = builder
            .build_value(
                "effective-time",
                &FieldSpec::Date {
                    path: "drugExposureStartDate",
                },
                &SearchValue::from("yesterday"),
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 422);
    }

    #[tokio::test]
    async fn test_strictness_override() {
        let context = context();
        let builder = PredicateBuilder::new(ResourceKind::MedicationAdministration, &context)
            .with_strictness(CodingStrictness::Strict);
        let result = builder
            .build_value(
                "code",
                &CODED,
                &SearchValue::Token(TokenParam::new("http://example/unknown", "1")),
                false,
            )
            .await;
        assert!(result.is_err());
    }
}
