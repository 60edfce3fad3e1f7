//! Reference parameter handler.

use crate::error::{OmopResult, ValidationError};
use crate::mapping::IdentifierTranslator;
use crate::types::{PredicateNode, ReferenceParam, Relationship, ResourceKind};

use super::IdHandler;

/// Handles direct reference predicates such as `context` or `performer`.
pub struct ReferenceHandler;

impl ReferenceHandler {
    /// Builds the node matching the foreign key at `path`.
    ///
    /// The reference may be typed (`Encounter/5`) or bare (`5`). An
    /// unresolvable id matches no rows.
    ///
    /// # Errors
    ///
    /// * `ValidationError::InvalidReference` - If the reference is typed with
    ///   a kind other than `target`
    pub fn build(
        path: &str,
        target: ResourceKind,
        reference: &ReferenceParam,
        ids: &dyn IdentifierTranslator,
        is_or: bool,
    ) -> OmopResult<PredicateNode> {
        if let Some(resource_type) = reference.resource_type.as_deref() {
            if resource_type != target.as_str() {
                return Err(ValidationError::InvalidReference {
                    reference: format!("{}/{}", resource_type, reference.value),
                    message: format!("expected a {} reference", target),
                }
                .into());
            }
        }

        Ok(
            IdHandler::build_for_path(path, target, &reference.value, ids)
                .with_outer(Relationship::from_or_flag(is_or)),
        )
    }
}
