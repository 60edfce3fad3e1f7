//! The per-kind record mapper trait.

use async_trait::async_trait;

use crate::context::EngineContext;
use crate::error::{OmopResult, SearchError};
use crate::search::{FieldSpec, PredicateBuilder};
use crate::types::{
    CanonicalResource, Entity, InternalId, PredicateNode, ResourceKind, SearchValue,
};

/// Bidirectional mapping between one resource kind and its entity.
///
/// Both directions are total: the mapper never rejects a malformed resource.
/// Required-field validation belongs to the caller.
///
/// # Example
///
/// ```ignore
/// use helios_omop::mapping::{MedicationAdministrationMapping, ResourceMapping};
///
/// let mapping = MedicationAdministrationMapping;
/// let resource = mapping.to_canonical(&context, id, &entity)?;
/// let entity = mapping.to_entity(&context, Some(id), &resource);
/// ```
#[async_trait]
pub trait ResourceMapping: Send + Sync + 'static {
    /// The canonical resource type.
    type Resource: CanonicalResource;

    /// The relational entity type.
    type Entity: Entity;

    /// The resource kind, used for identifier namespaces and errors.
    fn kind(&self) -> ResourceKind;

    /// Converts an entity into its canonical resource.
    ///
    /// Absent relational fields map to absent resource fields, never to
    /// empty structures. Embedded references carry external ids only.
    ///
    /// # Errors
    ///
    /// * `IntegrityError::MissingExternalId` - If the entity or a referenced
    ///   row has no external id
    fn to_canonical(
        &self,
        context: &EngineContext,
        id: InternalId,
        entity: &Self::Entity,
    ) -> OmopResult<Self::Resource>;

    /// Converts a resource into an entity.
    ///
    /// `id` is `None` for a create and the existing surrogate key for an
    /// update. Derived resource fields are not written back.
    fn to_entity(
        &self,
        context: &EngineContext,
        id: Option<InternalId>,
        resource: &Self::Resource,
    ) -> Self::Entity;

    /// Copies the columns this kind does not model from the stored row
    /// into its replacement.
    ///
    /// Kinds sharing a table each own some of its columns. An update through
    /// one kind keeps the columns only the others write.
    fn carry_unmodelled(&self, _stored: &Self::Entity, _entity: &mut Self::Entity) {}

    /// The column mapping of a search parameter, or `None` if the parameter
    /// is not searchable on this kind.
    fn search_field(&self, name: &str) -> Option<FieldSpec>;

    /// The column a sort parameter orders by.
    fn sort_path(&self, parameter: &str) -> Option<&'static str>;

    /// Builds the predicate nodes for one value of a named parameter.
    ///
    /// # Errors
    ///
    /// * `SearchError::UnsupportedParameter` - If `name` is not searchable
    async fn map_parameter(
        &self,
        context: &EngineContext,
        name: &str,
        value: &SearchValue,
        is_or: bool,
    ) -> OmopResult<Vec<PredicateNode>> {
        let spec = self
            .search_field(name)
            .ok_or_else(|| SearchError::UnsupportedParameter {
                parameter: name.to_string(),
                resource_type: self.kind().to_string(),
            })?;
        PredicateBuilder::new(self.kind(), context)
            .build_value(name, &spec, value, is_or)
            .await
    }
}
