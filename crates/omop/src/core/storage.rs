//! Persistence collaborator traits.
//!
//! The engine never talks to a database directly. It hands a
//! [`PredicateList`], a [`Window`] and an [`OrderSpec`] to an
//! [`EntityStorage`] and gets entity snapshots back.

use async_trait::async_trait;

use crate::error::OmopResult;
use crate::types::{Concept, Entity, InternalId, OrderSpec, PredicateList, Window};

/// Storage for one entity type.
///
/// Implementations own connection management, SQL generation and
/// transactions. They must evaluate a [`PredicateList`] with the combination
/// rule documented on that type and honor the resolved [`OrderSpec`] exactly,
/// so windowed fetches are deterministic.
///
/// # Example
///
/// ```ignore
/// use helios_omop::core::EntityStorage;
/// use helios_omop::types::{DrugExposure, OrderSpec, PredicateList, Window};
///
/// async fn first_page<S: EntityStorage<DrugExposure>>(storage: &S) -> OmopResult<()> {
///     let filter = PredicateList::new();
///     let total = storage.count(&filter).await?;
///     let rows = storage.find(&filter, Window::new(0, 30), &OrderSpec::new()).await?;
///     assert!(rows.len() as u64 <= total);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait EntityStorage<E: Entity>: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Inserts a new entity.
    ///
    /// # Arguments
    ///
    /// * `entity` - The entity to insert; its id is ignored
    ///
    /// # Returns
    ///
    /// The stored entity with its freshly assigned surrogate key.
    async fn create(&self, entity: E) -> OmopResult<E>;

    /// Replaces an existing entity, keeping its surrogate key.
    ///
    /// # Errors
    ///
    /// * `OmopError::Resource(NotFound)` - If no row has the entity's key
    async fn update(&self, entity: E) -> OmopResult<E>;

    /// Reads one entity by surrogate key.
    async fn read(&self, id: InternalId) -> OmopResult<Option<E>>;

    /// Counts the rows matching a filter.
    async fn count(&self, filter: &PredicateList) -> OmopResult<u64>;

    /// Fetches the `window` slice of matching rows in `order`.
    ///
    /// # Arguments
    ///
    /// * `filter` - The predicate list; empty means all rows
    /// * `window` - Half-open `[from, to)` range over the ordered matches
    /// * `order` - Ordering; resolved with the surrogate-key tie-breaker
    ///
    /// # Errors
    ///
    /// * `OmopError::Backend(UnknownField)` - If the filter or order names an
    ///   unknown column
    async fn find(
        &self,
        filter: &PredicateList,
        window: Window,
        order: &OrderSpec,
    ) -> OmopResult<Vec<E>>;

    /// Deletes a row by surrogate key and returns the number of rows removed.
    async fn delete_by_id(&self, id: InternalId) -> OmopResult<u64>;
}

/// Read access to the `concept` table.
///
/// Lookups are synchronous; implementations are expected to serve them from
/// memory or a cache.
pub trait ConceptLookup: Send + Sync {
    /// Finds a concept by its code, in any vocabulary.
    fn by_code(&self, concept_code: &str) -> Option<Concept>;

    /// Finds a concept by vocabulary and code.
    fn by_vocabulary_code(&self, vocabulary_id: &str, concept_code: &str) -> Option<Concept>;
}
