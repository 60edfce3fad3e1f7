//! Lazily evaluated search results.

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::context::EngineContext;
use crate::core::EntityStorage;
use crate::error::{BackendError, OmopError, OmopResult, ValidationError};
use crate::mapping::ResourceMapping;
use crate::types::{Entity, OrderSpec, PredicateList, Window};

/// The result set of one search.
///
/// Nothing is read until a caller asks for the total or a window. The total
/// is counted at most once per instance and cached; windows are fetched on
/// demand with the resolved order, so overlapping and adjacent windows agree
/// as long as the data does not change in between.
///
/// # Example
///
/// ```ignore
/// let results = provider.search(&request).await?;
/// let total = results.total().await?;
/// let first = results.page(0).await?;
/// let next = results.fetch_window(Window::new(30, 60)).await?;
/// ```
pub struct SearchResults<M: ResourceMapping, S> {
    context: Arc<EngineContext>,
    mapping: Arc<M>,
    storage: Arc<S>,
    filter: PredicateList,
    order: OrderSpec,
    total: OnceCell<u64>,
}

impl<M, S> SearchResults<M, S>
where
    M: ResourceMapping,
    S: EntityStorage<M::Entity>,
{
    pub(crate) fn new(
        context: Arc<EngineContext>,
        mapping: Arc<M>,
        storage: Arc<S>,
        filter: PredicateList,
        order: OrderSpec,
    ) -> Self {
        Self {
            context,
            mapping,
            storage,
            filter,
            order,
            total: OnceCell::new(),
        }
    }

    /// The translated filter.
    pub fn filter(&self) -> &PredicateList {
        &self.filter
    }

    /// The requested order, before the tie-breaker is appended.
    pub fn order(&self) -> &OrderSpec {
        &self.order
    }

    /// Page size to use when the caller does not ask for one.
    pub fn preferred_page_size(&self) -> usize {
        self.context.config().preferred_page_size
    }

    /// Returns true once the total has been counted.
    pub fn is_total_known(&self) -> bool {
        self.total.initialized()
    }

    /// Number of matching rows.
    ///
    /// The first call counts through the storage; later calls, including
    /// concurrent ones, reuse that count.
    pub async fn total(&self) -> OmopResult<u64> {
        let total = self
            .total
            .get_or_try_init(|| async {
                let count = self.storage.count(&self.filter).await?;
                debug!(
                    resource_type = %self.mapping.kind(),
                    backend = self.storage.backend_name(),
                    count,
                    "Counted search results"
                );
                Ok::<_, OmopError>(count)
            })
            .await?;
        Ok(*total)
    }

    /// Fetches and maps the rows in `window`.
    ///
    /// The window is served in full, so `fetch_window(0, total)` returns every
    /// match. Windows past the last match return an empty list. Page-size
    /// limits apply to [`Self::page_with_size`], not here.
    ///
    /// # Errors
    ///
    /// * `BackendError::Internal` - If storage returns a row without a key
    /// * `IntegrityError::MissingExternalId` - If a row or a row it
    ///   references has no external id
    pub async fn fetch_window(&self, window: Window) -> OmopResult<Vec<M::Resource>> {
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let entities = self.storage.find(&self.filter, window, &self.order).await?;
        debug!(
            resource_type = %self.mapping.kind(),
            window = %window,
            rows = entities.len(),
            "Fetched search window"
        );

        entities
            .iter()
            .map(|entity| {
                let id = entity.id().ok_or_else(|| BackendError::Internal {
                    backend_name: self.storage.backend_name().to_string(),
                    message: format!(
                        "{} row without a surrogate key",
                        <M::Entity as Entity>::TABLE
                    ),
                    source: None,
                })?;
                self.mapping.to_canonical(&self.context, id, entity)
            })
            .collect()
    }

    /// Fetches a zero-based page of the preferred size.
    pub async fn page(&self, page: usize) -> OmopResult<Vec<M::Resource>> {
        self.fetch_window(Window::page(page, self.preferred_page_size()))
            .await
    }

    /// Fetches a zero-based page of a caller-chosen size.
    ///
    /// # Errors
    ///
    /// * `ValidationError::InvalidSearchParameter` - If `size` is zero or
    ///   larger than the configured maximum page size
    pub async fn page_with_size(&self, page: usize, size: usize) -> OmopResult<Vec<M::Resource>> {
        let max = self.context.config().max_page_size;
        if size == 0 || size > max {
            return Err(ValidationError::InvalidSearchParameter {
                parameter: "_count".to_string(),
                message: format!("page size must be between 1 and {}, got {}", max, size),
            }
            .into());
        }
        self.fetch_window(Window::page(page, size)).await
    }
}

impl<M: ResourceMapping, S> fmt::Debug for SearchResults<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResults")
            .field("kind", &self.mapping.kind())
            .field("filter", &self.filter)
            .field("order", &self.order)
            .field("total", &self.total.get())
            .finish_non_exhaustive()
    }
}
