//! Identifier translation between external ids and internal surrogate keys.
//!
//! Two implementations are provided:
//!
//! - [`IdentityTranslator`] - external id equals internal key; the usual
//!   deployment when the relational keys are safe to expose
//! - [`TableTranslator`] - an explicit per-kind mapping table with its own
//!   monotonic external sequence

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::IntegrityError;
use crate::types::{ExternalId, InternalId, ResourceKind};

/// Bidirectional, kind-scoped id mapping.
///
/// The mapping is deterministic and injective per kind. Identical numeric
/// values under different kinds never collide.
pub trait IdentifierTranslator: Send + Sync {
    /// Maps an internal key to its external id.
    ///
    /// # Errors
    ///
    /// * `IntegrityError::MissingExternalId` - The key has no external id.
    ///   During result construction this is a data-integrity fault.
    fn external_from_internal(
        &self,
        internal: InternalId,
        kind: ResourceKind,
    ) -> Result<ExternalId, IntegrityError>;

    /// Maps an external id to its internal key.
    ///
    /// `None` means "not found / not yet created", never an error.
    fn internal_from_external(&self, external: ExternalId, kind: ResourceKind)
    -> Option<InternalId>;

    /// Assigns (or returns the existing) external id for a newly stored key.
    fn assign(&self, internal: InternalId, kind: ResourceKind) -> ExternalId;
}

/// Exposes internal keys unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl IdentifierTranslator for IdentityTranslator {
    fn external_from_internal(
        &self,
        internal: InternalId,
        _kind: ResourceKind,
    ) -> Result<ExternalId, IntegrityError> {
        Ok(ExternalId::new(internal.value()))
    }

    fn internal_from_external(
        &self,
        external: ExternalId,
        _kind: ResourceKind,
    ) -> Option<InternalId> {
        Some(InternalId::new(external.value()))
    }

    fn assign(&self, internal: InternalId, _kind: ResourceKind) -> ExternalId {
        ExternalId::new(internal.value())
    }
}

#[derive(Debug, Default)]
struct KindTable {
    to_internal: HashMap<ExternalId, InternalId>,
    to_external: HashMap<InternalId, ExternalId>,
    last_external: i64,
}

/// An explicit mapping table, one namespace per resource kind.
///
/// External ids are drawn from a per-kind monotonic sequence starting at 1.
/// Reads take a shared lock; only `assign` and `insert` take the write lock.
#[derive(Debug, Default)]
pub struct TableTranslator {
    tables: RwLock<HashMap<ResourceKind, KindTable>>,
}

impl TableTranslator {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a known mapping, e.g. when loading an existing table.
    ///
    /// Re-inserting the same pair is a no-op.
    ///
    /// # Errors
    ///
    /// * `IntegrityError::ConflictingMapping` - Either side is already bound
    ///   to a different id.
    pub fn insert(
        &self,
        external: ExternalId,
        internal: InternalId,
        kind: ResourceKind,
    ) -> Result<(), IntegrityError> {
        let mut tables = self.tables.write();
        let table = tables.entry(kind).or_default();

        if let Some(existing) = table.to_internal.get(&external) {
            if *existing == internal {
                return Ok(());
            }
            return Err(IntegrityError::ConflictingMapping {
                resource_type: kind.to_string(),
                external_id: external.value(),
                existing: existing.value(),
            });
        }
        if let Some(existing) = table.to_external.get(&internal) {
            return Err(IntegrityError::ConflictingMapping {
                resource_type: kind.to_string(),
                external_id: existing.value(),
                existing: internal.value(),
            });
        }

        table.to_internal.insert(external, internal);
        table.to_external.insert(internal, external);
        table.last_external = table.last_external.max(external.value());
        Ok(())
    }

    /// Number of mappings held for a kind.
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.tables
            .read()
            .get(&kind)
            .map(|t| t.to_internal.len())
            .unwrap_or(0)
    }
}

impl IdentifierTranslator for TableTranslator {
    fn external_from_internal(
        &self,
        internal: InternalId,
        kind: ResourceKind,
    ) -> Result<ExternalId, IntegrityError> {
        self.tables
            .read()
            .get(&kind)
            .and_then(|t| t.to_external.get(&internal).copied())
            .ok_or_else(|| IntegrityError::MissingExternalId {
                resource_type: kind.to_string(),
                internal_id: internal.value(),
            })
    }

    fn internal_from_external(
        &self,
        external: ExternalId,
        kind: ResourceKind,
    ) -> Option<InternalId> {
        self.tables
            .read()
            .get(&kind)
            .and_then(|t| t.to_internal.get(&external).copied())
    }

    fn assign(&self, internal: InternalId, kind: ResourceKind) -> ExternalId {
        let mut tables = self.tables.write();
        let table = tables.entry(kind).or_default();

        if let Some(existing) = table.to_external.get(&internal) {
            return *existing;
        }

        table.last_external += 1;
        let external = ExternalId::new(table.last_external);
        table.to_internal.insert(external, internal);
        table.to_external.insert(internal, external);
        debug!(
            resource_type = %kind,
            internal_id = internal.value(),
            external_id = external.value(),
            "Assigned external id"
        );
        external
    }
}
