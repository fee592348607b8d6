//! Metadata adapter trait.

use crate::Result;
use crate::models::{EntityId, EntityKind, MetadataRecord};
use crate::storage::Deadline;

/// Structured-record storage for entity metadata.
///
/// Implementations map [`MetadataRecord`] onto flexible document fields or
/// typed/JSON columns; both must preserve the tagged placement union
/// losslessly. Record ids are generated by the caller (the repository), so
/// both families mint ids identically.
pub trait MetadataStore: Send + Sync {
    /// Inserts a record. The id must not already exist.
    fn insert(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()>;

    /// Retrieves a record by id, `None` when absent.
    fn get(&self, id: &EntityId, deadline: &Deadline) -> Result<Option<MetadataRecord>>;

    /// Lists all records of `kind` whose parent is `parent_id`.
    fn list_by_parent(
        &self,
        kind: EntityKind,
        parent_id: &EntityId,
        deadline: &Deadline,
    ) -> Result<Vec<MetadataRecord>>;

    /// Lists all records of `kind` (dataset catalog listing).
    fn list_by_kind(&self, kind: EntityKind, deadline: &Deadline) -> Result<Vec<MetadataRecord>>;

    /// Finds the record of `kind` under `parent_id` carrying `name`, if any.
    ///
    /// Backs the `(dataset_id, name)` workspace overwrite key.
    fn find_by_name(
        &self,
        kind: EntityKind,
        parent_id: &EntityId,
        name: &str,
        deadline: &Deadline,
    ) -> Result<Option<MetadataRecord>>;

    /// Replaces an existing record in full.
    fn update(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()>;

    /// Deletes a record by id; returns whether a record existed.
    fn delete(&self, id: &EntityId, deadline: &Deadline) -> Result<bool>;

    /// Checks whether a record exists.
    fn exists(&self, id: &EntityId, deadline: &Deadline) -> Result<bool> {
        Ok(self.get(id, deadline)?.is_some())
    }
}
