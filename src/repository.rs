//! Entity repository: domain-level CRUD over the active backend.
//!
//! Composes placement routing with the active backend's adapters. Every
//! operation resolves the backend once through the factory and holds that
//! `Arc` for its whole duration, so a concurrent backend switch never swaps
//! adapters underneath a running operation.
//!
//! # Write Ordering
//!
//! Blob writes happen before their metadata record is committed; deletions
//! run the other way (blob before its owning record, children before the
//! parent dataset). An orphaned blob is recoverable by the audit pass; a
//! metadata record pointing at deleted bytes is not.
//!
//! # Consistency
//!
//! No cross-store transactions exist across a cascade. Deletion is
//! best-effort sequential: a failure partway leaves the dataset record in
//! place and already-deleted children gone: partially cleaned, but never a
//! dangling child without its dataset.

use crate::config::StoreConfig;
use crate::models::{
    ColumnDef, Dataset, EntityId, EntityKind, FeedbackRecord, MetadataRecord, Placement,
    TrainingRecord, Workspace, WorkspaceSummary, preview_lines,
};
use crate::storage::{
    Backend, BackendFactory, BackendKind, Deadline, DecisionKind, PlacementDecision, codec, place,
};
use crate::{Error, Result, current_timestamp};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// Domain-level repository for datasets, workspaces, training records and
/// feedback records.
pub struct ArtifactRepository {
    factory: Arc<BackendFactory>,
}

impl ArtifactRepository {
    /// Creates a repository over a backend factory.
    #[must_use]
    pub const fn new(factory: Arc<BackendFactory>) -> Self {
        Self { factory }
    }

    /// The factory owning the active backend.
    #[must_use]
    pub fn factory(&self) -> &BackendFactory {
        &self.factory
    }

    fn config(&self) -> &StoreConfig {
        self.factory.config()
    }

    /// Switches the active backend family.
    ///
    /// Data written under the outgoing family is not migrated; it becomes
    /// reachable again by switching back while the same physical store is
    /// configured.
    ///
    /// # Errors
    ///
    /// Propagates the incoming backend's construction error; the active
    /// backend is unchanged in that case.
    pub fn switch_backend(&self, kind: BackendKind) -> Result<()> {
        self.factory.switch(kind)
    }

    /// The family of the currently active backend.
    #[must_use]
    pub fn current_backend(&self) -> BackendKind {
        self.factory.current_kind()
    }

    // ---- datasets ----

    /// Ingests a payload as a new dataset.
    ///
    /// The preview is computed before placement so it exists even when the
    /// payload itself is offloaded to blob storage.
    ///
    /// # Errors
    ///
    /// Placement, blob-write and metadata-write failures propagate per the
    /// crate taxonomy; see [`crate::Error`].
    #[instrument(skip(self, schema, payload, deadline), fields(operation = "save_dataset", payload.len = payload.len()))]
    pub fn save_dataset(
        &self,
        name: &str,
        schema: Vec<ColumnDef>,
        payload: &[u8],
        deadline: &Deadline,
    ) -> Result<Dataset> {
        if name.is_empty() {
            return Err(Error::InvalidInput("dataset name is empty".to_string()));
        }
        let config = self.config();
        let preview = preview_lines(payload, config.preview_rows, config.preview_max_bytes);
        let decision = place(payload, &config.placement)?;

        let backend = self.factory.current();
        let (placement, blob_key) = self.write_placement(&backend, decision, deadline)?;

        let row_count = payload.split(|b| *b == b'\n').filter(|l| !l.is_empty()).count() as u64;
        let dataset = Dataset {
            id: EntityId::generate(),
            name: name.to_string(),
            row_count,
            column_count: schema.len() as u64,
            schema,
            preview,
            placement,
            created_at: current_timestamp(),
        };

        self.insert_with_cleanup(
            &backend,
            &dataset.to_record(),
            blob_key,
            "save_dataset",
            deadline,
        )?;
        Ok(dataset)
    }

    /// Loads a dataset's full payload and schema.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the id has no dataset record;
    /// [`Error::CorruptBlob`] when stored bytes cannot be reconstructed.
    #[instrument(skip(self, deadline), fields(operation = "load_dataset", dataset.id = %id.as_str()))]
    pub fn load_dataset(
        &self,
        id: &EntityId,
        deadline: &Deadline,
    ) -> Result<(Vec<u8>, Vec<ColumnDef>)> {
        let backend = self.factory.current();
        let dataset = self.get_dataset_on(&backend, id, deadline)?;
        let payload = Self::resolve_payload(&backend, &dataset.placement, deadline)?;
        Ok((payload, dataset.schema))
    }

    /// Fetches a dataset record without its payload.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the id has no dataset record.
    pub fn get_dataset(&self, id: &EntityId, deadline: &Deadline) -> Result<Dataset> {
        let backend = self.factory.current();
        self.get_dataset_on(&backend, id, deadline)
    }

    /// Lists all datasets in the active backend.
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn list_datasets(&self, deadline: &Deadline) -> Result<Vec<Dataset>> {
        let backend = self.factory.current();
        let records = backend
            .metadata()
            .list_by_kind(EntityKind::Dataset, deadline)?;
        records.iter().map(Dataset::from_record).collect()
    }

    /// Deletes a dataset and cascades over everything that references it.
    ///
    /// Children first (each blob before its record), the dataset's own blob
    /// and record last. Best-effort sequential: a child failure aborts the
    /// cascade with the dataset record intact.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the id has no dataset record; the first
    /// child-deletion failure otherwise.
    #[instrument(skip(self, deadline), fields(operation = "delete_dataset", dataset.id = %id.as_str()))]
    pub fn delete_dataset(&self, id: &EntityId, deadline: &Deadline) -> Result<()> {
        let backend = self.factory.current();
        let record = self.require_record(&backend, EntityKind::Dataset, id, deadline)?;

        for kind in EntityKind::cascade_children() {
            let children = backend.metadata().list_by_parent(kind, id, deadline)?;
            for child in &children {
                Self::delete_record_and_blob(&backend, child, deadline)?;
            }
        }

        Self::delete_record_and_blob(&backend, &record, deadline)?;
        tracing::info!(dataset.id = %id.as_str(), "Deleted dataset with cascade");
        Ok(())
    }

    // ---- workspaces ----

    /// Saves analysis state as a workspace under a dataset.
    ///
    /// Keyed on `(dataset_id, name)`: an existing workspace with the same
    /// key is overwritten in place (new payload written first, record
    /// updated, old blob reclaimed last). Concurrent saves on one key are
    /// last-write-wins; the loser's blob is reclaimed by the audit pass.
    ///
    /// # Errors
    ///
    /// [`Error::Reference`] when the dataset does not exist; placement and
    /// adapter failures otherwise.
    #[instrument(skip(self, payload, deadline), fields(operation = "save_workspace", dataset.id = %dataset_id.as_str(), payload.len = payload.len()))]
    pub fn save_workspace(
        &self,
        dataset_id: &EntityId,
        name: &str,
        payload: &[u8],
        deadline: &Deadline,
    ) -> Result<Workspace> {
        if name.is_empty() {
            return Err(Error::InvalidInput("workspace name is empty".to_string()));
        }
        let backend = self.factory.current();
        Self::ensure_dataset(&backend, dataset_id, EntityKind::Workspace, deadline)?;

        let existing = backend.metadata().find_by_name(
            EntityKind::Workspace,
            dataset_id,
            name,
            deadline,
        )?;

        let decision = place(payload, &self.config().placement)?;
        let compressed_size = decision
            .compressed
            .then(|| decision.bytes_to_persist.len() as u64);
        let size_bytes = decision.original_size;
        let (placement, blob_key) = self.write_placement(&backend, decision, deadline)?;
        let now = current_timestamp();

        match existing {
            Some(old_record) => {
                let workspace = Workspace {
                    id: old_record.id.clone(),
                    dataset_id: dataset_id.clone(),
                    name: name.to_string(),
                    placement,
                    size_bytes,
                    compressed_size_bytes: compressed_size,
                    created_at: old_record.created_at,
                    updated_at: now,
                };

                if let Err(e) = backend.metadata().update(&workspace.to_record(), deadline) {
                    return Err(self.cleanup_failed_write(
                        &backend,
                        blob_key,
                        "save_workspace",
                        e,
                        deadline,
                    ));
                }

                // Old payload last: a failure here orphans bytes, never the record.
                if let Some(old_ref) = old_record.placement.as_ref().and_then(Placement::blob_ref) {
                    if let Err(e) = backend.blobs().delete(old_ref, deadline) {
                        tracing::warn!(
                            blob.key = %old_ref.key,
                            error = %e,
                            "Failed to reclaim overwritten workspace blob; audit will sweep it"
                        );
                    }
                }
                Ok(workspace)
            },
            None => {
                let workspace = Workspace {
                    id: EntityId::generate(),
                    dataset_id: dataset_id.clone(),
                    name: name.to_string(),
                    placement,
                    size_bytes,
                    compressed_size_bytes: compressed_size,
                    created_at: now,
                    updated_at: now,
                };
                self.insert_with_cleanup(
                    &backend,
                    &workspace.to_record(),
                    blob_key,
                    "save_workspace",
                    deadline,
                )?;
                Ok(workspace)
            },
        }
    }

    /// Loads a workspace's payload byte-exactly.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the id has no workspace record;
    /// [`Error::CorruptBlob`] when stored bytes cannot be reconstructed.
    #[instrument(skip(self, deadline), fields(operation = "load_workspace", workspace.id = %id.as_str()))]
    pub fn load_workspace(&self, id: &EntityId, deadline: &Deadline) -> Result<Vec<u8>> {
        let backend = self.factory.current();
        let record = self.require_record(&backend, EntityKind::Workspace, id, deadline)?;
        let workspace = Workspace::from_record(&record)?;
        Self::resolve_payload(&backend, &workspace.placement, deadline)
    }

    /// Lists workspaces under a dataset.
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn list_workspaces(
        &self,
        dataset_id: &EntityId,
        deadline: &Deadline,
    ) -> Result<Vec<WorkspaceSummary>> {
        let backend = self.factory.current();
        let records =
            backend
                .metadata()
                .list_by_parent(EntityKind::Workspace, dataset_id, deadline)?;
        records
            .iter()
            .map(|r| Workspace::from_record(r).map(|w| w.summary()))
            .collect()
    }

    /// Deletes a single workspace (blob first, then record).
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the id has no workspace record.
    #[instrument(skip(self, deadline), fields(operation = "delete_workspace", workspace.id = %id.as_str()))]
    pub fn delete_workspace(&self, id: &EntityId, deadline: &Deadline) -> Result<()> {
        let backend = self.factory.current();
        let record = self.require_record(&backend, EntityKind::Workspace, id, deadline)?;
        Self::delete_record_and_blob(&backend, &record, deadline)
    }

    // ---- training records ----

    /// Records scalar metrics from a model training run.
    ///
    /// Always inline; never blob-eligible.
    ///
    /// # Errors
    ///
    /// [`Error::Reference`] when the dataset does not exist.
    pub fn record_training(
        &self,
        dataset_id: &EntityId,
        model_name: &str,
        metrics: BTreeMap<String, f64>,
        deadline: &Deadline,
    ) -> Result<TrainingRecord> {
        let backend = self.factory.current();
        Self::ensure_dataset(&backend, dataset_id, EntityKind::Training, deadline)?;

        let record = TrainingRecord {
            id: EntityId::generate(),
            dataset_id: dataset_id.clone(),
            model_name: model_name.to_string(),
            metrics,
            created_at: current_timestamp(),
        };
        backend.metadata().insert(&record.to_record(), deadline)?;
        Ok(record)
    }

    /// Lists training records under a dataset.
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn list_training(
        &self,
        dataset_id: &EntityId,
        deadline: &Deadline,
    ) -> Result<Vec<TrainingRecord>> {
        let backend = self.factory.current();
        let records =
            backend
                .metadata()
                .list_by_parent(EntityKind::Training, dataset_id, deadline)?;
        records.iter().map(TrainingRecord::from_record).collect()
    }

    // ---- feedback records ----

    /// Records user feedback on a prediction.
    ///
    /// # Errors
    ///
    /// [`Error::Reference`] when the dataset does not exist;
    /// [`Error::InvalidInput`] when `prediction_id` already has feedback
    /// under this dataset.
    pub fn record_feedback(
        &self,
        dataset_id: &EntityId,
        prediction_id: &str,
        rating: i32,
        comment: Option<String>,
        deadline: &Deadline,
    ) -> Result<FeedbackRecord> {
        let backend = self.factory.current();
        Self::ensure_dataset(&backend, dataset_id, EntityKind::Feedback, deadline)?;

        let siblings =
            backend
                .metadata()
                .list_by_parent(EntityKind::Feedback, dataset_id, deadline)?;
        for sibling in &siblings {
            let existing = FeedbackRecord::from_record(sibling)?;
            if existing.prediction_id == prediction_id {
                return Err(Error::InvalidInput(format!(
                    "feedback for prediction '{prediction_id}' already exists"
                )));
            }
        }

        let record = FeedbackRecord {
            id: EntityId::generate(),
            dataset_id: dataset_id.clone(),
            prediction_id: prediction_id.to_string(),
            rating,
            comment,
            created_at: current_timestamp(),
        };
        backend.metadata().insert(&record.to_record(), deadline)?;
        Ok(record)
    }

    /// Lists feedback records under a dataset.
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn list_feedback(
        &self,
        dataset_id: &EntityId,
        deadline: &Deadline,
    ) -> Result<Vec<FeedbackRecord>> {
        let backend = self.factory.current();
        let records =
            backend
                .metadata()
                .list_by_parent(EntityKind::Feedback, dataset_id, deadline)?;
        records.iter().map(FeedbackRecord::from_record).collect()
    }

    /// Deletes a single feedback record.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the id has no feedback record.
    pub fn delete_feedback(&self, id: &EntityId, deadline: &Deadline) -> Result<()> {
        let backend = self.factory.current();
        let record = self.require_record(&backend, EntityKind::Feedback, id, deadline)?;
        Self::delete_record_and_blob(&backend, &record, deadline)
    }

    // ---- audit ----

    /// Out-of-band audit pass: deletes blobs no record references.
    ///
    /// Normal operations never run this. It exists for the partial states
    /// normal cleanup cannot reach, like a process killed between a blob write
    /// and its metadata write, or a failed reclaim during workspace
    /// overwrite. Returns the swept keys.
    ///
    /// # Errors
    ///
    /// Propagates adapter failures; sweeping stops at the first failed
    /// delete.
    #[instrument(skip(self, deadline), fields(operation = "sweep_orphans"))]
    pub fn sweep_orphans(&self, deadline: &Deadline) -> Result<Vec<String>> {
        let backend = self.factory.current();

        let mut referenced: HashSet<String> = HashSet::new();
        for kind in [
            EntityKind::Dataset,
            EntityKind::Workspace,
            EntityKind::Training,
            EntityKind::Feedback,
        ] {
            for record in backend.metadata().list_by_kind(kind, deadline)? {
                if let Some(blob_ref) = record.placement.as_ref().and_then(Placement::blob_ref) {
                    referenced.insert(blob_ref.key.clone());
                }
            }
        }

        let mut swept = Vec::new();
        for key in backend.blobs().list_keys(deadline)? {
            if referenced.contains(&key) {
                continue;
            }
            let orphan = Error::OrphanedBlob { key: key.clone() };
            tracing::warn!(blob.key = %key, "{orphan}");
            let blob_ref = crate::models::BlobRef::new(key.clone(), 0, 0);
            backend.blobs().delete(&blob_ref, deadline)?;
            swept.push(key);
        }
        Ok(swept)
    }

    // ---- shared plumbing ----

    /// Writes a placement decision through the backend, returning the
    /// persisted placement and the blob key to reclaim if the subsequent
    /// metadata write fails.
    fn write_placement(
        &self,
        backend: &Backend,
        decision: PlacementDecision,
        deadline: &Deadline,
    ) -> Result<(Placement, Option<String>)> {
        match decision.kind {
            DecisionKind::Inline => Ok((Placement::inline(decision.bytes_to_persist), None)),
            DecisionKind::Blob => {
                let blob_ref = backend.blobs().put(&decision.bytes_to_persist, deadline)?;
                let key = blob_ref.key.clone();
                Ok((
                    Placement::Blob {
                        blob_ref,
                        original_size: decision.original_size,
                        compressed: decision.compressed,
                    },
                    Some(key),
                ))
            },
        }
    }

    /// Inserts a record, reclaiming the just-written blob when the metadata
    /// write fails.
    fn insert_with_cleanup(
        &self,
        backend: &Backend,
        record: &MetadataRecord,
        blob_key: Option<String>,
        operation: &str,
        deadline: &Deadline,
    ) -> Result<()> {
        match backend.metadata().insert(record, deadline) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.cleanup_failed_write(backend, blob_key, operation, e, deadline)),
        }
    }

    /// Best-effort reclaim of a blob written for a failed metadata write.
    ///
    /// Returns the original error when the reclaim succeeds (or there was no
    /// blob); escalates to [`Error::PartialWrite`] when the blob survives.
    fn cleanup_failed_write(
        &self,
        backend: &Backend,
        blob_key: Option<String>,
        operation: &str,
        cause: Error,
        deadline: &Deadline,
    ) -> Error {
        let Some(key) = blob_key else {
            return cause;
        };
        let blob_ref = crate::models::BlobRef::new(key.clone(), 0, 0);
        match backend.blobs().delete(&blob_ref, deadline) {
            Ok(_) => cause,
            Err(cleanup_err) => {
                tracing::error!(
                    blob.key = %key,
                    error = %cleanup_err,
                    "Blob cleanup after failed metadata write also failed"
                );
                Error::PartialWrite {
                    operation: operation.to_string(),
                    blob_key: key,
                    cause: cause.to_string(),
                }
            },
        }
    }

    /// Verifies that `dataset_id` names a live dataset before a child entity
    /// is created against it.
    ///
    /// A record of the wrong kind counts as missing; adapter failures
    /// propagate untouched rather than masquerading as `Reference`.
    fn ensure_dataset(
        backend: &Backend,
        dataset_id: &EntityId,
        child_kind: EntityKind,
        deadline: &Deadline,
    ) -> Result<()> {
        match backend.metadata().get(dataset_id, deadline)? {
            Some(record) if record.kind == EntityKind::Dataset => Ok(()),
            _ => Err(Error::Reference {
                kind: child_kind,
                dataset_id: dataset_id.to_string(),
            }),
        }
    }

    /// Fetches a record and checks it is of the expected kind.
    fn require_record(
        &self,
        backend: &Backend,
        kind: EntityKind,
        id: &EntityId,
        deadline: &Deadline,
    ) -> Result<MetadataRecord> {
        let record = backend.metadata().get(id, deadline)?;
        match record {
            Some(record) if record.kind == kind => Ok(record),
            _ => Err(Error::NotFound {
                kind,
                id: id.to_string(),
            }),
        }
    }

    fn get_dataset_on(
        &self,
        backend: &Backend,
        id: &EntityId,
        deadline: &Deadline,
    ) -> Result<Dataset> {
        let record = self.require_record(backend, EntityKind::Dataset, id, deadline)?;
        Dataset::from_record(&record)
    }

    /// Materializes a placement back into payload bytes.
    fn resolve_payload(
        backend: &Backend,
        placement: &Placement,
        deadline: &Deadline,
    ) -> Result<Vec<u8>> {
        match placement {
            Placement::Inline { bytes } => Ok(bytes.clone()),
            Placement::Blob {
                blob_ref,
                compressed,
                ..
            } => {
                let stored = backend.blobs().get(blob_ref, deadline)?;
                if *compressed {
                    // Decompression failure on stored bytes means the blob is
                    // damaged, not that the caller passed bad input.
                    codec::decompress(&stored).map_err(|e| Error::CorruptBlob {
                        key: blob_ref.key.clone(),
                        detail: format!("decompression failed: {e}"),
                    })
                } else {
                    Ok(stored)
                }
            },
        }
    }

    /// Deletes one record's blob (if any) and then the record itself.
    fn delete_record_and_blob(
        backend: &Backend,
        record: &MetadataRecord,
        deadline: &Deadline,
    ) -> Result<()> {
        if let Some(blob_ref) = record.placement.as_ref().and_then(Placement::blob_ref) {
            backend.blobs().delete(blob_ref, deadline)?;
        }
        backend.metadata().delete(&record.id, deadline)?;
        Ok(())
    }
}
