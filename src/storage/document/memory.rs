//! In-process document family backend.
//!
//! A fast, non-persistent rendition of the document family: flexible JSON
//! records in a map, plus a chunked object store with parent and chunk
//! records. Used standalone for development and as the document-family
//! reference in tests; the Redis backend follows the same record layout over
//! the wire.

use crate::models::{BlobRef, EntityId, EntityKind, MetadataRecord};
use crate::storage::traits::{BlobStore, MetadataStore};
use crate::storage::{DEFAULT_CHUNK_SIZE, Deadline};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::RwLock;

/// Maps a poisoned-lock failure into the error taxonomy.
fn lock_error(operation: &str) -> Error {
    Error::Connection {
        operation: operation.to_string(),
        cause: "store lock poisoned".to_string(),
    }
}

/// In-memory metadata store: one JSON-shaped document per record.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
/// Data is not persisted between runs.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: RwLock<HashMap<String, MetadataRecord>>,
}

impl MemoryMetadataStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records stored.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn insert(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()> {
        deadline.check("memory_metadata_insert")?;
        let mut records = self
            .records
            .write()
            .map_err(|_| lock_error("memory_metadata_insert"))?;
        records.insert(record.id.as_str().to_string(), record.clone());
        Ok(())
    }

    fn get(&self, id: &EntityId, deadline: &Deadline) -> Result<Option<MetadataRecord>> {
        deadline.check("memory_metadata_get")?;
        let records = self
            .records
            .read()
            .map_err(|_| lock_error("memory_metadata_get"))?;
        Ok(records.get(id.as_str()).cloned())
    }

    fn list_by_parent(
        &self,
        kind: EntityKind,
        parent_id: &EntityId,
        deadline: &Deadline,
    ) -> Result<Vec<MetadataRecord>> {
        deadline.check("memory_metadata_list_by_parent")?;
        let records = self
            .records
            .read()
            .map_err(|_| lock_error("memory_metadata_list_by_parent"))?;
        let mut matches: Vec<MetadataRecord> = records
            .values()
            .filter(|r| r.kind == kind && r.parent_id.as_ref() == Some(parent_id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(matches)
    }

    fn list_by_kind(&self, kind: EntityKind, deadline: &Deadline) -> Result<Vec<MetadataRecord>> {
        deadline.check("memory_metadata_list_by_kind")?;
        let records = self
            .records
            .read()
            .map_err(|_| lock_error("memory_metadata_list_by_kind"))?;
        let mut matches: Vec<MetadataRecord> =
            records.values().filter(|r| r.kind == kind).cloned().collect();
        matches.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(matches)
    }

    fn find_by_name(
        &self,
        kind: EntityKind,
        parent_id: &EntityId,
        name: &str,
        deadline: &Deadline,
    ) -> Result<Option<MetadataRecord>> {
        deadline.check("memory_metadata_find_by_name")?;
        let records = self
            .records
            .read()
            .map_err(|_| lock_error("memory_metadata_find_by_name"))?;
        Ok(records
            .values()
            .find(|r| {
                r.kind == kind
                    && r.parent_id.as_ref() == Some(parent_id)
                    && r.name.as_deref() == Some(name)
            })
            .cloned())
    }

    fn update(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()> {
        deadline.check("memory_metadata_update")?;
        let mut records = self
            .records
            .write()
            .map_err(|_| lock_error("memory_metadata_update"))?;
        if !records.contains_key(record.id.as_str()) {
            return Err(Error::NotFound {
                kind: record.kind,
                id: record.id.to_string(),
            });
        }
        records.insert(record.id.as_str().to_string(), record.clone());
        Ok(())
    }

    fn delete(&self, id: &EntityId, deadline: &Deadline) -> Result<bool> {
        deadline.check("memory_metadata_delete")?;
        let mut records = self
            .records
            .write()
            .map_err(|_| lock_error("memory_metadata_delete"))?;
        Ok(records.remove(id.as_str()).is_some())
    }
}

/// Parent record for one chunked object.
#[derive(Debug, Clone, Copy)]
struct ChunkParent {
    byte_length: u64,
    chunk_count: u32,
}

/// In-memory chunked object store.
///
/// Splits payloads into fixed-size chunks, one record per chunk keyed by
/// `(object key, sequence)`, plus a parent record holding total length and
/// chunk count. The parent is written last: until it exists the object is
/// not retrievable, so an interrupted `put` leaves no half-readable state.
#[derive(Debug)]
pub struct MemoryChunkStore {
    chunk_size: usize,
    parents: RwLock<HashMap<String, ChunkParent>>,
    chunks: RwLock<HashMap<(String, u32), Vec<u8>>>,
}

impl MemoryChunkStore {
    /// Creates a store with the given chunk size.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            parents: RwLock::new(HashMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Configured chunk size in bytes.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Removes any chunks written for `key` (cleanup after an interrupted put).
    fn remove_chunks(&self, key: &str, written: u32) {
        if let Ok(mut chunks) = self.chunks.write() {
            for seq in 0..written {
                chunks.remove(&(key.to_string(), seq));
            }
        }
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl BlobStore for MemoryChunkStore {
    fn put(&self, payload: &[u8], deadline: &Deadline) -> Result<BlobRef> {
        deadline.check("memory_blob_put")?;
        let key = uuid::Uuid::new_v4().to_string();
        let chunk_count = u32::try_from(payload.len().div_ceil(self.chunk_size))
            .map_err(|_| Error::InvalidInput("payload exceeds chunk-count range".to_string()))?;

        for (seq, piece) in payload.chunks(self.chunk_size).enumerate() {
            let seq = seq as u32;
            if let Err(e) = deadline.check("memory_blob_put") {
                self.remove_chunks(&key, seq);
                return Err(e);
            }
            let mut chunks = self.chunks.write().map_err(|_| lock_error("memory_blob_put"))?;
            chunks.insert((key.clone(), seq), piece.to_vec());
        }

        let mut parents = self
            .parents
            .write()
            .map_err(|_| lock_error("memory_blob_put"))?;
        parents.insert(
            key.clone(),
            ChunkParent {
                byte_length: payload.len() as u64,
                chunk_count,
            },
        );

        Ok(BlobRef::new(key, payload.len() as u64, chunk_count))
    }

    fn get(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<Vec<u8>> {
        deadline.check("memory_blob_get")?;
        let parent = {
            let parents = self
                .parents
                .read()
                .map_err(|_| lock_error("memory_blob_get"))?;
            parents.get(&blob_ref.key).copied()
        };
        let Some(parent) = parent else {
            return Err(Error::CorruptBlob {
                key: blob_ref.key.clone(),
                detail: "parent record missing".to_string(),
            });
        };

        let mut payload = Vec::with_capacity(usize::try_from(parent.byte_length).unwrap_or(0));
        for seq in 0..parent.chunk_count {
            deadline.check("memory_blob_get")?;
            let chunk = {
                let chunks = self
                    .chunks
                    .read()
                    .map_err(|_| lock_error("memory_blob_get"))?;
                chunks.get(&(blob_ref.key.clone(), seq)).cloned()
            };
            let Some(chunk) = chunk else {
                return Err(Error::CorruptBlob {
                    key: blob_ref.key.clone(),
                    detail: format!("missing chunk {seq} of {}", parent.chunk_count),
                });
            };
            payload.extend_from_slice(&chunk);
        }

        if payload.len() as u64 != parent.byte_length {
            return Err(Error::CorruptBlob {
                key: blob_ref.key.clone(),
                detail: format!(
                    "reassembled {} bytes, parent records {}",
                    payload.len(),
                    parent.byte_length
                ),
            });
        }

        Ok(payload)
    }

    fn delete(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<bool> {
        deadline.check("memory_blob_delete")?;
        let removed = {
            let mut parents = self
                .parents
                .write()
                .map_err(|_| lock_error("memory_blob_delete"))?;
            parents.remove(&blob_ref.key)
        };
        if let Some(parent) = removed {
            self.remove_chunks(&blob_ref.key, parent.chunk_count);
        }
        Ok(removed.is_some())
    }

    fn list_keys(&self, deadline: &Deadline) -> Result<Vec<String>> {
        deadline.check("memory_blob_list_keys")?;
        let parents = self
            .parents
            .read()
            .map_err(|_| lock_error("memory_blob_list_keys"))?;
        let mut keys: Vec<String> = parents.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Placement;

    fn record(id: &str, kind: EntityKind, parent: Option<&str>, name: Option<&str>) -> MetadataRecord {
        MetadataRecord {
            id: EntityId::new(id),
            kind,
            parent_id: parent.map(EntityId::new),
            name: name.map(str::to_string),
            placement: Some(Placement::inline(b"x".to_vec())),
            body: serde_json::json!({}),
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_metadata_crud() {
        let store = MemoryMetadataStore::new();
        let deadline = Deadline::none();

        let rec = record("a", EntityKind::Dataset, None, Some("ds"));
        store.insert(&rec, &deadline).unwrap();
        assert_eq!(store.get(&EntityId::new("a"), &deadline).unwrap(), Some(rec.clone()));
        assert!(store.exists(&EntityId::new("a"), &deadline).unwrap());

        let mut updated = rec;
        updated.name = Some("renamed".to_string());
        store.update(&updated, &deadline).unwrap();
        let got = store.get(&EntityId::new("a"), &deadline).unwrap().unwrap();
        assert_eq!(got.name.as_deref(), Some("renamed"));

        assert!(store.delete(&EntityId::new("a"), &deadline).unwrap());
        assert!(!store.delete(&EntityId::new("a"), &deadline).unwrap());
        assert_eq!(store.get(&EntityId::new("a"), &deadline).unwrap(), None);
    }

    #[test]
    fn test_update_missing_record_is_not_found() {
        let store = MemoryMetadataStore::new();
        let rec = record("ghost", EntityKind::Workspace, Some("d"), Some("w"));
        let err = store.update(&rec, &Deadline::none()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_list_by_parent_filters_kind_and_parent() {
        let store = MemoryMetadataStore::new();
        let deadline = Deadline::none();
        store
            .insert(&record("w1", EntityKind::Workspace, Some("d1"), Some("a")), &deadline)
            .unwrap();
        store
            .insert(&record("w2", EntityKind::Workspace, Some("d1"), Some("b")), &deadline)
            .unwrap();
        store
            .insert(&record("w3", EntityKind::Workspace, Some("d2"), Some("c")), &deadline)
            .unwrap();
        store
            .insert(&record("t1", EntityKind::Training, Some("d1"), None), &deadline)
            .unwrap();

        let workspaces = store
            .list_by_parent(EntityKind::Workspace, &EntityId::new("d1"), &deadline)
            .unwrap();
        assert_eq!(workspaces.len(), 2);

        let found = store
            .find_by_name(EntityKind::Workspace, &EntityId::new("d1"), "b", &deadline)
            .unwrap();
        assert_eq!(found.map(|r| r.id), Some(EntityId::new("w2")));
    }

    #[test]
    fn test_chunk_store_roundtrip_exact_multiple() {
        let store = MemoryChunkStore::new(4);
        let deadline = Deadline::none();
        let payload = b"abcdefgh".to_vec();

        let blob_ref = store.put(&payload, &deadline).unwrap();
        assert_eq!(blob_ref.chunk_count, 2);
        assert_eq!(blob_ref.byte_length, 8);
        assert_eq!(store.get(&blob_ref, &deadline).unwrap(), payload);
    }

    #[test]
    fn test_chunk_store_five_chunk_reconstruction() {
        // chunk size x 4 + 1 byte forces exactly 5 chunks.
        let store = MemoryChunkStore::new(256);
        let deadline = Deadline::none();
        let payload: Vec<u8> = (0..256 * 4 + 1).map(|i| (i % 251) as u8).collect();

        let blob_ref = store.put(&payload, &deadline).unwrap();
        assert_eq!(blob_ref.chunk_count, 5);
        assert_eq!(store.get(&blob_ref, &deadline).unwrap(), payload);
    }

    #[test]
    fn test_chunk_store_empty_payload() {
        let store = MemoryChunkStore::new(4);
        let deadline = Deadline::none();

        let blob_ref = store.put(b"", &deadline).unwrap();
        assert_eq!(blob_ref.chunk_count, 0);
        assert_eq!(store.get(&blob_ref, &deadline).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_missing_chunk_is_corrupt_not_partial() {
        let store = MemoryChunkStore::new(4);
        let deadline = Deadline::none();
        let blob_ref = store.put(b"abcdefghij", &deadline).unwrap();

        // Simulate a lost chunk record.
        store
            .chunks
            .write()
            .unwrap()
            .remove(&(blob_ref.key.clone(), 1));

        let err = store.get(&blob_ref, &deadline).unwrap_err();
        assert!(matches!(err, Error::CorruptBlob { .. }));
        assert!(err.to_string().contains("missing chunk 1"));
    }

    #[test]
    fn test_dangling_ref_is_corrupt() {
        let store = MemoryChunkStore::new(4);
        let blob_ref = BlobRef::new("never-written", 10, 3);
        let err = store.get(&blob_ref, &Deadline::none()).unwrap_err();
        assert!(matches!(err, Error::CorruptBlob { .. }));
    }

    #[test]
    fn test_delete_removes_parent_and_chunks() {
        let store = MemoryChunkStore::new(4);
        let deadline = Deadline::none();
        let blob_ref = store.put(b"abcdefghij", &deadline).unwrap();

        assert!(store.delete(&blob_ref, &deadline).unwrap());
        assert!(!store.delete(&blob_ref, &deadline).unwrap());
        assert!(store.chunks.read().unwrap().is_empty());
        assert!(store.list_keys(&deadline).unwrap().is_empty());
    }

    #[test]
    fn test_expired_deadline_rejects_put() {
        let store = MemoryChunkStore::new(4);
        let deadline = Deadline::within(std::time::Duration::ZERO);
        let err = store.put(b"abc", &deadline).unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
    }
}
