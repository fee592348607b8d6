//! Redis rendition of the document family.
//!
//! Records are JSON strings under `{prefix}:record:{id}` with secondary index
//! sets for parent and kind lookups and a direct name-index key backing the
//! `(dataset_id, name)` overwrite lookup. Blobs are chunked: one parent hash
//! per object plus one binary value per chunk, because a single Redis string
//! value caps out well below the largest saved workspace.
//!
//! # Key Scheme
//!
//! | Key | Type | Holds |
//! |-----|------|-------|
//! | `{prefix}:record:{id}` | string | record JSON |
//! | `{prefix}:kind:{kind}` | set | ids of that kind |
//! | `{prefix}:children:{kind}:{parent}` | set | child ids under a dataset |
//! | `{prefix}:name:{kind}:{parent}:{name}` | string | id carrying that name |
//! | `{prefix}:blob:{key}` | hash | `byte_length`, `chunk_count` |
//! | `{prefix}:blob:{key}:chunk:{seq}` | string (binary) | one chunk |
//! | `{prefix}:blobs` | set | all blob keys |

#[cfg(feature = "redis")]
mod implementation {
    use crate::models::{BlobRef, EntityId, EntityKind, MetadataRecord};
    use crate::storage::traits::{BlobStore, MetadataStore};
    use crate::storage::{Deadline, metrics::record_operation_metrics};
    use crate::{Error, Result};
    use redis::{Client, Commands, Connection};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Maps a redis driver error into the taxonomy.
    fn redis_error(operation: &str, e: &redis::RedisError) -> Error {
        Error::Connection {
            operation: operation.to_string(),
            cause: e.to_string(),
        }
    }

    /// Shared connection handling for both adapters.
    ///
    /// The connection is cached and reused across operations; a failed
    /// operation drops the cached connection so the next call reconnects.
    struct RedisHandle {
        client: Client,
        connection: Mutex<Option<Connection>>,
    }

    impl RedisHandle {
        fn open(connection_url: &str) -> Result<Self> {
            let client = Client::open(connection_url).map_err(|e| Error::Connection {
                operation: "redis_connect".to_string(),
                cause: e.to_string(),
            })?;
            Ok(Self {
                client,
                connection: Mutex::new(None),
            })
        }

        /// Runs `f` on the cached connection, reconnecting when necessary.
        fn with_conn<T>(
            &self,
            operation: &'static str,
            f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
        ) -> Result<T> {
            let mut guard = self
                .connection
                .lock()
                .map_err(|_| Error::Connection {
                    operation: operation.to_string(),
                    cause: "connection lock poisoned".to_string(),
                })?;

            if guard.is_none() {
                *guard = Some(
                    self.client
                        .get_connection()
                        .map_err(|e| redis_error(operation, &e))?,
                );
            }

            // The guard was just populated above when empty.
            let Some(conn) = guard.as_mut() else {
                return Err(Error::Connection {
                    operation: operation.to_string(),
                    cause: "connection unavailable".to_string(),
                });
            };

            match f(conn) {
                Ok(value) => Ok(value),
                Err(e) => {
                    // Drop the cached connection; it may be wedged.
                    *guard = None;
                    Err(redis_error(operation, &e))
                },
            }
        }

        /// PING health check used at construction and by the factory before
        /// publishing a switched-in backend.
        fn ping(&self) -> Result<()> {
            let _: String = self.with_conn("redis_ping", |conn| {
                redis::cmd("PING").query(conn)
            })?;
            Ok(())
        }
    }

    /// Redis metadata store: flexible JSON records with index sets.
    pub struct RedisMetadataStore {
        handle: RedisHandle,
        prefix: String,
    }

    impl RedisMetadataStore {
        /// Creates a store and verifies connectivity with a PING.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Connection`] if the server is unreachable.
        pub fn new(connection_url: &str, prefix: impl Into<String>) -> Result<Self> {
            let store = Self {
                handle: RedisHandle::open(connection_url)?,
                prefix: prefix.into(),
            };
            store.handle.ping()?;
            Ok(store)
        }

        fn record_key(&self, id: &str) -> String {
            format!("{}:record:{id}", self.prefix)
        }

        fn kind_key(&self, kind: EntityKind) -> String {
            format!("{}:kind:{kind}", self.prefix)
        }

        fn children_key(&self, kind: EntityKind, parent: &str) -> String {
            format!("{}:children:{kind}:{parent}", self.prefix)
        }

        fn name_key(&self, kind: EntityKind, parent: &str, name: &str) -> String {
            format!("{}:name:{kind}:{parent}:{name}", self.prefix)
        }

        fn encode(record: &MetadataRecord) -> Result<String> {
            serde_json::to_string(record).map_err(|e| {
                Error::InvalidInput(format!("record '{}' failed to serialize: {e}", record.id))
            })
        }

        fn decode(id: &str, json: &str) -> Result<MetadataRecord> {
            serde_json::from_str(json).map_err(|e| {
                Error::InvalidInput(format!("record '{id}' has undecodable document: {e}"))
            })
        }

        /// Writes the record plus its index entries.
        fn write_record(&self, operation: &'static str, record: &MetadataRecord) -> Result<()> {
            let json = Self::encode(record)?;
            let record_key = self.record_key(record.id.as_str());
            let kind_key = self.kind_key(record.kind);
            let children_key = record
                .parent_id
                .as_ref()
                .map(|p| self.children_key(record.kind, p.as_str()));
            let name_key = match (&record.parent_id, &record.name) {
                (Some(parent), Some(name)) => {
                    Some(self.name_key(record.kind, parent.as_str(), name))
                },
                _ => None,
            };
            let id = record.id.as_str().to_string();

            self.handle.with_conn(operation, |conn| {
                let _: () = conn.set(&record_key, &json)?;
                let _: () = conn.sadd(&kind_key, &id)?;
                if let Some(children_key) = &children_key {
                    let _: () = conn.sadd(children_key, &id)?;
                }
                if let Some(name_key) = &name_key {
                    let _: () = conn.set(name_key, &id)?;
                }
                Ok(())
            })
        }

        /// Removes index entries derived from a stored record.
        fn drop_indexes(&self, operation: &'static str, record: &MetadataRecord) -> Result<()> {
            let kind_key = self.kind_key(record.kind);
            let children_key = record
                .parent_id
                .as_ref()
                .map(|p| self.children_key(record.kind, p.as_str()));
            let name_key = match (&record.parent_id, &record.name) {
                (Some(parent), Some(name)) => {
                    Some(self.name_key(record.kind, parent.as_str(), name))
                },
                _ => None,
            };
            let id = record.id.as_str().to_string();

            self.handle.with_conn(operation, |conn| {
                let _: () = conn.srem(&kind_key, &id)?;
                if let Some(children_key) = &children_key {
                    let _: () = conn.srem(children_key, &id)?;
                }
                if let Some(name_key) = &name_key {
                    let _: () = conn.del(name_key)?;
                }
                Ok(())
            })
        }

        fn get_by_raw_id(&self, operation: &'static str, id: &str) -> Result<Option<MetadataRecord>> {
            let record_key = self.record_key(id);
            let json: Option<String> = self
                .handle
                .with_conn(operation, |conn| conn.get(&record_key))?;
            json.map(|j| Self::decode(id, &j)).transpose()
        }

        fn get_many(&self, operation: &'static str, ids: &[String]) -> Result<Vec<MetadataRecord>> {
            let mut records = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(record) = self.get_by_raw_id(operation, id)? {
                    records.push(record);
                }
            }
            records.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
            Ok(records)
        }
    }

    impl MetadataStore for RedisMetadataStore {
        fn insert(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()> {
            deadline.check("redis_metadata_insert")?;
            let start = Instant::now();
            let result = self.write_record("redis_metadata_insert", record);
            let status = if result.is_ok() { "success" } else { "error" };
            record_operation_metrics("redis", "metadata_insert", start, status);
            result
        }

        fn get(&self, id: &EntityId, deadline: &Deadline) -> Result<Option<MetadataRecord>> {
            deadline.check("redis_metadata_get")?;
            self.get_by_raw_id("redis_metadata_get", id.as_str())
        }

        fn list_by_parent(
            &self,
            kind: EntityKind,
            parent_id: &EntityId,
            deadline: &Deadline,
        ) -> Result<Vec<MetadataRecord>> {
            deadline.check("redis_metadata_list_by_parent")?;
            let children_key = self.children_key(kind, parent_id.as_str());
            let ids: Vec<String> = self
                .handle
                .with_conn("redis_metadata_list_by_parent", |conn| {
                    conn.smembers(&children_key)
                })?;
            self.get_many("redis_metadata_list_by_parent", &ids)
        }

        fn list_by_kind(
            &self,
            kind: EntityKind,
            deadline: &Deadline,
        ) -> Result<Vec<MetadataRecord>> {
            deadline.check("redis_metadata_list_by_kind")?;
            let kind_key = self.kind_key(kind);
            let ids: Vec<String> = self
                .handle
                .with_conn("redis_metadata_list_by_kind", |conn| {
                    conn.smembers(&kind_key)
                })?;
            self.get_many("redis_metadata_list_by_kind", &ids)
        }

        fn find_by_name(
            &self,
            kind: EntityKind,
            parent_id: &EntityId,
            name: &str,
            deadline: &Deadline,
        ) -> Result<Option<MetadataRecord>> {
            deadline.check("redis_metadata_find_by_name")?;
            let name_key = self.name_key(kind, parent_id.as_str(), name);
            let id: Option<String> = self
                .handle
                .with_conn("redis_metadata_find_by_name", |conn| conn.get(&name_key))?;
            match id {
                Some(id) => self.get_by_raw_id("redis_metadata_find_by_name", &id),
                None => Ok(None),
            }
        }

        fn update(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()> {
            deadline.check("redis_metadata_update")?;
            let Some(old) = self.get_by_raw_id("redis_metadata_update", record.id.as_str())? else {
                return Err(Error::NotFound {
                    kind: record.kind,
                    id: record.id.to_string(),
                });
            };
            // A rename must not leave the old name index dangling.
            if old.name != record.name {
                self.drop_indexes("redis_metadata_update", &old)?;
            }
            self.write_record("redis_metadata_update", record)
        }

        fn delete(&self, id: &EntityId, deadline: &Deadline) -> Result<bool> {
            deadline.check("redis_metadata_delete")?;
            let start = Instant::now();
            let result = (|| {
                let Some(record) = self.get_by_raw_id("redis_metadata_delete", id.as_str())? else {
                    return Ok(false);
                };
                self.drop_indexes("redis_metadata_delete", &record)?;
                let record_key = self.record_key(id.as_str());
                let _: () = self
                    .handle
                    .with_conn("redis_metadata_delete", |conn| conn.del(&record_key))?;
                Ok(true)
            })();
            let status = if result.is_ok() { "success" } else { "error" };
            record_operation_metrics("redis", "metadata_delete", start, status);
            result
        }
    }

    /// Redis chunked object store.
    pub struct RedisChunkStore {
        handle: RedisHandle,
        prefix: String,
        chunk_size: usize,
    }

    impl RedisChunkStore {
        /// Creates a store and verifies connectivity with a PING.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Connection`] if the server is unreachable.
        pub fn new(
            connection_url: &str,
            prefix: impl Into<String>,
            chunk_size: usize,
        ) -> Result<Self> {
            let store = Self {
                handle: RedisHandle::open(connection_url)?,
                prefix: prefix.into(),
                chunk_size: chunk_size.max(1),
            };
            store.handle.ping()?;
            Ok(store)
        }

        fn parent_key(&self, key: &str) -> String {
            format!("{}:blob:{key}", self.prefix)
        }

        fn chunk_key(&self, key: &str, seq: u32) -> String {
            format!("{}:blob:{key}:chunk:{seq}", self.prefix)
        }

        fn keys_key(&self) -> String {
            format!("{}:blobs", self.prefix)
        }

        /// Deletes chunk values `0..written` for an interrupted put.
        fn remove_chunks(&self, key: &str, written: u32) {
            for seq in 0..written {
                let chunk_key = self.chunk_key(key, seq);
                let _ = self
                    .handle
                    .with_conn("redis_blob_cleanup", |conn| conn.del::<_, ()>(&chunk_key));
            }
        }
    }

    impl BlobStore for RedisChunkStore {
        fn put(&self, payload: &[u8], deadline: &Deadline) -> Result<BlobRef> {
            deadline.check("redis_blob_put")?;
            let start = Instant::now();
            let key = uuid::Uuid::new_v4().to_string();
            let chunk_count = u32::try_from(payload.len().div_ceil(self.chunk_size))
                .map_err(|_| Error::InvalidInput("payload exceeds chunk-count range".to_string()))?;

            let result = (|| {
                for (seq, piece) in payload.chunks(self.chunk_size).enumerate() {
                    let seq = u32::try_from(seq).unwrap_or(u32::MAX);
                    if let Err(e) = deadline.check("redis_blob_put") {
                        self.remove_chunks(&key, seq);
                        return Err(e);
                    }
                    let chunk_key = self.chunk_key(&key, seq);
                    if let Err(e) = self
                        .handle
                        .with_conn("redis_blob_put", |conn| conn.set::<_, _, ()>(&chunk_key, piece))
                    {
                        self.remove_chunks(&key, seq);
                        return Err(e);
                    }
                }

                // Parent last: the object is not retrievable until it exists.
                let parent_key = self.parent_key(&key);
                let keys_key = self.keys_key();
                let byte_length = payload.len() as u64;
                let result = self.handle.with_conn("redis_blob_put", |conn| {
                    let _: () = conn.hset_multiple(
                        &parent_key,
                        &[
                            ("byte_length", byte_length.to_string()),
                            ("chunk_count", chunk_count.to_string()),
                        ],
                    )?;
                    let _: () = conn.sadd(&keys_key, &key)?;
                    Ok(())
                });
                if let Err(e) = result {
                    self.remove_chunks(&key, chunk_count);
                    return Err(e);
                }

                Ok(BlobRef::new(key.clone(), byte_length, chunk_count))
            })();

            let status = if result.is_ok() { "success" } else { "error" };
            record_operation_metrics("redis", "blob_put", start, status);
            result
        }

        fn get(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<Vec<u8>> {
            deadline.check("redis_blob_get")?;
            let start = Instant::now();
            let result = (|| {
                let parent_key = self.parent_key(&blob_ref.key);
                let fields: std::collections::HashMap<String, String> = self
                    .handle
                    .with_conn("redis_blob_get", |conn| conn.hgetall(&parent_key))?;
                if fields.is_empty() {
                    return Err(Error::CorruptBlob {
                        key: blob_ref.key.clone(),
                        detail: "parent record missing".to_string(),
                    });
                }
                let byte_length: u64 = fields
                    .get("byte_length")
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::CorruptBlob {
                        key: blob_ref.key.clone(),
                        detail: "parent record lacks byte_length".to_string(),
                    })?;
                let chunk_count: u32 = fields
                    .get("chunk_count")
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::CorruptBlob {
                        key: blob_ref.key.clone(),
                        detail: "parent record lacks chunk_count".to_string(),
                    })?;

                let mut payload = Vec::with_capacity(usize::try_from(byte_length).unwrap_or(0));
                for seq in 0..chunk_count {
                    deadline.check("redis_blob_get")?;
                    let chunk_key = self.chunk_key(&blob_ref.key, seq);
                    let chunk: Option<Vec<u8>> = self
                        .handle
                        .with_conn("redis_blob_get", |conn| conn.get(&chunk_key))?;
                    let Some(chunk) = chunk else {
                        return Err(Error::CorruptBlob {
                            key: blob_ref.key.clone(),
                            detail: format!("missing chunk {seq} of {chunk_count}"),
                        });
                    };
                    payload.extend_from_slice(&chunk);
                }

                if payload.len() as u64 != byte_length {
                    return Err(Error::CorruptBlob {
                        key: blob_ref.key.clone(),
                        detail: format!(
                            "reassembled {} bytes, parent records {byte_length}",
                            payload.len()
                        ),
                    });
                }

                Ok(payload)
            })();

            let status = if result.is_ok() { "success" } else { "error" };
            record_operation_metrics("redis", "blob_get", start, status);
            result
        }

        fn delete(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<bool> {
            deadline.check("redis_blob_delete")?;
            let parent_key = self.parent_key(&blob_ref.key);
            let fields: std::collections::HashMap<String, String> = self
                .handle
                .with_conn("redis_blob_delete", |conn| conn.hgetall(&parent_key))?;
            if fields.is_empty() {
                return Ok(false);
            }
            let chunk_count: u32 = fields
                .get("chunk_count")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);

            self.remove_chunks(&blob_ref.key, chunk_count);
            let keys_key = self.keys_key();
            let key = blob_ref.key.clone();
            let _: () = self.handle.with_conn("redis_blob_delete", |conn| {
                let _: () = conn.del(&parent_key)?;
                let _: () = conn.srem(&keys_key, &key)?;
                Ok(())
            })?;
            Ok(true)
        }

        fn list_keys(&self, deadline: &Deadline) -> Result<Vec<String>> {
            deadline.check("redis_blob_list_keys")?;
            let keys_key = self.keys_key();
            let mut keys: Vec<String> = self
                .handle
                .with_conn("redis_blob_list_keys", |conn| conn.smembers(&keys_key))?;
            keys.sort();
            Ok(keys)
        }
    }
}

#[cfg(feature = "redis")]
pub use implementation::{RedisChunkStore, RedisMetadataStore};

#[cfg(not(feature = "redis"))]
mod stub {
    use crate::models::{BlobRef, EntityId, EntityKind, MetadataRecord};
    use crate::storage::Deadline;
    use crate::storage::traits::{BlobStore, MetadataStore};
    use crate::{Error, Result};

    /// Stub Redis metadata store when the feature is not enabled.
    pub struct RedisMetadataStore {
        connection_url: String,
        prefix: String,
    }

    impl RedisMetadataStore {
        /// Creates a stub store (always succeeds; operations fail).
        ///
        /// # Errors
        ///
        /// Never fails in the stub; kept fallible for signature parity with
        /// the real backend.
        pub fn new(connection_url: &str, prefix: impl Into<String>) -> Result<Self> {
            Ok(Self {
                connection_url: connection_url.to_string(),
                prefix: prefix.into(),
            })
        }

        fn not_implemented(&self, what: &str) -> Error {
            Error::NotImplemented(format!(
                "RedisMetadataStore::{what} against {} (prefix {})",
                self.connection_url, self.prefix
            ))
        }
    }

    impl MetadataStore for RedisMetadataStore {
        fn insert(&self, _record: &MetadataRecord, _deadline: &Deadline) -> Result<()> {
            Err(self.not_implemented("insert"))
        }

        fn get(&self, _id: &EntityId, _deadline: &Deadline) -> Result<Option<MetadataRecord>> {
            Err(self.not_implemented("get"))
        }

        fn list_by_parent(
            &self,
            _kind: EntityKind,
            _parent_id: &EntityId,
            _deadline: &Deadline,
        ) -> Result<Vec<MetadataRecord>> {
            Err(self.not_implemented("list_by_parent"))
        }

        fn list_by_kind(
            &self,
            _kind: EntityKind,
            _deadline: &Deadline,
        ) -> Result<Vec<MetadataRecord>> {
            Err(self.not_implemented("list_by_kind"))
        }

        fn find_by_name(
            &self,
            _kind: EntityKind,
            _parent_id: &EntityId,
            _name: &str,
            _deadline: &Deadline,
        ) -> Result<Option<MetadataRecord>> {
            Err(self.not_implemented("find_by_name"))
        }

        fn update(&self, _record: &MetadataRecord, _deadline: &Deadline) -> Result<()> {
            Err(self.not_implemented("update"))
        }

        fn delete(&self, _id: &EntityId, _deadline: &Deadline) -> Result<bool> {
            Err(self.not_implemented("delete"))
        }
    }

    /// Stub Redis chunk store when the feature is not enabled.
    pub struct RedisChunkStore {
        connection_url: String,
        prefix: String,
    }

    impl RedisChunkStore {
        /// Creates a stub store (always succeeds; operations fail).
        ///
        /// # Errors
        ///
        /// Never fails in the stub; kept fallible for signature parity with
        /// the real backend.
        pub fn new(
            connection_url: &str,
            prefix: impl Into<String>,
            _chunk_size: usize,
        ) -> Result<Self> {
            Ok(Self {
                connection_url: connection_url.to_string(),
                prefix: prefix.into(),
            })
        }

        fn not_implemented(&self, what: &str) -> Error {
            Error::NotImplemented(format!(
                "RedisChunkStore::{what} against {} (prefix {})",
                self.connection_url, self.prefix
            ))
        }
    }

    impl BlobStore for RedisChunkStore {
        fn put(&self, _payload: &[u8], _deadline: &Deadline) -> Result<BlobRef> {
            Err(self.not_implemented("put"))
        }

        fn get(&self, _blob_ref: &BlobRef, _deadline: &Deadline) -> Result<Vec<u8>> {
            Err(self.not_implemented("get"))
        }

        fn delete(&self, _blob_ref: &BlobRef, _deadline: &Deadline) -> Result<bool> {
            Err(self.not_implemented("delete"))
        }

        fn list_keys(&self, _deadline: &Deadline) -> Result<Vec<String>> {
            Err(self.not_implemented("list_keys"))
        }
    }
}

#[cfg(not(feature = "redis"))]
pub use stub::{RedisChunkStore, RedisMetadataStore};

#[cfg(all(test, feature = "redis"))]
mod tests {
    use super::*;
    use crate::models::{EntityId, EntityKind, MetadataRecord, Placement};
    use crate::storage::Deadline;
    use crate::storage::traits::{BlobStore, MetadataStore};
    use std::env;

    /// Gets the test server URL from the environment or skips the test.
    fn get_test_redis_url() -> Option<String> {
        env::var("LODESTORE_TEST_REDIS_URL").ok()
    }

    /// Unique prefix per test run for isolation.
    fn unique_prefix() -> String {
        format!("lodestore_test_{}", uuid::Uuid::new_v4().simple())
    }

    #[test]
    fn test_record_crud() {
        let Some(url) = get_test_redis_url() else {
            eprintln!("Skipping: LODESTORE_TEST_REDIS_URL not set");
            return;
        };

        let store = RedisMetadataStore::new(&url, unique_prefix()).expect("connect");
        let deadline = Deadline::none();
        let record = MetadataRecord {
            id: EntityId::new("w1"),
            kind: EntityKind::Workspace,
            parent_id: Some(EntityId::new("d1")),
            name: Some("analysis".to_string()),
            placement: Some(Placement::inline(b"payload".to_vec())),
            body: serde_json::json!({"size_bytes": 7}),
            created_at: 1,
            updated_at: 1,
        };

        store.insert(&record, &deadline).expect("insert");
        let got = store.get(&EntityId::new("w1"), &deadline).expect("get");
        assert_eq!(got, Some(record.clone()));

        let found = store
            .find_by_name(EntityKind::Workspace, &EntityId::new("d1"), "analysis", &deadline)
            .expect("find");
        assert_eq!(found.map(|r| r.id), Some(EntityId::new("w1")));

        let children = store
            .list_by_parent(EntityKind::Workspace, &EntityId::new("d1"), &deadline)
            .expect("list");
        assert_eq!(children.len(), 1);

        assert!(store.delete(&EntityId::new("w1"), &deadline).expect("delete"));
        assert_eq!(store.get(&EntityId::new("w1"), &deadline).expect("get"), None);
        assert!(
            store
                .list_by_parent(EntityKind::Workspace, &EntityId::new("d1"), &deadline)
                .expect("list")
                .is_empty()
        );
    }

    #[test]
    fn test_chunked_blob_roundtrip() {
        let Some(url) = get_test_redis_url() else {
            eprintln!("Skipping: LODESTORE_TEST_REDIS_URL not set");
            return;
        };

        let store = RedisChunkStore::new(&url, unique_prefix(), 64).expect("connect");
        let deadline = Deadline::none();
        let payload: Vec<u8> = (0..64 * 4 + 1).map(|i| (i % 256) as u8).collect();

        let blob_ref = store.put(&payload, &deadline).expect("put");
        assert_eq!(blob_ref.chunk_count, 5);
        assert_eq!(store.get(&blob_ref, &deadline).expect("get"), payload);

        assert!(store.delete(&blob_ref, &deadline).expect("delete"));
        assert!(store.list_keys(&deadline).expect("list").is_empty());
    }
}

#[cfg(all(test, not(feature = "redis")))]
mod stub_tests {
    use super::*;
    use crate::Error;
    use crate::models::EntityId;
    use crate::storage::Deadline;
    use crate::storage::traits::{BlobStore, MetadataStore};

    #[test]
    fn test_stub_metadata_returns_not_implemented() {
        let store = RedisMetadataStore::new("redis://localhost:6379", "lodestore").unwrap();
        let result = store.get(&EntityId::new("x"), &Deadline::none());
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }

    #[test]
    fn test_stub_blob_returns_not_implemented() {
        let store = RedisChunkStore::new("redis://localhost:6379", "lodestore", 1024).unwrap();
        let result = store.put(b"abc", &Deadline::none());
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }
}
