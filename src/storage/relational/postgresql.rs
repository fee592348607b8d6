//! PostgreSQL rendition of the relational family.
//!
//! Records live in a `{prefix}_records` table with typed columns for the
//! placement discriminator and blob-ref fields plus a JSONB `body` column;
//! blobs go whole into a BYTEA column of `{prefix}_blobs`. No chunking:
//! BYTEA has no practical ceiling at the sizes the placement thresholds
//! imply. Both adapter views share one bounded deadpool connection pool.

#[cfg(feature = "postgres")]
mod implementation {
    use crate::models::{BlobRef, EntityId, EntityKind, MetadataRecord, Placement};
    use crate::storage::Deadline;
    use crate::storage::metrics::record_operation_metrics;
    use crate::storage::migrations::{Migration, MigrationRunner};
    use crate::storage::traits::{BlobStore, MetadataStore};
    use crate::{Error, Result};
    use deadpool_postgres::{Config, Pool, Runtime};
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::runtime::Handle;
    use tokio_postgres::NoTls;

    /// Embedded migrations compiled into the binary.
    const MIGRATIONS: &[Migration] = &[
        Migration {
            version: 1,
            description: "Initial records and blobs tables",
            sql: r"
                CREATE TABLE IF NOT EXISTS {records} (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    parent_id TEXT,
                    name TEXT,
                    placement TEXT,
                    inline_payload BYTEA,
                    blob_key TEXT,
                    blob_byte_length BIGINT,
                    blob_chunk_count INTEGER,
                    blob_original_size BIGINT,
                    blob_compressed BOOLEAN,
                    body JSONB NOT NULL,
                    created_at BIGINT NOT NULL,
                    updated_at BIGINT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS {blobs} (
                    key TEXT PRIMARY KEY,
                    byte_length BIGINT NOT NULL,
                    data BYTEA NOT NULL
                );
            ",
        },
        Migration {
            version: 2,
            description: "Cascade and overwrite-key indexes",
            sql: r"
                CREATE INDEX IF NOT EXISTS idx_{records}_kind_parent ON {records} (kind, parent_id);
                CREATE INDEX IF NOT EXISTS idx_{records}_kind_parent_name ON {records} (kind, parent_id, name);
            ",
        },
    ];

    /// Helper to map pool errors.
    fn pool_error(operation: &'static str, e: impl std::fmt::Display) -> Error {
        Error::Connection {
            operation: operation.to_string(),
            cause: e.to_string(),
        }
    }

    /// Helper to map query errors.
    fn query_error(operation: &str, e: impl std::fmt::Display) -> Error {
        Error::Connection {
            operation: operation.to_string(),
            cause: e.to_string(),
        }
    }

    /// Shared PostgreSQL relational-family store.
    pub struct PostgresStore {
        /// Connection pool.
        pool: Pool,
        /// Table prefix; actual tables are `{prefix}_records` and
        /// `{prefix}_blobs`.
        table_prefix: String,
    }

    impl PostgresStore {
        /// Default maximum connections in pool.
        const DEFAULT_POOL_MAX_SIZE: usize = 20;

        /// Creates a new PostgreSQL store with default pool size.
        ///
        /// # Errors
        ///
        /// Returns an error if the pool cannot be initialized or migrations
        /// fail.
        pub fn new(connection_url: &str, table_prefix: impl Into<String>) -> Result<Self> {
            Self::with_pool_size(connection_url, table_prefix, None)
        }

        /// Creates a new PostgreSQL store with configurable pool size.
        ///
        /// # Arguments
        ///
        /// * `connection_url` - PostgreSQL connection URL
        /// * `table_prefix` - Prefix for the records/blobs tables
        /// * `pool_max_size` - Maximum connections in pool (defaults to 20)
        ///
        /// # Errors
        ///
        /// Returns an error if the pool cannot be initialized or migrations
        /// fail.
        pub fn with_pool_size(
            connection_url: &str,
            table_prefix: impl Into<String>,
            pool_max_size: Option<usize>,
        ) -> Result<Self> {
            let table_prefix = table_prefix.into();
            let config = Self::parse_connection_url(connection_url)?;
            let cfg = Self::build_pool_config(&config, pool_max_size);

            let pool = cfg
                .create_pool(Some(Runtime::Tokio1), NoTls)
                .map_err(|e| pool_error("postgres_create_pool", e))?;

            let store = Self { pool, table_prefix };
            store.run_migrations()?;
            Ok(store)
        }

        /// Splits a shared store into its adapter pair.
        #[must_use]
        pub fn into_pair(self) -> (PostgresMetadataStore, PostgresBlobStore) {
            let store = Arc::new(self);
            (
                PostgresMetadataStore {
                    store: Arc::clone(&store),
                },
                PostgresBlobStore { store },
            )
        }

        /// Parses the connection URL into a tokio-postgres config.
        fn parse_connection_url(url: &str) -> Result<tokio_postgres::Config> {
            url.parse::<tokio_postgres::Config>()
                .map_err(|e| Error::InvalidInput(format!("invalid postgres url: {e}")))
        }

        /// Extracts host string from tokio-postgres Host.
        #[cfg(unix)]
        fn host_to_string(h: &tokio_postgres::config::Host) -> String {
            match h {
                tokio_postgres::config::Host::Tcp(s) => s.clone(),
                tokio_postgres::config::Host::Unix(p) => p.to_string_lossy().to_string(),
            }
        }

        /// Extracts host string from tokio-postgres Host (Windows: Tcp only).
        #[cfg(not(unix))]
        fn host_to_string(h: &tokio_postgres::config::Host) -> String {
            let tokio_postgres::config::Host::Tcp(s) = h;
            s.clone()
        }

        /// Builds a deadpool config from tokio-postgres config.
        ///
        /// Pool acquisition blocks with a 5 second timeout when exhausted, so
        /// a stalled store surfaces as `Connection` instead of hanging the
        /// caller indefinitely.
        fn build_pool_config(
            config: &tokio_postgres::Config,
            pool_max_size: Option<usize>,
        ) -> Config {
            let mut cfg = Config::new();
            cfg.host = config.get_hosts().first().map(Self::host_to_string);
            cfg.port = config.get_ports().first().copied();
            cfg.user = config.get_user().map(String::from);
            cfg.password = config
                .get_password()
                .map(|p| String::from_utf8_lossy(p).to_string());
            cfg.dbname = config.get_dbname().map(String::from);

            let max_size = pool_max_size.unwrap_or(Self::DEFAULT_POOL_MAX_SIZE);
            cfg.pool = Some(deadpool_postgres::PoolConfig {
                max_size,
                timeouts: deadpool_postgres::Timeouts {
                    wait: Some(std::time::Duration::from_secs(5)),
                    create: Some(std::time::Duration::from_secs(5)),
                    recycle: Some(std::time::Duration::from_secs(5)),
                },
                ..Default::default()
            });

            cfg.manager = Some(deadpool_postgres::ManagerConfig {
                recycling_method: deadpool_postgres::RecyclingMethod::Fast,
            });

            cfg
        }

        /// Runs a blocking operation on the async pool.
        fn block_on<F, T>(&self, f: F) -> Result<T>
        where
            F: std::future::Future<Output = Result<T>>,
        {
            if let Ok(handle) = Handle::try_current() {
                handle.block_on(f)
            } else {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| pool_error("postgres_create_runtime", e))?;
                rt.block_on(f)
            }
        }

        /// Runs migrations.
        fn run_migrations(&self) -> Result<()> {
            self.block_on(async {
                let runner = MigrationRunner::new(self.pool.clone(), &self.table_prefix);
                runner.run(MIGRATIONS).await
            })
        }

        fn records_table(&self) -> String {
            format!("{}_records", self.table_prefix)
        }

        fn blobs_table(&self) -> String {
            format!("{}_blobs", self.table_prefix)
        }

        /// Converts a database row to a metadata record.
        #[allow(clippy::cast_sign_loss)]
        fn row_to_record(row: &tokio_postgres::Row) -> MetadataRecord {
            let id: String = row.get("id");
            let kind_str: String = row.get("kind");
            let parent_id: Option<String> = row.get("parent_id");
            let name: Option<String> = row.get("name");
            let placement_str: Option<String> = row.get("placement");
            let inline_payload: Option<Vec<u8>> = row.get("inline_payload");
            let blob_key: Option<String> = row.get("blob_key");
            let blob_byte_length: Option<i64> = row.get("blob_byte_length");
            let blob_chunk_count: Option<i32> = row.get("blob_chunk_count");
            let blob_original_size: Option<i64> = row.get("blob_original_size");
            let blob_compressed: Option<bool> = row.get("blob_compressed");
            let body: serde_json::Value = row.get("body");
            let created_at: i64 = row.get("created_at");
            let updated_at: i64 = row.get("updated_at");

            let kind = EntityKind::parse(&kind_str).unwrap_or(EntityKind::Dataset);
            let placement = match placement_str.as_deref() {
                Some("inline") => Some(Placement::Inline {
                    bytes: inline_payload.unwrap_or_default(),
                }),
                Some("blob") => Some(Placement::Blob {
                    blob_ref: BlobRef::new(
                        blob_key.unwrap_or_default(),
                        blob_byte_length.unwrap_or(0) as u64,
                        u32::try_from(blob_chunk_count.unwrap_or(0)).unwrap_or(0),
                    ),
                    original_size: blob_original_size.unwrap_or(0) as u64,
                    compressed: blob_compressed.unwrap_or(false),
                }),
                _ => None,
            };

            MetadataRecord {
                id: EntityId::new(id),
                kind,
                parent_id: parent_id.map(EntityId::new),
                name,
                placement,
                body,
                created_at: created_at as u64,
                updated_at: updated_at as u64,
            }
        }

        const RECORD_COLUMNS: &'static str = "id, kind, parent_id, name, placement, inline_payload,
            blob_key, blob_byte_length, blob_chunk_count, blob_original_size, blob_compressed,
            body, created_at, updated_at";

        /// Async INSERT or UPDATE of a record row.
        #[allow(clippy::cast_possible_wrap)]
        async fn write_record_async(
            &self,
            operation: &'static str,
            record: &MetadataRecord,
            replace: bool,
        ) -> Result<()> {
            let client = self.pool.get().await.map_err(|e| pool_error(operation, e))?;

            let (placement, inline_payload, blob_key, blob_len, blob_chunks, blob_orig, blob_comp) =
                match &record.placement {
                    None => (None, None, None, None, None, None, None),
                    Some(Placement::Inline { bytes }) => (
                        Some("inline"),
                        Some(bytes.as_slice()),
                        None,
                        None,
                        None,
                        None,
                        None,
                    ),
                    Some(Placement::Blob {
                        blob_ref,
                        original_size,
                        compressed,
                    }) => (
                        Some("blob"),
                        None,
                        Some(blob_ref.key.as_str()),
                        Some(blob_ref.byte_length as i64),
                        Some(i32::try_from(blob_ref.chunk_count).unwrap_or(i32::MAX)),
                        Some(*original_size as i64),
                        Some(*compressed),
                    ),
                };

            let sql = if replace {
                format!(
                    "UPDATE {} SET kind = $2, parent_id = $3, name = $4, placement = $5,
                        inline_payload = $6, blob_key = $7, blob_byte_length = $8,
                        blob_chunk_count = $9, blob_original_size = $10, blob_compressed = $11,
                        body = $12, created_at = $13, updated_at = $14
                     WHERE id = $1",
                    self.records_table()
                )
            } else {
                format!(
                    "INSERT INTO {} (id, kind, parent_id, name, placement, inline_payload,
                        blob_key, blob_byte_length, blob_chunk_count, blob_original_size,
                        blob_compressed, body, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
                    self.records_table()
                )
            };

            let rows = client
                .execute(
                    &sql,
                    &[
                        &record.id.as_str(),
                        &record.kind.as_str(),
                        &record.parent_id.as_ref().map(EntityId::as_str),
                        &record.name.as_deref(),
                        &placement,
                        &inline_payload,
                        &blob_key,
                        &blob_len,
                        &blob_chunks,
                        &blob_orig,
                        &blob_comp,
                        &record.body,
                        &(record.created_at as i64),
                        &(record.updated_at as i64),
                    ],
                )
                .await
                .map_err(|e| query_error(operation, e))?;

            if replace && rows == 0 {
                return Err(Error::NotFound {
                    kind: record.kind,
                    id: record.id.to_string(),
                });
            }
            Ok(())
        }

        async fn get_async(&self, id: &EntityId) -> Result<Option<MetadataRecord>> {
            let client = self
                .pool
                .get()
                .await
                .map_err(|e| pool_error("postgres_metadata_get", e))?;

            let sql = format!(
                "SELECT {} FROM {} WHERE id = $1",
                Self::RECORD_COLUMNS,
                self.records_table()
            );

            let row = client
                .query_opt(&sql, &[&id.as_str()])
                .await
                .map_err(|e| query_error("postgres_metadata_get", e))?;

            Ok(row.map(|r| Self::row_to_record(&r)))
        }

        async fn query_records_async(
            &self,
            operation: &'static str,
            sql: &str,
            params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        ) -> Result<Vec<MetadataRecord>> {
            let client = self.pool.get().await.map_err(|e| pool_error(operation, e))?;
            let rows = client
                .query(sql, params)
                .await
                .map_err(|e| query_error(operation, e))?;
            Ok(rows.iter().map(Self::row_to_record).collect())
        }

        async fn delete_record_async(&self, id: &EntityId) -> Result<bool> {
            let client = self
                .pool
                .get()
                .await
                .map_err(|e| pool_error("postgres_metadata_delete", e))?;
            let sql = format!("DELETE FROM {} WHERE id = $1", self.records_table());
            let rows = client
                .execute(&sql, &[&id.as_str()])
                .await
                .map_err(|e| query_error("postgres_metadata_delete", e))?;
            Ok(rows > 0)
        }
    }

    /// Metadata-adapter view over a shared [`PostgresStore`].
    pub struct PostgresMetadataStore {
        store: Arc<PostgresStore>,
    }

    impl MetadataStore for PostgresMetadataStore {
        fn insert(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()> {
            deadline.check("postgres_metadata_insert")?;
            let start = Instant::now();
            let result = self.store.block_on(self.store.write_record_async(
                "postgres_metadata_insert",
                record,
                false,
            ));
            let status = if result.is_ok() { "success" } else { "error" };
            record_operation_metrics("postgresql", "metadata_insert", start, status);
            result
        }

        fn get(&self, id: &EntityId, deadline: &Deadline) -> Result<Option<MetadataRecord>> {
            deadline.check("postgres_metadata_get")?;
            self.store.block_on(self.store.get_async(id))
        }

        fn list_by_parent(
            &self,
            kind: EntityKind,
            parent_id: &EntityId,
            deadline: &Deadline,
        ) -> Result<Vec<MetadataRecord>> {
            deadline.check("postgres_metadata_list_by_parent")?;
            let sql = format!(
                "SELECT {} FROM {} WHERE kind = $1 AND parent_id = $2 ORDER BY id",
                PostgresStore::RECORD_COLUMNS,
                self.store.records_table()
            );
            self.store.block_on(self.store.query_records_async(
                "postgres_metadata_list_by_parent",
                &sql,
                &[&kind.as_str(), &parent_id.as_str()],
            ))
        }

        fn list_by_kind(
            &self,
            kind: EntityKind,
            deadline: &Deadline,
        ) -> Result<Vec<MetadataRecord>> {
            deadline.check("postgres_metadata_list_by_kind")?;
            let sql = format!(
                "SELECT {} FROM {} WHERE kind = $1 ORDER BY id",
                PostgresStore::RECORD_COLUMNS,
                self.store.records_table()
            );
            self.store.block_on(self.store.query_records_async(
                "postgres_metadata_list_by_kind",
                &sql,
                &[&kind.as_str()],
            ))
        }

        fn find_by_name(
            &self,
            kind: EntityKind,
            parent_id: &EntityId,
            name: &str,
            deadline: &Deadline,
        ) -> Result<Option<MetadataRecord>> {
            deadline.check("postgres_metadata_find_by_name")?;
            let sql = format!(
                "SELECT {} FROM {} WHERE kind = $1 AND parent_id = $2 AND name = $3 LIMIT 1",
                PostgresStore::RECORD_COLUMNS,
                self.store.records_table()
            );
            let records = self.store.block_on(self.store.query_records_async(
                "postgres_metadata_find_by_name",
                &sql,
                &[&kind.as_str(), &parent_id.as_str(), &name],
            ))?;
            Ok(records.into_iter().next())
        }

        fn update(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()> {
            deadline.check("postgres_metadata_update")?;
            let start = Instant::now();
            let result = self.store.block_on(self.store.write_record_async(
                "postgres_metadata_update",
                record,
                true,
            ));
            let status = if result.is_ok() { "success" } else { "error" };
            record_operation_metrics("postgresql", "metadata_update", start, status);
            result
        }

        fn delete(&self, id: &EntityId, deadline: &Deadline) -> Result<bool> {
            deadline.check("postgres_metadata_delete")?;
            self.store.block_on(self.store.delete_record_async(id))
        }
    }

    /// Blob-adapter view over a shared [`PostgresStore`].
    pub struct PostgresBlobStore {
        store: Arc<PostgresStore>,
    }

    impl BlobStore for PostgresBlobStore {
        #[allow(clippy::cast_possible_wrap)]
        fn put(&self, payload: &[u8], deadline: &Deadline) -> Result<BlobRef> {
            deadline.check("postgres_blob_put")?;
            let start = Instant::now();
            let key = uuid::Uuid::new_v4().to_string();

            let result = self.store.block_on(async {
                let client = self
                    .store
                    .pool
                    .get()
                    .await
                    .map_err(|e| pool_error("postgres_blob_put", e))?;
                let sql = format!(
                    "INSERT INTO {} (key, byte_length, data) VALUES ($1, $2, $3)",
                    self.store.blobs_table()
                );
                client
                    .execute(&sql, &[&key, &(payload.len() as i64), &payload])
                    .await
                    .map_err(|e| query_error("postgres_blob_put", e))?;
                Ok(BlobRef::new(key.clone(), payload.len() as u64, 0))
            });

            let status = if result.is_ok() { "success" } else { "error" };
            record_operation_metrics("postgresql", "blob_put", start, status);
            result
        }

        fn get(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<Vec<u8>> {
            deadline.check("postgres_blob_get")?;
            let start = Instant::now();

            let result = self.store.block_on(async {
                let client = self
                    .store
                    .pool
                    .get()
                    .await
                    .map_err(|e| pool_error("postgres_blob_get", e))?;
                let sql = format!(
                    "SELECT byte_length, data FROM {} WHERE key = $1",
                    self.store.blobs_table()
                );
                let row = client
                    .query_opt(&sql, &[&blob_ref.key])
                    .await
                    .map_err(|e| query_error("postgres_blob_get", e))?;

                let Some(row) = row else {
                    return Err(Error::CorruptBlob {
                        key: blob_ref.key.clone(),
                        detail: "blob row missing".to_string(),
                    });
                };
                let byte_length: i64 = row.get(0);
                let data: Vec<u8> = row.get(1);
                if i64::try_from(data.len()).unwrap_or(i64::MAX) != byte_length {
                    return Err(Error::CorruptBlob {
                        key: blob_ref.key.clone(),
                        detail: format!("row holds {} bytes, expected {byte_length}", data.len()),
                    });
                }
                Ok(data)
            });

            let status = if result.is_ok() { "success" } else { "error" };
            record_operation_metrics("postgresql", "blob_get", start, status);
            result
        }

        fn delete(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<bool> {
            deadline.check("postgres_blob_delete")?;
            self.store.block_on(async {
                let client = self
                    .store
                    .pool
                    .get()
                    .await
                    .map_err(|e| pool_error("postgres_blob_delete", e))?;
                let sql = format!("DELETE FROM {} WHERE key = $1", self.store.blobs_table());
                let rows = client
                    .execute(&sql, &[&blob_ref.key])
                    .await
                    .map_err(|e| query_error("postgres_blob_delete", e))?;
                Ok(rows > 0)
            })
        }

        fn list_keys(&self, deadline: &Deadline) -> Result<Vec<String>> {
            deadline.check("postgres_blob_list_keys")?;
            self.store.block_on(async {
                let client = self
                    .store
                    .pool
                    .get()
                    .await
                    .map_err(|e| pool_error("postgres_blob_list_keys", e))?;
                let sql = format!("SELECT key FROM {} ORDER BY key", self.store.blobs_table());
                let rows = client
                    .query(&sql, &[])
                    .await
                    .map_err(|e| query_error("postgres_blob_list_keys", e))?;
                Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
            })
        }
    }
}

#[cfg(feature = "postgres")]
pub use implementation::{PostgresBlobStore, PostgresMetadataStore, PostgresStore};

#[cfg(not(feature = "postgres"))]
mod stub {
    use crate::models::{BlobRef, EntityId, EntityKind, MetadataRecord};
    use crate::storage::Deadline;
    use crate::storage::traits::{BlobStore, MetadataStore};
    use crate::{Error, Result};

    /// Stub PostgreSQL store when the feature is not enabled.
    pub struct PostgresStore {
        connection_url: String,
        table_prefix: String,
    }

    impl PostgresStore {
        /// Creates a stub store (always succeeds; operations fail).
        ///
        /// # Errors
        ///
        /// Never fails in the stub; kept fallible for signature parity with
        /// the real backend.
        pub fn new(connection_url: &str, table_prefix: impl Into<String>) -> Result<Self> {
            Ok(Self {
                connection_url: connection_url.to_string(),
                table_prefix: table_prefix.into(),
            })
        }

        /// Creates a stub store; the pool size is ignored without the
        /// `postgres` feature.
        ///
        /// # Errors
        ///
        /// Never fails in the stub.
        pub fn with_pool_size(
            connection_url: &str,
            table_prefix: impl Into<String>,
            _pool_max_size: Option<usize>,
        ) -> Result<Self> {
            Self::new(connection_url, table_prefix)
        }

        /// Splits the stub store into its adapter pair.
        #[must_use]
        pub fn into_pair(self) -> (PostgresMetadataStore, PostgresBlobStore) {
            let detail = format!("{} (prefix {})", self.connection_url, self.table_prefix);
            (
                PostgresMetadataStore {
                    detail: detail.clone(),
                },
                PostgresBlobStore { detail },
            )
        }
    }

    /// Stub metadata adapter.
    pub struct PostgresMetadataStore {
        detail: String,
    }

    impl PostgresMetadataStore {
        fn not_implemented(&self, what: &str) -> Error {
            Error::NotImplemented(format!("PostgresMetadataStore::{what} against {}", self.detail))
        }
    }

    impl MetadataStore for PostgresMetadataStore {
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

    /// Stub blob adapter.
    pub struct PostgresBlobStore {
        detail: String,
    }

    impl PostgresBlobStore {
        fn not_implemented(&self, what: &str) -> Error {
            Error::NotImplemented(format!("PostgresBlobStore::{what} against {}", self.detail))
        }
    }

    impl BlobStore for PostgresBlobStore {
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

#[cfg(not(feature = "postgres"))]
pub use stub::{PostgresBlobStore, PostgresMetadataStore, PostgresStore};


#[cfg(all(test, not(feature = "postgres")))]
mod stub_tests {
    use super::*;
    use crate::Error;
    use crate::models::EntityId;
    use crate::storage::Deadline;
    use crate::storage::traits::{BlobStore, MetadataStore};

    #[test]
    fn test_stub_returns_not_implemented() {
        let (metadata, blobs) = PostgresStore::new("postgresql://localhost/artifacts", "artifacts")
            .unwrap()
            .into_pair();

        let result = metadata.get(&EntityId::new("x"), &Deadline::none());
        assert!(matches!(result, Err(Error::NotImplemented(_))));

        let result = blobs.put(b"abc", &Deadline::none());
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }
}
