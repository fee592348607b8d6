//! `SQLite` rendition of the relational family.
//!
//! One database file holds two tables: `artifact_records` maps the metadata
//! record onto typed columns (placement discriminator plus nullable
//! payload/blob-ref columns, kind-specific fields as a JSON column), and
//! `artifact_blobs` stores each offloaded payload monolithically in a single
//! BLOB row, with no chunking since the column type has no practical size
//! ceiling at the payload sizes the placement thresholds imply.
//!
//! The two adapter views ([`SqliteMetadataStore`], [`SqliteBlobStore`]) share
//! one [`SqliteStore`] so records and blobs live in the same database file.
//!
//! # Concurrency Model
//!
//! A `Mutex<Connection>` serializes statements; WAL mode and `busy_timeout`
//! keep concurrent callers from failing under contention.

use super::connection::{acquire_lock, configure_connection};
use crate::models::{BlobRef, EntityId, EntityKind, MetadataRecord, Placement};
use crate::storage::Deadline;
use crate::storage::metrics::record_operation_metrics;
use crate::storage::traits::{BlobStore, MetadataStore};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::instrument;

/// Maps a rusqlite error into the taxonomy.
fn sqlite_error(operation: &str, e: &rusqlite::Error) -> Error {
    Error::Connection {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

/// Shared `SQLite` relational-family store.
///
/// Holds the connection and both tables; wrap it in the two adapter views to
/// plug it into a backend pair.
pub struct SqliteStore {
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) a database file and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the database cannot be opened or the
    /// schema cannot be created.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| sqlite_error("open_sqlite", &e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if initialization fails.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| sqlite_error("open_sqlite_in_memory", &e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Splits a shared store into its adapter pair.
    #[must_use]
    pub fn into_pair(self) -> (SqliteMetadataStore, SqliteBlobStore) {
        let store = Arc::new(self);
        (
            SqliteMetadataStore {
                store: Arc::clone(&store),
            },
            SqliteBlobStore { store },
        )
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Initializes the schema.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS artifact_records (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                parent_id TEXT,
                name TEXT,
                placement TEXT,
                inline_payload BLOB,
                blob_key TEXT,
                blob_byte_length INTEGER,
                blob_chunk_count INTEGER,
                blob_original_size INTEGER,
                blob_compressed INTEGER,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| sqlite_error("create_records_table", &e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS artifact_blobs (
                key TEXT PRIMARY KEY,
                byte_length INTEGER NOT NULL,
                data BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| sqlite_error("create_blobs_table", &e))?;

        Self::create_indexes(&conn);
        Ok(())
    }

    /// Creates indexes for the common query patterns.
    fn create_indexes(conn: &Connection) {
        // Cascade collection and listings filter on (kind, parent_id).
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_kind_parent
             ON artifact_records(kind, parent_id)",
            [],
        );
        // Workspace overwrite key lookup.
        let _ = conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_kind_parent_name
             ON artifact_records(kind, parent_id, name)",
            [],
        );
    }

    /// Converts a database row to a metadata record.
    #[allow(clippy::cast_sign_loss)]
    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<MetadataRecord> {
        let id: String = row.get("id")?;
        let kind_str: String = row.get("kind")?;
        let parent_id: Option<String> = row.get("parent_id")?;
        let name: Option<String> = row.get("name")?;
        let placement_str: Option<String> = row.get("placement")?;
        let inline_payload: Option<Vec<u8>> = row.get("inline_payload")?;
        let blob_key: Option<String> = row.get("blob_key")?;
        let blob_byte_length: Option<i64> = row.get("blob_byte_length")?;
        let blob_chunk_count: Option<i64> = row.get("blob_chunk_count")?;
        let blob_original_size: Option<i64> = row.get("blob_original_size")?;
        let blob_compressed: Option<bool> = row.get("blob_compressed")?;
        let body_str: String = row.get("body")?;
        let created_at: i64 = row.get("created_at")?;
        let updated_at: i64 = row.get("updated_at")?;

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
        let body = serde_json::from_str(&body_str).unwrap_or(serde_json::Value::Null);

        Ok(MetadataRecord {
            id: EntityId::new(id),
            kind,
            parent_id: parent_id.map(EntityId::new),
            name,
            placement,
            body,
            created_at: created_at as u64,
            updated_at: updated_at as u64,
        })
    }

    /// Column values for the placement union: discriminator plus the
    /// nullable payload/blob-ref columns.
    #[allow(clippy::type_complexity, clippy::cast_possible_wrap)]
    fn placement_columns(
        record: &MetadataRecord,
    ) -> (
        Option<&'static str>,
        Option<&[u8]>,
        Option<&str>,
        Option<i64>,
        Option<i64>,
        Option<i64>,
        Option<bool>,
    ) {
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
                Some(i64::from(blob_ref.chunk_count)),
                Some(*original_size as i64),
                Some(*compressed),
            ),
        }
    }

    /// INSERT or full UPDATE of a record row.
    #[allow(clippy::cast_possible_wrap)]
    fn write_record(
        &self,
        operation: &'static str,
        record: &MetadataRecord,
        replace: bool,
    ) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        let (placement, inline_payload, blob_key, blob_len, blob_chunks, blob_orig, blob_comp) =
            Self::placement_columns(record);
        let body = serde_json::to_string(&record.body).map_err(|e| {
            Error::InvalidInput(format!("record '{}' failed to serialize: {e}", record.id))
        })?;

        let sql = if replace {
            "UPDATE artifact_records SET kind = ?2, parent_id = ?3, name = ?4, placement = ?5,
                inline_payload = ?6, blob_key = ?7, blob_byte_length = ?8, blob_chunk_count = ?9,
                blob_original_size = ?10, blob_compressed = ?11, body = ?12, created_at = ?13,
                updated_at = ?14
             WHERE id = ?1"
        } else {
            "INSERT INTO artifact_records (id, kind, parent_id, name, placement, inline_payload,
                blob_key, blob_byte_length, blob_chunk_count, blob_original_size, blob_compressed,
                body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        };

        let rows = conn
            .execute(
                sql,
                params![
                    record.id.as_str(),
                    record.kind.as_str(),
                    record.parent_id.as_ref().map(EntityId::as_str),
                    record.name.as_deref(),
                    placement,
                    inline_payload,
                    blob_key,
                    blob_len,
                    blob_chunks,
                    blob_orig,
                    blob_comp,
                    body,
                    record.created_at as i64,
                    record.updated_at as i64,
                ],
            )
            .map_err(|e| sqlite_error(operation, &e))?;

        if replace && rows == 0 {
            return Err(Error::NotFound {
                kind: record.kind,
                id: record.id.to_string(),
            });
        }
        Ok(())
    }

    const RECORD_COLUMNS: &'static str = "id, kind, parent_id, name, placement, inline_payload,
        blob_key, blob_byte_length, blob_chunk_count, blob_original_size, blob_compressed,
        body, created_at, updated_at";

    fn get_record(&self, id: &EntityId) -> Result<Option<MetadataRecord>> {
        let conn = acquire_lock(&self.conn);
        let sql = format!(
            "SELECT {} FROM artifact_records WHERE id = ?1",
            Self::RECORD_COLUMNS
        );
        conn.query_row(&sql, params![id.as_str()], |row| Self::row_to_record(row))
            .optional()
            .map_err(|e| sqlite_error("sqlite_metadata_get", &e))
    }

    fn query_records(
        &self,
        operation: &'static str,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<MetadataRecord>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn.prepare(sql).map_err(|e| sqlite_error(operation, &e))?;
        let rows = stmt
            .query_map(args, |row| Self::row_to_record(row))
            .map_err(|e| sqlite_error(operation, &e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| sqlite_error(operation, &e))
    }
}

/// Metadata-adapter view over a shared [`SqliteStore`].
pub struct SqliteMetadataStore {
    store: Arc<SqliteStore>,
}

impl MetadataStore for SqliteMetadataStore {
    #[instrument(skip(self, record, deadline), fields(operation = "metadata_insert", backend = "sqlite", record.id = %record.id.as_str()))]
    fn insert(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()> {
        deadline.check("sqlite_metadata_insert")?;
        let start = Instant::now();
        let result = self
            .store
            .write_record("sqlite_metadata_insert", record, false);
        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("sqlite", "metadata_insert", start, status);
        result
    }

    #[instrument(skip(self, deadline), fields(operation = "metadata_get", backend = "sqlite", record.id = %id.as_str()))]
    fn get(&self, id: &EntityId, deadline: &Deadline) -> Result<Option<MetadataRecord>> {
        deadline.check("sqlite_metadata_get")?;
        self.store.get_record(id)
    }

    fn list_by_parent(
        &self,
        kind: EntityKind,
        parent_id: &EntityId,
        deadline: &Deadline,
    ) -> Result<Vec<MetadataRecord>> {
        deadline.check("sqlite_metadata_list_by_parent")?;
        let sql = format!(
            "SELECT {} FROM artifact_records WHERE kind = ?1 AND parent_id = ?2 ORDER BY id",
            SqliteStore::RECORD_COLUMNS
        );
        self.store.query_records(
            "sqlite_metadata_list_by_parent",
            &sql,
            &[&kind.as_str(), &parent_id.as_str()],
        )
    }

    fn list_by_kind(&self, kind: EntityKind, deadline: &Deadline) -> Result<Vec<MetadataRecord>> {
        deadline.check("sqlite_metadata_list_by_kind")?;
        let sql = format!(
            "SELECT {} FROM artifact_records WHERE kind = ?1 ORDER BY id",
            SqliteStore::RECORD_COLUMNS
        );
        self.store
            .query_records("sqlite_metadata_list_by_kind", &sql, &[&kind.as_str()])
    }

    fn find_by_name(
        &self,
        kind: EntityKind,
        parent_id: &EntityId,
        name: &str,
        deadline: &Deadline,
    ) -> Result<Option<MetadataRecord>> {
        deadline.check("sqlite_metadata_find_by_name")?;
        let conn = acquire_lock(&self.store.conn);
        let sql = format!(
            "SELECT {} FROM artifact_records
             WHERE kind = ?1 AND parent_id = ?2 AND name = ?3 LIMIT 1",
            SqliteStore::RECORD_COLUMNS
        );
        conn.query_row(
            &sql,
            params![kind.as_str(), parent_id.as_str(), name],
            |row| SqliteStore::row_to_record(row),
        )
        .optional()
        .map_err(|e| sqlite_error("sqlite_metadata_find_by_name", &e))
    }

    fn update(&self, record: &MetadataRecord, deadline: &Deadline) -> Result<()> {
        deadline.check("sqlite_metadata_update")?;
        let start = Instant::now();
        let result = self
            .store
            .write_record("sqlite_metadata_update", record, true);
        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("sqlite", "metadata_update", start, status);
        result
    }

    #[instrument(skip(self, deadline), fields(operation = "metadata_delete", backend = "sqlite", record.id = %id.as_str()))]
    fn delete(&self, id: &EntityId, deadline: &Deadline) -> Result<bool> {
        deadline.check("sqlite_metadata_delete")?;
        let conn = acquire_lock(&self.store.conn);
        let rows = conn
            .execute(
                "DELETE FROM artifact_records WHERE id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| sqlite_error("sqlite_metadata_delete", &e))?;
        Ok(rows > 0)
    }
}

/// Blob-adapter view over a shared [`SqliteStore`].
pub struct SqliteBlobStore {
    store: Arc<SqliteStore>,
}

impl BlobStore for SqliteBlobStore {
    #[instrument(skip(self, payload, deadline), fields(operation = "blob_put", backend = "sqlite", payload.len = payload.len()))]
    #[allow(clippy::cast_possible_wrap)]
    fn put(&self, payload: &[u8], deadline: &Deadline) -> Result<BlobRef> {
        deadline.check("sqlite_blob_put")?;
        let start = Instant::now();
        let key = uuid::Uuid::new_v4().to_string();

        let result = (|| {
            let conn = acquire_lock(&self.store.conn);
            conn.execute(
                "INSERT INTO artifact_blobs (key, byte_length, data) VALUES (?1, ?2, ?3)",
                params![key, payload.len() as i64, payload],
            )
            .map_err(|e| sqlite_error("sqlite_blob_put", &e))?;
            // Monolithic row: chunk_count 0 by convention.
            Ok(BlobRef::new(key.clone(), payload.len() as u64, 0))
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("sqlite", "blob_put", start, status);
        result
    }

    #[instrument(skip(self, deadline), fields(operation = "blob_get", backend = "sqlite", blob.key = %blob_ref.key))]
    fn get(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<Vec<u8>> {
        deadline.check("sqlite_blob_get")?;
        let start = Instant::now();

        let result = (|| {
            let conn = acquire_lock(&self.store.conn);
            let row: Option<(i64, Vec<u8>)> = conn
                .query_row(
                    "SELECT byte_length, data FROM artifact_blobs WHERE key = ?1",
                    params![blob_ref.key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(|e| sqlite_error("sqlite_blob_get", &e))?;

            let Some((byte_length, data)) = row else {
                return Err(Error::CorruptBlob {
                    key: blob_ref.key.clone(),
                    detail: "blob row missing".to_string(),
                });
            };
            if i64::try_from(data.len()).unwrap_or(i64::MAX) != byte_length {
                return Err(Error::CorruptBlob {
                    key: blob_ref.key.clone(),
                    detail: format!("row holds {} bytes, expected {byte_length}", data.len()),
                });
            }
            Ok(data)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("sqlite", "blob_get", start, status);
        result
    }

    fn delete(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<bool> {
        deadline.check("sqlite_blob_delete")?;
        let conn = acquire_lock(&self.store.conn);
        let rows = conn
            .execute(
                "DELETE FROM artifact_blobs WHERE key = ?1",
                params![blob_ref.key],
            )
            .map_err(|e| sqlite_error("sqlite_blob_delete", &e))?;
        Ok(rows > 0)
    }

    fn list_keys(&self, deadline: &Deadline) -> Result<Vec<String>> {
        deadline.check("sqlite_blob_list_keys")?;
        let conn = acquire_lock(&self.store.conn);
        let mut stmt = conn
            .prepare("SELECT key FROM artifact_blobs ORDER BY key")
            .map_err(|e| sqlite_error("sqlite_blob_list_keys", &e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| sqlite_error("sqlite_blob_list_keys", &e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| sqlite_error("sqlite_blob_list_keys", &e))
    }
}
