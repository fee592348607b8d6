//! Backend factory: constructs and owns the active backend pair.
//!
//! The active backend is the one piece of genuinely shared mutable state in
//! this subsystem. Reads go through a read-mostly `RwLock<Arc<Backend>>`;
//! switches serialize on a dedicated mutex and follow construct-then-publish:
//! the incoming backend is fully built and verified (pool opened, migrations
//! run, connectivity checked by its constructor) before the handle flips.
//! The outgoing backend's resources close when the last in-flight operation
//! drops its `Arc`, never underneath a running operation.
//!
//! Switching never migrates data. Artifacts written under one family remain
//! retrievable only while that family (or a reconnect to the same physical
//! store) is configured; this is documented behavior, not a defect.

use crate::config::{DocumentEngine, RelationalEngine, StoreConfig};
use crate::storage::document::{MemoryChunkStore, MemoryMetadataStore, RedisChunkStore, RedisMetadataStore};
use crate::storage::relational::{PostgresStore, SqliteStore};
use crate::storage::{Backend, BackendKind};
use crate::{Error, Result};
use std::sync::{Arc, Mutex, RwLock};

/// Owns the active [`Backend`] and performs atomic switches between
/// families.
pub struct BackendFactory {
    config: StoreConfig,
    current: RwLock<Arc<Backend>>,
    /// Serializes `switch`; the RwLock alone would let two switches
    /// interleave construct and publish.
    switch_lock: Mutex<()>,
}

impl BackendFactory {
    /// Builds the factory with the configured default backend active.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent or the initial
    /// backend fails to construct.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let initial = Self::build(config.default_backend, &config)?;
        Ok(Self {
            config,
            current: RwLock::new(Arc::new(initial)),
            switch_lock: Mutex::new(()),
        })
    }

    /// The configuration backends are built from.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The currently active backend.
    ///
    /// The returned `Arc` pins the backend's resources for the duration of
    /// the operation, so a concurrent switch cannot close them mid-use.
    #[must_use]
    pub fn current(&self) -> Arc<Backend> {
        self.current
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    /// The family of the currently active backend.
    #[must_use]
    pub fn current_kind(&self) -> BackendKind {
        self.current().kind()
    }

    /// Switches the active backend to the given family.
    ///
    /// Construct-then-publish: the new backend is fully initialized before
    /// the handle flips, and the operation is a no-op when the family is
    /// already active. On construction failure the previous backend stays
    /// published and untouched.
    ///
    /// # Errors
    ///
    /// Returns the construction error of the incoming backend; the active
    /// backend is unchanged in that case.
    pub fn switch(&self, kind: BackendKind) -> Result<()> {
        let _serialized = self
            .switch_lock
            .lock()
            .map_err(|_| Error::Connection {
                operation: "backend_switch".to_string(),
                cause: "switch lock poisoned".to_string(),
            })?;

        if self.current_kind() == kind {
            return Ok(());
        }

        let replacement = Self::build(kind, &self.config)?;

        let mut guard = self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, Arc::new(replacement));
        drop(guard);

        tracing::info!(from = %previous.kind(), to = %kind, "Switched active backend");
        // `previous` drops here; its pools close once in-flight operations
        // release their clones.
        Ok(())
    }

    /// Constructs a backend pair for the given family from configuration.
    fn build(kind: BackendKind, config: &StoreConfig) -> Result<Backend> {
        match kind {
            BackendKind::Document => Self::build_document(config),
            BackendKind::Relational => Self::build_relational(config),
        }
    }

    fn build_document(config: &StoreConfig) -> Result<Backend> {
        match config.document.engine {
            DocumentEngine::Memory => Ok(Backend::new(
                BackendKind::Document,
                Arc::new(MemoryMetadataStore::new()),
                Arc::new(MemoryChunkStore::new(config.chunk_size)),
            )),
            DocumentEngine::Redis => {
                if !cfg!(feature = "redis") {
                    return Err(Error::FeatureNotEnabled("redis".to_string()));
                }
                let metadata = RedisMetadataStore::new(
                    &config.document.redis_url,
                    config.document.key_prefix.clone(),
                )?;
                let blobs = RedisChunkStore::new(
                    &config.document.redis_url,
                    config.document.key_prefix.clone(),
                    config.chunk_size,
                )?;
                Ok(Backend::new(
                    BackendKind::Document,
                    Arc::new(metadata),
                    Arc::new(blobs),
                ))
            },
        }
    }

    fn build_relational(config: &StoreConfig) -> Result<Backend> {
        match config.relational.engine {
            RelationalEngine::Sqlite => {
                let (metadata, blobs) =
                    SqliteStore::new(&config.relational.sqlite_path)?.into_pair();
                Ok(Backend::new(
                    BackendKind::Relational,
                    Arc::new(metadata),
                    Arc::new(blobs),
                ))
            },
            RelationalEngine::Postgres => {
                if !cfg!(feature = "postgres") {
                    return Err(Error::FeatureNotEnabled("postgres".to_string()));
                }
                let (metadata, blobs) = PostgresStore::with_pool_size(
                    &config.relational.postgres_url,
                    config.relational.table_prefix.clone(),
                    config.relational.pool_max_size,
                )?
                .into_pair();
                Ok(Backend::new(
                    BackendKind::Relational,
                    Arc::new(metadata),
                    Arc::new(blobs),
                ))
            },
        }
    }
}
