//! Configuration management.
//!
//! Thresholds, chunk size, preview bounds, engine selection and connection
//! settings are all deployment configuration, never hard-coded. Values come
//! from defaults, an optional TOML file, and `LODESTORE_*` environment
//! overrides, in that order. Parsing and validating the *contents* of
//! connection URLs (hosts, credentials) is out of scope here; they are passed
//! through to the drivers untouched.

use crate::storage::{BackendKind, DEFAULT_CHUNK_SIZE, PlacementPolicy};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Engine selection within the document family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentEngine {
    /// In-process store; fast, non-persistent.
    #[default]
    Memory,
    /// Redis (requires the `redis` feature).
    Redis,
}

impl DocumentEngine {
    /// Parses an engine string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "redis" => Self::Redis,
            _ => Self::Memory,
        }
    }
}

/// Engine selection within the relational family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationalEngine {
    /// Embedded `SQLite`; zero configuration.
    #[default]
    Sqlite,
    /// PostgreSQL (requires the `postgres` feature).
    Postgres,
}

impl RelationalEngine {
    /// Parses an engine string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Self::Postgres,
            _ => Self::Sqlite,
        }
    }
}

/// Document family settings.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Which engine backs the family.
    pub engine: DocumentEngine,
    /// Redis connection URL.
    pub redis_url: String,
    /// Key prefix isolating this deployment's keys.
    pub key_prefix: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            engine: DocumentEngine::default(),
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "lodestore".to_string(),
        }
    }
}

/// Relational family settings.
#[derive(Debug, Clone)]
pub struct RelationalConfig {
    /// Which engine backs the family.
    pub engine: RelationalEngine,
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// PostgreSQL connection URL.
    pub postgres_url: String,
    /// Prefix for the records/blobs tables.
    pub table_prefix: String,
    /// Maximum connections in the PostgreSQL pool (None for the driver
    /// default of 20).
    pub pool_max_size: Option<usize>,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            engine: RelationalEngine::default(),
            sqlite_path: PathBuf::from("artifacts.db"),
            postgres_url: "postgresql://localhost/lodestore".to_string(),
            table_prefix: "artifacts".to_string(),
            pool_max_size: None,
        }
    }
}

/// Main configuration for the artifact store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// The backend family active at startup.
    pub default_backend: BackendKind,
    /// Inline/compression thresholds.
    pub placement: PlacementPolicy,
    /// Chunk size for the document family's object store, in bytes.
    pub chunk_size: usize,
    /// Maximum rows in a dataset preview.
    pub preview_rows: usize,
    /// Maximum total bytes in a dataset preview. Must stay below the inline
    /// threshold so previews are always inline-eligible.
    pub preview_max_bytes: usize,
    /// Document family settings.
    pub document: DocumentConfig,
    /// Relational family settings.
    pub relational: RelationalConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_backend: BackendKind::Relational,
            placement: PlacementPolicy::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            preview_rows: 20,
            preview_max_bytes: 16 * 1024,
            document: DocumentConfig::default(),
            relational: RelationalConfig::default(),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Backend family: "document" or "relational".
    pub backend: Option<String>,
    /// Inline threshold in bytes.
    pub inline_threshold: Option<usize>,
    /// Compress threshold in bytes.
    pub compress_threshold: Option<usize>,
    /// Chunk size in bytes.
    pub chunk_size: Option<usize>,
    /// Preview row bound.
    pub preview_rows: Option<usize>,
    /// Preview byte bound.
    pub preview_max_bytes: Option<usize>,
    /// Document family section.
    pub document: Option<ConfigFileDocument>,
    /// Relational family section.
    pub relational: Option<ConfigFileRelational>,
}

/// Document section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDocument {
    /// Engine: "memory" or "redis".
    pub engine: Option<String>,
    /// Redis connection URL.
    pub redis_url: Option<String>,
    /// Key prefix.
    pub key_prefix: Option<String>,
}

/// Relational section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRelational {
    /// Engine: "sqlite" or "postgres".
    pub engine: Option<String>,
    /// `SQLite` database path.
    pub sqlite_path: Option<String>,
    /// PostgreSQL connection URL.
    pub postgres_url: Option<String>,
    /// Table prefix.
    pub table_prefix: Option<String>,
    /// Maximum pool size.
    pub pool_max_size: Option<usize>,
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::InvalidInput(format!(
            "cannot read config file {}: {e}",
            path.display()
        )))?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
            Error::InvalidInput(format!("cannot parse config file {}: {e}", path.display()))
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Converts a [`ConfigFile`] into a full configuration over defaults.
    #[must_use]
    pub fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(backend) = file.backend {
            config.default_backend = BackendKind::parse(&backend);
        }
        if let Some(v) = file.inline_threshold {
            config.placement.inline_threshold = v;
        }
        if let Some(v) = file.compress_threshold {
            config.placement.compress_threshold = v;
        }
        if let Some(v) = file.chunk_size {
            config.chunk_size = v;
        }
        if let Some(v) = file.preview_rows {
            config.preview_rows = v;
        }
        if let Some(v) = file.preview_max_bytes {
            config.preview_max_bytes = v;
        }
        if let Some(document) = file.document {
            if let Some(engine) = document.engine {
                config.document.engine = DocumentEngine::parse(&engine);
            }
            if let Some(url) = document.redis_url {
                config.document.redis_url = url;
            }
            if let Some(prefix) = document.key_prefix {
                config.document.key_prefix = prefix;
            }
        }
        if let Some(relational) = file.relational {
            if let Some(engine) = relational.engine {
                config.relational.engine = RelationalEngine::parse(&engine);
            }
            if let Some(path) = relational.sqlite_path {
                config.relational.sqlite_path = PathBuf::from(path);
            }
            if let Some(url) = relational.postgres_url {
                config.relational.postgres_url = url;
            }
            if let Some(prefix) = relational.table_prefix {
                config.relational.table_prefix = prefix;
            }
            if relational.pool_max_size.is_some() {
                config.relational.pool_max_size = relational.pool_max_size;
            }
        }

        config
    }

    /// Applies `LODESTORE_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("LODESTORE_BACKEND") {
            self.default_backend = BackendKind::parse(&v);
        }
        if let Ok(v) = std::env::var("LODESTORE_INLINE_THRESHOLD") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.placement.inline_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("LODESTORE_COMPRESS_THRESHOLD") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.placement.compress_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("LODESTORE_CHUNK_SIZE") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.chunk_size = parsed.max(1);
            }
        }
        if let Ok(v) = std::env::var("LODESTORE_SQLITE_PATH") {
            self.relational.sqlite_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LODESTORE_POSTGRES_URL") {
            self.relational.postgres_url = v;
        }
        if let Ok(v) = std::env::var("LODESTORE_REDIS_URL") {
            self.document.redis_url = v;
        }
        if let Ok(v) = std::env::var("LODESTORE_POOL_MAX_SIZE") {
            if let Ok(parsed) = v.parse::<usize>() {
                self.relational.pool_max_size = Some(parsed.max(1));
            }
        }
        self
    }

    /// Validates internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the preview byte bound is not
    /// below the inline threshold, or the chunk size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.preview_max_bytes >= self.placement.inline_threshold {
            return Err(Error::InvalidInput(format!(
                "preview_max_bytes ({}) must stay below inline_threshold ({})",
                self.preview_max_bytes, self.placement.inline_threshold
            )));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidInput("chunk_size must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Sets the placement thresholds.
    #[must_use]
    pub const fn with_placement(mut self, placement: PlacementPolicy) -> Self {
        self.placement = placement;
        self
    }

    /// Sets the startup backend family.
    #[must_use]
    pub const fn with_default_backend(mut self, kind: BackendKind) -> Self {
        self.default_backend = kind;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StoreConfig::default();
        config.validate().unwrap();
        assert_eq!(config.default_backend, BackendKind::Relational);
        assert_eq!(config.relational.engine, RelationalEngine::Sqlite);
        assert_eq!(config.document.engine, DocumentEngine::Memory);
    }

    #[test]
    fn test_from_config_file_merges_over_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            backend = "document"
            inline_threshold = 4096
            compress_threshold = 8192

            [document]
            engine = "redis"
            redis_url = "redis://cache:6379"

            [relational]
            engine = "postgres"
            pool_max_size = 8
            "#,
        )
        .unwrap();

        let config = StoreConfig::from_config_file(file);
        assert_eq!(config.default_backend, BackendKind::Document);
        assert_eq!(config.placement.inline_threshold, 4096);
        assert_eq!(config.placement.compress_threshold, 8192);
        assert_eq!(config.document.engine, DocumentEngine::Redis);
        assert_eq!(config.document.redis_url, "redis://cache:6379");
        assert_eq!(config.relational.engine, RelationalEngine::Postgres);
        assert_eq!(config.relational.pool_max_size, Some(8));
        // Untouched fields keep defaults.
        assert_eq!(config.relational.table_prefix, "artifacts");
    }

    #[test]
    fn test_validate_rejects_preview_above_inline_threshold() {
        let mut config = StoreConfig::default();
        config.preview_max_bytes = config.placement.inline_threshold;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let config = StoreConfig {
            chunk_size: 0,
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_parsing() {
        assert_eq!(DocumentEngine::parse("REDIS"), DocumentEngine::Redis);
        assert_eq!(DocumentEngine::parse("anything"), DocumentEngine::Memory);
        assert_eq!(RelationalEngine::parse("postgresql"), RelationalEngine::Postgres);
        assert_eq!(RelationalEngine::parse("sqlite"), RelationalEngine::Sqlite);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "inline_threshold = 123456\n").unwrap();

        let config = StoreConfig::load_from_file(&path).unwrap();
        assert_eq!(config.placement.inline_threshold, 123_456);

        assert!(StoreConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
    }
}
