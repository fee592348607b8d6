//! # Lodestore
//!
//! Polymorphic persistence layer for large analysis artifacts.
//!
//! Lodestore stores and retrieves raw datasets and saved analysis workspaces
//! across interchangeable backend families without ever hitting a backend's
//! single-document or row size limit:
//!
//! - **Document family**: flexible JSON records plus a companion chunked
//!   object store (in-process or Redis)
//! - **Relational family**: typed/JSON columns plus binary-large-object rows
//!   (`SQLite` or PostgreSQL)
//!
//! Payloads are routed per size: small ones land inline next to their
//! metadata record, large ones are offloaded to blob storage, optionally
//! zstd-compressed first. Deleting a dataset cascades over every workspace,
//! training record and feedback record that references it, blobs included.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lodestore::{ArtifactRepository, BackendFactory, StoreConfig};
//! use lodestore::storage::Deadline;
//!
//! let factory = BackendFactory::new(StoreConfig::default())?;
//! let repo = ArtifactRepository::new(factory.into());
//! let dataset = repo.save_dataset("trips", schema, &payload, &Deadline::none())?;
//! let (bytes, _) = repo.load_dataset(&dataset.id, &Deadline::none())?;
//! assert_eq!(bytes, payload);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod models;
pub mod repository;
pub mod storage;

// Re-exports for convenience
pub use config::{DocumentEngine, RelationalEngine, StoreConfig};
pub use models::{
    BlobRef, ColumnDef, Dataset, EntityId, EntityKind, FeedbackRecord, MetadataRecord, Placement,
    TrainingRecord, Workspace, WorkspaceSummary,
};
pub use repository::ArtifactRepository;
pub use storage::{
    Backend, BackendFactory, BackendKind, BlobStore, Deadline, MetadataStore, PlacementDecision,
    PlacementPolicy,
};

/// Error type for lodestore operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
/// Backend-native error types (rusqlite, tokio-postgres, redis, zstd) are
/// wrapped into this taxonomy at the adapter layer; callers never see them.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Connection` | Pool acquisition, connect, or query against a physical store fails (transient; caller may retry with backoff, this layer never retries internally) |
/// | `NotFound` | An entity id has no record in the active backend |
/// | `Reference` | A child entity names a parent dataset that does not exist |
/// | `CorruptBlob` | A chunk is missing or out of sequence, a blob parent record is gone, or decompression fails on stored bytes |
/// | `OrphanedBlob` | The audit pass found a blob no record references (never raised during normal operations) |
/// | `PartialWrite` | A blob was written, the metadata write failed, and post-failure cleanup of the blob also failed |
/// | `Codec` | Compression or decompression of a payload failed |
/// | `Cancelled` | The caller-supplied deadline expired or its cancellation flag was set |
/// | `InvalidInput` | Malformed arguments, undecodable record bodies, duplicate feedback keys |
/// | `NotImplemented` | A stub backend compiled without its feature was invoked |
/// | `FeatureNotEnabled` | Configuration selects a backend whose feature flag is off |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A connection-level failure against the physical store.
    ///
    /// Transient by contract: the caller may retry with backoff. This layer
    /// does not retry internally and never falls back to another backend.
    #[error("connection failure during '{operation}': {cause}")]
    Connection {
        /// The operation that failed.
        operation: String,
        /// The underlying driver error, stringified.
        cause: String,
    },

    /// No record exists for the given entity id.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// The entity kind that was looked up.
        kind: models::EntityKind,
        /// The id that had no record.
        id: String,
    },

    /// A child entity references a parent dataset that does not exist.
    ///
    /// Raised at creation time, e.g. saving a workspace against a deleted
    /// dataset id.
    #[error("{kind} references missing dataset '{dataset_id}'")]
    Reference {
        /// The kind of the entity being created.
        kind: models::EntityKind,
        /// The dataset id that has no record.
        dataset_id: String,
    },

    /// Stored blob bytes cannot be reconstructed.
    ///
    /// Raised when:
    /// - A chunk is missing or arrives out of sequence order
    /// - The blob parent record is gone while a metadata record still points at it
    /// - Decompression of stored bytes fails
    ///
    /// Fatal to the operation; never silently tolerated.
    #[error("corrupt blob '{key}': {detail}")]
    CorruptBlob {
        /// The backend-opaque blob key.
        key: String,
        /// What failed during reconstruction.
        detail: String,
    },

    /// A blob object exists with no metadata record referencing it.
    ///
    /// Only constructed by the out-of-band audit pass
    /// ([`ArtifactRepository::sweep_orphans`](repository::ArtifactRepository::sweep_orphans));
    /// normal save/load/delete paths never raise it.
    #[error("orphaned blob '{key}' has no owning record")]
    OrphanedBlob {
        /// The unreferenced blob key.
        key: String,
    },

    /// A blob was written but its metadata record was not, and cleanup failed.
    ///
    /// The named blob now exists unreferenced in the physical store until the
    /// audit pass sweeps it. Surfaced as a hard failure; the entity was not
    /// created.
    #[error("partial write during '{operation}': blob '{blob_key}' is orphaned ({cause})")]
    PartialWrite {
        /// The repository operation that failed.
        operation: String,
        /// The key of the blob left behind.
        blob_key: String,
        /// The metadata-write error that triggered the partial state.
        cause: String,
    },

    /// Payload compression or decompression failed.
    #[error("codec failure: {cause}")]
    Codec {
        /// The underlying codec error, stringified.
        cause: String,
    },

    /// The caller-supplied deadline expired or cancellation was requested.
    ///
    /// On cancellation mid-blob-write the partially written chunks are
    /// removed best-effort before this error propagates.
    #[error("operation '{operation}' cancelled by deadline")]
    Cancelled {
        /// The operation that was abandoned.
        operation: String,
    },

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - Required arguments are empty (e.g. a workspace name)
    /// - A stored record body cannot be decoded back into its entity
    /// - A feedback record duplicates an existing prediction id
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A stub backend compiled without its cargo feature was invoked.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Configuration selects a backend whose feature flag is off.
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

/// Result type alias for lodestore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Centralized so every entity stamps time the same way. Falls back to 0 if
/// the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use lodestore::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound {
            kind: models::EntityKind::Dataset,
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "dataset 'abc' not found");

        let err = Error::Connection {
            operation: "sqlite_get".to_string(),
            cause: "disk I/O error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "connection failure during 'sqlite_get': disk I/O error"
        );

        let err = Error::CorruptBlob {
            key: "b1".to_string(),
            detail: "missing chunk 3".to_string(),
        };
        assert_eq!(err.to_string(), "corrupt blob 'b1': missing chunk 3");
    }

    #[test]
    fn test_partial_write_names_the_blob() {
        let err = Error::PartialWrite {
            operation: "save_dataset".to_string(),
            blob_key: "k9".to_string(),
            cause: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("k9"));
        assert!(err.to_string().contains("save_dataset"));
    }

    #[test]
    fn test_current_timestamp_monotonic_enough() {
        let a = current_timestamp();
        let b = current_timestamp();
        assert!(b >= a);
    }
}
