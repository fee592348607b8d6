//! Storage layer abstraction.
//!
//! Two backend families hide behind one pair of adapter traits:
//! - **Document**: flexible JSON records + a chunked object store
//!   (in-process or Redis)
//! - **Relational**: typed/JSON columns + binary-large-object rows
//!   (`SQLite` or PostgreSQL)
//!
//! A [`Backend`] is one matched pair of metadata + blob adapters. The
//! [`BackendFactory`] owns the active pair behind an atomically swappable
//! handle; the placement [`router`] decides inline vs blob vs compressed
//! before any I/O happens.

// Allow significant_drop_tightening - dropping store guards slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod codec;
mod deadline;
pub mod document;
mod factory;
pub mod metrics;
pub mod migrations;
pub mod relational;
pub mod router;
pub mod traits;

pub use deadline::Deadline;
pub use factory::BackendFactory;
pub use router::{DecisionKind, PlacementDecision, PlacementPolicy, place};
pub use traits::{BlobStore, MetadataStore};

use std::sync::Arc;

/// Default chunk size for the document family's object store (256 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// The backend family a matched adapter pair implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Document store with a companion chunked object store.
    Document,
    /// Relational store with binary-large-object columns.
    Relational,
}

impl BackendKind {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Relational => "relational",
        }
    }

    /// Parses a family string; unknown values fall back to relational, the
    /// embedded default.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "document" => Self::Document,
            _ => Self::Relational,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One matched pair of metadata + blob adapters.
///
/// A [`crate::models::BlobRef`] minted by this backend's blob store is only
/// meaningful while this backend (or a reconnect to the same physical store)
/// is active; nothing migrates between backends on switch.
pub struct Backend {
    kind: BackendKind,
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl Backend {
    /// Creates a backend from an adapter pair.
    #[must_use]
    pub fn new(
        kind: BackendKind,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            kind,
            metadata,
            blobs,
        }
    }

    /// The family this backend implements.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Returns the metadata adapter.
    #[must_use]
    pub fn metadata(&self) -> &dyn MetadataStore {
        self.metadata.as_ref()
    }

    /// Returns the blob adapter.
    #[must_use]
    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }
}
