//! Blob store adapter trait.

use crate::Result;
use crate::models::BlobRef;
use crate::storage::Deadline;

/// Backend-specific chunked/binary object storage.
///
/// The chunked family splits payloads into fixed-size ordered chunk records
/// under one parent record; the relational-BLOB family writes the whole
/// buffer into a single binary column row. Both accept payloads from zero
/// bytes up to whatever the placement thresholds imply; neither imposes an
/// implicit ceiling of its own.
pub trait BlobStore: Send + Sync {
    /// Stores a payload, returning a reference valid only within this
    /// backend.
    ///
    /// On failure or cancellation mid-write, partially written chunks are
    /// removed best-effort before the error propagates; a `put` that returns
    /// `Err` leaves no retrievable object behind unless the cleanup itself
    /// failed (which the audit pass later sweeps).
    fn put(&self, payload: &[u8], deadline: &Deadline) -> Result<BlobRef>;

    /// Reconstructs a stored payload byte-exactly.
    ///
    /// A missing or out-of-order chunk is a fatal
    /// [`crate::Error::CorruptBlob`], never silently tolerated.
    fn get(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<Vec<u8>>;

    /// Deletes a stored payload; returns whether an object existed.
    fn delete(&self, blob_ref: &BlobRef, deadline: &Deadline) -> Result<bool>;

    /// Lists every stored blob key.
    ///
    /// Input to the out-of-band orphan audit; normal save/load/delete paths
    /// never call it.
    fn list_keys(&self, deadline: &Deadline) -> Result<Vec<String>>;
}
