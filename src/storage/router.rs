//! Placement routing: inline vs blob, compressed vs raw.
//!
//! The router is pure. It inspects payload size against configured
//! thresholds, runs the codec when warranted, and returns a decision; the
//! entity repository performs the actual blob write through the active
//! backend. Keeping the decision free of I/O is what lets both backend
//! families share one routing policy and lets the threshold-boundary cases
//! be unit-tested without a live store.

use super::codec;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Size thresholds steering placement, in bytes.
///
/// Configuration, not constants: relational deployments with tight row-size
/// limits run a smaller inline threshold than document deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPolicy {
    /// Payloads strictly below this land inline; at or above, they go to
    /// blob storage.
    pub inline_threshold: usize,
    /// Blob-tier payloads at or above this are zstd-compressed first.
    pub compress_threshold: usize,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            inline_threshold: 1024 * 1024,
            compress_threshold: 2 * 1024 * 1024,
        }
    }
}

/// Which tier a payload was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    /// Store alongside the metadata record.
    Inline,
    /// Offload to the backend's blob store.
    Blob,
}

/// The router's output: everything the repository needs to persist a payload,
/// before any I/O has happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementDecision {
    /// Chosen tier.
    pub kind: DecisionKind,
    /// The exact bytes to hand to the store (compressed when `compressed`).
    pub bytes_to_persist: Vec<u8>,
    /// Whether `bytes_to_persist` is zstd-compressed.
    pub compressed: bool,
    /// Payload size before compression, in bytes.
    pub original_size: u64,
}

/// Routes a payload against the policy.
///
/// # Errors
///
/// Returns [`crate::Error::Codec`] if compression fails; no other failure
/// mode exists (the function performs no I/O).
pub fn place(payload: &[u8], policy: &PlacementPolicy) -> Result<PlacementDecision> {
    let original_size = payload.len() as u64;

    if payload.len() < policy.inline_threshold {
        return Ok(PlacementDecision {
            kind: DecisionKind::Inline,
            bytes_to_persist: payload.to_vec(),
            compressed: false,
            original_size,
        });
    }

    if payload.len() >= policy.compress_threshold {
        let compressed = codec::compress(payload)?;
        return Ok(PlacementDecision {
            kind: DecisionKind::Blob,
            bytes_to_persist: compressed,
            compressed: true,
            original_size,
        });
    }

    Ok(PlacementDecision {
        kind: DecisionKind::Blob,
        bytes_to_persist: payload.to_vec(),
        compressed: false,
        original_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn policy(inline: usize, compress: usize) -> PlacementPolicy {
        PlacementPolicy {
            inline_threshold: inline,
            compress_threshold: compress,
        }
    }

    #[test_case(0, DecisionKind::Inline; "empty payload is inline")]
    #[test_case(99, DecisionKind::Inline; "one below threshold is inline")]
    #[test_case(100, DecisionKind::Blob; "exactly threshold is blob")]
    #[test_case(101, DecisionKind::Blob; "above threshold is blob")]
    fn test_inline_threshold_boundary(len: usize, expected: DecisionKind) {
        let payload = vec![7u8; len];
        let decision = place(&payload, &policy(100, 1000)).unwrap();
        assert_eq!(decision.kind, expected);
        assert_eq!(decision.original_size, len as u64);
    }

    #[test]
    fn test_blob_below_compress_threshold_stays_raw() {
        let payload = vec![1u8; 500];
        let decision = place(&payload, &policy(100, 1000)).unwrap();
        assert_eq!(decision.kind, DecisionKind::Blob);
        assert!(!decision.compressed);
        assert_eq!(decision.bytes_to_persist, payload);
    }

    #[test]
    fn test_blob_at_compress_threshold_is_compressed() {
        let payload = vec![1u8; 1000];
        let decision = place(&payload, &policy(100, 1000)).unwrap();
        assert_eq!(decision.kind, DecisionKind::Blob);
        assert!(decision.compressed);
        // Repetitive content must shrink.
        assert!(decision.bytes_to_persist.len() < payload.len());
        assert_eq!(decision.original_size, 1000);
        assert_eq!(
            super::codec::decompress(&decision.bytes_to_persist).unwrap(),
            payload
        );
    }

    #[test]
    fn test_inline_bytes_pass_through_unchanged() {
        let payload = b"city,count\nberlin,7\n".to_vec();
        let decision = place(&payload, &PlacementPolicy::default()).unwrap();
        assert_eq!(decision.kind, DecisionKind::Inline);
        assert_eq!(decision.bytes_to_persist, payload);
        assert!(!decision.compressed);
    }

    #[test]
    fn test_default_policy_orders_thresholds() {
        let policy = PlacementPolicy::default();
        assert!(policy.inline_threshold < policy.compress_threshold);
    }
}
