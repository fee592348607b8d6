//! Payload placement: inline bytes or a reference into blob storage.

use serde::{Deserialize, Serialize};

/// Backend-opaque handle to a stored blob.
///
/// A `BlobRef` is only valid within the backend that created it. It must
/// never be persisted into, or dereferenced against, a different backend
/// instance; the repository guarantees this by always resolving refs through
/// the backend that owns the metadata record they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    /// Opaque object key generated by the blob store.
    pub key: String,
    /// Total byte length of the stored object (pre-reconstruction).
    pub byte_length: u64,
    /// Number of chunks, or 0 when the backend stores the object
    /// monolithically (relational-BLOB family).
    pub chunk_count: u32,
}

impl BlobRef {
    /// Creates a new blob reference.
    #[must_use]
    pub fn new(key: impl Into<String>, byte_length: u64, chunk_count: u32) -> Self {
        Self {
            key: key.into(),
            byte_length,
            chunk_count,
        }
    }
}

/// Where an entity's payload physically lives.
///
/// Exhaustively matched wherever consumed; exactly one variant is ever
/// populated for an entity that carries a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Payload stored directly alongside its metadata record.
    Inline {
        /// The raw payload bytes (base64 in JSON form).
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    /// Payload offloaded to the backend's blob store.
    Blob {
        /// Handle to the stored object.
        blob_ref: BlobRef,
        /// Size of the payload before compression, in bytes.
        original_size: u64,
        /// Whether the stored bytes are zstd-compressed.
        compressed: bool,
    },
}

impl Placement {
    /// Convenience constructor for the inline variant.
    #[must_use]
    pub const fn inline(bytes: Vec<u8>) -> Self {
        Self::Inline { bytes }
    }

    /// Returns true for the inline variant.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }

    /// The logical payload size in bytes (original, not compressed).
    #[must_use]
    pub fn logical_size(&self) -> u64 {
        match self {
            Self::Inline { bytes } => bytes.len() as u64,
            Self::Blob { original_size, .. } => *original_size,
        }
    }

    /// The blob reference, when the payload is offloaded.
    #[must_use]
    pub const fn blob_ref(&self) -> Option<&BlobRef> {
        match self {
            Self::Inline { .. } => None,
            Self::Blob { blob_ref, .. } => Some(blob_ref),
        }
    }
}

/// Base64 (de)serialization for inline payload bytes.
///
/// Document backends persist records as JSON; raw byte arrays would serialize
/// as number lists there, quadrupling size.
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_json_roundtrip() {
        let placement = Placement::inline(vec![0, 1, 2, 255]);
        let json = serde_json::to_string(&placement).unwrap();
        assert!(json.contains("\"kind\":\"inline\""));
        let back: Placement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, placement);
    }

    #[test]
    fn test_blob_json_roundtrip() {
        let placement = Placement::Blob {
            blob_ref: BlobRef::new("obj-42", 1024, 5),
            original_size: 4096,
            compressed: true,
        };
        let json = serde_json::to_string(&placement).unwrap();
        let back: Placement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, placement);
    }

    #[test]
    fn test_empty_inline_roundtrip() {
        let placement = Placement::inline(Vec::new());
        let json = serde_json::to_string(&placement).unwrap();
        let back: Placement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.logical_size(), 0);
    }

    #[test]
    fn test_logical_size_uses_original() {
        let placement = Placement::Blob {
            blob_ref: BlobRef::new("k", 100, 0),
            original_size: 300,
            compressed: true,
        };
        assert_eq!(placement.logical_size(), 300);
        assert!(!placement.is_inline());
        assert_eq!(placement.blob_ref().map(|r| r.chunk_count), Some(0));
    }
}
