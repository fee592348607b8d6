//! Payload compression codec.
//!
//! Pure byte-to-byte transformation with no I/O; the placement router decides
//! *whether* to compress, the entity repository decides *where* the result
//! goes. `decompress(compress(x)) == x` holds for every byte sequence,
//! including empty input.

use crate::{Error, Result};

/// zstd compression level for blob-tier payloads.
///
/// Level 3 is the throughput/ratio sweet spot for the JSON-heavy artifacts
/// this layer stores.
const COMPRESSION_LEVEL: i32 = 3;

/// Compresses a payload.
///
/// # Errors
///
/// Returns [`Error::Codec`] if the encoder fails (out of memory is the only
/// realistic cause; any input byte sequence is valid).
pub fn compress(payload: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(payload, COMPRESSION_LEVEL).map_err(|e| Error::Codec {
        cause: e.to_string(),
    })
}

/// Decompresses a payload produced by [`compress`].
///
/// # Errors
///
/// Returns [`Error::Codec`] on malformed input (truncated frame, bad magic,
/// corrupted stream).
pub fn decompress(payload: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(payload).map_err(|e| Error::Codec {
        cause: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roundtrip_empty() {
        let compressed = compress(b"").unwrap();
        assert_eq!(decompress(&compressed).unwrap(), b"");
    }

    #[test]
    fn test_roundtrip_repetitive_json_shrinks() {
        let payload = r#"{"city":"berlin","count":7}"#.repeat(1000);
        let compressed = compress(payload.as_bytes()).unwrap();
        assert!(compressed.len() < payload.len());
        assert_eq!(decompress(&compressed).unwrap(), payload.as_bytes());
    }

    #[test]
    fn test_malformed_input_fails() {
        let err = decompress(b"definitely not a zstd frame").unwrap_err();
        assert!(matches!(err, Error::Codec { .. }));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_any_bytes(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let compressed = compress(&payload).unwrap();
            prop_assert_eq!(decompress(&compressed).unwrap(), payload);
        }
    }
}
