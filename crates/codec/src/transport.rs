//! Transport form: standard base64, no line wrapping.
//!
//! The HTTP API carries filter patterns inside JSON strings, so the raw
//! pattern bytes are base64-encoded for the wire and decoded straight back.
//! This is the only form the daemon ever sees.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::Result;

/// Encode raw pattern bytes into the transport form.
pub fn encode(raw: &[u8]) -> String {
    BASE64.encode(raw)
}

/// Decode a transport-form pattern back into raw bytes.
pub fn decode(transport: &str) -> Result<Vec<u8>> {
    Ok(BASE64.decode(transport)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii() {
        let raw = b"GET /flag HTTP/1.1";
        assert_eq!(decode(&encode(raw)).unwrap(), raw);
    }

    #[test]
    fn round_trips_empty() {
        assert_eq!(encode(b""), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn round_trips_every_byte_value() {
        let raw: Vec<u8> = (0u8..=255).collect();
        assert_eq!(decode(&encode(&raw)).unwrap(), raw);
    }

    #[test]
    fn known_vector() {
        // ".*A=.*" as produced by find-mode wrapping
        assert_eq!(encode(b".*A=.*"), "LipBPS4q");
        assert_eq!(decode("LipBPS4q").unwrap(), b".*A=.*");
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(decode("not base64!!").is_err());
    }
}
