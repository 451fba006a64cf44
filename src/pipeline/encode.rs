//! Payload encoding: raw bytes → standard base64.
//!
//! The delivery API takes attachments as base64 strings embedded in the JSON
//! request body. The standard alphabet with padding is what it decodes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode fetched bytes or a rendered PDF for the delivery API.
pub fn encode_payload(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    b64
}

/// Inverse of [`encode_payload`].
pub fn decode_payload(b64: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(b64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_pdf_header() {
        assert_eq!(encode_payload(b"%PDF-1.7"), "JVBERi0xLjc=");
    }

    #[test]
    fn empty_input() {
        assert_eq!(encode_payload(&[]), "");
        assert!(decode_payload("").unwrap().is_empty());
    }

    #[test]
    fn binary_bytes_survive() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let decoded = decode_payload(&encode_payload(&bytes)).expect("valid base64");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_payload("not base64 !!").is_err());
    }
}
