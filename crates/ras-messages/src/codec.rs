//! Wire codec for message envelopes.
//!
//! JSON on the wire. Decoding is fed untrusted broker input and must
//! always return a typed failure, never panic.

use crate::MessageEnvelope;
use thiserror::Error;

/// Codec error type.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Structurally invalid input
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Serialize an envelope to wire bytes.
pub fn encode(envelope: &MessageEnvelope) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(envelope)?)
}

/// Parse wire bytes into an envelope.
pub fn decode(bytes: &[u8]) -> Result<MessageEnvelope, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roundtrip_preserves_envelope() {
        let envelope = MessageEnvelope::new(
            "cmd.read_sensor",
            json!({"name": "temp0", "nested": {"a": [1, 2, 3]}}),
        );
        let bytes = encode(&envelope).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_roundtrip_preserves_signature() {
        let mut envelope = MessageEnvelope::new("status.sensor_reading", json!({"value": 42}));
        envelope.signature = Some(crate::MessageSignature {
            username: "sspl-ll".to_string(),
            token_digest: "ZGlnZXN0".to_string(),
            expires_at: envelope.timestamp + chrono::Duration::seconds(3600),
        });
        let decoded = decode(&encode(&envelope).unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_malformed_bytes_return_typed_error() {
        for bytes in [
            &b"not json"[..],
            &b"{\"type\": \"x\"}"[..],
            &b"\xff\xfe\x00"[..],
            &b""[..],
            &b"[1,2,3]"[..],
        ] {
            let err = decode(bytes).unwrap_err();
            assert!(matches!(err, CodecError::Malformed(_)));
        }
    }

    #[test]
    fn test_decode_rejects_missing_uuid() {
        let bytes = br#"{"type":"cmd.x","timestamp":"2026-01-01T00:00:00Z","payload":{}}"#;
        assert!(decode(bytes).is_err());
    }
}
