//! HMAC message signing and verification.
//!
//! Signing derives a per-message session token from the shared secret,
//! the signing username, and the signature lifetime, then computes an
//! HMAC-SHA256 digest over the payload, timestamp, and username. Both
//! sides of the exchange share only the secret token; the session token
//! is never transmitted.

use crate::{MessageEnvelope, MessageSignature};
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Base64 engine for the wire form of digests.
const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Signs outbound envelopes with a shared secret token.
#[derive(Debug, Clone)]
pub struct Signer {
    username: String,
    token: String,
    ttl_secs: i64,
}

impl Signer {
    pub fn new(username: impl Into<String>, token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            // Saturate rather than wrap: a wrapped ttl would sign
            // messages as already expired.
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Attach a signature to an envelope.
    ///
    /// The digest is computed fresh for every call; signatures are never
    /// cached or reused across messages. `expires_at` is the envelope
    /// timestamp plus the configured lifetime.
    pub fn sign(&self, mut envelope: MessageEnvelope) -> MessageEnvelope {
        let expires_at = envelope
            .timestamp
            .checked_add_signed(
                chrono::Duration::try_seconds(self.ttl_secs).unwrap_or(chrono::Duration::MAX),
            )
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let digest = compute_digest(
            &envelope.payload,
            &envelope.timestamp,
            &self.username,
            &self.token,
            self.ttl_secs,
        );
        envelope.signature = Some(MessageSignature {
            username: self.username.clone(),
            token_digest: digest,
            expires_at,
        });
        envelope
    }
}

/// Verifies envelope signatures against a shared secret token.
#[derive(Debug, Clone)]
pub struct Verifier {
    token: String,
}

impl Verifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Check an envelope's signature against the current time.
    ///
    /// Returns false (never errors) when the signature is absent, the
    /// digest does not match, or the signature has expired.
    pub fn verify(&self, envelope: &MessageEnvelope) -> bool {
        self.verify_at(envelope, Utc::now())
    }

    /// Pure verification against an explicit clock. Performs no I/O.
    pub fn verify_at(&self, envelope: &MessageEnvelope, now: DateTime<Utc>) -> bool {
        let Some(signature) = &envelope.signature else {
            return false;
        };
        // Accepted strictly before expiry, rejected at and after.
        if now >= signature.expires_at {
            return false;
        }
        let ttl_secs = (signature.expires_at - envelope.timestamp).num_seconds();
        if ttl_secs <= 0 {
            return false;
        }
        let Ok(claimed) = BASE64.decode(&signature.token_digest) else {
            return false;
        };
        message_mac(
            &envelope.payload,
            &envelope.timestamp,
            &signature.username,
            &self.token,
            ttl_secs,
        )
        .verify_slice(&claimed)
        .is_ok()
    }
}

/// Derive the session token binding the shared secret to a username and
/// signature lifetime.
fn session_token(username: &str, secret: &str, ttl_secs: i64) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(username.as_bytes());
    mac.update(&ttl_secs.to_le_bytes());
    mac.finalize().into_bytes().into()
}

fn message_mac(
    payload: &serde_json::Value,
    timestamp: &DateTime<Utc>,
    username: &str,
    secret: &str,
    ttl_secs: i64,
) -> HmacSha256 {
    let key = session_token(username, secret, ttl_secs);
    let mut mac = HmacSha256::new_from_slice(&key).expect("HMAC accepts any key length");
    // serde_json::Value always serializes; an empty digest input would
    // only occur on a broken serde_json.
    let payload_bytes = serde_json::to_vec(payload).unwrap_or_default();
    mac.update(&payload_bytes);
    mac.update(timestamp.to_rfc3339().as_bytes());
    mac.update(username.as_bytes());
    mac
}

fn compute_digest(
    payload: &serde_json::Value,
    timestamp: &DateTime<Utc>,
    username: &str,
    secret: &str,
    ttl_secs: i64,
) -> String {
    let mac = message_mac(payload, timestamp, username, secret, ttl_secs);
    BASE64.encode(mac.finalize().into_bytes())
}
