//! Message envelope types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authentication tag carried by signed egress messages.
///
/// `token_digest` is the base64 HMAC-SHA256 over the envelope's payload,
/// timestamp, and signing username; `expires_at` bounds how long the
/// signature is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSignature {
    pub username: String,
    #[serde(rename = "signature")]
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
}

/// A single RAS message.
///
/// The signature is present only on egress when signing is configured;
/// ingress traffic may carry one, in which case the configured policy
/// decides whether it is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<MessageSignature>,
}

impl MessageEnvelope {
    /// Create an unsigned envelope stamped with the current time.
    pub fn new(message_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            message_type: message_type.into(),
            timestamp: Utc::now(),
            payload,
            signature: None,
        }
    }

    /// Create a reply envelope correlated to an inbound message.
    ///
    /// The reply payload carries `in_response_to` so the management system
    /// can match acks to the request that produced them.
    pub fn reply_to(
        original: &MessageEnvelope,
        message_type: impl Into<String>,
        mut payload: serde_json::Value,
    ) -> Self {
        if let Some(map) = payload.as_object_mut() {
            map.insert(
                "in_response_to".to_string(),
                serde_json::Value::String(original.uuid.to_string()),
            );
        }
        Self::new(message_type, payload)
    }
}
