use crate::EgressError;
use agent_config::{EgressConfig, QueueBinding};
use broker_transport::Connector;
use ras_messages::{encode, MessageEnvelope, Signer};
use std::sync::Arc;
use tracing::debug;

/// Publishes outbound messages through the transport connector.
///
/// When signing is configured, every outbound envelope gets a freshly
/// computed signature; nothing is cached across messages, so a signature
/// can never outlive its configured expiry by reuse.
pub struct EgressProcessor {
    connector: Arc<Connector>,
    binding: QueueBinding,
    signer: Option<Signer>,
}

impl EgressProcessor {
    pub fn new(connector: Arc<Connector>, config: &EgressConfig) -> Self {
        let signer = config
            .signature()
            .map(|s| Signer::new(s.username.clone(), s.token.clone(), s.ttl()));
        Self {
            connector,
            binding: config.binding(),
            signer,
        }
    }

    /// Construct, sign, encode, and send one message.
    pub async fn publish(
        &self,
        message_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), EgressError> {
        self.send_envelope(MessageEnvelope::new(message_type, payload))
            .await
    }

    /// Sign, encode, and send an already-built envelope.
    pub async fn send_envelope(&self, envelope: MessageEnvelope) -> Result<(), EgressError> {
        let envelope = match &self.signer {
            Some(signer) => signer.sign(envelope),
            None => envelope,
        };
        let bytes = encode(&envelope)?;
        self.connector.send(&self.binding, &bytes).await?;
        debug!(
            message_type = %envelope.message_type,
            uuid = %envelope.uuid,
            signed = envelope.signature.is_some(),
            "Published message"
        );
        Ok(())
    }
}
