use crate::{DispatchError, HandlerError};
use async_trait::async_trait;
use ras_messages::MessageEnvelope;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Handles one message type.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// The dotted message type this handler consumes.
    fn message_type(&self) -> &str;

    /// Process one inbound envelope, optionally producing an outbound one.
    async fn handle(
        &self,
        envelope: &MessageEnvelope,
    ) -> Result<Option<MessageEnvelope>, HandlerError>;
}

/// Routes envelopes to handlers by message type.
///
/// Registration is last-wins: re-registering a type replaces the previous
/// handler with a warning. The map is frozen after startup and shared
/// read-only with dispatch workers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn MessageHandler>) {
        let message_type = handler.message_type().to_string();
        if self
            .handlers
            .insert(message_type.clone(), handler)
            .is_some()
        {
            warn!(message_type = %message_type, "replacing registered handler");
        }
    }

    pub fn is_registered(&self, message_type: &str) -> bool {
        self.handlers.contains_key(message_type)
    }

    /// Look up the handler for the envelope's type and run it.
    ///
    /// An unregistered type returns [`DispatchError::NoHandler`] without
    /// side effects; the caller logs and counts it.
    pub async fn dispatch(
        &self,
        envelope: &MessageEnvelope,
    ) -> Result<Option<MessageEnvelope>, DispatchError> {
        let handler = self
            .handlers
            .get(&envelope.message_type)
            .ok_or_else(|| DispatchError::NoHandler(envelope.message_type.clone()))?;

        handler
            .handle(envelope)
            .await
            .map_err(|source| DispatchError::Handler {
                message_type: envelope.message_type.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingHandler {
        message_type: String,
        calls: Arc<AtomicU32>,
        reply: Option<String>,
    }

    #[async_trait]
    impl MessageHandler for CountingHandler {
        fn message_type(&self) -> &str {
            &self.message_type
        }

        async fn handle(
            &self,
            envelope: &MessageEnvelope,
        ) -> Result<Option<MessageEnvelope>, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .reply
                .as_ref()
                .map(|t| MessageEnvelope::reply_to(envelope, t.clone(), json!({}))))
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_type() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(CountingHandler {
            message_type: "cmd.ping".to_string(),
            calls: calls.clone(),
            reply: Some("status.pong".to_string()),
        }));

        let envelope = MessageEnvelope::new("cmd.ping", json!({}));
        let reply = registry.dispatch(&envelope).await.unwrap().unwrap();
        assert_eq!(reply.message_type, "status.pong");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_type_is_no_handler() {
        let registry = HandlerRegistry::new();
        let envelope = MessageEnvelope::new("cmd.unknown", json!({}));
        let err = registry.dispatch(&envelope).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoHandler(t) if t == "cmd.unknown"));
    }

    #[tokio::test]
    async fn test_register_is_last_wins() {
        let first_calls = Arc::new(AtomicU32::new(0));
        let second_calls = Arc::new(AtomicU32::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(CountingHandler {
            message_type: "cmd.ping".to_string(),
            calls: first_calls.clone(),
            reply: None,
        }));
        registry.register(Arc::new(CountingHandler {
            message_type: "cmd.ping".to_string(),
            calls: second_calls.clone(),
            reply: None,
        }));

        let envelope = MessageEnvelope::new("cmd.ping", json!({}));
        assert!(registry.dispatch(&envelope).await.unwrap().is_none());
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_may_produce_no_output() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(CountingHandler {
            message_type: "cmd.silent".to_string(),
            calls: Arc::new(AtomicU32::new(0)),
            reply: None,
        }));

        let envelope = MessageEnvelope::new("cmd.silent", json!({}));
        assert!(registry.dispatch(&envelope).await.unwrap().is_none());
    }
}
