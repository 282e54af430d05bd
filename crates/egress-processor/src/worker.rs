use crate::{EgressError, EgressProcessor};
use ras_messages::MessageEnvelope;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Handle for submitting outbound envelopes to the egress worker.
///
/// Cheap to clone; one per handler or processor that publishes. Submission
/// only waits for queue space, never for the broker.
#[derive(Clone)]
pub struct EgressSender {
    tx: mpsc::Sender<MessageEnvelope>,
}

impl EgressSender {
    pub async fn submit(&self, envelope: MessageEnvelope) -> Result<(), EgressError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| EgressError::QueueClosed)
    }
}

/// Drains submitted envelopes to the broker, one at a time, in order.
///
/// The worker exits once every [`EgressSender`] is dropped and the queue
/// is empty, which is the shutdown drain: dropping the senders stops new
/// submissions while buffered messages still go out.
pub struct EgressWorker {
    processor: Arc<EgressProcessor>,
    rx: mpsc::Receiver<MessageEnvelope>,
}

impl EgressWorker {
    pub fn channel(processor: Arc<EgressProcessor>, queue_depth: usize) -> (EgressSender, Self) {
        let (tx, rx) = mpsc::channel(queue_depth);
        (EgressSender { tx }, Self { processor, rx })
    }

    pub fn start(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = self.rx.recv().await {
                let message_type = envelope.message_type.clone();
                let uuid = envelope.uuid;
                if let Err(e) = self.processor.send_envelope(envelope).await {
                    // Message-scoped: log and keep serving the queue.
                    error!(message_type = %message_type, uuid = %uuid, error = %e, "Outbound message lost");
                }
            }
            debug!("Egress worker drained and stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_config::{Credentials, EgressConfig};
    use broker_transport::{Connector, ConnectorConfig, MemoryBroker};
    use ras_messages::decode;
    use serde_json::json;

    fn worker_pair(broker: &Arc<MemoryBroker>) -> (EgressSender, EgressWorker) {
        let config: EgressConfig = toml::from_str(
            r#"
            virtual_host = "SSPL"
            queue_name = "ras_status"
            exchange_name = "ras_sspl"
            routing_key = "sspl_ll"
            username = "sspluser"
            password = "sspl4ever"
            primary_messaging_server = "puppet"
            "#,
        )
        .unwrap();
        let connector = Arc::new(
            Connector::new(
                Arc::clone(broker) as Arc<dyn broker_transport::BrokerLink>,
                config.endpoints(),
                Credentials {
                    username: config.username.clone(),
                    password: config.password.clone(),
                },
                ConnectorConfig::default(),
            )
            .unwrap(),
        );
        let processor = Arc::new(EgressProcessor::new(connector, &config));
        EgressWorker::channel(processor, 8)
    }

    #[tokio::test]
    async fn test_submitted_envelopes_publish_in_order() {
        let broker = Arc::new(MemoryBroker::new());
        let (sender, worker) = worker_pair(&broker);
        let handle = worker.start();

        sender
            .submit(MessageEnvelope::new("status.a", json!({"n": 1})))
            .await
            .unwrap();
        sender
            .submit(MessageEnvelope::new("status.b", json!({"n": 2})))
            .await
            .unwrap();

        // Dropping the sender lets the worker drain and exit.
        drop(sender);
        handle.await.unwrap();

        let published = broker.take_published("ras_status");
        assert_eq!(published.len(), 2);
        assert_eq!(decode(&published[0]).unwrap().message_type, "status.a");
        assert_eq!(decode(&published[1]).unwrap().message_type, "status.b");
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let broker = Arc::new(MemoryBroker::new());
        let (sender, worker) = worker_pair(&broker);
        drop(worker);

        let err = sender
            .submit(MessageEnvelope::new("status.late", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, EgressError::QueueClosed));
    }

    #[tokio::test]
    async fn test_failed_publish_does_not_stop_the_worker() {
        let broker = Arc::new(MemoryBroker::new());
        broker.fail_next_publishes(1);
        let (sender, worker) = worker_pair(&broker);
        let handle = worker.start();

        sender
            .submit(MessageEnvelope::new("status.lost", json!({})))
            .await
            .unwrap();
        sender
            .submit(MessageEnvelope::new("status.kept", json!({})))
            .await
            .unwrap();
        drop(sender);
        handle.await.unwrap();

        let published = broker.take_published("ras_status");
        assert_eq!(published.len(), 1);
        assert_eq!(decode(&published[0]).unwrap().message_type, "status.kept");
    }
}
