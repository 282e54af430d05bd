use crate::IngressCounters;
use agent_config::{DispatchConfig, IngressConfig, QueueBinding, SignaturePolicy};
use broker_transport::{Connector, Delivery, TransportError};
use egress_processor::EgressSender;
use handler_registry::{error_ack, DispatchError, HandlerRegistry};
use ras_messages::{decode, Verifier};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Bound on deliveries buffered between the transport and the dispatch
/// loop; beyond this the broker sees backpressure instead of the process
/// seeing memory growth.
const DELIVERY_BUFFER: usize = 32;

/// Ingress lifecycle as observed from outside.
///
/// Written only by the processor's worker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    Subscribed,
    Dispatching,
}

/// Consumes the command queue and dispatches each message to its handler.
pub struct IngressProcessor {
    connector: Arc<Connector>,
    binding: QueueBinding,
    registry: Arc<HandlerRegistry>,
    egress: EgressSender,
    policy: SignaturePolicy,
    verifier: Option<Verifier>,
    dispatch: DispatchConfig,
    counters: Arc<IngressCounters>,
    state_tx: watch::Sender<ProcessorState>,
}

/// Controls a started ingress processor.
pub struct IngressHandle {
    shutdown_tx: watch::Sender<bool>,
    join: tokio::task::JoinHandle<()>,
}

impl IngressHandle {
    /// Stop consuming, drain in-flight dispatches within the configured
    /// grace period, then force-close the transport.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

impl IngressProcessor {
    pub fn new(
        connector: Arc<Connector>,
        config: &IngressConfig,
        dispatch: DispatchConfig,
        registry: Arc<HandlerRegistry>,
        egress: EgressSender,
    ) -> Self {
        let verifier = config
            .signature_token
            .as_ref()
            .map(|token| Verifier::new(token.clone()));
        let (state_tx, _) = watch::channel(ProcessorState::Idle);
        Self {
            connector,
            binding: config.binding(),
            registry,
            egress,
            policy: config.signature_policy,
            verifier,
            dispatch,
            counters: Arc::new(IngressCounters::default()),
            state_tx,
        }
    }

    /// Observe processor state transitions.
    pub fn state(&self) -> watch::Receiver<ProcessorState> {
        self.state_tx.subscribe()
    }

    pub fn counters(&self) -> Arc<IngressCounters> {
        Arc::clone(&self.counters)
    }

    /// Bind to the command queue and start the dispatch loop.
    pub async fn start(self: &Arc<Self>) -> Result<IngressHandle, TransportError> {
        let deliveries = self
            .connector
            .subscribe(&self.binding, DELIVERY_BUFFER)
            .await?;
        self.set_state(ProcessorState::Subscribed);
        info!(queue = %self.binding.queue_name, "Ingress subscribed");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let processor = Arc::clone(self);
        let join = tokio::spawn(async move { processor.run(deliveries, shutdown_rx).await });
        Ok(IngressHandle { shutdown_tx, join })
    }

    async fn run(
        self: Arc<Self>,
        mut deliveries: mpsc::Receiver<Delivery>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let concurrency = self.dispatch.dispatch_concurrency;
        let semaphore = Arc::new(Semaphore::new(concurrency));

        loop {
            if semaphore.available_permits() == concurrency {
                self.set_state(ProcessorState::Subscribed);
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                maybe = deliveries.recv() => {
                    let Some(delivery) = maybe else { break };
                    self.counters.record_received();
                    // Acquiring before spawning bounds the in-flight count
                    // and, at a limit of 1, keeps dispatch in delivery order.
                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                        break;
                    };
                    self.set_state(ProcessorState::Dispatching);
                    let processor = Arc::clone(&self);
                    tokio::spawn(async move {
                        processor.process(delivery).await;
                        drop(permit);
                    });
                }
            }
        }

        // Drain what is already in flight, bounded by the grace period.
        if timeout(
            self.dispatch.drain_grace(),
            semaphore.acquire_many(concurrency as u32),
        )
        .await
        .is_err()
        {
            warn!("Shutdown grace period expired with dispatches in flight");
        }
        self.connector.close().await;
        self.set_state(ProcessorState::Idle);
        info!("Ingress stopped");
    }

    /// Handle one delivery end to end.
    ///
    /// All faults in here are message-scoped: counted, logged, and the
    /// delivery acked so the broker does not redeliver a message that can
    /// never succeed.
    async fn process(&self, delivery: Delivery) {
        let envelope = match decode(&delivery.bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.counters.record_decode_failure();
                warn!(error = %e, "Dropping undecodable message");
                delivery.ack();
                return;
            }
        };

        if self.policy == SignaturePolicy::Required {
            let verified = self
                .verifier
                .as_ref()
                .map(|v| v.verify(&envelope))
                .unwrap_or(false);
            if !verified {
                self.counters.record_rejected_signature();
                warn!(
                    uuid = %envelope.uuid,
                    message_type = %envelope.message_type,
                    "Rejecting message without a valid signature"
                );
                delivery.ack();
                return;
            }
        }

        match self.registry.dispatch(&envelope).await {
            Ok(reply) => {
                self.counters.record_dispatched();
                debug!(uuid = %envelope.uuid, message_type = %envelope.message_type, "Dispatched");
                if let Some(reply) = reply {
                    if let Err(e) = self.egress.submit(reply).await {
                        error!(uuid = %envelope.uuid, error = %e, "Failed to forward handler output");
                    }
                }
            }
            Err(DispatchError::NoHandler(message_type)) => {
                self.counters.record_unhandled();
                warn!(message_type = %message_type, "No handler for message type, dropping");
            }
            Err(e) => {
                self.counters.record_handler_failure();
                error!(uuid = %envelope.uuid, error = %e, "Dispatch failed");
                // Answer with an error ack so the management system is not
                // left waiting on a reply that will never come.
                if let Err(e) = self.egress.submit(error_ack(&envelope, &e)).await {
                    error!(uuid = %envelope.uuid, error = %e, "Failed to publish error ack");
                }
            }
        }
        delivery.ack();
    }

    fn set_state(&self, state: ProcessorState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}
