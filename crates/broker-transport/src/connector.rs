//! Broker connector with primary/secondary failover.

use crate::{BrokerChannel, BrokerLink, Delivery, TransportError};
use agent_config::{Credentials, Endpoint, QueueBinding};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Connection lifecycle as observed by the processors.
///
/// Written only by the connector; everyone else holds a watch receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    FailingOver,
}

/// Connector tuning.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Base delay between connection attempts.
    pub retry_base_delay: Duration,
    /// Cap for the exponential backoff.
    pub retry_max_delay: Duration,
    /// Consecutive failures on one endpoint before advancing to the next.
    pub failure_threshold: u32,
    /// Total attempts per connect call before the fault is surfaced.
    pub max_connect_attempts: u32,
    /// Reconnect-and-retry cycles a send performs on connection faults.
    pub send_retries: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            failure_threshold: 3,
            max_connect_attempts: 12,
            send_retries: 2,
        }
    }
}

/// Failover position: which endpoint is current and how many times in a
/// row it has failed.
struct FailoverCursor {
    index: usize,
    consecutive_failures: u32,
}

/// Manages one broker connection on behalf of a processor.
///
/// Endpoints are tried in priority order; after `failure_threshold`
/// consecutive failures the cursor advances to the next endpoint,
/// wrapping back to the primary after exhausting the list.
pub struct Connector {
    link: Arc<dyn BrokerLink>,
    endpoints: Vec<Endpoint>,
    credentials: Credentials,
    config: ConnectorConfig,
    channel: AsyncMutex<Option<Arc<dyn BrokerChannel>>>,
    cursor: Mutex<FailoverCursor>,
    state_tx: watch::Sender<ConnectionState>,
    closed: AtomicBool,
}

impl Connector {
    pub fn new(
        link: Arc<dyn BrokerLink>,
        endpoints: Vec<Endpoint>,
        credentials: Credentials,
        config: ConnectorConfig,
    ) -> Result<Self, TransportError> {
        if endpoints.is_empty() {
            return Err(TransportError::NoEndpoints);
        }
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            link,
            endpoints,
            credentials,
            config,
            channel: AsyncMutex::new(None),
            cursor: Mutex::new(FailoverCursor {
                index: 0,
                consecutive_failures: 0,
            }),
            state_tx,
            closed: AtomicBool::new(false),
        })
    }

    /// Observe connection state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Establish a connection if one is not already open.
    ///
    /// Retries with bounded exponential backoff, failing over across
    /// endpoints, and surfaces the last fault only once
    /// `max_connect_attempts` is exhausted.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let mut guard = self.channel.lock().await;
        if let Some(channel) = guard.as_ref() {
            if channel.is_open() {
                return Ok(());
            }
        }
        *guard = None;
        self.set_state(ConnectionState::Connecting);

        let mut attempts = 0u32;
        let mut delay = self.config.retry_base_delay;
        loop {
            if self.closed.load(Ordering::SeqCst) {
                self.set_state(ConnectionState::Disconnected);
                return Err(TransportError::Closed);
            }

            let endpoint = self.current_endpoint();
            attempts += 1;
            let last_error = match timeout(
                self.config.connect_timeout,
                self.link.open(&endpoint, &self.credentials),
            )
            .await
            {
                Ok(Ok(channel)) => {
                    *guard = Some(channel);
                    self.reset_failures();
                    self.set_state(ConnectionState::Connected);
                    info!(host = %endpoint.host, "Connected to broker");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    warn!(host = %endpoint.host, attempt = attempts, error = %e, "Connection attempt failed");
                    e
                }
                Err(_) => {
                    warn!(host = %endpoint.host, attempt = attempts, "Connection attempt timed out");
                    TransportError::Timeout
                }
            };

            if attempts >= self.config.max_connect_attempts {
                error!(attempts, "Connection retries exhausted");
                self.set_state(ConnectionState::Disconnected);
                return Err(last_error);
            }

            self.record_failure();
            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, self.config.retry_max_delay);
        }
    }

    /// Publish with confirm semantics.
    ///
    /// Connection faults trigger reconnect-and-retry up to `send_retries`;
    /// an unconfirmed publish is surfaced immediately because republishing
    /// it could duplicate delivery.
    pub async fn send(&self, binding: &QueueBinding, bytes: &[u8]) -> Result<(), TransportError> {
        let mut attempt = 0u32;
        loop {
            self.connect().await?;
            let channel = self
                .channel
                .lock()
                .await
                .clone()
                .ok_or(TransportError::Closed)?;

            match channel.publish(binding, bytes).await {
                Ok(()) => return Ok(()),
                Err(TransportError::Unconfirmed) => return Err(TransportError::Unconfirmed),
                Err(e) => {
                    attempt += 1;
                    warn!(
                        exchange = %binding.exchange_name,
                        routing_key = %binding.routing_key,
                        attempt,
                        error = %e,
                        "Publish failed"
                    );
                    self.invalidate().await;
                    if attempt > self.config.send_retries {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Subscribe to a queue binding.
    ///
    /// Deliveries arrive on the returned channel; a background supervisor
    /// re-establishes the consumer across connection losses until the
    /// receiver is dropped or the connector is closed. Bounded channel
    /// capacity is the backpressure against message floods.
    pub async fn subscribe(
        self: &Arc<Self>,
        binding: &QueueBinding,
        buffer: usize,
    ) -> Result<mpsc::Receiver<Delivery>, TransportError> {
        self.connect().await?;
        let (tx, rx) = mpsc::channel(buffer);
        let connector = Arc::clone(self);
        let binding = binding.clone();

        tokio::spawn(async move {
            loop {
                if connector.closed.load(Ordering::SeqCst) || tx.is_closed() {
                    break;
                }
                let channel = connector.channel.lock().await.clone();
                let channel = match channel {
                    Some(channel) => channel,
                    None => {
                        if connector.connect().await.is_err() {
                            error!(queue = %binding.queue_name, "Resubscribe failed, stopping consumer");
                            break;
                        }
                        continue;
                    }
                };

                match channel.consume(&binding, tx.clone()).await {
                    Ok(()) => {
                        debug!(queue = %binding.queue_name, "Consumer receiver dropped");
                        break;
                    }
                    Err(e) => {
                        warn!(queue = %binding.queue_name, error = %e, "Consumer lost, reconnecting");
                        connector.invalidate().await;
                        if connector.connect().await.is_err() {
                            error!(queue = %binding.queue_name, "Resubscribe failed, stopping consumer");
                            break;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    /// Close the connection and stop all reconnect activity.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(channel) = self.channel.lock().await.take() {
            channel.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
        info!("Connector closed");
    }

    /// Drop the current channel so the next operation reconnects.
    async fn invalidate(&self) {
        if let Some(channel) = self.channel.lock().await.take() {
            channel.close().await;
        }
    }

    fn current_endpoint(&self) -> Endpoint {
        let cursor = self.cursor.lock().expect("lock poisoned");
        self.endpoints[cursor.index % self.endpoints.len()].clone()
    }

    fn reset_failures(&self) {
        let mut cursor = self.cursor.lock().expect("lock poisoned");
        cursor.consecutive_failures = 0;
    }

    fn record_failure(&self) {
        let mut cursor = self.cursor.lock().expect("lock poisoned");
        cursor.consecutive_failures += 1;
        if cursor.consecutive_failures >= self.config.failure_threshold && self.endpoints.len() > 1
        {
            cursor.index = (cursor.index + 1) % self.endpoints.len();
            cursor.consecutive_failures = 0;
            let next = &self.endpoints[cursor.index];
            info!(host = %next.host, "Failing over to next endpoint");
            drop(cursor);
            self.set_state(ConnectionState::FailingOver);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}
