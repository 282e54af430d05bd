//! The seam between the connector and the broker client library.
//!
//! An AMQP client binding implements [`BrokerLink`]; the connector is
//! generic over it and owns all failover and retry policy. Wire framing
//! never leaks above this module.

use crate::TransportError;
use agent_config::{Credentials, Endpoint, QueueBinding};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Factory for broker connections.
#[async_trait]
pub trait BrokerLink: Send + Sync {
    /// Open a channel to one endpoint. Implementations should fail fast;
    /// the connector applies its own timeout and backoff around this.
    async fn open(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Arc<dyn BrokerChannel>, TransportError>;
}

/// One open connection to a broker endpoint.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    fn is_open(&self) -> bool;

    /// Publish with publisher-confirm semantics: returns only once the
    /// broker has accepted the message, otherwise fails with
    /// [`TransportError::Unconfirmed`] or a connection fault.
    async fn publish(&self, binding: &QueueBinding, bytes: &[u8]) -> Result<(), TransportError>;

    /// Deliver queue messages into `deliveries` until the channel drops
    /// (`Err`) or the receiver side is gone (`Ok`). Messages not acked
    /// before a drop must be redelivered on the next consume.
    async fn consume(
        &self,
        binding: &QueueBinding,
        deliveries: mpsc::Sender<Delivery>,
    ) -> Result<(), TransportError>;

    async fn close(&self);
}

impl std::fmt::Debug for dyn BrokerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerChannel")
            .field("is_open", &self.is_open())
            .finish()
    }
}

/// Acknowledgement handle for one delivery.
pub trait Acknowledge: Send {
    fn ack(self: Box<Self>);
}

/// One inbound message handed to a processor.
///
/// Dropping a delivery without calling [`ack`](Delivery::ack) leaves the
/// message unacknowledged at the broker, which redelivers it after the
/// next (re)subscribe.
pub struct Delivery {
    pub bytes: Vec<u8>,
    acker: Option<Box<dyn Acknowledge>>,
}

impl Delivery {
    pub fn new(bytes: Vec<u8>, acker: Box<dyn Acknowledge>) -> Self {
        Self {
            bytes,
            acker: Some(acker),
        }
    }

    /// Acknowledge the delivery to the broker.
    pub fn ack(mut self) {
        if let Some(acker) = self.acker.take() {
            acker.ack();
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("bytes", &self.bytes.len())
            .field("acked", &self.acker.is_none())
            .finish()
    }
}
