//! Broker transport: connection management with endpoint failover.
//!
//! The [`Connector`] owns the connection to the message broker and is the
//! single writer of [`ConnectionState`]; processors observe state through
//! a watch channel and receive deliveries through an mpsc channel rather
//! than nested callbacks, keeping ordering and backpressure explicit.
//!
//! The broker client library itself sits behind the [`BrokerLink`] /
//! [`BrokerChannel`] traits. [`MemoryBroker`] is the in-process
//! implementation used by tests and loopback deployments.

mod connector;
mod error;
mod link;
mod memory;

pub use connector::{ConnectionState, Connector, ConnectorConfig};
pub use error::TransportError;
pub use link::{Acknowledge, BrokerChannel, BrokerLink, Delivery};
pub use memory::MemoryBroker;
