//! Transport error types.

use thiserror::Error;

/// Transport error type.
///
/// Connection-level faults are retried with failover inside the
/// [`Connector`](crate::Connector) and surface only after retries are
/// exhausted. `Unconfirmed` is never retried by the transport because a
/// blind republish risks duplicate delivery.
#[derive(Error, Debug)]
pub enum TransportError {
    /// A connection attempt exceeded the configured timeout
    #[error("Connection attempt timed out")]
    Timeout,

    /// The broker did not acknowledge a publish
    #[error("Broker did not confirm the publish")]
    Unconfirmed,

    /// The processor was configured without endpoints
    #[error("No broker endpoints configured")]
    NoEndpoints,

    /// Network or broker fault
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The transport has been shut down
    #[error("Transport is closed")]
    Closed,
}
