//! Egress error types.

use broker_transport::TransportError;
use ras_messages::CodecError;
use thiserror::Error;

/// Egress error type.
///
/// Surfaced to the caller that attempted the publish; the caller decides
/// whether to retry. The processor adds no retry of its own beyond the
/// transport's, because a republish after an ambiguous failure risks
/// duplicate delivery.
#[derive(Error, Debug)]
pub enum EgressError {
    /// The envelope could not be encoded for the wire
    #[error("Message could not be encoded: {0}")]
    Encode(#[from] CodecError),

    /// The transport gave up on delivering the message
    #[error("Delivery failed: {0}")]
    DeliveryFailed(#[from] TransportError),

    /// The egress worker has shut down and takes no more submissions
    #[error("Egress queue is closed")]
    QueueClosed,
}
