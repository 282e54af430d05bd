//! Dispatch and handler error types.

use plugin_api::{ActuatorError, SensorError};
use thiserror::Error;

/// Failure inside a handler. Message-scoped; never crashes the processor.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The payload does not have the shape the handler expects
    #[error("Malformed payload: {0}")]
    BadPayload(String),

    /// The command names a sensor or actuator that is not registered
    #[error("No such plugin: {0}")]
    UnknownTarget(String),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

/// Dispatch error type.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No handler is registered for the envelope's message type
    #[error("No handler registered for message type {0}")]
    NoHandler(String),

    /// The handler ran and failed
    #[error("Handler for {message_type} failed: {source}")]
    Handler {
        message_type: String,
        source: HandlerError,
    },
}
