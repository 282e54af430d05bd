//! Message handler registry and dispatcher.
//!
//! Inbound envelopes are routed by their dotted message type to a
//! [`MessageHandler`]. A handler produces zero or one outbound envelope per
//! inbound message; the ingress processor forwards any output to egress.
//! Built-in handlers cover the sensor-read and actuator command types.

mod error;
mod handlers;
mod registry;

pub use error::{DispatchError, HandlerError};
pub use handlers::{error_ack, ActuatorCommandHandler, SensorReadHandler};
pub use registry::{HandlerRegistry, MessageHandler};
