//! Plugin contracts for sensors and actuators.
//!
//! Concrete sensor and actuator implementations live outside the message
//! core; handlers reach them through these traits. The [`PluginRegistry`]
//! maps configured names to implementations and fails fast at startup when
//! a configured name has no registered plugin.

mod actuator;
mod registry;
mod sensor;

pub use actuator::{Actuator, ActuatorCommand, ActuatorError, ActuatorResult};
pub use registry::PluginRegistry;
pub use sensor::{Sensor, SensorError, SensorReading};
