//! Built-in demonstration plugins.
//!
//! Real deployments register hardware-backed sensors and actuators here;
//! these two exist so a stock configuration runs end to end.

use async_trait::async_trait;
use plugin_api::{
    Actuator, ActuatorCommand, ActuatorError, ActuatorResult, Sensor, SensorError, SensorReading,
};
use tracing::info;

/// Reports a fixed value under a configured name.
pub struct StaticSensor {
    name: String,
    value: serde_json::Value,
}

impl StaticSensor {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[async_trait]
impl Sensor for StaticSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<SensorReading, SensorError> {
        Ok(SensorReading::now(self.name.clone(), self.value.clone()))
    }
}

/// Writes every command to the log and acknowledges it.
pub struct SyslogActuator;

#[async_trait]
impl Actuator for SyslogActuator {
    fn name(&self) -> &str {
        "syslog"
    }

    async fn execute(&self, command: &ActuatorCommand) -> Result<ActuatorResult, ActuatorError> {
        info!(
            actuator = %command.name,
            command = %command.command,
            arguments = %command.arguments,
            "Actuator command"
        );
        Ok(ActuatorResult {
            name: command.name.clone(),
            command: command.command.clone(),
            response: "logged".to_string(),
        })
    }
}
