use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A command addressed to one actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// Actuator name, as registered.
    pub name: String,
    /// Operation to perform, actuator-specific (e.g. "restart", "log").
    pub command: String,
    /// Operation arguments. Defaults to null when absent on the wire.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Outcome of a completed actuator command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorResult {
    pub name: String,
    pub command: String,
    /// Actuator-specific response text.
    pub response: String,
}

#[derive(Error, Debug)]
pub enum ActuatorError {
    /// The actuator does not implement the requested command
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    /// The command ran but the device reported a failure
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),
}

/// A sink for hardware or system commands.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Registered name, referenced by configuration and commands.
    fn name(&self) -> &str;

    async fn execute(&self, command: &ActuatorCommand) -> Result<ActuatorResult, ActuatorError>;
}
