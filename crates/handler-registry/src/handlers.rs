//! Built-in handlers for the plane control command set.

use crate::{DispatchError, HandlerError, MessageHandler};
use async_trait::async_trait;
use plugin_api::{ActuatorCommand, PluginRegistry};
use ras_messages::MessageEnvelope;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Answers `cmd.read_sensor` with a `status.sensor_reading`.
pub struct SensorReadHandler {
    plugins: Arc<PluginRegistry>,
}

#[derive(Deserialize)]
struct ReadSensorPayload {
    name: String,
}

impl SensorReadHandler {
    pub fn new(plugins: Arc<PluginRegistry>) -> Self {
        Self { plugins }
    }
}

#[async_trait]
impl MessageHandler for SensorReadHandler {
    fn message_type(&self) -> &str {
        "cmd.read_sensor"
    }

    async fn handle(
        &self,
        envelope: &MessageEnvelope,
    ) -> Result<Option<MessageEnvelope>, HandlerError> {
        let request: ReadSensorPayload = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| HandlerError::BadPayload(e.to_string()))?;

        let sensor = self
            .plugins
            .sensor(&request.name)
            .ok_or_else(|| HandlerError::UnknownTarget(request.name.clone()))?;

        let reading = sensor.read().await?;
        Ok(Some(MessageEnvelope::reply_to(
            envelope,
            "status.sensor_reading",
            json!({
                "name": reading.name,
                "value": reading.value,
                "recorded_at": reading.recorded_at,
            }),
        )))
    }
}

/// Answers `cmd.execute_actuator` with a `status.actuator_ack`.
pub struct ActuatorCommandHandler {
    plugins: Arc<PluginRegistry>,
}

impl ActuatorCommandHandler {
    pub fn new(plugins: Arc<PluginRegistry>) -> Self {
        Self { plugins }
    }
}

#[async_trait]
impl MessageHandler for ActuatorCommandHandler {
    fn message_type(&self) -> &str {
        "cmd.execute_actuator"
    }

    async fn handle(
        &self,
        envelope: &MessageEnvelope,
    ) -> Result<Option<MessageEnvelope>, HandlerError> {
        let command: ActuatorCommand = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| HandlerError::BadPayload(e.to_string()))?;

        let actuator = self
            .plugins
            .actuator(&command.name)
            .ok_or_else(|| HandlerError::UnknownTarget(command.name.clone()))?;

        let result = actuator.execute(&command).await?;
        Ok(Some(MessageEnvelope::reply_to(
            envelope,
            "status.actuator_ack",
            json!({
                "name": result.name,
                "command": result.command,
                "response": result.response,
            }),
        )))
    }
}

/// Build the error ack published when a command fails dispatch.
///
/// Correlated to the failed request so the management system does not wait
/// on a reply that will never come.
pub fn error_ack(original: &MessageEnvelope, error: &DispatchError) -> MessageEnvelope {
    MessageEnvelope::reply_to(
        original,
        "status.ack",
        json!({
            "ack_type": "error",
            "ack_msg": error.to_string(),
        }),
    )
}
