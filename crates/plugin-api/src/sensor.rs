use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single observation from a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor name, as registered.
    pub name: String,
    /// Observed value. Shape is sensor-specific (number, string, object).
    pub value: serde_json::Value,
    /// When the observation was taken.
    pub recorded_at: DateTime<Utc>,
}

impl SensorReading {
    pub fn now(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SensorError {
    /// The underlying device or data source could not be read
    #[error("Sensor read failed: {0}")]
    ReadFailed(String),

    /// The sensor is present but not ready to report yet
    #[error("Sensor is not ready")]
    NotReady,
}

/// A source of hardware or system state.
///
/// Implementations may block on device I/O; they are invoked from dispatch
/// workers, so the bounded dispatch concurrency also bounds concurrent
/// sensor reads.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Registered name, referenced by configuration and commands.
    fn name(&self) -> &str;

    async fn read(&self) -> Result<SensorReading, SensorError>;
}
