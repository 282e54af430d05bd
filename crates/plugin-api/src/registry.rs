use crate::{Actuator, Sensor};
use agent_config::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Name-to-implementation map for sensors and actuators.
///
/// Populated at startup from the configured plugin lists, then shared
/// read-only with handlers. [`resolve`](PluginRegistry::resolve) is called
/// once after registration so a misconfigured name aborts startup instead
/// of failing on first use.
#[derive(Default)]
pub struct PluginRegistry {
    sensors: HashMap<String, Arc<dyn Sensor>>,
    actuators: HashMap<String, Arc<dyn Actuator>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("sensors", &self.sensors.keys().collect::<Vec<_>>())
            .field("actuators", &self.actuators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_sensor(&mut self, sensor: Arc<dyn Sensor>) {
        self.sensors.insert(sensor.name().to_string(), sensor);
    }

    pub fn register_actuator(&mut self, actuator: Arc<dyn Actuator>) {
        self.actuators.insert(actuator.name().to_string(), actuator);
    }

    pub fn sensor(&self, name: &str) -> Option<Arc<dyn Sensor>> {
        self.sensors.get(name).cloned()
    }

    pub fn actuator(&self, name: &str) -> Option<Arc<dyn Actuator>> {
        self.actuators.get(name).cloned()
    }

    /// Check every configured name against the registered implementations.
    pub fn resolve(&self, sensor_names: &[String], actuator_names: &[String]) -> ConfigResult<()> {
        for name in sensor_names {
            if !self.sensors.contains_key(name) {
                return Err(ConfigError::UnknownPlugin(name.clone()));
            }
        }
        for name in actuator_names {
            if !self.actuators.contains_key(name) {
                return Err(ConfigError::UnknownPlugin(name.clone()));
            }
        }
        Ok(())
    }
}
