//! Wires configuration, plugins, handlers, and processors together.

use crate::plugins::{StaticSensor, SyslogActuator};
use agent_config::{AgentConfig, AgentSettings, ConfigError, Credentials};
use broker_transport::{BrokerLink, Connector, ConnectorConfig, MemoryBroker};
use egress_processor::{EgressProcessor, EgressWorker};
use handler_registry::{ActuatorCommandHandler, HandlerRegistry, SensorReadHandler};
use ingress_processor::IngressProcessor;
use plugin_api::PluginRegistry;
use serde_json::json;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, warn};

/// Queue depth between handlers and the egress worker.
const EGRESS_QUEUE_DEPTH: usize = 64;

/// Register the built-in plugins, then check the configured name lists.
///
/// An unresolved name is fatal here, at startup, rather than on the first
/// command that references it.
fn build_plugins(settings: &AgentSettings) -> Result<Arc<PluginRegistry>, ConfigError> {
    let mut registry = PluginRegistry::new();
    registry.register_sensor(Arc::new(StaticSensor::new("temp0", json!(42))));
    registry.register_actuator(Arc::new(SyslogActuator));
    registry.resolve(&settings.sensors, &settings.actuators)?;
    Ok(Arc::new(registry))
}

fn build_handlers(
    settings: &AgentSettings,
    plugins: &Arc<PluginRegistry>,
) -> Result<Arc<HandlerRegistry>, ConfigError> {
    let mut registry = HandlerRegistry::new();
    for name in &settings.message_handlers {
        match name.as_str() {
            "sensor_read" => {
                registry.register(Arc::new(SensorReadHandler::new(Arc::clone(plugins))))
            }
            "actuator_command" => {
                registry.register(Arc::new(ActuatorCommandHandler::new(Arc::clone(plugins))))
            }
            other => return Err(ConfigError::UnknownPlugin(other.to_string())),
        }
    }
    Ok(Arc::new(registry))
}

fn connector(
    link: Arc<dyn BrokerLink>,
    endpoints: Vec<agent_config::Endpoint>,
    credentials: Credentials,
) -> Result<Arc<Connector>, broker_transport::TransportError> {
    Ok(Arc::new(Connector::new(
        link,
        endpoints,
        credentials,
        ConnectorConfig::default(),
    )?))
}

/// Run the agent until a shutdown signal arrives.
pub async fn run(config: AgentConfig) -> anyhow::Result<()> {
    let plugins = build_plugins(&config.settings)?;
    let handlers = build_handlers(&config.settings, &plugins)?;

    // In-process loopback broker. A production deployment swaps in an
    // AMQP client binding behind the same trait.
    let broker = Arc::new(MemoryBroker::new());

    let egress_connector = connector(
        Arc::clone(&broker) as Arc<dyn BrokerLink>,
        config.egress.endpoints(),
        Credentials {
            username: config.egress.username.clone(),
            password: config.egress.password.clone(),
        },
    )?;
    let egress = Arc::new(EgressProcessor::new(egress_connector, &config.egress));
    let (egress_sender, egress_worker) = EgressWorker::channel(egress, EGRESS_QUEUE_DEPTH);
    let egress_join = egress_worker.start();

    let ingress_connector = connector(
        Arc::clone(&broker) as Arc<dyn BrokerLink>,
        config.ingress.endpoints(),
        Credentials {
            username: config.ingress.username.clone(),
            password: config.ingress.password.clone(),
        },
    )?;
    let ingress = Arc::new(IngressProcessor::new(
        ingress_connector,
        &config.ingress,
        config.dispatch.clone(),
        handlers,
        egress_sender.clone(),
    ));
    let ingress_handle = ingress.start().await?;

    info!(
        queue = %config.ingress.queue_name,
        concurrency = config.dispatch.dispatch_concurrency,
        "Agent started"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Ingress first: stop taking commands, drain in-flight dispatches.
    ingress_handle.shutdown().await;
    // Then let the egress worker flush what the drain produced. The
    // processor holds an egress sender clone, so it must go too or the
    // worker never sees the channel close.
    drop(ingress);
    drop(egress_sender);
    if timeout(config.dispatch.drain_grace(), egress_join)
        .await
        .is_err()
    {
        warn!("Egress drain grace expired with messages still queued");
    }
    info!("Agent stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const LOOPBACK_CONFIG: &str = r#"
        [ingress]
        virtual_host = "SSPL"
        queue_name = "ras_control"
        exchange_name = "ras_sspl"
        routing_key = "sspl_ll"
        username = "sspluser"
        password = "sspl4ever"
        primary_messaging_server = "puppet"

        [egress]
        virtual_host = "SSPL"
        queue_name = "ras_status"
        exchange_name = "ras_sspl"
        routing_key = "sspl_ll"
        username = "sspluser"
        password = "sspl4ever"
        primary_messaging_server = "puppet"
    "#;

    fn settings(sensors: &[&str], handlers: &[&str]) -> AgentSettings {
        AgentSettings {
            core_processors: Vec::new(),
            message_handlers: handlers.iter().map(|s| s.to_string()).collect(),
            sensors: sensors.iter().map(|s| s.to_string()).collect(),
            actuators: Vec::new(),
        }
    }

    #[test]
    fn test_configured_plugins_resolve() {
        assert!(build_plugins(&settings(&["temp0"], &[])).is_ok());
    }

    #[test]
    fn test_unknown_sensor_name_is_fatal() {
        let err = build_plugins(&settings(&["temp9"], &[])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin(name) if name == "temp9"));
    }

    #[test]
    fn test_known_handler_names_register() {
        let plugins = build_plugins(&settings(&["temp0"], &[])).unwrap();
        let registry =
            build_handlers(&settings(&[], &["sensor_read", "actuator_command"]), &plugins)
                .unwrap();
        assert!(registry.is_registered("cmd.read_sensor"));
        assert!(registry.is_registered("cmd.execute_actuator"));
    }

    #[test]
    fn test_unknown_handler_name_is_fatal() {
        let plugins = build_plugins(&settings(&[], &[])).unwrap();
        let err = build_handlers(&settings(&[], &["telemetry"]), &plugins).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin(name) if name == "telemetry"));
    }

    #[tokio::test]
    async fn test_shutdown_releases_the_egress_worker() {
        let config: AgentConfig = toml::from_str(LOOPBACK_CONFIG).unwrap();
        let broker = Arc::new(MemoryBroker::new());

        let egress = Arc::new(EgressProcessor::new(
            connector(
                Arc::clone(&broker) as Arc<dyn BrokerLink>,
                config.egress.endpoints(),
                Credentials {
                    username: config.egress.username.clone(),
                    password: config.egress.password.clone(),
                },
            )
            .unwrap(),
            &config.egress,
        ));
        let (egress_sender, egress_worker) = EgressWorker::channel(egress, 8);
        let egress_join = egress_worker.start();

        let ingress = Arc::new(IngressProcessor::new(
            connector(
                Arc::clone(&broker) as Arc<dyn BrokerLink>,
                config.ingress.endpoints(),
                Credentials {
                    username: config.ingress.username.clone(),
                    password: config.ingress.password.clone(),
                },
            )
            .unwrap(),
            &config.ingress,
            config.dispatch.clone(),
            Arc::new(HandlerRegistry::new()),
            egress_sender.clone(),
        ));
        let handle = ingress.start().await.unwrap();

        handle.shutdown().await;
        // The processor keeps an egress sender clone alive; both it and
        // the local sender must go before the worker can see the channel
        // close and drain out.
        drop(ingress);
        drop(egress_sender);

        assert!(
            timeout(Duration::from_secs(2), egress_join).await.is_ok(),
            "egress worker did not exit after the last sender was dropped"
        );
    }
}
