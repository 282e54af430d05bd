//! Full-path tests: command in, signed status out, with broker failover.

use agent_config::{Credentials, DispatchConfig, EgressConfig, IngressConfig};
use async_trait::async_trait;
use broker_transport::{BrokerLink, Connector, ConnectorConfig, MemoryBroker};
use egress_processor::{EgressProcessor, EgressSender, EgressWorker};
use handler_registry::{HandlerRegistry, SensorReadHandler};
use ingress_processor::IngressProcessor;
use plugin_api::{PluginRegistry, Sensor, SensorError, SensorReading};
use ras_messages::{decode, encode, MessageEnvelope, Verifier};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const COMMAND_QUEUE: &str = "ras_control";
const STATUS_QUEUE: &str = "ras_status";
const TOKEN: &str = "ALOOFauskdnfa12";

struct TempSensor;

#[async_trait]
impl Sensor for TempSensor {
    fn name(&self) -> &str {
        "temp0"
    }

    async fn read(&self) -> Result<SensorReading, SensorError> {
        Ok(SensorReading::now("temp0", json!(42)))
    }
}

fn fast_config() -> ConnectorConfig {
    ConnectorConfig {
        connect_timeout: Duration::from_millis(100),
        retry_base_delay: Duration::from_millis(1),
        retry_max_delay: Duration::from_millis(4),
        failure_threshold: 2,
        max_connect_attempts: 10,
        send_retries: 1,
    }
}

fn connector(broker: &Arc<MemoryBroker>, hosts: &[&str]) -> Arc<Connector> {
    let mut endpoints = vec![agent_config::Endpoint::primary(hosts[0])];
    for host in &hosts[1..] {
        endpoints.push(agent_config::Endpoint::secondary(*host));
    }
    Arc::new(
        Connector::new(
            Arc::clone(broker) as Arc<dyn BrokerLink>,
            endpoints,
            Credentials {
                username: "sspluser".to_string(),
                password: "sspl4ever".to_string(),
            },
            fast_config(),
        )
        .unwrap(),
    )
}

fn egress_config() -> EgressConfig {
    toml::from_str(&format!(
        r#"
        virtual_host = "SSPL"
        queue_name = "{STATUS_QUEUE}"
        exchange_name = "ras_sspl"
        routing_key = "sspl_ll"
        username = "sspluser"
        password = "sspl4ever"
        primary_messaging_server = "puppet"
        secondary_messaging_server = "nfsserv"
        message_signature_username = "sspl-ll"
        message_signature_token = "{TOKEN}"
        "#
    ))
    .unwrap()
}

fn ingress_config() -> IngressConfig {
    toml::from_str(&format!(
        r#"
        virtual_host = "SSPL"
        queue_name = "{COMMAND_QUEUE}"
        exchange_name = "ras_sspl"
        routing_key = "sspl_ll"
        username = "sspluser"
        password = "sspl4ever"
        primary_messaging_server = "puppet"
        secondary_messaging_server = "nfsserv"
        "#
    ))
    .unwrap()
}

fn egress_sender(broker: &Arc<MemoryBroker>, hosts: &[&str]) -> EgressSender {
    let processor = Arc::new(EgressProcessor::new(
        connector(broker, hosts),
        &egress_config(),
    ));
    let (sender, worker) = EgressWorker::channel(processor, 8);
    worker.start();
    sender
}

fn handler_registry() -> Arc<HandlerRegistry> {
    let mut plugins = PluginRegistry::new();
    plugins.register_sensor(Arc::new(TempSensor));
    let plugins = Arc::new(plugins);
    plugins.resolve(&["temp0".to_string()], &[]).unwrap();

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(SensorReadHandler::new(plugins)));
    Arc::new(registry)
}

async fn wait_for_status(broker: &Arc<MemoryBroker>, count: usize) -> Vec<MessageEnvelope> {
    for _ in 0..300 {
        if broker.queue_depth(STATUS_QUEUE) >= count {
            return broker
                .take_published(STATUS_QUEUE)
                .iter()
                .map(|bytes| decode(bytes).unwrap())
                .collect();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no status message published within timeout");
}

#[tokio::test]
async fn test_read_sensor_command_yields_signed_reading() {
    let broker = Arc::new(MemoryBroker::new());
    let ingress = Arc::new(IngressProcessor::new(
        connector(&broker, &["puppet"]),
        &ingress_config(),
        DispatchConfig::default(),
        handler_registry(),
        egress_sender(&broker, &["puppet"]),
    ));
    let handle = ingress.start().await.unwrap();

    let command = MessageEnvelope::new("cmd.read_sensor", json!({"name": "temp0"}));
    broker.enqueue(COMMAND_QUEUE, encode(&command).unwrap());

    let statuses = wait_for_status(&broker, 1).await;
    let reading = &statuses[0];
    assert_eq!(reading.message_type, "status.sensor_reading");
    assert_eq!(reading.payload["name"], json!("temp0"));
    assert_eq!(reading.payload["value"], json!(42));
    assert_eq!(
        reading.payload["in_response_to"],
        json!(command.uuid.to_string())
    );

    let signature = reading.signature.as_ref().unwrap();
    assert_eq!(signature.username, "sspl-ll");
    assert_eq!(
        signature.expires_at,
        reading.timestamp + chrono::Duration::seconds(3600)
    );
    assert!(Verifier::new(TOKEN).verify(reading));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_commands_queued_during_failover_are_served() {
    let broker = Arc::new(MemoryBroker::new());
    let ingress = Arc::new(IngressProcessor::new(
        connector(&broker, &["puppet", "nfsserv"]),
        &ingress_config(),
        DispatchConfig::default(),
        handler_registry(),
        egress_sender(&broker, &["puppet", "nfsserv"]),
    ));
    let handle = ingress.start().await.unwrap();

    // First command over the primary proves the path works.
    let first = MessageEnvelope::new("cmd.read_sensor", json!({"name": "temp0"}));
    broker.enqueue(COMMAND_QUEUE, encode(&first).unwrap());
    wait_for_status(&broker, 1).await;

    // Lose the primary, then queue a command while disconnected. The
    // connector must fail over to the secondary and serve it.
    broker.set_host_down("puppet", true);
    let second = MessageEnvelope::new("cmd.read_sensor", json!({"name": "temp0"}));
    broker.enqueue(COMMAND_QUEUE, encode(&second).unwrap());

    let statuses = wait_for_status(&broker, 1).await;
    assert_eq!(statuses[0].message_type, "status.sensor_reading");
    assert_eq!(
        statuses[0].payload["in_response_to"],
        json!(second.uuid.to_string())
    );

    handle.shutdown().await;
}
