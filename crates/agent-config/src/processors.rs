//! Per-processor configuration sections.
//!
//! Deployment variants of the agent have drifted on a few field names
//! (`primary_messaging_server` vs `primary_rabbitmq_server` vs
//! `primary_amqp_server`); these are schema aliases for the same value,
//! not distinct behaviors, so each variant is accepted via serde aliases.

use crate::{ConfigError, ConfigResult, Credentials, Endpoint, QueueBinding};
use serde::Deserialize;
use std::time::Duration;

fn default_signature_expires() -> u64 {
    3600
}

fn default_dispatch_concurrency() -> usize {
    1
}

fn default_drain_grace_secs() -> u64 {
    10
}

/// Signing configuration for outbound messages.
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureConfig {
    pub username: String,
    pub token: String,
    /// Signature lifetime in seconds.
    #[serde(default = "default_signature_expires")]
    pub expires_secs: u64,
}

impl SignatureConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.expires_secs)
    }
}

/// Whether inbound messages must carry a valid signature.
///
/// The ingress section of the configuration carries no signing fields, so
/// the default is `Disabled`; deployments that share a signing token on
/// both sides can opt in to `Required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignaturePolicy {
    #[default]
    Disabled,
    Required,
}

/// Configuration for the ingress (consume) processor.
#[derive(Debug, Clone, Deserialize)]
pub struct IngressConfig {
    pub virtual_host: String,
    pub queue_name: String,
    pub exchange_name: String,
    pub routing_key: String,
    pub username: String,
    pub password: String,
    #[serde(
        alias = "primary_rabbitmq_server",
        alias = "primary_amqp_server",
        alias = "primary_server"
    )]
    pub primary_messaging_server: String,
    #[serde(
        default,
        alias = "secondary_rabbitmq_server",
        alias = "secondary_amqp_server",
        alias = "secondary_server"
    )]
    pub secondary_messaging_server: Option<String>,
    #[serde(default)]
    pub signature_policy: SignaturePolicy,
    /// Shared token for verifying inbound signatures when the policy
    /// requires them.
    #[serde(default)]
    pub signature_token: Option<String>,
}

impl IngressConfig {
    /// Validate required fields; fatal at startup.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.queue_name.is_empty() {
            return Err(ConfigError::MissingField("ingress.queue_name"));
        }
        if self.primary_messaging_server.is_empty() {
            return Err(ConfigError::MissingField("ingress.primary_messaging_server"));
        }
        if self.signature_policy == SignaturePolicy::Required && self.signature_token.is_none() {
            return Err(ConfigError::MissingField("ingress.signature_token"));
        }
        Ok(())
    }

    /// Broker endpoints in failover priority order. Always non-empty for a
    /// validated config.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        endpoints(
            &self.primary_messaging_server,
            self.secondary_messaging_server.as_deref(),
        )
    }

    pub fn binding(&self) -> QueueBinding {
        QueueBinding {
            virtual_host: self.virtual_host.clone(),
            exchange_name: self.exchange_name.clone(),
            queue_name: self.queue_name.clone(),
            routing_key: self.routing_key.clone(),
            credentials: Credentials {
                username: self.username.clone(),
                password: self.password.clone(),
            },
        }
    }
}

/// Configuration for the egress (publish) processor.
#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    pub virtual_host: String,
    pub queue_name: String,
    pub exchange_name: String,
    pub routing_key: String,
    pub username: String,
    pub password: String,
    #[serde(
        alias = "primary_rabbitmq_server",
        alias = "primary_amqp_server",
        alias = "primary_server"
    )]
    pub primary_messaging_server: String,
    #[serde(
        default,
        alias = "secondary_rabbitmq_server",
        alias = "secondary_amqp_server",
        alias = "secondary_server"
    )]
    pub secondary_messaging_server: Option<String>,
    #[serde(default)]
    pub message_signature_username: Option<String>,
    #[serde(default)]
    pub message_signature_token: Option<String>,
    #[serde(default = "default_signature_expires")]
    pub message_signature_expires: u64,
}

impl EgressConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.exchange_name.is_empty() {
            return Err(ConfigError::MissingField("egress.exchange_name"));
        }
        if self.primary_messaging_server.is_empty() {
            return Err(ConfigError::MissingField("egress.primary_messaging_server"));
        }
        // Signing is optional, but a username without a token (or the
        // reverse) is a broken half-configuration.
        match (
            &self.message_signature_username,
            &self.message_signature_token,
        ) {
            (Some(_), None) => Err(ConfigError::MissingField("egress.message_signature_token")),
            (None, Some(_)) => Err(ConfigError::MissingField(
                "egress.message_signature_username",
            )),
            _ => Ok(()),
        }
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        endpoints(
            &self.primary_messaging_server,
            self.secondary_messaging_server.as_deref(),
        )
    }

    pub fn binding(&self) -> QueueBinding {
        QueueBinding {
            virtual_host: self.virtual_host.clone(),
            exchange_name: self.exchange_name.clone(),
            queue_name: self.queue_name.clone(),
            routing_key: self.routing_key.clone(),
            credentials: Credentials {
                username: self.username.clone(),
                password: self.password.clone(),
            },
        }
    }

    /// Signing configuration, if both username and token are present.
    pub fn signature(&self) -> Option<SignatureConfig> {
        match (
            &self.message_signature_username,
            &self.message_signature_token,
        ) {
            (Some(username), Some(token)) => Some(SignatureConfig {
                username: username.clone(),
                token: token.clone(),
                expires_secs: self.message_signature_expires,
            }),
            _ => None,
        }
    }
}

/// Dispatch tuning shared by the worker loops.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Maximum in-flight dispatches per processor. Delivery order is
    /// preserved end-to-end only when this is 1; raising it trades
    /// ordering for throughput. This is an explicit choice, never a
    /// side effect.
    #[serde(default = "default_dispatch_concurrency")]
    pub dispatch_concurrency: usize,
    /// How long shutdown waits for in-flight dispatches to settle before
    /// force-closing the transport.
    #[serde(default = "default_drain_grace_secs")]
    pub drain_grace_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dispatch_concurrency: default_dispatch_concurrency(),
            drain_grace_secs: default_drain_grace_secs(),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.dispatch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "dispatch_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_secs(self.drain_grace_secs)
    }
}

fn endpoints(primary: &str, secondary: Option<&str>) -> Vec<Endpoint> {
    let mut out = vec![Endpoint::primary(primary)];
    if let Some(host) = secondary {
        // A secondary identical to the primary adds nothing to failover.
        if !host.is_empty() && host != primary {
            out.push(Endpoint::secondary(host));
        }
    }
    out
}
