//! Broker addressing types: endpoints, queue bindings, credentials.

use serde::Deserialize;

/// Priority of a broker endpoint in the failover order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Primary,
    Secondary,
}

/// A broker host together with its failover role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub role: EndpointRole,
}

impl Endpoint {
    pub fn primary(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            role: EndpointRole::Primary,
        }
    }

    pub fn secondary(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            role: EndpointRole::Secondary,
        }
    }
}

/// Broker login credentials.
///
/// Loaded once at startup and immutable for the process lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The broker routing addressing tuple for one processor.
///
/// Identifies where a processor reads or writes: publish goes to
/// `exchange_name` + `routing_key`, consume binds `queue_name` under
/// `virtual_host`. Immutable after load.
#[derive(Debug, Clone)]
pub struct QueueBinding {
    pub virtual_host: String,
    pub exchange_name: String,
    pub queue_name: String,
    pub routing_key: String,
    pub credentials: Credentials,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_constructors() {
        let primary = Endpoint::primary("puppet");
        assert_eq!(primary.host, "puppet");
        assert_eq!(primary.role, EndpointRole::Primary);

        let secondary = Endpoint::secondary("nfsserv");
        assert_eq!(secondary.host, "nfsserv");
        assert_eq!(secondary.role, EndpointRole::Secondary);
    }

    #[test]
    fn test_endpoint_role_deserialize() {
        let role: EndpointRole = serde_json::from_str("\"primary\"").unwrap();
        assert_eq!(role, EndpointRole::Primary);
    }
}
