//! Immutable configuration for the SSPL RAS agent.
//!
//! Everything here is created once at startup from a parsed configuration
//! file and handed to the message core by value. The core never parses
//! files itself and never mutates configuration at runtime; a reload
//! requires a restart.

mod agent;
mod binding;
mod error;
mod processors;

pub use agent::{AgentConfig, AgentSettings, SystemInformation};
pub use binding::{Credentials, Endpoint, EndpointRole, QueueBinding};
pub use error::{ConfigError, ConfigResult};
pub use processors::{
    DispatchConfig, EgressConfig, IngressConfig, SignatureConfig, SignaturePolicy,
};
