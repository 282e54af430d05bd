//! Top-level agent configuration.

use crate::{ConfigResult, DispatchConfig, EgressConfig, IngressConfig};
use serde::Deserialize;

/// The `[SSPL-LL_SETTING]` section: which modules this process runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub core_processors: Vec<String>,
    #[serde(default)]
    pub message_handlers: Vec<String>,
    #[serde(default)]
    pub sensors: Vec<String>,
    #[serde(default)]
    pub actuators: Vec<String>,
}

/// The `[SYSTEM_INFORMATION]` section. Informational only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInformation {
    #[serde(default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub setup: Option<String>,
}

/// Fully parsed agent configuration.
///
/// Parsing the on-disk format is the bootstrap's job; the message core
/// only ever sees this struct, already validated.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default, alias = "sspl_ll_setting")]
    pub settings: AgentSettings,
    #[serde(default, alias = "system_information")]
    pub system: SystemInformation,
    #[serde(alias = "planecntrlrmqingressprocessor", alias = "ingress_processor")]
    pub ingress: IngressConfig,
    #[serde(alias = "planecntrlrmqegressprocessor", alias = "egress_processor")]
    pub egress: EgressConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl AgentConfig {
    /// Validate every section; any error is fatal at startup.
    pub fn validate(&self) -> ConfigResult<()> {
        self.ingress.validate()?;
        self.egress.validate()?;
        self.dispatch.validate()?;
        Ok(())
    }
}
