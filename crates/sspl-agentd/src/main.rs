//! SSPL RAS agent daemon.
//!
//! Loads the agent configuration, wires the ingress and egress processors
//! to the broker, and serves commands until interrupted.

mod agent;
mod plugins;

use agent_config::AgentConfig;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sspl-agentd", version, about = "SSPL RAS monitoring agent")]
struct Args {
    /// Path to the agent configuration file (TOML).
    #[arg(short, long, env = "SSPL_CONFIG", default_value = "/etc/sspl/agent.toml")]
    config: PathBuf,

    /// Log filter, e.g. "info" or "ingress_processor=debug".
    #[arg(long, env = "SSPL_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log).context("invalid log filter")?)
        .init();

    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading configuration from {}", args.config.display()))?;
    let config: AgentConfig = toml::from_str(&raw).context("parsing configuration")?;
    config.validate().context("invalid configuration")?;

    agent::run(config).await
}
