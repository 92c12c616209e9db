//! Runtime assembly from configuration.

use std::path::Path;
use std::sync::Arc;

use nodekeeper_core::{AgentConfig, NodeRole};
use nodekeeper_probe::{
    ConfigurationMissingError, DiscoveryError, HttpChecker, discover_probes,
    resolve_restart_config,
};
use nodekeeper_runtime::{MaintenanceSettings, RktFetcher, Runtime, SystemdRestarter};
use thiserror::Error;
use tracing::info;

/// Fatal startup failures, each with its own process exit code.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("failed to get liveness probes to query: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("failed to get reboot coordination config from probes: {0}")]
    RestartConfig(#[from] ConfigurationMissingError),
}

impl StartupError {
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Config(_) => 1,
            StartupError::Discovery(_) => 2,
            StartupError::RestartConfig(_) => 3,
        }
    }
}

/// Load the config file, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<AgentConfig, StartupError> {
    AgentConfig::load(path).map_err(StartupError::Config)
}

/// Discover probes, resolve the reboot lock and wire the services.
pub fn build_runtime(
    role: NodeRole,
    rkt_fetch_insecure: bool,
    config: &AgentConfig,
) -> Result<Runtime, StartupError> {
    let probe_timeout = config.timeouts.probe_timeout().map_err(StartupError::Config)?;
    let command_timeout = config.timeouts.command_timeout().map_err(StartupError::Config)?;

    let probes = discover_probes(role, config, HttpChecker::shared(probe_timeout))?;
    let reboot = resolve_restart_config(&probes)?;

    let settings = MaintenanceSettings {
        units: config.maintenance.units_for(role),
        stack_image: config.maintenance.stack_image().map(str::to_string),
        insecure_fetch: rkt_fetch_insecure,
    };
    info!(
        %role,
        units = ?settings.units,
        stack_image = ?settings.stack_image,
        insecure_fetch = rkt_fetch_insecure,
        "maintenance configured"
    );

    let fetcher = Arc::new(RktFetcher::new(&config.maintenance.rkt_bin, command_timeout));
    let restarter = Arc::new(SystemdRestarter::new(
        &config.maintenance.systemctl_bin,
        command_timeout,
    ));

    Ok(Runtime::new(
        role,
        reboot,
        probes,
        probe_timeout,
        settings,
        fetcher,
        restarter,
    ))
}
