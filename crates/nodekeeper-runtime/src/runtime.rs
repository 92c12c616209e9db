//! The agent's aggregate root.

use std::sync::Arc;
use std::time::Duration;

use nodekeeper_core::NodeRole;
use nodekeeper_probe::{LivenessProbe, RuntimeConfig};

use crate::actions::{SharedFetcher, SharedRestarter};
use crate::coordinator::RestartCoordinator;
use crate::health::HealthService;
use crate::maintenance::{MaintenanceService, MaintenanceSettings};

/// Everything a request handler needs, built once at startup.
///
/// Cloning is cheap: all state is behind `Arc`s, and the health and
/// maintenance services share the same [`RestartCoordinator`].
#[derive(Debug, Clone)]
pub struct Runtime {
    role: NodeRole,
    reboot: Arc<RuntimeConfig>,
    coordinator: RestartCoordinator,
    health: HealthService,
    maintenance: MaintenanceService,
}

impl Runtime {
    pub fn new(
        role: NodeRole,
        reboot: RuntimeConfig,
        probes: Vec<LivenessProbe>,
        probe_timeout: Duration,
        settings: MaintenanceSettings,
        fetcher: SharedFetcher,
        restarter: SharedRestarter,
    ) -> Self {
        let coordinator = RestartCoordinator::new();
        let health = HealthService::new(probes, coordinator.clone(), probe_timeout);
        let maintenance =
            MaintenanceService::new(coordinator.clone(), fetcher, restarter, settings);
        Self {
            role,
            reboot: Arc::new(reboot),
            coordinator,
            health,
            maintenance,
        }
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn reboot(&self) -> &RuntimeConfig {
        &self.reboot
    }

    pub fn coordinator(&self) -> &RestartCoordinator {
        &self.coordinator
    }

    pub fn health(&self) -> &HealthService {
        &self.health
    }

    pub fn maintenance(&self) -> &MaintenanceService {
        &self.maintenance
    }
}
