//! Health aggregation.
//!
//! A node is healthy iff every configured probe reports `Up`. The report
//! always carries one entry per probe so callers can see which check failed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use nodekeeper_probe::{LivenessProbe, ProbeStatus};
use serde::Serialize;
use tracing::{debug, warn};

use crate::coordinator::RestartCoordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverallStatus {
    Healthy,
    Unhealthy,
}

/// Aggregated result of one health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub probes: BTreeMap<String, ProbeStatus>,
}

impl HealthReport {
    pub fn from_results(results: impl IntoIterator<Item = (String, ProbeStatus)>) -> Self {
        let probes: BTreeMap<_, _> = results.into_iter().collect();
        let status = if probes.values().all(|s| s.is_up()) {
            OverallStatus::Healthy
        } else {
            OverallStatus::Unhealthy
        };
        Self { status, probes }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Healthy
    }

    /// Names of probes that did not report `Up`.
    pub fn failing(&self) -> Vec<&str> {
        self.probes
            .iter()
            .filter(|(_, s)| !s.is_up())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Build metadata served on `/version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_rev: Option<&'static str>,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            name: "nodekeeperd",
            version: env!("CARGO_PKG_VERSION"),
            git_rev: option_env!("NODEKEEPER_GIT_REV"),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)?;
        if let Some(rev) = self.git_rev {
            write!(f, " ({rev})")?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct HealthService {
    probes: Arc<[LivenessProbe]>,
    coordinator: RestartCoordinator,
    /// Upper bound on a single probe, on top of the checker's own timeout.
    check_timeout: Duration,
}

impl HealthService {
    pub fn new(
        probes: Vec<LivenessProbe>,
        coordinator: RestartCoordinator,
        check_timeout: Duration,
    ) -> Self {
        Self {
            probes: probes.into(),
            coordinator,
            check_timeout,
        }
    }

    pub fn probes(&self) -> &[LivenessProbe] {
        &self.probes
    }

    /// Query every probe under a shared restart-lock permit.
    pub async fn check_health(&self) -> HealthReport {
        let _permit = self.coordinator.acquire_for_health_check().await;

        let checks = self.probes.iter().map(|probe| async move {
            let status = match tokio::time::timeout(self.check_timeout, probe.check()).await {
                Ok(status) => status,
                Err(_) => {
                    debug!(probe = probe.name(), "probe exceeded check timeout");
                    ProbeStatus::CheckError
                }
            };
            (probe.name().to_string(), status)
        });
        let report = HealthReport::from_results(join_all(checks).await);

        if report.is_healthy() {
            debug!(probes = report.probes.len(), "node healthy");
        } else {
            warn!(failing = ?report.failing(), "node unhealthy");
        }
        report
    }

    pub fn version_info(&self) -> VersionInfo {
        VersionInfo::current()
    }
}

impl fmt::Debug for HealthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthService")
            .field("probes", &self.probes)
            .field("check_timeout", &self.check_timeout)
            .finish_non_exhaustive()
    }
}
