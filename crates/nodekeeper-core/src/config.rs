//! agent.toml configuration parser.
//!
//! Every section is optional; a missing file or a missing key falls back to
//! the defaults of a CoreOS Kubernetes node. The node role and the
//! insecure-fetch flag are command-line inputs and never come from here.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::types::NodeRole;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub probes: ProbeTargets,
    pub reboot: RebootConfig,
    pub maintenance: MaintenanceConfig,
    pub timeouts: TimeoutsConfig,
}

/// Liveness targets queried by `/healthz`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeTargets {
    pub kubelet: String,
    pub kube_proxy: String,
    /// Fleet etcd also hosts the locksmith reboot semaphore.
    pub etcd_fleet: String,
    pub kube_apiserver: String,
    pub kube_controller_manager: String,
    pub kube_scheduler: String,
    pub etcd_kubernetes: String,
    /// Additional probes queried on every role.
    pub extra: Vec<ExtraProbe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraProbe {
    pub name: String,
    pub target: String,
}

impl Default for ProbeTargets {
    fn default() -> Self {
        Self {
            kubelet: "http://127.0.0.1:10248/healthz".to_string(),
            kube_proxy: "http://127.0.0.1:10256/healthz".to_string(),
            etcd_fleet: "http://127.0.0.1:4001/health".to_string(),
            kube_apiserver: "http://127.0.0.1:8080/healthz".to_string(),
            kube_controller_manager: "http://127.0.0.1:10252/healthz".to_string(),
            kube_scheduler: "http://127.0.0.1:10251/healthz".to_string(),
            etcd_kubernetes: "http://127.0.0.1:2379/health".to_string(),
            extra: Vec::new(),
        }
    }
}

/// Cluster-wide reboot coordination (locksmith).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebootConfig {
    /// Semaphore name to take before restarting this node's stack.
    pub lock: String,
    /// Overrides the endpoint derived from the fleet etcd probe.
    pub endpoint: Option<String>,
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            lock: "kubernetes".to_string(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Image fetched by `/hack/rkt/fetch` when the request names none, and
    /// pre-fetched before a stack restart. Empty disables both.
    pub stack_image: String,
    pub worker_units: Vec<String>,
    /// Restarted after the worker units on control-plane nodes.
    pub control_plane_units: Vec<String>,
    pub rkt_bin: String,
    pub systemctl_bin: String,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            stack_image: "quay.io/coreos/hyperkube:v1.7.7_coreos.0".to_string(),
            worker_units: vec![
                "kubelet.service".to_string(),
                "kube-proxy.service".to_string(),
            ],
            control_plane_units: vec![
                "kube-apiserver.service".to_string(),
                "kube-controller-manager.service".to_string(),
                "kube-scheduler.service".to_string(),
            ],
            rkt_bin: "rkt".to_string(),
            systemctl_bin: "systemctl".to_string(),
        }
    }
}

impl MaintenanceConfig {
    /// Units making up the managed stack for `role`, in restart order.
    pub fn units_for(&self, role: NodeRole) -> Vec<String> {
        let mut units = self.worker_units.clone();
        if role.is_control_plane() {
            units.extend(self.control_plane_units.iter().cloned());
        }
        units
    }

    /// The configured stack image, or `None` when it is blank.
    pub fn stack_image(&self) -> Option<&str> {
        let image = self.stack_image.trim();
        (!image.is_empty()).then_some(image)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Bound on one liveness probe exchange.
    pub probe: String,
    /// Bound on one rkt/systemctl invocation.
    pub command: String,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            probe: "2s".to_string(),
            command: "2s".to_string(),
        }
    }
}

impl TimeoutsConfig {
    pub fn probe_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.probe).context("timeouts.probe")
    }

    pub fn command_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.command).context("timeouts.command")
    }
}

impl AgentConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: AgentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values that would only fail later, at request time.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.timeouts.probe_timeout()?;
        self.timeouts.command_timeout()?;
        if self.maintenance.worker_units.iter().any(|u| u.trim().is_empty()) {
            anyhow::bail!("maintenance.worker_units contains an empty unit name");
        }
        if self
            .maintenance
            .control_plane_units
            .iter()
            .any(|u| u.trim().is_empty())
        {
            anyhow::bail!("maintenance.control_plane_units contains an empty unit name");
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = AgentConfig::from_toml_str("").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.reboot.lock, "kubernetes");
        assert_eq!(config.timeouts.probe_timeout().unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_partial_override() {
        let toml_str = r#"
[probes]
kubelet = "http://10.0.0.5:10248/healthz"

[reboot]
lock = "restart-k8s"
endpoint = "http://10.0.0.1:4001"

[timeouts]
probe = "500ms"
"#;
        let config = AgentConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.probes.kubelet, "http://10.0.0.5:10248/healthz");
        assert_eq!(config.probes.kube_proxy, ProbeTargets::default().kube_proxy);
        assert_eq!(config.reboot.lock, "restart-k8s");
        assert_eq!(config.reboot.endpoint.as_deref(), Some("http://10.0.0.1:4001"));
        assert_eq!(config.timeouts.probe_timeout().unwrap(), Duration::from_millis(500));
        assert_eq!(config.timeouts.command_timeout().unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_extra_probes() {
        let toml_str = r#"
[[probes.extra]]
name = "rkt-api"
target = "http://127.0.0.1:8088/healthz"
"#;
        let config = AgentConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(
            config.probes.extra,
            vec![ExtraProbe {
                name: "rkt-api".to_string(),
                target: "http://127.0.0.1:8088/healthz".to_string(),
            }]
        );
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let err = AgentConfig::from_toml_str("[timeouts]\ncommand = \"forever\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("timeouts.command"));
    }

    #[test]
    fn test_empty_unit_rejected() {
        let toml_str = "[maintenance]\nworker_units = [\"kubelet.service\", \" \"]\n";
        assert!(AgentConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_units_are_additive_for_control_plane() {
        let maintenance = MaintenanceConfig::default();
        let worker = maintenance.units_for(NodeRole::Worker);
        let control_plane = maintenance.units_for(NodeRole::ControlPlane);
        assert_eq!(worker, vec!["kubelet.service", "kube-proxy.service"]);
        assert_eq!(control_plane.len(), 5);
        assert_eq!(&control_plane[..2], worker.as_slice());
    }

    #[test]
    fn test_blank_stack_image_is_none() {
        let mut maintenance = MaintenanceConfig::default();
        assert!(maintenance.stack_image().is_some());
        maintenance.stack_image = "  ".to_string();
        assert_eq!(maintenance.stack_image(), None);
    }

    #[test]
    fn test_load_from_file_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        let mut config = AgentConfig::default();
        config.reboot.lock = "from-file".to_string();
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = AgentConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.reboot.lock, "from-file");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = AgentConfig::load(Some(Path::new("/nonexistent/agent.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
