//! Probe discovery and reboot-lock resolution.
//!
//! Runs once at startup. Control-plane nodes get the worker probes plus the
//! control-plane ones; extra probes from `agent.toml` come last. The fleet
//! etcd probe is the cluster-configuration provider: locksmith keeps its
//! reboot semaphore in fleet etcd.

use std::collections::{BTreeMap, HashSet};

use http::Uri;
use nodekeeper_core::{AgentConfig, NodeRole};
use tracing::{debug, info};

use crate::checker::SharedChecker;
use crate::error::{ConfigurationMissingError, DiscoveryError, DiscoveryResult};
use crate::probe::{LivenessProbe, REBOOT_ENDPOINT_KEY, REBOOT_LOCK_KEY};

/// Where this node takes the cluster reboot lock.
///
/// Resolved once before the server starts and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub reboot_endpoint: String,
    pub reboot_lock: String,
}

/// Build the ordered probe set for `role`.
pub fn discover_probes(
    role: NodeRole,
    config: &AgentConfig,
    checker: SharedChecker,
) -> DiscoveryResult<Vec<LivenessProbe>> {
    let targets = &config.probes;
    let mut probes = Vec::new();

    probes.push(build_probe("kubelet", &targets.kubelet, &checker)?);
    probes.push(build_probe("kube-proxy", &targets.kube_proxy, &checker)?);

    let fleet = build_probe("etcd-fleet", &targets.etcd_fleet, &checker)?;
    let endpoint = config
        .reboot
        .endpoint
        .clone()
        .unwrap_or_else(|| origin(fleet.target()));
    let metadata = BTreeMap::from([
        (REBOOT_ENDPOINT_KEY.to_string(), endpoint),
        (REBOOT_LOCK_KEY.to_string(), config.reboot.lock.clone()),
    ]);
    probes.push(fleet.with_cluster_config(metadata));

    if role.is_control_plane() {
        probes.push(build_probe("kube-apiserver", &targets.kube_apiserver, &checker)?);
        probes.push(build_probe(
            "kube-controller-manager",
            &targets.kube_controller_manager,
            &checker,
        )?);
        probes.push(build_probe("kube-scheduler", &targets.kube_scheduler, &checker)?);
        probes.push(build_probe("etcd-kubernetes", &targets.etcd_kubernetes, &checker)?);
    }

    for extra in &targets.extra {
        if extra.name.trim().is_empty() {
            return Err(DiscoveryError::EmptyName(extra.target.clone()));
        }
        probes.push(build_probe(&extra.name, &extra.target, &checker)?);
    }

    ensure_unique(&probes)?;

    for probe in &probes {
        debug!(probe = probe.name(), target = %probe.target(), "liveness probe configured");
    }
    info!(%role, count = probes.len(), "liveness probes discovered");

    Ok(probes)
}

/// Extract the reboot endpoint and lock from the first provider probe.
pub fn resolve_restart_config(
    probes: &[LivenessProbe],
) -> Result<RuntimeConfig, ConfigurationMissingError> {
    let (probe, metadata) = probes
        .iter()
        .find_map(|p| p.metadata().map(|m| (p, m)))
        .ok_or(ConfigurationMissingError::NoProvider)?;

    let field = |key: &'static str| -> Result<String, ConfigurationMissingError> {
        let value = metadata
            .get(key)
            .ok_or_else(|| ConfigurationMissingError::MissingKey {
                probe: probe.name().to_string(),
                key,
            })?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigurationMissingError::EmptyValue {
                probe: probe.name().to_string(),
                key,
            });
        }
        Ok(value.to_string())
    };

    let config = RuntimeConfig {
        reboot_endpoint: field(REBOOT_ENDPOINT_KEY)?,
        reboot_lock: field(REBOOT_LOCK_KEY)?,
    };

    info!(
        provider = probe.name(),
        endpoint = %config.reboot_endpoint,
        lock = %config.reboot_lock,
        "reboot coordination resolved"
    );
    Ok(config)
}

fn build_probe(name: &str, raw: &str, checker: &SharedChecker) -> DiscoveryResult<LivenessProbe> {
    let invalid = |reason: &str| DiscoveryError::InvalidTarget {
        name: name.to_string(),
        target: raw.to_string(),
        reason: reason.to_string(),
    };

    let target: Uri = raw.trim().parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    if target.scheme_str() != Some("http") {
        return Err(invalid("scheme must be http"));
    }
    if target.authority().is_none() {
        return Err(invalid("missing host"));
    }

    Ok(LivenessProbe::new(name, target, checker.clone()))
}

fn ensure_unique(probes: &[LivenessProbe]) -> DiscoveryResult<()> {
    if probes.is_empty() {
        return Err(DiscoveryError::NoProbes);
    }
    let mut seen = HashSet::new();
    for probe in probes {
        if !seen.insert(probe.name()) {
            return Err(DiscoveryError::DuplicateName(probe.name().to_string()));
        }
    }
    Ok(())
}

/// `scheme://authority` of a target, the address locksmith clients dial.
fn origin(target: &Uri) -> String {
    match (target.scheme_str(), target.authority()) {
        (Some(scheme), Some(authority)) => format!("{scheme}://{authority}"),
        _ => target.to_string(),
    }
}
