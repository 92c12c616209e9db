//! nodekeeper-probe: liveness probes for the node agent.
//!
//! Builds the set of HTTP liveness probes a node must answer for and
//! resolves, from that set, where the cluster reboot lock lives.
//!
//! # Architecture
//!
//! ```text
//! discover_probes(role, config)
//!   ├── worker probes        (kubelet, kube-proxy, etcd-fleet)
//!   ├── control-plane probes (apiserver, controller-manager, scheduler, etcd)
//!   └── extra probes         (from agent.toml)
//!
//! resolve_restart_config(probes)
//!   └── first ProbeKind::ClusterConfig → RuntimeConfig { endpoint, lock }
//! ```
//!
//! Every probe shares one [`Checker`]. Production code uses
//! [`HttpChecker`], which performs a single bounded HTTP/1.1 GET.

pub mod checker;
pub mod discovery;
pub mod error;
pub mod probe;

pub use checker::{CheckFuture, Checker, HttpChecker, SharedChecker};
pub use discovery::{discover_probes, resolve_restart_config, RuntimeConfig};
pub use error::{ConfigurationMissingError, DiscoveryError, DiscoveryResult, ProbeCheckError};
pub use probe::{LivenessProbe, ProbeKind, ProbeStatus, REBOOT_ENDPOINT_KEY, REBOOT_LOCK_KEY};
