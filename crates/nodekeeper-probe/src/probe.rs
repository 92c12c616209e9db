//! The liveness probe type.

use std::collections::BTreeMap;
use std::fmt;

use http::Uri;
use serde::Serialize;
use tracing::debug;

use crate::checker::SharedChecker;

/// Metadata key holding the reboot-coordination endpoint.
pub const REBOOT_ENDPOINT_KEY: &str = "reboot-endpoint";
/// Metadata key holding the reboot-coordination lock name.
pub const REBOOT_LOCK_KEY: &str = "reboot-lock";

/// Outcome of one liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeStatus {
    /// The target answered with a 2xx.
    Up,
    /// The target answered, but not with a 2xx.
    Down,
    /// No answer: connection error, protocol error or timeout.
    CheckError,
}

impl ProbeStatus {
    pub fn is_up(self) -> bool {
        self == ProbeStatus::Up
    }
}

/// What a probe offers beyond its up/down answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeKind {
    /// A plain liveness check.
    Liveness,
    /// A liveness check whose target also hosts cluster configuration,
    /// exposed as string metadata.
    ClusterConfig(BTreeMap<String, String>),
}

/// A named check against one HTTP target.
///
/// Built once at startup and shared read-only by every health query.
#[derive(Clone)]
pub struct LivenessProbe {
    name: String,
    target: Uri,
    kind: ProbeKind,
    checker: SharedChecker,
}

impl LivenessProbe {
    pub fn new(name: impl Into<String>, target: Uri, checker: SharedChecker) -> Self {
        Self {
            name: name.into(),
            target,
            kind: ProbeKind::Liveness,
            checker,
        }
    }

    /// Mark this probe as a cluster-configuration provider.
    pub fn with_cluster_config(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.kind = ProbeKind::ClusterConfig(metadata);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Uri {
        &self.target
    }

    pub fn kind(&self) -> &ProbeKind {
        &self.kind
    }

    /// Cluster-configuration metadata, present only on provider probes.
    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            ProbeKind::Liveness => None,
            ProbeKind::ClusterConfig(metadata) => Some(metadata),
        }
    }

    /// Run the check once.
    pub async fn check(&self) -> ProbeStatus {
        match self.checker.check(&self.target).await {
            Ok(status) if status.is_success() => ProbeStatus::Up,
            Ok(status) => {
                debug!(probe = %self.name, target = %self.target, %status, "probe non-2xx");
                ProbeStatus::Down
            }
            Err(e) => {
                debug!(probe = %self.name, target = %self.target, error = %e, "probe check failed");
                ProbeStatus::CheckError
            }
        }
    }
}

impl fmt::Debug for LivenessProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessProbe")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;

    use super::*;
    use crate::checker::{CheckFuture, Checker};
    use crate::error::ProbeCheckError;

    /// Answers every check with a fixed outcome.
    struct FixedChecker(Option<StatusCode>);

    impl Checker for FixedChecker {
        fn check<'a>(&'a self, _target: &'a Uri) -> CheckFuture<'a> {
            let outcome = self.0.ok_or_else(|| ProbeCheckError::Request("refused".into()));
            Box::pin(async move { outcome })
        }
    }

    fn probe(outcome: Option<StatusCode>) -> LivenessProbe {
        LivenessProbe::new(
            "kubelet",
            Uri::from_static("http://127.0.0.1:10248/healthz"),
            Arc::new(FixedChecker(outcome)),
        )
    }

    #[tokio::test]
    async fn success_is_up() {
        assert_eq!(probe(Some(StatusCode::OK)).check().await, ProbeStatus::Up);
        assert_eq!(probe(Some(StatusCode::NO_CONTENT)).check().await, ProbeStatus::Up);
    }

    #[tokio::test]
    async fn non_success_is_down() {
        let status = probe(Some(StatusCode::SERVICE_UNAVAILABLE)).check().await;
        assert_eq!(status, ProbeStatus::Down);
    }

    #[tokio::test]
    async fn checker_error_is_check_error() {
        assert_eq!(probe(None).check().await, ProbeStatus::CheckError);
    }

    #[test]
    fn plain_probe_has_no_metadata() {
        let p = probe(None);
        assert_eq!(p.kind(), &ProbeKind::Liveness);
        assert!(p.metadata().is_none());
    }

    #[test]
    fn cluster_config_probe_exposes_metadata() {
        let metadata = BTreeMap::from([(REBOOT_LOCK_KEY.to_string(), "kubernetes".to_string())]);
        let p = probe(None).with_cluster_config(metadata.clone());
        assert_eq!(p.metadata(), Some(&metadata));
    }

    #[test]
    fn status_serializes_as_variant_name() {
        let json = serde_json::to_string(&ProbeStatus::CheckError).unwrap();
        assert_eq!(json, "\"CheckError\"");
    }
}
