//! Privileged node actions: image fetch and unit restart.
//!
//! The maintenance service only sees the [`ImageFetcher`] and
//! [`ServiceRestarter`] traits. Production implementations shell out to
//! `rkt` and `systemctl` with a hard timeout; the child is killed if the
//! timeout fires.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::CommandError;

/// Boxed future alias for collaborator results.
pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + 'a>>;

/// Fetches a container image into the local store. Injected for testability.
pub trait ImageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, image_ref: &'a str, insecure: bool) -> CommandFuture<'a>;
}

/// Restarts one service-manager unit. Injected for testability.
pub trait ServiceRestarter: Send + Sync {
    fn restart<'a>(&'a self, unit: &'a str) -> CommandFuture<'a>;
}

pub type SharedFetcher = Arc<dyn ImageFetcher>;
pub type SharedRestarter = Arc<dyn ServiceRestarter>;

/// `rkt fetch` into the node's image store.
#[derive(Debug, Clone)]
pub struct RktFetcher {
    bin: String,
    timeout: Duration,
}

impl RktFetcher {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    fn args(image_ref: &str, insecure: bool) -> Vec<String> {
        let mut args = vec!["fetch".to_string()];
        if insecure {
            args.push("--insecure-options=all".to_string());
        }
        args.push(image_ref.to_string());
        args
    }
}

impl ImageFetcher for RktFetcher {
    fn fetch<'a>(&'a self, image_ref: &'a str, insecure: bool) -> CommandFuture<'a> {
        Box::pin(async move {
            info!(image = image_ref, insecure, "fetching image");
            run_command(&self.bin, &Self::args(image_ref, insecure), self.timeout).await
        })
    }
}

/// `systemctl restart` of a single unit.
#[derive(Debug, Clone)]
pub struct SystemdRestarter {
    bin: String,
    timeout: Duration,
}

impl SystemdRestarter {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

impl ServiceRestarter for SystemdRestarter {
    fn restart<'a>(&'a self, unit: &'a str) -> CommandFuture<'a> {
        Box::pin(async move {
            info!(unit, "restarting unit");
            let args = ["restart".to_string(), unit.to_string()];
            run_command(&self.bin, &args, self.timeout).await
        })
    }
}

/// Run `program args...` to completion within `timeout`.
async fn run_command(program: &str, args: &[String], timeout: Duration) -> Result<(), CommandError> {
    debug!(program, ?args, ?timeout, "running command");

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, output).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(CommandError::Spawn {
                program: program.to_string(),
                reason: e.to_string(),
            });
        }
        Err(_) => {
            return Err(CommandError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    debug!(program, "command succeeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn rkt_args_insecure() {
        assert_eq!(
            RktFetcher::args("quay.io/coreos/hyperkube:v1.7.7_coreos.0", true),
            vec![
                "fetch",
                "--insecure-options=all",
                "quay.io/coreos/hyperkube:v1.7.7_coreos.0"
            ]
        );
    }

    #[test]
    fn rkt_args_secure() {
        assert_eq!(RktFetcher::args("img", false), vec!["fetch", "img"]);
    }

    #[tokio::test]
    async fn command_success() {
        run_command("sh", &sh("exit 0"), Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn command_failure_carries_stderr() {
        let err = run_command("sh", &sh("echo 'unit not found' >&2; exit 5"), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            CommandError::Failed { program, status, stderr } => {
                assert_eq!(program, "sh");
                assert!(status.contains('5'));
                assert_eq!(stderr, "unit not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn command_timeout() {
        let err = run_command("sh", &sh("sleep 10"), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::Timeout {
                program: "sh".to_string(),
                timeout: Duration::from_millis(200),
            }
        );
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let err = run_command("/nonexistent/rkt", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[tokio::test]
    async fn systemd_restarter_passes_unit() {
        // `echo` stands in for systemctl and always succeeds.
        let restarter = SystemdRestarter::new("echo", Duration::from_secs(5));
        restarter.restart("kubelet.service").await.unwrap();
    }

    #[tokio::test]
    async fn rkt_fetcher_reports_failure() {
        let fetcher = RktFetcher::new("false", Duration::from_secs(5));
        let err = fetcher.fetch("img", true).await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
    }
}
