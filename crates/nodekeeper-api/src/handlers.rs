//! Agent API handlers.
//!
//! Each handler calls into the `Runtime` services and returns JSON, except
//! `/version` which is plain text. Maintenance failures become error
//! responses here and never reach the server loop.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nodekeeper_runtime::{MaintenanceActionError, Runtime};
use serde::Deserialize;
use tracing::warn;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

fn maintenance_error(e: &MaintenanceActionError) -> Response {
    let status = match e {
        MaintenanceActionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        MaintenanceActionError::Fetch { .. } | MaintenanceActionError::Restart { .. } => {
            StatusCode::BAD_GATEWAY
        }
        MaintenanceActionError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(error = %e, %status, "maintenance action failed");
    error_response(&e.to_string(), status)
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz(State(runtime): State<Runtime>) -> Response {
    let report = runtime.health().check_health().await;
    ApiResponse::ok(report).into_response()
}

/// GET /version
pub async fn version(State(runtime): State<Runtime>) -> String {
    runtime.health().version_info().to_string()
}

// ── Maintenance ────────────────────────────────────────────────

/// Optional body of `POST /hack/rkt/fetch`.
#[derive(Debug, Default, Deserialize)]
pub struct FetchRequest {
    pub image: Option<String>,
}

/// POST /hack/rkt/fetch
pub async fn hack_rkt_fetch(State(runtime): State<Runtime>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        FetchRequest::default()
    } else {
        match serde_json::from_slice::<FetchRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                return error_response(
                    &format!("invalid request body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        }
    };

    let maintenance = runtime.maintenance();
    let settings = maintenance.settings();
    let Some(image) = request.image.or_else(|| settings.stack_image.clone()) else {
        return error_response(
            "no image given and no stack image configured",
            StatusCode::BAD_REQUEST,
        );
    };

    match maintenance.fetch_image(&image, settings.insecure_fetch).await {
        Ok(()) => ApiResponse::ok(serde_json::json!({
            "image": image,
            "insecure": settings.insecure_fetch,
        }))
        .into_response(),
        Err(e) => maintenance_error(&e),
    }
}

/// POST /hack/systemd/restart/kubernetes
///
/// The restart runs in its own task so a client hanging up cannot cancel
/// it halfway; the response waits for the task either way.
pub async fn hack_systemd_restart_kubernetes(State(runtime): State<Runtime>) -> Response {
    let maintenance = runtime.maintenance().clone();
    let task = tokio::spawn(async move { maintenance.restart_managed_stack().await });

    let result = match task.await {
        Ok(result) => result,
        Err(e) => Err(MaintenanceActionError::Aborted(e.to_string())),
    };

    match result {
        Ok(summary) => ApiResponse::ok(summary).into_response(),
        Err(e) => maintenance_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use http::Uri;
    use nodekeeper_core::NodeRole;
    use nodekeeper_probe::{CheckFuture, Checker, LivenessProbe, RuntimeConfig};
    use nodekeeper_runtime::{
        CommandError, CommandFuture, ImageFetcher, MaintenanceSettings, ServiceRestarter,
    };

    use super::*;

    struct Fake {
        up: bool,
        fail_commands: bool,
    }

    impl Checker for Fake {
        fn check<'a>(&'a self, _target: &'a Uri) -> CheckFuture<'a> {
            let status = if self.up { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
            Box::pin(async move { Ok(status) })
        }
    }

    impl Fake {
        fn outcome(&self) -> Result<(), CommandError> {
            if self.fail_commands {
                Err(CommandError::Spawn {
                    program: "rkt".to_string(),
                    reason: "not installed".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    impl ImageFetcher for Fake {
        fn fetch<'a>(&'a self, _image_ref: &'a str, _insecure: bool) -> CommandFuture<'a> {
            let outcome = self.outcome();
            Box::pin(async move { outcome })
        }
    }

    impl ServiceRestarter for Fake {
        fn restart<'a>(&'a self, _unit: &'a str) -> CommandFuture<'a> {
            let outcome = self.outcome();
            Box::pin(async move { outcome })
        }
    }

    fn test_runtime(up: bool, fail_commands: bool, stack_image: Option<&str>) -> Runtime {
        let fake = Arc::new(Fake { up, fail_commands });
        let probe = LivenessProbe::new(
            "kubelet",
            Uri::from_static("http://127.0.0.1:10248/healthz"),
            fake.clone(),
        );
        Runtime::new(
            NodeRole::Worker,
            RuntimeConfig {
                reboot_endpoint: "http://127.0.0.1:4001".to_string(),
                reboot_lock: "kubernetes".to_string(),
            },
            vec![probe],
            Duration::from_secs(1),
            MaintenanceSettings {
                units: vec!["kubelet.service".to_string()],
                stack_image: stack_image.map(str::to_string),
                insecure_fetch: true,
            },
            fake.clone(),
            fake,
        )
    }

    #[tokio::test]
    async fn healthz_ok_when_healthy() {
        let resp = healthz(State(test_runtime(true, false, None))).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn healthz_still_ok_when_unhealthy() {
        let resp = healthz(State(test_runtime(false, false, None))).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn version_names_the_agent() {
        let body = version(State(test_runtime(true, false, None))).await;
        assert!(body.starts_with("nodekeeperd "));
    }

    #[tokio::test]
    async fn fetch_uses_stack_image_without_body() {
        let rt = test_runtime(true, false, Some("hyperkube:v1.7.7"));
        let resp = hack_rkt_fetch(State(rt), Bytes::new()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn fetch_without_any_image_is_bad_request() {
        let rt = test_runtime(true, false, None);
        let resp = hack_rkt_fetch(State(rt), Bytes::new()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fetch_with_malformed_body_is_bad_request() {
        let rt = test_runtime(true, false, Some("hyperkube:v1.7.7"));
        let resp = hack_rkt_fetch(State(rt), Bytes::from_static(b"{image")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fetch_failure_is_bad_gateway() {
        let rt = test_runtime(true, true, None);
        let body = Bytes::from_static(br#"{"image":"quay.io/coreos/etcd:v3.2"}"#);
        let resp = hack_rkt_fetch(State(rt), body).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn restart_ok() {
        let resp = hack_systemd_restart_kubernetes(State(test_runtime(true, false, None))).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn restart_failure_is_bad_gateway() {
        let resp = hack_systemd_restart_kubernetes(State(test_runtime(true, true, None))).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn aborted_task_is_internal_error() {
        let resp = maintenance_error(&MaintenanceActionError::Aborted("panicked".to_string()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
