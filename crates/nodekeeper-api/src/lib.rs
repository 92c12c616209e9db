//! nodekeeper-api: HTTP control surface of the node agent.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Aggregated liveness of the node's probes |
//! | GET | `/version` | Build version string |
//! | POST | `/hack/rkt/fetch` | Fetch an image (default: the stack image) |
//! | POST | `/hack/systemd/restart/kubernetes` | Restart the managed stack |
//!
//! `/healthz` answers 200 even when the node is unhealthy; the verdict is in
//! the body.

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use nodekeeper_runtime::Runtime;

/// Build the agent router.
pub fn build_router(runtime: Runtime) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/version", get(handlers::version))
        .route("/hack/rkt/fetch", post(handlers::hack_rkt_fetch))
        .route(
            "/hack/systemd/restart/kubernetes",
            post(handlers::hack_systemd_restart_kubernetes),
        )
        .with_state(runtime)
}
