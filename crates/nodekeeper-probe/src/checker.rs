//! HTTP liveness checks.
//!
//! A [`Checker`] turns a probe target into the status code it answered
//! with. The production [`HttpChecker`] opens a fresh TCP connection per
//! check and speaks HTTP/1.1 through hyper, bounded by a fixed timeout.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use http::{StatusCode, Uri};
use tracing::debug;

use crate::error::ProbeCheckError;

/// Boxed future alias for checker results.
pub type CheckFuture<'a> =
    Pin<Box<dyn Future<Output = Result<StatusCode, ProbeCheckError>> + Send + 'a>>;

/// Performs one check against a target. Injected for testability.
pub trait Checker: Send + Sync {
    /// Query `target` once and return the status code it answered with.
    fn check<'a>(&'a self, target: &'a Uri) -> CheckFuture<'a>;
}

pub type SharedChecker = Arc<dyn Checker>;

/// Plain-HTTP checker with a per-check timeout.
#[derive(Debug, Clone)]
pub struct HttpChecker {
    timeout: Duration,
}

impl HttpChecker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn shared(timeout: Duration) -> SharedChecker {
        Arc::new(Self::new(timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Checker for HttpChecker {
    fn check<'a>(&'a self, target: &'a Uri) -> CheckFuture<'a> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, http_get(target)).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(%target, timeout = ?self.timeout, "liveness check timed out");
                    Err(ProbeCheckError::Timeout(self.timeout))
                }
            }
        })
    }
}

/// Issue a single `GET` against `target` and return its status code.
async fn http_get(target: &Uri) -> Result<StatusCode, ProbeCheckError> {
    let authority = target
        .authority()
        .ok_or_else(|| ProbeCheckError::InvalidTarget(target.to_string()))?;
    let addr = match authority.port_u16() {
        Some(_) => authority.as_str().to_string(),
        None => format!("{}:80", authority.host()),
    };

    let stream = tokio::net::TcpStream::connect(&addr)
        .await
        .map_err(|e| ProbeCheckError::Connect {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| ProbeCheckError::Handshake(e.to_string()))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let path = target.path_and_query().map_or("/", |pq| pq.as_str());
    let req = http::Request::builder()
        .method("GET")
        .uri(path)
        .header("host", authority.as_str())
        .header("user-agent", concat!("nodekeeper/", env!("CARGO_PKG_VERSION")))
        .body(http_body_util::Empty::<bytes::Bytes>::new())
        .map_err(|e| ProbeCheckError::Request(e.to_string()))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| ProbeCheckError::Request(e.to_string()))?;

    Ok(resp.status())
}
