//! Maintenance error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for maintenance operations.
pub type MaintenanceResult<T> = Result<T, MaintenanceActionError>;

/// An external command (rkt, systemctl) did not succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        /// Rendered exit status, e.g. "exit status: 1".
        status: String,
        stderr: String,
    },
}

/// A maintenance action failed. Never fatal to the agent.
#[derive(Debug, Error)]
pub enum MaintenanceActionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("fetch of {image} failed: {source}")]
    Fetch {
        image: String,
        #[source]
        source: CommandError,
    },

    #[error("restart of {unit} failed: {source}")]
    Restart {
        unit: String,
        #[source]
        source: CommandError,
    },

    #[error("maintenance task aborted: {0}")]
    Aborted(String),
}
