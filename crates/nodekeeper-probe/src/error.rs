//! Error types for probe construction, checking and reboot-lock resolution.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for probe discovery.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// The probe set for this node could not be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("probe '{name}' has an invalid target '{target}': {reason}")]
    InvalidTarget {
        name: String,
        target: String,
        reason: String,
    },

    #[error("probe with target '{0}' has an empty name")]
    EmptyName(String),

    #[error("duplicate probe name: {0}")]
    DuplicateName(String),

    #[error("no liveness probes configured")]
    NoProbes,
}

/// No probe provides a usable reboot-coordination endpoint and lock.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationMissingError {
    #[error("no probe carries reboot-coordination metadata")]
    NoProvider,

    #[error("probe '{probe}' metadata has no '{key}' entry")]
    MissingKey { probe: String, key: &'static str },

    #[error("probe '{probe}' metadata has an empty '{key}' entry")]
    EmptyValue { probe: String, key: &'static str },
}

/// A single probe exchange failed before a status code was received.
#[derive(Debug, Error)]
pub enum ProbeCheckError {
    #[error("connect to {addr} failed: {reason}")]
    Connect { addr: String, reason: String },

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid target: {0}")]
    InvalidTarget(String),
}
