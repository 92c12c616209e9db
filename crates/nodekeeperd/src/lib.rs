//! nodekeeperd: the per-node agent.
//!
//! Startup is strictly ordered and fails fast:
//!
//! 1. Load `agent.toml` (exit 1 on error)
//! 2. Discover liveness probes for the node role (exit 2 on error)
//! 3. Resolve the reboot endpoint and lock from the probes (exit 3 on error)
//! 4. Build the runtime and serve the API until SIGINT/SIGTERM
//!
//! There is no degraded mode: without a reboot lock the agent cannot
//! coordinate restarts, so it does not serve at all.

pub mod server;
pub mod startup;

pub use startup::{StartupError, build_runtime};
