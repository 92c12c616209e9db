//! nodekeeper-runtime: the agent's long-lived services.
//!
//! # Architecture
//!
//! ```text
//! Runtime
//!   ├── RuntimeConfig          (reboot endpoint + lock, immutable)
//!   ├── RestartCoordinator     (one RwLock: health = read, restart = write)
//!   ├── HealthService          (read permit → all probes → HealthReport)
//!   └── MaintenanceService
//!       ├── fetch_image        (no permit)
//!       └── restart_managed_stack (write permit → fetch → restart units)
//! ```
//!
//! The permit types release on drop, so a failed, panicking or cancelled
//! restart can never leave `/healthz` wedged.

pub mod actions;
pub mod coordinator;
pub mod error;
pub mod health;
pub mod maintenance;
pub mod runtime;

pub use actions::{
    CommandFuture, ImageFetcher, RktFetcher, ServiceRestarter, SharedFetcher, SharedRestarter,
    SystemdRestarter,
};
pub use coordinator::{HealthCheckPermit, LockState, RestartCoordinator, RestartPermit};
pub use error::{CommandError, MaintenanceActionError, MaintenanceResult};
pub use health::{HealthReport, HealthService, OverallStatus, VersionInfo};
pub use maintenance::{MaintenanceService, MaintenanceSettings, RestartSummary};
pub use runtime::Runtime;
