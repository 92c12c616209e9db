pub mod config;
pub mod duration;
pub mod types;

pub use config::{AgentConfig, ExtraProbe, MaintenanceConfig, ProbeTargets, RebootConfig, TimeoutsConfig};
pub use duration::{parse_duration, DurationError};
pub use types::NodeRole;
