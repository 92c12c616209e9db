//! Shared types used across nodekeeper crates.

/// Role of the node the agent runs on.
///
/// Control-plane nodes run every worker component plus the Kubernetes
/// control-plane services, so anything keyed on the role is additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Worker,
    ControlPlane,
}

impl NodeRole {
    /// Map the `--control-plane` flag onto a role.
    pub fn from_control_plane_flag(is_control_plane: bool) -> Self {
        if is_control_plane {
            NodeRole::ControlPlane
        } else {
            NodeRole::Worker
        }
    }

    pub fn is_control_plane(self) -> bool {
        self == NodeRole::ControlPlane
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeRole::Worker => "worker",
            NodeRole::ControlPlane => "control-plane",
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
