//! Stream descriptors and lifecycle states.
//!
//! A stream is a named, partitioned, append-only log owned by the remote
//! service. The service provisions and tears down streams asynchronously, so
//! a descriptor held by the client is only a snapshot; the authoritative
//! lifecycle state lives server-side and is refreshed by polling.

use serde::{Deserialize, Serialize};

/// Provisioning status of a stream.
///
/// Transitions are driven entirely by the service:
/// `Creating -> Active -> Deleting -> Deleted`, with `Failed` as a terminal
/// error state reachable from `Creating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Creating,
    Active,
    Deleting,
    Deleted,
    Failed,
}

impl LifecycleState {
    /// Whether this state can never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Deleted | LifecycleState::Failed)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Creating => "Creating",
            LifecycleState::Active => "Active",
            LifecycleState::Deleting => "Deleting",
            LifecycleState::Deleted => "Deleted",
            LifecycleState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Read-only snapshot of a stream as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Opaque service-assigned identity.
    pub id: String,

    /// Display name. Treated as effectively unique within a compartment by
    /// convention, not enforced by the service.
    pub name: String,

    /// Number of partitions. Fixed at creation.
    pub partitions: u32,

    /// Lifecycle state at the time of the snapshot.
    pub lifecycle_state: LifecycleState,
}

impl StreamDescriptor {
    pub fn is_active(&self) -> bool {
        self.lifecycle_state == LifecycleState::Active
    }
}
