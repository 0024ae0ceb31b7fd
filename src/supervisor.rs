//! Supervision runtime: one supervisor per process group plus a top-level
//! supervisor wiring restart propagation across the dependency graph.

pub mod group;
pub mod root;

use std::fmt::{self, Display};

pub use group::GroupSupervisor;
pub use root::RootSupervisor;

/// Why a group is going through a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// A process of the group exited (or faulted) on its own.
    ProcessExit,
    /// Another party asked for the restart, e.g. a dependency restarting.
    ExternalRequest,
}

impl Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::ProcessExit => write!(f, "process exit"),
            RestartReason::ExternalRequest => write!(f, "external request"),
        }
    }
}

/// Notifications published by group supervisors for the top-level
/// supervisor's dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    GroupRestarting { group: String, reason: RestartReason },
}
