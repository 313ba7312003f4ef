//! Helper workload lifecycle events with structured tracing

use std::fmt;
use std::time::Duration;

use crate::HelperPhase;

/// Events emitted while a helper workload is driven through its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperEvent {
    /// Helper workload accepted by the cluster
    Created {
        /// Helper workload name
        name: String,
        /// Namespace it was created in
        namespace: String,
        /// Node it is pinned to
        node: String,
    },

    /// Watch observed a phase change
    PhaseObserved {
        /// Helper workload name
        name: String,
        /// Observed phase
        phase: HelperPhase,
    },

    /// Creation timeout fired before the helper settled
    TimedOut {
        /// Helper workload name
        name: String,
        /// Configured timeout
        after: Duration,
    },

    /// Operator signal received
    Interrupted {
        /// Helper workload name
        name: String,
    },

    /// Helper workload deleted
    Deleted {
        /// Helper workload name
        name: String,
    },

    /// Helper workload deletion failed
    CleanupFailed {
        /// Helper workload name
        name: String,
        /// Error message
        message: String,
    },
}

impl HelperEvent {
    /// Emit structured tracing event
    pub fn emit_trace(&self) {
        match self {
            Self::Created {
                name,
                namespace,
                node,
            } => {
                tracing::info!(
                    helper = %name,
                    namespace = %namespace,
                    node = %node,
                    event = "created",
                    "Helper workload created"
                );
            }
            Self::PhaseObserved { name, phase } => {
                tracing::debug!(
                    helper = %name,
                    phase = %phase,
                    event = "phase",
                    "Helper workload phase"
                );
            }
            Self::TimedOut { name, after } => {
                tracing::error!(
                    helper = %name,
                    timeout_secs = after.as_secs(),
                    event = "timed_out",
                    "Helper workload did not start in time"
                );
            }
            Self::Interrupted { name } => {
                tracing::warn!(
                    helper = %name,
                    event = "interrupted",
                    "Interrupted, removing helper workload"
                );
            }
            Self::Deleted { name } => {
                tracing::debug!(helper = %name, event = "deleted", "Helper workload deleted");
            }
            Self::CleanupFailed { name, message } => {
                tracing::warn!(
                    helper = %name,
                    message = %message,
                    event = "cleanup_failed",
                    "Failed to delete helper workload"
                );
            }
        }
    }
}

impl fmt::Display for HelperEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { name, node, .. } => write!(f, "Helper {name} created on {node}"),
            Self::PhaseObserved { name, phase } => write!(f, "Helper {name} is {phase}"),
            Self::TimedOut { name, after } => {
                write!(f, "Helper {name} not running after {:?}", after)
            }
            Self::Interrupted { name } => write!(f, "Helper {name} interrupted"),
            Self::Deleted { name } => write!(f, "Helper {name} deleted"),
            Self::CleanupFailed { name, message } => {
                write!(f, "Helper {name} cleanup failed: {message}")
            }
        }
    }
}

/// Scheduling or runtime event recorded by the cluster for an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterEvent {
    /// `Normal` or `Warning`
    pub kind: String,
    /// Short machine-readable reason
    pub reason: String,
    /// Human-readable message
    pub message: String,
}

impl fmt::Display for ClusterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.reason, self.message)
    }
}
