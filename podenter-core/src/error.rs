//! Error types for Podenter

use std::time::Duration;

use thiserror::Error;

/// Podenter error types
///
/// Variants are grouped by the stage of an invocation that produces them.
/// Nothing here is retried automatically: every variant except
/// [`Error::Cleanup`] is terminal for the invocation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// System error from nix
    #[error("System error: {0}")]
    System(#[from] nix::Error),

    /// Invalid configuration (missing identifiers, empty command, ...)
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Container runtime kind is not one of the supported backends
    #[error("Unsupported container runtime: {runtime}")]
    UnsupportedRuntime {
        /// Runtime name as given
        runtime: String,
    },

    /// Target workload or container could not be resolved
    #[error("Resolution failed: {message}")]
    Resolution {
        /// Error message
        message: String,
    },

    /// Runtime socket could not be reached
    #[error("Runtime endpoint {endpoint} unreachable: {message}")]
    RuntimeUnreachable {
        /// Socket path or endpoint
        endpoint: String,
        /// Error message
        message: String,
    },

    /// Runtime does not know the container
    #[error("Container {id} not found: {message}")]
    ContainerNotFound {
        /// Runtime container id
        id: String,
        /// Error message
        message: String,
    },

    /// Inspect output could not be parsed
    #[error("Malformed inspect output: {message}")]
    MalformedInspect {
        /// Error message
        message: String,
    },

    /// Init pid present but not usable
    #[error("Failed to extract init pid: {message}")]
    PidExtraction {
        /// Error message
        message: String,
    },

    /// Helper workload creation was rejected
    #[error("Failed to create helper workload: {message}")]
    Scheduling {
        /// Error message
        message: String,
    },

    /// Helper workload status could not be observed
    #[error("Failed to watch helper workload: {message}")]
    Lifecycle {
        /// Error message
        message: String,
    },

    /// Helper workload did not start in time
    #[error("Helper workload {name} not running after {}s", .after.as_secs())]
    Timeout {
        /// Helper workload name
        name: String,
        /// Configured timeout
        after: Duration,
    },

    /// Operator interrupted the invocation
    #[error("Interrupted by signal")]
    Interrupted,

    /// Interactive attach failed
    #[error("Failed to attach to helper workload: {message}")]
    Attach {
        /// Error message
        message: String,
    },

    /// Attach raced with helper completion
    #[error("Helper workload already completed: {message}")]
    AttachCompleted {
        /// Error message
        message: String,
    },

    /// Log stream could not be opened or read
    #[error("Failed to stream helper logs: {message}")]
    LogStream {
        /// Error message
        message: String,
    },

    /// Helper workload could not be deleted
    #[error("Failed to delete helper workload {name}: {message}")]
    Cleanup {
        /// Helper workload name
        name: String,
        /// Error message
        message: String,
    },

    /// Namespace operation failed
    #[error("Namespace error: {message}")]
    Namespace {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Whether an attach failure only means the helper already exited
    #[must_use]
    pub const fn is_attach_completed(&self) -> bool {
        matches!(self, Self::AttachCompleted { .. })
    }
}

/// Result type alias for Podenter operations
pub type Result<T> = std::result::Result<T, Error>;
