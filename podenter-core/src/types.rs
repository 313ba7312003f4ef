//! Core type definitions with strong typing and validation

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Container runtime backing a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    /// Docker engine (containers live in containerd's `moby` namespace)
    Docker,
    /// containerd through CRI (`k8s.io` namespace)
    Containerd,
    /// CRI-O
    CriO,
}

impl RuntimeKind {
    /// All supported runtime kinds
    pub const ALL: [Self; 3] = [Self::Docker, Self::Containerd, Self::CriO];

    /// Scheme used in container-status URIs and on the agent command line
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Containerd => "containerd",
            Self::CriO => "cri-o",
        }
    }

    /// Control socket the runtime listens on
    #[must_use]
    pub const fn default_socket(self) -> &'static str {
        match self {
            Self::Docker | Self::Containerd => "/run/containerd/containerd.sock",
            Self::CriO => "/var/run/crio/crio.sock",
        }
    }

    /// Namespace the runtime files its containers under, if any
    #[must_use]
    pub const fn runtime_namespace(self) -> Option<&'static str> {
        match self {
            Self::Docker => Some("moby"),
            Self::Containerd => Some("k8s.io"),
            Self::CriO => None,
        }
    }

    /// State directory that relative root paths are resolved against
    #[must_use]
    pub const fn state_dir(self) -> &'static str {
        match self {
            Self::Docker | Self::Containerd => "/run/containerd/io.containerd.runtime.v2.task",
            Self::CriO => "/run/containers/storage/overlay-containers",
        }
    }

    /// Host directory holding container root filesystems
    #[must_use]
    pub const fn storage_root(self) -> &'static str {
        match self {
            Self::Docker => "/var/lib/docker",
            Self::Containerd => "/run/containerd",
            Self::CriO => "/var/lib/containers",
        }
    }

    /// Whether the runtime is inspected through the daemon's native API
    #[must_use]
    pub const fn has_direct_api(self) -> bool {
        matches!(self, Self::Docker)
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnsupportedRuntime {
                runtime: s.to_string(),
            })
    }
}

/// Container reference as reported in a workload's container status
///
/// The orchestrator reports containers as `scheme://id`, where the scheme
/// names the runtime and the host part is the runtime-native id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerUri {
    runtime: RuntimeKind,
    id: String,
}

impl ContainerUri {
    /// Create from parts
    ///
    /// # Errors
    /// Returns error if the id is empty
    pub fn new(runtime: RuntimeKind, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Container ID cannot be empty".to_string(),
            });
        }
        Ok(Self { runtime, id })
    }

    /// Runtime kind (URI scheme)
    #[must_use]
    pub const fn runtime(&self) -> RuntimeKind {
        self.runtime
    }

    /// Runtime-native container id (URI host)
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl FromStr for ContainerUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (scheme, rest) = s.split_once("://").ok_or_else(|| Error::Resolution {
            message: format!("container status URI '{s}' has no scheme"),
        })?;

        // host part ends at the first path, query or fragment delimiter
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();

        Self::new(scheme.parse()?, host)
    }
}

impl fmt::Display for ContainerUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.runtime, self.id)
    }
}

/// Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Create from raw PID
    #[must_use]
    pub const fn from_raw(pid: u32) -> Self {
        Self(pid)
    }

    /// Get raw PID value
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Whether this is a usable pid (zero means "not resolved")
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }

    /// Convert to `nix::unistd::Pid`
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn as_nix_pid(self) -> nix::unistd::Pid {
        nix::unistd::Pid::from_raw(self.0 as i32)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle phase of a helper workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperPhase {
    /// Accepted but not started
    Pending,
    /// At least one container running
    Running,
    /// All containers exited successfully
    Succeeded,
    /// All containers exited, at least one in failure
    Failed,
    /// Phase not reported or not recognised
    Unknown,
}

impl HelperPhase {
    /// Parse the phase string reported by the cluster API
    #[must_use]
    pub fn from_reported(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => Self::Pending,
            Some("Running") => Self::Running,
            Some("Succeeded") => Self::Succeeded,
            Some("Failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Running or terminal: the orchestrator stops waiting
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Running | Self::Succeeded | Self::Failed)
    }

    /// Phase string as the cluster API reports it
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for HelperPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
