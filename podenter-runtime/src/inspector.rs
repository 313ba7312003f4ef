//! Runtime inspector trait for pluggable inspection strategies

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use podenter_core::{Error, ProcessId, Result, RuntimeKind};
use serde_json::Value;

use crate::direct::DirectClient;
use crate::probe::CliProbe;

/// Facts about a running container, resolved once per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    /// Runtime the container belongs to
    pub runtime: RuntimeKind,
    /// Runtime-native container id
    pub id: String,
    /// Init process of the container, on the host (zero when absent)
    pub init_pid: ProcessId,
    /// Root filesystem, absolute once resolved (empty when absent)
    pub root_path: PathBuf,
    /// Recorded working directory of the init process
    pub working_dir: String,
    /// Recorded environment, `KEY=VALUE`, order and duplicates preserved
    pub env: Vec<String>,
}

/// Trait for container inspection strategies
///
/// This allows for different implementations:
/// - [`DirectClient`] - daemon's native socket API
/// - [`CliProbe`] - external inspect command with structured output
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait RuntimeInspector: Send + Sync {
    /// Runtime kind this inspector serves
    fn runtime(&self) -> RuntimeKind;

    /// Resolve the facts of a container
    ///
    /// Absent fields come back as zero values; validating them is the
    /// caller's job.
    ///
    /// # Errors
    /// Returns error if the runtime is unreachable, the container is
    /// unknown, or the runtime's answer cannot be parsed
    async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor>;
}

/// Pick the inspection strategy for a runtime kind
///
/// `endpoint` overrides the runtime's default control socket.
#[must_use]
pub fn inspector_for(kind: RuntimeKind, endpoint: Option<&str>) -> Box<dyn RuntimeInspector> {
    let endpoint = endpoint.unwrap_or_else(|| kind.default_socket());

    if kind.has_direct_api() {
        Box::new(DirectClient::new(kind, endpoint))
    } else {
        Box::new(CliProbe::new(kind, endpoint))
    }
}

/// Make a container root path absolute
///
/// Relative roots live under the runtime's state directory:
/// `<state dir>/<runtime namespace>/<container id>/<root>`.
#[must_use]
pub fn resolve_root_path(kind: RuntimeKind, container_id: &str, root: &str) -> PathBuf {
    if root.is_empty() || Path::new(root).is_absolute() {
        return PathBuf::from(root);
    }

    let mut path = PathBuf::from(kind.state_dir());
    if let Some(namespace) = kind.runtime_namespace() {
        path.push(namespace);
    }
    path.push(container_id);
    path.push(root);
    path
}

/// Root, cwd and environment found in an OCI runtime spec
#[derive(Debug, Default)]
pub(crate) struct SpecFields {
    pub root: String,
    pub cwd: String,
    pub env: Vec<String>,
}

impl SpecFields {
    /// Read the fields of the spec located at `prefix` inside `doc`
    pub(crate) fn extract(doc: &Value, prefix: &str) -> Self {
        let text = |path: &str| {
            doc.pointer(&format!("{prefix}{path}"))
                .map(value_text)
                .unwrap_or_default()
        };

        let env = doc
            .pointer(&format!("{prefix}/process/env"))
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(value_text).collect())
            .unwrap_or_default();

        Self {
            root: text("/root/path"),
            cwd: text("/process/cwd"),
            env,
        }
    }
}

/// Read a pid at a fixed path; an absent path is pid zero
pub(crate) fn extract_pid(doc: &Value, path: &str) -> Result<ProcessId> {
    let Some(value) = doc.pointer(path) else {
        return Ok(ProcessId::from_raw(0));
    };

    value
        .as_u64()
        .and_then(|pid| u32::try_from(pid).ok())
        .map(ProcessId::from_raw)
        .ok_or_else(|| Error::PidExtraction {
            message: format!("{path} is {value}, not a process id"),
        })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
