//! Inspection through the `crictl` command line

use std::process::Stdio;

use async_trait::async_trait;
use podenter_core::{Error, Result, RuntimeKind};
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::inspector::{
    ContainerDescriptor, RuntimeInspector, SpecFields, extract_pid, resolve_root_path,
};

/// Default inspect command
pub const CRICTL: &str = "crictl";

const PID_PATH: &str = "/info/pid";
const SPEC_PATH: &str = "/info/runtimeSpec";

/// Lowercased stderr fragments of a runtime socket that cannot be dialled
const UNREACHABLE_MARKERS: [&str; 5] = [
    "code = unavailable",
    "connection refused",
    "connection error",
    "transport: error while dialing",
    "no such file or directory",
];

/// Inspector scraping `crictl inspect` output
///
/// One subprocess is spawned per inspection.
#[derive(Debug, Clone)]
pub struct CliProbe {
    runtime: RuntimeKind,
    endpoint: String,
    program: String,
}

impl CliProbe {
    /// Create a probe against a runtime socket
    #[must_use]
    pub fn new(runtime: RuntimeKind, endpoint: impl Into<String>) -> Self {
        Self {
            runtime,
            endpoint: endpoint.into(),
            program: CRICTL.to_string(),
        }
    }

    /// Use another inspect executable
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to the inspect executable
    #[must_use]
    pub fn args(&self, container_id: &str) -> Vec<String> {
        vec![
            "--runtime-endpoint".to_string(),
            format!("unix://{}", self.endpoint),
            "inspect".to_string(),
            container_id.to_string(),
        ]
    }

    fn failure(&self, container_id: &str, stderr: &str) -> Error {
        let lowered = stderr.to_lowercase();

        if lowered.contains("not found") || lowered.contains("notfound") {
            Error::ContainerNotFound {
                id: container_id.to_string(),
                message: stderr.trim().to_string(),
            }
        } else if UNREACHABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
            Error::RuntimeUnreachable {
                endpoint: self.endpoint.clone(),
                message: stderr.trim().to_string(),
            }
        } else {
            Error::Resolution {
                message: format!("{} inspect failed: {}", self.program, stderr.trim()),
            }
        }
    }
}

#[async_trait]
impl RuntimeInspector for CliProbe {
    fn runtime(&self) -> RuntimeKind {
        self.runtime
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor> {
        let args = self.args(container_id);
        debug!(program = %self.program, ?args, "Probing container");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::RuntimeUnreachable {
                endpoint: self.endpoint.clone(),
                message: format!("failed to run {}: {e}", self.program),
            })?;

        if !output.status.success() {
            return Err(self.failure(container_id, &String::from_utf8_lossy(&output.stderr)));
        }

        parse_inspect(self.runtime, container_id, &output.stdout)
    }
}

/// Extract container facts from `crictl inspect` output
///
/// # Errors
/// Returns error if the output is not JSON or the pid is not a number
pub fn parse_inspect(
    runtime: RuntimeKind,
    container_id: &str,
    raw: &[u8],
) -> Result<ContainerDescriptor> {
    let doc: Value = serde_json::from_slice(raw).map_err(|e| Error::MalformedInspect {
        message: format!("inspect output: {e}"),
    })?;

    let init_pid = extract_pid(&doc, PID_PATH)?;
    let fields = SpecFields::extract(&doc, SPEC_PATH);

    Ok(ContainerDescriptor {
        runtime,
        id: container_id.to_string(),
        init_pid,
        root_path: resolve_root_path(runtime, container_id, &fields.root),
        working_dir: fields.cwd,
        env: fields.env,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSPECT: &str = r#"{
      "status": { "id": "abc123", "state": "CONTAINER_RUNNING" },
      "info": {
        "sandboxID": "f00",
        "pid": 4821,
        "runtimeSpec": {
          "root": { "path": "rootfs" },
          "process": {
            "cwd": "/app",
            "env": ["PATH=/usr/bin", "HOSTNAME=web-0", "PATH=/bin"]
          }
        }
      }
    }"#;

    #[test]
    fn test_parse_containerd_inspect() {
        let descriptor =
            parse_inspect(RuntimeKind::Containerd, "abc123", INSPECT.as_bytes()).unwrap();

        assert_eq!(descriptor.init_pid.as_raw(), 4821);
        assert_eq!(
            descriptor.root_path.to_str(),
            Some("/run/containerd/io.containerd.runtime.v2.task/k8s.io/abc123/rootfs")
        );
        assert_eq!(descriptor.working_dir, "/app");
        assert_eq!(
            descriptor.env,
            vec!["PATH=/usr/bin", "HOSTNAME=web-0", "PATH=/bin"]
        );
    }

    #[test]
    fn test_parse_missing_paths() {
        let descriptor =
            parse_inspect(RuntimeKind::CriO, "abc123", br#"{"status": {}}"#).unwrap();

        assert!(!descriptor.init_pid.is_valid());
        assert!(descriptor.working_dir.is_empty());
        assert!(descriptor.env.is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_inspect(RuntimeKind::CriO, "abc123", b"FATA[0000] oops").unwrap_err();
        assert!(matches!(err, Error::MalformedInspect { .. }));
    }

    #[test]
    fn test_args() {
        let probe = CliProbe::new(RuntimeKind::CriO, "/var/run/crio/crio.sock");
        assert_eq!(
            probe.args("abc"),
            vec![
                "--runtime-endpoint",
                "unix:///var/run/crio/crio.sock",
                "inspect",
                "abc"
            ]
        );
    }

    #[test]
    fn test_failure_classification() {
        let probe = CliProbe::new(RuntimeKind::Containerd, "/run/containerd/containerd.sock");

        let err = probe.failure("abc", "rpc error: code = NotFound desc = container \"abc\" not found");
        assert!(matches!(err, Error::ContainerNotFound { .. }));

        let err = probe.failure(
            "abc",
            "rpc error: code = Unavailable desc = connection error: desc = \"transport: \
             Error while dialing: dial unix /run/containerd/containerd.sock: connect: \
             no such file or directory\"",
        );
        assert!(matches!(err, Error::RuntimeUnreachable { .. }));

        let err = probe.failure("abc", "dial unix /var/run/crio/crio.sock: connection refused");
        assert!(matches!(err, Error::RuntimeUnreachable { .. }));

        let err = probe.failure("abc", "container abc is not connected to a network");
        assert!(matches!(err, Error::Resolution { .. }));

        let err = probe.failure("abc", "permission denied");
        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let probe = CliProbe::new(RuntimeKind::Containerd, "/run/containerd/containerd.sock")
            .with_program("/nonexistent/crictl");

        let err = probe.inspect("abc").await.unwrap_err();
        assert!(matches!(err, Error::RuntimeUnreachable { .. }));
    }
}
