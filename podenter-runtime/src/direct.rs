//! Inspection through the containerd socket API

use async_trait::async_trait;
use containerd_client::services::v1::containers_client::ContainersClient;
use containerd_client::services::v1::tasks_client::TasksClient;
use containerd_client::services::v1::{GetContainerRequest, GetRequest};
use containerd_client::tonic::{Code, Request, Status};
use containerd_client::with_namespace;
use podenter_core::{Error, ProcessId, Result, RuntimeKind};
use serde_json::Value;
use tracing::debug;

use crate::inspector::{ContainerDescriptor, RuntimeInspector, SpecFields, resolve_root_path};

/// Inspector talking to containerd directly
///
/// Docker's CRI shim does not report pid, cwd or environment, so Docker
/// containers are read from containerd's own metadata in the runtime's
/// namespace.
#[derive(Debug, Clone)]
pub struct DirectClient {
    runtime: RuntimeKind,
    socket: String,
    namespace: String,
}

impl DirectClient {
    /// Create a client for a runtime, connecting to `socket` on use
    #[must_use]
    pub fn new(runtime: RuntimeKind, socket: impl Into<String>) -> Self {
        Self {
            runtime,
            socket: socket.into(),
            namespace: runtime.runtime_namespace().unwrap_or("default").to_string(),
        }
    }

    /// containerd namespace looked up
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn status_error(&self, id: &str, status: &Status) -> Error {
        match status.code() {
            Code::NotFound => Error::ContainerNotFound {
                id: id.to_string(),
                message: status.message().to_string(),
            },
            Code::Unavailable => Error::RuntimeUnreachable {
                endpoint: self.socket.clone(),
                message: status.message().to_string(),
            },
            _ => Error::Resolution {
                message: format!("containerd: {status}"),
            },
        }
    }
}

#[async_trait]
impl RuntimeInspector for DirectClient {
    fn runtime(&self) -> RuntimeKind {
        self.runtime
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor> {
        debug!(socket = %self.socket, namespace = %self.namespace, "Connecting to containerd");

        if !tokio::fs::try_exists(&self.socket).await.unwrap_or(false) {
            return Err(Error::RuntimeUnreachable {
                endpoint: self.socket.clone(),
                message: "socket does not exist".to_string(),
            });
        }

        // the channel is dropped, and the connection closed, on every return
        let channel = containerd_client::connect(&self.socket)
            .await
            .map_err(|e| Error::RuntimeUnreachable {
                endpoint: self.socket.clone(),
                message: e.to_string(),
            })?;

        let mut tasks = TasksClient::new(channel.clone());
        let request = with_namespace!(
            GetRequest {
                container_id: container_id.to_string(),
                ..Default::default()
            },
            self.namespace
        );
        let task = tasks
            .get(request)
            .await
            .map_err(|s| self.status_error(container_id, &s))?
            .into_inner();
        let init_pid = ProcessId::from_raw(task.process.map_or(0, |p| p.pid));

        let mut containers = ContainersClient::new(channel);
        let request = with_namespace!(
            GetContainerRequest {
                id: container_id.to_string(),
            },
            self.namespace
        );
        let container = containers
            .get(request)
            .await
            .map_err(|s| self.status_error(container_id, &s))?
            .into_inner()
            .container
            .ok_or_else(|| Error::ContainerNotFound {
                id: container_id.to_string(),
                message: "containerd returned no container".to_string(),
            })?;

        let spec = container.spec.map(|any| any.value).unwrap_or_default();
        let fields = parse_spec(&spec)?;

        debug!(
            container_id,
            pid = %init_pid,
            root = %fields.root,
            "Resolved container through containerd"
        );

        Ok(ContainerDescriptor {
            runtime: self.runtime,
            id: container_id.to_string(),
            init_pid,
            root_path: resolve_root_path(self.runtime, container_id, &fields.root),
            working_dir: fields.cwd,
            env: fields.env,
        })
    }
}

/// Read root, cwd and env from a serialized OCI spec
fn parse_spec(raw: &[u8]) -> Result<SpecFields> {
    if raw.is_empty() {
        return Ok(SpecFields::default());
    }

    let doc: Value = serde_json::from_slice(raw).map_err(|e| Error::MalformedInspect {
        message: format!("container spec: {e}"),
    })?;

    Ok(SpecFields::extract(&doc, ""))
}
