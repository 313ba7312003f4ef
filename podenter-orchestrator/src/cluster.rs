//! Cluster API capability consumed by the orchestrator

use std::collections::BTreeMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Pod;
use podenter_core::{ClusterEvent, HelperPhase, Result};
use tokio::io::AsyncRead;

/// Phases reported by a watch on one pod, in arrival order
pub type PhaseStream = BoxStream<'static, Result<HelperPhase>>;

/// Followed log output of one container
pub type LogStream = Pin<Box<dyn AsyncRead + Send>>;

/// What the garbage collector needs to know about a pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSummary {
    /// Namespace of the pod
    pub namespace: String,
    /// Pod name
    pub name: String,
    /// Reported phase
    pub phase: HelperPhase,
    /// Pod labels
    pub labels: BTreeMap<String, String>,
}

impl From<&Pod> for PodSummary {
    fn from(pod: &Pod) -> Self {
        Self {
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            name: pod.metadata.name.clone().unwrap_or_default(),
            phase: HelperPhase::from_reported(
                pod.status.as_ref().and_then(|s| s.phase.as_deref()),
            ),
            labels: pod.metadata.labels.clone().unwrap_or_default(),
        }
    }
}

impl PodSummary {
    /// Whether the pod carries `key=value`
    #[must_use]
    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).is_some_and(|v| v == value)
    }
}

/// Operations the orchestrator performs against the cluster
///
/// Implementations:
/// - [`KubeCluster`](crate::KubeCluster) - real API server through `kube`
/// - [`MockCluster`](crate::MockCluster) - scripted, in-memory
///
/// # Thread Safety
/// All implementations must be `Send + Sync`; the wait race shares one
/// instance between the foreground watch and a background responder.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetch a pod
    ///
    /// # Errors
    /// Returns [`Error::Resolution`](podenter_core::Error::Resolution) if
    /// the pod does not exist or cannot be read
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;

    /// Create a pod
    ///
    /// # Errors
    /// Returns [`Error::Scheduling`](podenter_core::Error::Scheduling) if
    /// the API server rejects it
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<()>;

    /// Delete a pod by name; deleting a missing pod succeeds
    ///
    /// # Errors
    /// Returns [`Error::Cleanup`](podenter_core::Error::Cleanup) on failure
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;

    /// Watch the phase of one pod, filtered server-side by name
    ///
    /// # Errors
    /// Returns [`Error::Lifecycle`](podenter_core::Error::Lifecycle) if the
    /// watch cannot be opened
    async fn watch_phase(&self, namespace: &str, name: &str) -> Result<PhaseStream>;

    /// Events recorded for one object
    ///
    /// # Errors
    /// Returns error if events cannot be listed
    async fn recent_events(&self, namespace: &str, name: &str) -> Result<Vec<ClusterEvent>>;

    /// Follow the logs of a container until it exits
    ///
    /// # Errors
    /// Returns [`Error::LogStream`](podenter_core::Error::LogStream) if the
    /// stream cannot be opened
    async fn log_stream(&self, namespace: &str, name: &str, container: &str) -> Result<LogStream>;

    /// Pods matching a label selector, across all namespaces
    ///
    /// # Errors
    /// Returns error if pods cannot be listed
    async fn list_pods(&self, selector: &str) -> Result<Vec<PodSummary>>;

    /// Attach the operator's terminal to a running container
    ///
    /// # Errors
    /// Returns [`Error::AttachCompleted`](podenter_core::Error::AttachCompleted)
    /// if the pod finished before the attach, or
    /// [`Error::Attach`](podenter_core::Error::Attach) for any other failure
    async fn attach(
        &self,
        namespace: &str,
        name: &str,
        container: &str,
        stdin: bool,
        tty: bool,
    ) -> Result<()>;
}
