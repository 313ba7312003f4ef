//! In-memory cluster for testing without an API server

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use k8s_openapi::api::core::v1::Pod;
use podenter_core::{ClusterEvent, Error, HelperPhase, Result};
use tokio::sync::Mutex;

use crate::cluster::{ClusterApi, LogStream, PhaseStream, PodSummary};

/// How a scripted attach ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachOutcome {
    /// Session ran and ended normally
    #[default]
    Succeed,
    /// Helper finished before the attach
    Completed,
    /// Any other attach failure
    Fail,
}

/// Mock cluster for testing (no API server)
///
/// Pods are kept in memory. The helper watch replays a scripted list of
/// phases, then either ends or stays silent forever.
///
/// # Example
/// ```
/// use podenter_core::HelperPhase;
/// use podenter_orchestrator::{ClusterApi, MockCluster};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let cluster = MockCluster::new();
/// cluster.script_phases([HelperPhase::Pending, HelperPhase::Running]).await;
///
/// cluster.delete_pod("default", "podenter-x").await.unwrap();
/// assert_eq!(cluster.delete_count().await, 1);
/// # });
/// ```
#[derive(Clone)]
pub struct MockCluster {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    pods: Vec<Pod>,
    created: Vec<Pod>,
    deleted: Vec<(String, String)>,
    failing_deletes: HashSet<String>,
    reject_create: bool,
    ignore_selectors: bool,
    phases: Vec<HelperPhase>,
    hang_after_phases: bool,
    attach: AttachOutcome,
    attach_calls: usize,
    logs: Vec<u8>,
    events: Vec<ClusterEvent>,
    event_queries: usize,
}

impl MockCluster {
    /// Create an empty mock cluster
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Add an existing pod
    pub async fn add_pod(&self, pod: Pod) {
        self.state.lock().await.pods.push(pod);
    }

    /// Phases the helper watch will report
    pub async fn script_phases(&self, phases: impl IntoIterator<Item = HelperPhase>) {
        self.state.lock().await.phases = phases.into_iter().collect();
    }

    /// Keep the watch open, silent, after the scripted phases
    pub async fn hang_after_phases(&self) {
        self.state.lock().await.hang_after_phases = true;
    }

    /// How the next attach ends
    pub async fn script_attach(&self, outcome: AttachOutcome) {
        self.state.lock().await.attach = outcome;
    }

    /// Log output served for any container
    pub async fn script_logs(&self, logs: impl Into<Vec<u8>>) {
        self.state.lock().await.logs = logs.into();
    }

    /// Events served for any object
    pub async fn script_events(&self, events: Vec<ClusterEvent>) {
        self.state.lock().await.events = events;
    }

    /// Make deleting the named pod fail
    pub async fn fail_delete(&self, name: &str) {
        self.state.lock().await.failing_deletes.insert(name.to_string());
    }

    /// Make pod creation fail
    pub async fn reject_create(&self) {
        self.state.lock().await.reject_create = true;
    }

    /// Return every pod from `list_pods`, whatever the selector
    pub async fn ignore_selectors(&self) {
        self.state.lock().await.ignore_selectors = true;
    }

    /// Pods created so far
    pub async fn created(&self) -> Vec<Pod> {
        self.state.lock().await.created.clone()
    }

    /// `(namespace, name)` of every delete call, failed ones included
    pub async fn deleted(&self) -> Vec<(String, String)> {
        self.state.lock().await.deleted.clone()
    }

    /// Number of delete calls
    pub async fn delete_count(&self) -> usize {
        self.state.lock().await.deleted.len()
    }

    /// Number of attach calls
    pub async fn attach_calls(&self) -> usize {
        self.state.lock().await.attach_calls
    }

    /// Number of event listings
    pub async fn event_queries(&self) -> usize {
        self.state.lock().await.event_queries
    }
}

impl Default for MockCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCluster").finish_non_exhaustive()
    }
}

fn is_named(pod: &Pod, namespace: &str, name: &str) -> bool {
    pod.metadata.namespace.as_deref() == Some(namespace)
        && pod.metadata.name.as_deref() == Some(name)
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.state
            .lock()
            .await
            .pods
            .iter()
            .find(|p| is_named(p, namespace, name))
            .cloned()
            .ok_or_else(|| Error::Resolution {
                message: format!("pod {namespace}/{name} not found"),
            })
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.reject_create {
            return Err(Error::Scheduling {
                message: "admission webhook denied the request".to_string(),
            });
        }

        let mut pod = pod.clone();
        pod.metadata.namespace = Some(namespace.to_string());
        state.created.push(pod.clone());
        state.pods.push(pod);
        Ok(())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.deleted.push((namespace.to_string(), name.to_string()));

        if state.failing_deletes.contains(name) {
            return Err(Error::Cleanup {
                name: name.to_string(),
                message: "forbidden".to_string(),
            });
        }

        state.pods.retain(|p| !is_named(p, namespace, name));
        Ok(())
    }

    async fn watch_phase(&self, _namespace: &str, _name: &str) -> Result<PhaseStream> {
        let state = self.state.lock().await;
        let scripted = stream::iter(state.phases.clone().into_iter().map(Ok));

        Ok(if state.hang_after_phases {
            scripted.chain(stream::pending()).boxed()
        } else {
            scripted.boxed()
        })
    }

    async fn recent_events(&self, _namespace: &str, _name: &str) -> Result<Vec<ClusterEvent>> {
        let mut state = self.state.lock().await;
        state.event_queries += 1;
        Ok(state.events.clone())
    }

    async fn log_stream(
        &self,
        _namespace: &str,
        _name: &str,
        _container: &str,
    ) -> Result<LogStream> {
        let logs = self.state.lock().await.logs.clone();
        Ok(Box::pin(std::io::Cursor::new(logs)))
    }

    async fn list_pods(&self, selector: &str) -> Result<Vec<PodSummary>> {
        let (key, value) = selector.split_once('=').unwrap_or((selector, ""));
        let state = self.state.lock().await;

        Ok(state
            .pods
            .iter()
            .map(PodSummary::from)
            .filter(|s| state.ignore_selectors || s.has_label(key, value))
            .collect())
    }

    async fn attach(
        &self,
        _namespace: &str,
        name: &str,
        _container: &str,
        _stdin: bool,
        _tty: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.attach_calls += 1;

        match state.attach {
            AttachOutcome::Succeed => Ok(()),
            AttachOutcome::Completed => Err(Error::AttachCompleted {
                message: format!("cannot attach a container in a completed pod; pod {name}"),
            }),
            AttachOutcome::Fail => Err(Error::Attach {
                message: "unable to upgrade connection".to_string(),
            }),
        }
    }
}
