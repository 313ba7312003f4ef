//! Cluster access through the Kubernetes API

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use futures::{StreamExt, future};
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{DeleteParams, ListParams, LogParams, PostParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use podenter_core::{ClusterEvent, Error, HelperPhase, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tracing::debug;

use crate::cluster::{ClusterApi, LogStream, PhaseStream, PodSummary};

/// Interactive attach is delegated to this executable
pub const KUBECTL: &str = "kubectl";

/// stderr marker of an attach to a pod that already finished
const COMPLETED_MARKER: &str = "completed pod";

/// [`ClusterApi`] backed by a Kubernetes API server
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    default_namespace: String,
    kubeconfig: Option<PathBuf>,
}

impl KubeCluster {
    /// Connect using a kubeconfig file, or the inferred configuration
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if no usable configuration is found
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let config = match kubeconfig {
            Some(path) => {
                let raw = Kubeconfig::read_from(path).map_err(|e| Error::InvalidConfig {
                    message: format!("kubeconfig {}: {e}", path.display()),
                })?;
                Config::from_custom_kubeconfig(raw, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| Error::InvalidConfig {
                        message: format!("kubeconfig {}: {e}", path.display()),
                    })?
            }
            None => Config::infer().await.map_err(|e| Error::InvalidConfig {
                message: format!("cluster configuration: {e}"),
            })?,
        };

        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).map_err(|e| Error::InvalidConfig {
            message: format!("cluster client: {e}"),
        })?;

        debug!(namespace = %default_namespace, "Connected to cluster");

        Ok(Self {
            client,
            default_namespace,
            kubeconfig: kubeconfig.map(Path::to_path_buf),
        })
    }

    /// Namespace of the current kubeconfig context
    #[must_use]
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster")
            .field("default_namespace", &self.default_namespace)
            .field("kubeconfig", &self.kubeconfig)
            .finish_non_exhaustive()
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

/// `kubectl attach` arguments
fn attach_args(
    kubeconfig: Option<&Path>,
    namespace: &str,
    name: &str,
    container: &str,
    stdin: bool,
    tty: bool,
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(path) = kubeconfig {
        args.push(format!("--kubeconfig={}", path.display()));
    }
    args.extend(
        [
            "attach",
            "--namespace",
            namespace,
            name,
            "--container",
            container,
        ]
        .map(String::from),
    );
    if stdin {
        args.push("--stdin".to_string());
    }
    if tty {
        args.push("--tty".to_string());
    }
    args
}

/// Classify a failed attach from its exit status and stderr
fn attach_failure(status: ExitStatus, stderr: &str) -> Error {
    let message = if stderr.trim().is_empty() {
        format!("attach exited with {status}")
    } else {
        stderr.trim().to_string()
    };

    if stderr.contains(COMPLETED_MARKER) {
        Error::AttachCompleted { message }
    } else {
        Error::Attach { message }
    }
}

/// Forward attach stderr as it arrives, keeping it for classification
async fn forward_stderr<R>(stderr: R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut captured = String::new();
    let mut lines = BufReader::new(stderr).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| Error::Attach {
        message: format!("reading {KUBECTL} stderr: {e}"),
    })? {
        eprintln!("{line}");
        captured.push_str(&line);
        captured.push('\n');
    }
    Ok(captured)
}

fn watch_phase_of(event: kube::Result<WatchEvent<Pod>>) -> Option<Result<HelperPhase>> {
    match event {
        Ok(WatchEvent::Added(pod) | WatchEvent::Modified(pod)) => Some(Ok(
            HelperPhase::from_reported(pod.status.as_ref().and_then(|s| s.phase.as_deref())),
        )),
        Ok(WatchEvent::Deleted(_)) => Some(Err(Error::Lifecycle {
            message: "helper workload deleted while starting".to_string(),
        })),
        Ok(WatchEvent::Bookmark(_)) => None,
        Ok(WatchEvent::Error(response)) => Some(Err(Error::Lifecycle {
            message: response.message,
        })),
        Err(e) => Some(Err(Error::Lifecycle {
            message: e.to_string(),
        })),
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.pods(namespace).get(name).await.map_err(|e| {
            let message = if is_not_found(&e) {
                format!("pod {namespace}/{name} not found")
            } else {
                format!("pod {namespace}/{name}: {e}")
            };
            Error::Resolution { message }
        })
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<()> {
        self.pods(namespace)
            .create(&PostParams::default(), pod)
            .await
            .map(|_| ())
            .map_err(|e| Error::Scheduling {
                message: e.to_string(),
            })
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        match self.pods(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(namespace, helper = name, "Helper already gone");
                Ok(())
            }
            Err(e) => Err(Error::Cleanup {
                name: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn watch_phase(&self, namespace: &str, name: &str) -> Result<PhaseStream> {
        let params = WatchParams::default().fields(&format!("metadata.name={name}"));
        let events = self
            .pods(namespace)
            .watch(&params, "0")
            .await
            .map_err(|e| Error::Lifecycle {
                message: e.to_string(),
            })?;

        Ok(events
            .filter_map(|event| future::ready(watch_phase_of(event)))
            .boxed())
    }

    async fn recent_events(&self, namespace: &str, name: &str) -> Result<Vec<ClusterEvent>> {
        let params = ListParams::default().fields(&format!("involvedObject.name={name}"));
        let events = Api::<Event>::namespaced(self.client.clone(), namespace)
            .list(&params)
            .await
            .map_err(|e| Error::Lifecycle {
                message: format!("events: {e}"),
            })?;

        Ok(events
            .items
            .into_iter()
            .map(|event| ClusterEvent {
                kind: event.type_.unwrap_or_default(),
                reason: event.reason.unwrap_or_default(),
                message: event.message.unwrap_or_default(),
            })
            .collect())
    }

    async fn log_stream(&self, namespace: &str, name: &str, container: &str) -> Result<LogStream> {
        let params = LogParams {
            follow: true,
            container: Some(container.to_string()),
            ..Default::default()
        };
        let logs = self
            .pods(namespace)
            .log_stream(name, &params)
            .await
            .map_err(|e| Error::LogStream {
                message: e.to_string(),
            })?;

        Ok(Box::pin(logs.compat()))
    }

    async fn list_pods(&self, selector: &str) -> Result<Vec<PodSummary>> {
        let pods = Api::<Pod>::all(self.client.clone())
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| Error::Resolution {
                message: format!("listing pods: {e}"),
            })?;

        Ok(pods.items.iter().map(PodSummary::from).collect())
    }

    async fn attach(
        &self,
        namespace: &str,
        name: &str,
        container: &str,
        stdin: bool,
        tty: bool,
    ) -> Result<()> {
        let args = attach_args(
            self.kubeconfig.as_deref(),
            namespace,
            name,
            container,
            stdin,
            tty,
        );
        debug!(program = KUBECTL, ?args, "Attaching to helper");

        let mut child = Command::new(KUBECTL)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Attach {
                message: format!("failed to run {KUBECTL}: {e}"),
            })?;

        let captured = match child.stderr.take() {
            Some(stderr) => forward_stderr(stderr).await?,
            None => String::new(),
        };

        let status = child.wait().await.map_err(|e| Error::Attach {
            message: format!("waiting for {KUBECTL}: {e}"),
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(attach_failure(status, &captured))
        }
    }
}
