//! One operator invocation, from target lookup to helper cleanup

use std::sync::Arc;
use std::time::Duration;

use podenter_core::defaults::{HELPER_CONTAINER, HELPER_TIMEOUT};
use podenter_core::{Error, HelperEvent, HelperPhase, Result};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cluster::ClusterApi;
use crate::helper::{HelperMode, HelperSpec};
use crate::logs::relay_logs;
use crate::names::{NameGenerator, RandomSuffix};
use crate::target::Target;
use crate::wait::{HelperCleanup, wait_for_helper};

/// What the operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Namespace of the target pod, or the client's default
    pub namespace: Option<String>,
    /// Target pod name
    pub pod: String,
    /// Target container, or the pod's first container
    pub container: Option<String>,
    /// Program and arguments to run
    pub command: Vec<String>,
    /// Forward stdin
    pub stdin: bool,
    /// Allocate a terminal
    pub tty: bool,
    /// Entry mode
    pub mode: HelperMode,
    /// Namespace for the helper, or the target's namespace
    pub helper_namespace: Option<String>,
    /// Helper image override
    pub helper_image: Option<String>,
    /// How long the helper may take to start
    pub timeout: Duration,
}

impl ExecRequest {
    /// Create a request with defaults for everything but pod and command
    #[must_use]
    pub fn new(pod: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            namespace: None,
            pod: pod.into(),
            container: None,
            command,
            stdin: false,
            tty: false,
            mode: HelperMode::Default,
            helper_namespace: None,
            helper_image: None,
            timeout: HELPER_TIMEOUT,
        }
    }

    /// Set the target namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the target container
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Set stdin and tty forwarding
    #[must_use]
    pub const fn with_io(mut self, stdin: bool, tty: bool) -> Self {
        self.stdin = stdin;
        self.tty = tty;
        self
    }

    /// Set the entry mode
    #[must_use]
    pub const fn with_mode(mut self, mode: HelperMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the helper namespace
    #[must_use]
    pub fn with_helper_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.helper_namespace = Some(namespace.into());
        self
    }

    /// Set the helper image
    #[must_use]
    pub fn with_helper_image(mut self, image: impl Into<String>) -> Self {
        self.helper_image = Some(image.into());
        self
    }

    /// Set the start timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the request before touching the cluster
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the pod name or the command is
    /// missing, or the timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.pod.is_empty() {
            return Err(Error::InvalidConfig {
                message: "pod name is required".to_string(),
            });
        }
        if self.command.first().is_none_or(String::is_empty) {
            return Err(Error::InvalidConfig {
                message: "command is required".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig {
                message: "helper timeout must be positive".to_string(),
            });
        }
        Ok(())
    }

    const fn interactive(&self) -> bool {
        self.stdin || self.tty
    }
}

/// Drives helper workloads against a cluster
///
/// # Example
/// ```
/// use std::sync::Arc;
///
/// use podenter_orchestrator::{FixedNames, MockCluster, Session};
///
/// let session = Session::new(Arc::new(MockCluster::new()), "default")
///     .with_names(FixedNames::new(["podenter-fixed"]));
/// ```
pub struct Session {
    cluster: Arc<dyn ClusterApi>,
    default_namespace: String,
    names: Box<dyn NameGenerator>,
    shutdown: CancellationToken,
}

impl Session {
    /// Create a session with random helper names
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterApi>, default_namespace: impl Into<String>) -> Self {
        Self {
            cluster,
            default_namespace: default_namespace.into(),
            names: Box::new(RandomSuffix),
            shutdown: CancellationToken::new(),
        }
    }

    /// Use another name generator
    #[must_use]
    pub fn with_names(mut self, names: impl NameGenerator + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    /// Token cancelled when the operator interrupts the invocation
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Run the request's command in the target container
    ///
    /// Helper output goes to `out` when relayed from logs; an interactive
    /// attach talks to the process's own terminal. The helper is deleted
    /// before this returns, whatever the outcome.
    ///
    /// # Errors
    /// Returns the first fatal error of the invocation; cleanup failures
    /// are only logged
    pub async fn run<W>(&self, request: &ExecRequest, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        request.validate()?;

        let namespace = request
            .namespace
            .as_deref()
            .unwrap_or(&self.default_namespace);
        let pod = tokio::select! {
            biased;

            () = self.shutdown.cancelled() => return Err(Error::Interrupted),
            pod = self.cluster.get_pod(namespace, &request.pod) => pod?,
        };
        let target = Target::resolve(&pod, request.container.as_deref())?;

        if target.defaulted {
            eprintln!("Defaulting container name to {}", target.container);
        }
        debug!(
            pod = %target.pod,
            container = %target.container,
            uri = %target.uri,
            node = %target.node,
            "Resolved target"
        );

        let helper_namespace = request
            .helper_namespace
            .clone()
            .unwrap_or_else(|| target.namespace.clone());
        let name = self.names.generate();
        let helper = HelperSpec::for_target(&target, request.command.clone())
            .with_mode(request.mode)
            .with_image(request.helper_image.clone())
            .with_stdin(request.stdin)
            .with_tty(request.tty)
            .build(&name, &helper_namespace);

        // an interrupt before creation leaves nothing to clean up
        if self.shutdown.is_cancelled() {
            return Err(Error::Interrupted);
        }
        self.cluster.create_pod(&helper_namespace, &helper).await?;
        HelperEvent::Created {
            name: name.clone(),
            namespace: helper_namespace.clone(),
            node: target.node.clone(),
        }
        .emit_trace();

        let cleanup = Arc::new(HelperCleanup::new(
            Arc::clone(&self.cluster),
            helper_namespace,
            name,
        ));

        let result = self.drive(request, &cleanup, out).await;
        cleanup.run().await;
        result
    }

    async fn drive<W>(
        &self,
        request: &ExecRequest,
        cleanup: &Arc<HelperCleanup>,
        out: &mut W,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let phase = wait_for_helper(
            Arc::clone(&self.cluster),
            Arc::clone(cleanup),
            request.timeout,
            self.shutdown.clone(),
        )
        .await?;

        // Failed is still attached to; only Succeeded goes straight to logs
        if phase != HelperPhase::Succeeded && request.interactive() {
            match self
                .cluster
                .attach(
                    cleanup.namespace(),
                    cleanup.name(),
                    HELPER_CONTAINER,
                    request.stdin,
                    request.tty,
                )
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if e.is_attach_completed() => {
                    info!(helper = %cleanup.name(), "Helper already completed, reading its logs");
                }
                Err(e) => return Err(e),
            }
        }

        let logs = self
            .cluster
            .log_stream(cleanup.namespace(), cleanup.name(), HELPER_CONTAINER)
            .await?;

        tokio::select! {
            relayed = relay_logs(logs, out) => {
                let bytes = relayed?;
                debug!(helper = %cleanup.name(), bytes, "Log stream ended");
                Ok(())
            }
            () = self.shutdown.cancelled() => Err(Error::Interrupted),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("default_namespace", &self.default_namespace)
            .finish_non_exhaustive()
    }
}
