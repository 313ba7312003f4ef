//! Helper workload specification

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, HostPathVolumeSource, Pod, PodDNSConfig, PodSpec, SecurityContext, Toleration,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use podenter_core::defaults::{
    AGENT_BINARY, AGENT_IMAGE, AGENT_TOOLS_IMAGE, HELPER_CONTAINER, HELPER_LABEL_KEY,
    HELPER_LABEL_VALUE, REMOUNT_PROC_EXEC, TOOLS_ROOT, TOOLS_TERM,
};
use podenter_core::{ContainerUri, RuntimeKind};

use crate::target::Target;

const SOCKET_VOLUME: &str = "runtime-socket";
const STORAGE_VOLUME: &str = "container-storage";

/// How the helper enters the target container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelperMode {
    /// Join the mount namespace; the helper sees only the container's files
    #[default]
    Default,
    /// Keep a private mount namespace with the helper image's tools, with
    /// the container's root exposed at `/croot`
    Tools,
}

impl HelperMode {
    /// Image used when none is given
    #[must_use]
    pub const fn default_image(self) -> &'static str {
        match self {
            Self::Default => AGENT_IMAGE,
            Self::Tools => AGENT_TOOLS_IMAGE,
        }
    }
}

/// Command line of the entry agent inside the helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    uri: ContainerUri,
    mode: HelperMode,
    command: Vec<String>,
}

impl AgentCommand {
    /// Create for a target container and the operator's command
    #[must_use]
    pub const fn new(uri: ContainerUri, mode: HelperMode, command: Vec<String>) -> Self {
        Self { uri, mode, command }
    }

    /// Full argv, agent executable first
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![AGENT_BINARY.to_string()];

        if self.mode == HelperMode::Default {
            argv.push("--mount".to_string());
        }
        argv.extend(["--pid", "--net", "--ipc", "--uts"].map(String::from));
        argv.push(format!("--runtime={}", self.uri.runtime()));
        argv.push(format!("--container={}", self.uri.id()));

        match self.mode {
            HelperMode::Default => {
                argv.push("--wd".to_string());
                argv.push("--".to_string());
            }
            HelperMode::Tools => {
                argv.extend(
                    [
                        "--root-symlink",
                        TOOLS_ROOT,
                        "--wd",
                        "--wd-base",
                        TOOLS_ROOT,
                        "--env",
                        TOOLS_TERM,
                        "--",
                        REMOUNT_PROC_EXEC,
                    ]
                    .map(String::from),
                );
            }
        }

        argv.extend(self.command.iter().cloned());
        argv
    }
}

/// Builder for the helper pod
///
/// # Example
/// ```
/// use podenter_orchestrator::{HelperMode, HelperSpec};
///
/// let spec = HelperSpec::new("node-1", "containerd://abc".parse().unwrap(), vec!["sh".into()])
///     .with_mode(HelperMode::Tools)
///     .with_stdin(true)
///     .with_tty(true);
///
/// let pod = spec.build("podenter-x", "default");
/// assert_eq!(pod.metadata.name.as_deref(), Some("podenter-x"));
/// ```
#[derive(Debug, Clone)]
pub struct HelperSpec {
    node: String,
    uri: ContainerUri,
    command: Vec<String>,
    mode: HelperMode,
    image: Option<String>,
    stdin: bool,
    tty: bool,
    dns_policy: Option<String>,
    dns_config: Option<PodDNSConfig>,
}

impl HelperSpec {
    /// Create a default-mode spec
    #[must_use]
    pub fn new(node: impl Into<String>, uri: ContainerUri, command: Vec<String>) -> Self {
        Self {
            node: node.into(),
            uri,
            command,
            mode: HelperMode::Default,
            image: None,
            stdin: false,
            tty: false,
            dns_policy: None,
            dns_config: None,
        }
    }

    /// Create for a resolved target, carrying its DNS settings
    #[must_use]
    pub fn for_target(target: &Target, command: Vec<String>) -> Self {
        let mut spec = Self::new(target.node.clone(), target.uri.clone(), command);
        spec.dns_policy.clone_from(&target.dns_policy);
        spec.dns_config.clone_from(&target.dns_config);
        spec
    }

    /// Set the mode
    #[must_use]
    pub const fn with_mode(mut self, mode: HelperMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the image
    #[must_use]
    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    /// Keep stdin open
    #[must_use]
    pub const fn with_stdin(mut self, stdin: bool) -> Self {
        self.stdin = stdin;
        self
    }

    /// Allocate a terminal
    #[must_use]
    pub const fn with_tty(mut self, tty: bool) -> Self {
        self.tty = tty;
        self
    }

    /// Image the helper will run
    #[must_use]
    pub fn image(&self) -> &str {
        self.image
            .as_deref()
            .unwrap_or_else(|| self.mode.default_image())
    }

    /// Runtime of the target container
    #[must_use]
    pub const fn runtime(&self) -> RuntimeKind {
        self.uri.runtime()
    }

    /// Agent command line
    #[must_use]
    pub fn agent_command(&self) -> AgentCommand {
        AgentCommand::new(self.uri.clone(), self.mode, self.command.clone())
    }

    /// Render the helper pod
    #[must_use]
    pub fn build(&self, name: &str, namespace: &str) -> Pod {
        let runtime = self.runtime();

        let mut volumes = vec![host_path(SOCKET_VOLUME, runtime.default_socket(), "Socket")];
        let mut mounts = vec![mount(SOCKET_VOLUME, runtime.default_socket())];
        let (dns_policy, dns_config) = match self.mode {
            HelperMode::Default => (None, None),
            HelperMode::Tools => {
                volumes.push(host_path(STORAGE_VOLUME, runtime.storage_root(), "Directory"));
                mounts.push(mount(STORAGE_VOLUME, runtime.storage_root()));
                (self.dns_policy.clone(), self.dns_config.clone())
            }
        };

        let container = Container {
            name: HELPER_CONTAINER.to_string(),
            image: Some(self.image().to_string()),
            command: Some(self.agent_command().argv()),
            stdin: Some(self.stdin),
            tty: Some(self.tty),
            volume_mounts: Some(mounts),
            security_context: Some(SecurityContext {
                privileged: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(BTreeMap::from([(
                    HELPER_LABEL_KEY.to_string(),
                    HELPER_LABEL_VALUE.to_string(),
                )])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some(self.node.clone()),
                host_pid: Some(true),
                restart_policy: Some("Never".to_string()),
                tolerations: Some(vec![Toleration {
                    operator: Some("Exists".to_string()),
                    ..Default::default()
                }]),
                dns_policy,
                dns_config,
                containers: vec![container],
                volumes: Some(volumes),
                ..Default::default()
            }),
            status: None,
        }
    }
}

fn host_path(name: &str, path: &str, kind: &str) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: Some(kind.to_string()),
        }),
        ..Default::default()
    }
}

fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}
