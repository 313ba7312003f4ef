//! Resolution of the target workload and container

use k8s_openapi::api::core::v1::{Pod, PodDNSConfig};
use podenter_core::{ContainerUri, Error, Result};

/// Everything the helper needs to know about the target container
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Namespace of the target pod
    pub namespace: String,
    /// Target pod name
    pub pod: String,
    /// Node hosting the pod
    pub node: String,
    /// Target container name
    pub container: String,
    /// Whether the container was picked because none was named
    pub defaulted: bool,
    /// Runtime kind and runtime-native id of the container
    pub uri: ContainerUri,
    /// DNS policy of the target pod
    pub dns_policy: Option<String>,
    /// DNS config of the target pod
    pub dns_config: Option<PodDNSConfig>,
}

impl Target {
    /// Resolve the target from a fetched pod
    ///
    /// When `container` is `None` the first container of the pod is used.
    ///
    /// # Errors
    /// Returns [`Error::Resolution`] if the pod is not scheduled, the
    /// container does not exist or has not started, and
    /// [`Error::UnsupportedRuntime`] if its runtime is unknown
    pub fn resolve(pod: &Pod, container: Option<&str>) -> Result<Self> {
        let pod_name = pod.metadata.name.clone().unwrap_or_default();

        let spec = pod.spec.as_ref().ok_or_else(|| Error::Resolution {
            message: format!("pod {pod_name} has no spec"),
        })?;

        let node = spec
            .node_name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Resolution {
                message: format!("pod {pod_name} is not scheduled to a node"),
            })?;

        let (container, defaulted) = match container {
            Some(name) => {
                if !spec.containers.iter().any(|c| c.name == name) {
                    return Err(Error::Resolution {
                        message: format!("container {name} not found in pod {pod_name}"),
                    });
                }
                (name.to_string(), false)
            }
            None => {
                let first = spec.containers.first().ok_or_else(|| Error::Resolution {
                    message: format!("pod {pod_name} has no containers"),
                })?;
                (first.name.clone(), true)
            }
        };

        let container_id = pod
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_ref())
            .and_then(|statuses| statuses.iter().find(|s| s.name == container))
            .and_then(|s| s.container_id.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Resolution {
                message: format!("container {container} in pod {pod_name} has no runtime id"),
            })?;

        Ok(Self {
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            pod: pod_name,
            node,
            container,
            defaulted,
            uri: container_id.parse()?,
            dns_policy: spec.dns_policy.clone(),
            dns_config: spec.dns_config.clone(),
        })
    }
}


#[cfg(test)]
mod tests {
    use podenter_core::RuntimeKind;

    use super::fixtures::pod;
    use super::*;

    #[test]
    fn test_resolve_named_container() {
        let pod = pod(
            "shop",
            "web-0",
            &[("app", "containerd://aaa111"), ("sidecar", "containerd://bbb222")],
        );

        let target = Target::resolve(&pod, Some("sidecar")).unwrap();
        assert_eq!(target.namespace, "shop");
        assert_eq!(target.node, "node-1");
        assert_eq!(target.container, "sidecar");
        assert!(!target.defaulted);
        assert_eq!(target.uri.runtime(), RuntimeKind::Containerd);
        assert_eq!(target.uri.id(), "bbb222");
        assert_eq!(target.dns_policy.as_deref(), Some("ClusterFirst"));
    }

    #[test]
    fn test_resolve_defaults_to_first_container() {
        let pod = pod("shop", "web-0", &[("app", "cri-o://aaa111")]);

        let target = Target::resolve(&pod, None).unwrap();
        assert_eq!(target.container, "app");
        assert!(target.defaulted);
        assert_eq!(target.uri.runtime(), RuntimeKind::CriO);
    }

    #[test]
    fn test_resolve_unknown_container() {
        let pod = pod("shop", "web-0", &[("app", "docker://aaa111")]);
        assert!(matches!(
            Target::resolve(&pod, Some("db")),
            Err(Error::Resolution { .. })
        ));
    }

    #[test]
    fn test_resolve_unscheduled() {
        let mut pod = pod("shop", "web-0", &[("app", "docker://aaa111")]);
        if let Some(spec) = pod.spec.as_mut() {
            spec.node_name = None;
        }
        assert!(matches!(
            Target::resolve(&pod, None),
            Err(Error::Resolution { .. })
        ));
    }

    #[test]
    fn test_resolve_not_started() {
        let pod = pod("shop", "web-0", &[("app", "")]);
        assert!(matches!(
            Target::resolve(&pod, None),
            Err(Error::Resolution { .. })
        ));
    }

    #[test]
    fn test_resolve_unsupported_runtime() {
        let pod = pod("shop", "web-0", &[("app", "rkt://aaa111")]);
        assert!(matches!(
            Target::resolve(&pod, None),
            Err(Error::UnsupportedRuntime { .. })
        ));
    }
}
