//! Garbage collection of orphaned helper workloads

use std::sync::Arc;

use podenter_core::defaults::{HELPER_LABEL_KEY, HELPER_LABEL_VALUE, helper_selector};
use podenter_core::{HelperPhase, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cluster::ClusterApi;

/// A helper workload the sweep failed to delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GcFailure {
    /// Namespace of the helper
    pub namespace: String,
    /// Helper name
    pub name: String,
    /// Error message
    pub message: String,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    /// `(namespace, name)` of deleted helpers
    pub deleted: Vec<(String, String)>,
    /// Running helpers left alone
    pub kept: usize,
    /// Helpers that could not be deleted
    pub failed: Vec<GcFailure>,
}

impl GcReport {
    /// Whether every stale helper was deleted
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes labelled helper workloads that are no longer running
#[derive(Clone)]
pub struct GarbageCollector {
    cluster: Arc<dyn ClusterApi>,
}

impl GarbageCollector {
    /// Create a collector
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }

    /// Sweep all namespaces once
    ///
    /// Per-helper delete failures are recorded in the report and do not
    /// stop the sweep.
    ///
    /// # Errors
    /// Returns error only if the helpers cannot be listed
    pub async fn sweep(&self) -> Result<GcReport> {
        let pods = self.cluster.list_pods(&helper_selector()).await?;
        let mut report = GcReport::default();

        for pod in pods {
            if !pod.has_label(HELPER_LABEL_KEY, HELPER_LABEL_VALUE) {
                continue;
            }
            if pod.phase == HelperPhase::Running {
                debug!(namespace = %pod.namespace, helper = %pod.name, "Keeping running helper");
                report.kept += 1;
                continue;
            }

            match self.cluster.delete_pod(&pod.namespace, &pod.name).await {
                Ok(()) => {
                    info!(
                        namespace = %pod.namespace,
                        helper = %pod.name,
                        phase = %pod.phase,
                        "Deleted stale helper"
                    );
                    report.deleted.push((pod.namespace, pod.name));
                }
                Err(e) => {
                    warn!(
                        namespace = %pod.namespace,
                        helper = %pod.name,
                        error = %e,
                        "Failed to delete helper"
                    );
                    report.failed.push(GcFailure {
                        namespace: pod.namespace,
                        name: pod.name,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

impl std::fmt::Debug for GarbageCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GarbageCollector").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::{Pod, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;
    use crate::mock::MockCluster;

    fn pod(namespace: &str, name: &str, phase: &str, labelled: bool) -> Pod {
        let labels = labelled.then(|| {
            BTreeMap::from([(HELPER_LABEL_KEY.to_string(), HELPER_LABEL_VALUE.to_string())])
        });

        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels,
                ..Default::default()
            },
            spec: None,
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_stale_helpers() {
        let mock = MockCluster::new();
        mock.add_pod(pod("a", "podenter-run", "Running", true)).await;
        mock.add_pod(pod("a", "podenter-fail", "Failed", true)).await;
        mock.add_pod(pod("b", "podenter-ok", "Succeeded", true)).await;
        mock.add_pod(pod("a", "web-0", "Failed", false)).await;
        mock.add_pod(pod("b", "db-0", "Succeeded", false)).await;

        let report = GarbageCollector::new(Arc::new(mock.clone()))
            .sweep()
            .await
            .unwrap();

        assert_eq!(
            report.deleted,
            vec![
                ("a".to_string(), "podenter-fail".to_string()),
                ("b".to_string(), "podenter-ok".to_string()),
            ]
        );
        assert_eq!(report.kept, 1);
        assert!(report.is_clean());
        assert_eq!(mock.deleted().await, report.deleted);
    }

    #[tokio::test]
    async fn test_sweep_skips_unlabelled_pods_in_listing() {
        let mock = MockCluster::new();
        mock.ignore_selectors().await;
        mock.add_pod(pod("a", "web-0", "Failed", false)).await;
        mock.add_pod(pod("a", "podenter-x", "Succeeded", true)).await;

        let report = GarbageCollector::new(Arc::new(mock.clone()))
            .sweep()
            .await
            .unwrap();

        assert_eq!(report.deleted, vec![("a".to_string(), "podenter-x".to_string())]);
        assert_eq!(mock.deleted().await, report.deleted);
        assert!(mock.get_pod("a", "web-0").await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_continues_after_failure() {
        let mock = MockCluster::new();
        mock.add_pod(pod("a", "podenter-x", "Failed", true)).await;
        mock.add_pod(pod("a", "podenter-y", "Pending", true)).await;
        mock.fail_delete("podenter-x").await;

        let report = GarbageCollector::new(Arc::new(mock.clone()))
            .sweep()
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "podenter-x");
        assert_eq!(report.deleted, vec![("a".to_string(), "podenter-y".to_string())]);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let mock = MockCluster::new();
        mock.add_pod(pod("a", "podenter-x", "Succeeded", true)).await;
        let gc = GarbageCollector::new(Arc::new(mock.clone()));

        assert_eq!(gc.sweep().await.unwrap().deleted.len(), 1);
        assert_eq!(gc.sweep().await.unwrap(), GcReport::default());
    }

    #[test]
    fn test_report_serialization() {
        let report = GcReport {
            deleted: vec![("a".to_string(), "podenter-x".to_string())],
            kept: 2,
            failed: vec![GcFailure {
                namespace: "b".to_string(),
                name: "podenter-y".to_string(),
                message: "forbidden".to_string(),
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["deleted"][0][1], "podenter-x");
        assert_eq!(json["kept"], 2);
        assert_eq!(json["failed"][0]["message"], "forbidden");
    }
}
