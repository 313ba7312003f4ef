//! `podenter gc`

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use podenter_orchestrator::{GarbageCollector, GcReport, KubeCluster};

use crate::cli::GcArgs;

/// Delete helper pods that are no longer running
pub async fn execute(args: GcArgs) -> Result<()> {
    let cluster = KubeCluster::connect(args.kubeconfig.as_deref())
        .await
        .context("Failed to connect to the cluster")?;

    let report = GarbageCollector::new(Arc::new(cluster))
        .sweep()
        .await
        .context("Failed to list helper pods")?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize the report")?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    if !report.is_clean() {
        bail!("{} helper pods could not be deleted", report.failed.len());
    }
    Ok(())
}

fn print_report(report: &GcReport) {
    for (namespace, name) in &report.deleted {
        println!("🗑️  Deleted {namespace}/{name}");
    }
    for failure in &report.failed {
        eprintln!(
            "⚠️  Failed to delete {}/{}: {}",
            failure.namespace, failure.name, failure.message
        );
    }
    println!(
        "✅ {} deleted, {} running, {} failed",
        report.deleted.len(),
        report.kept,
        report.failed.len()
    );
}
