//! `podenter exec`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use podenter_orchestrator::{ExecRequest, HelperMode, KubeCluster, Session};

use crate::cli::ExecArgs;
use crate::signals;

/// Translate arguments into an orchestrator request
pub fn request(args: ExecArgs) -> ExecRequest {
    let mode = if args.tools {
        HelperMode::Tools
    } else {
        HelperMode::Default
    };

    ExecRequest {
        namespace: args.namespace,
        pod: args.pod,
        container: args.container,
        command: args.command,
        stdin: args.stdin,
        tty: args.tty,
        mode,
        helper_namespace: args.helper_namespace,
        helper_image: args.helper_image,
        timeout: Duration::from_secs(args.helper_timeout),
    }
}

/// Run the command in the target container
pub async fn execute(args: ExecArgs) -> Result<()> {
    let kubeconfig = args.kubeconfig.clone();
    let request = request(args);
    request.validate().context("Invalid arguments")?;

    let cluster = KubeCluster::connect(kubeconfig.as_deref())
        .await
        .context("Failed to connect to the cluster")?;

    // signals keep their default action until there is a helper to clean up
    let shutdown = signals::shutdown_token()?;
    let default_namespace = cluster.default_namespace().to_string();

    let session = Session::new(Arc::new(cluster), default_namespace).with_shutdown(shutdown);

    session
        .run(&request, &mut tokio::io::stdout())
        .await
        .with_context(|| format!("Failed to run command in pod {}", request.pod))
}
