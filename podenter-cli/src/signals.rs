//! Operator signals

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Token cancelled on SIGINT, SIGTERM, SIGHUP or SIGQUIT
pub fn shutdown_token() -> Result<CancellationToken> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to register SIGTERM")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to register SIGHUP")?;
    let mut sigquit = signal(SignalKind::quit()).context("Failed to register SIGQUIT")?;

    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sighup.recv() => "SIGHUP",
            _ = sigquit.recv() => "SIGQUIT",
        };

        warn!("Received {name}");
        trigger.cancel();
    });

    Ok(token)
}
