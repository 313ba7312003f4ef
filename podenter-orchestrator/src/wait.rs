//! Waiting for the helper workload to start
//!
//! Three activities race while the helper starts: the foreground watch, a
//! timer and the operator's shutdown signal. The first to claim the outcome
//! wins; it cancels the shared `done` token, which disarms the others.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use futures::StreamExt;
use podenter_core::{Error, HelperEvent, HelperPhase, Result};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cluster::ClusterApi;

const UNCLAIMED: u8 = 0;
const READY: u8 = 1;
const TIMED_OUT: u8 = 2;
const INTERRUPTED: u8 = 3;

/// Delete-by-name cleanup for one helper workload
///
/// Runs the delete at most once, however many paths call [`run`](Self::run).
/// Delete failures are logged and swallowed.
pub struct HelperCleanup {
    cluster: Arc<dyn ClusterApi>,
    namespace: String,
    name: String,
    done: AtomicBool,
}

impl HelperCleanup {
    /// Create a cleanup for `namespace/name`
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
            name: name.into(),
            done: AtomicBool::new(false),
        }
    }

    /// Helper workload name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Helper workload namespace
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether the delete has been issued
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Delete the helper workload unless already done
    ///
    /// Returns `true` if this call issued the delete.
    pub async fn run(&self) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }

        let event = match self.cluster.delete_pod(&self.namespace, &self.name).await {
            Ok(()) => HelperEvent::Deleted {
                name: self.name.clone(),
            },
            Err(e) => HelperEvent::CleanupFailed {
                name: self.name.clone(),
                message: e.to_string(),
            },
        };
        event.emit_trace();
        true
    }
}

impl std::fmt::Debug for HelperCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperCleanup")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("done", &self.has_run())
            .finish_non_exhaustive()
    }
}

fn claim(winner: &AtomicU8, outcome: u8) -> bool {
    winner
        .compare_exchange(UNCLAIMED, outcome, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Wait until the helper is running or has terminated
///
/// Returns the settled phase. If `timeout` elapses first, recent events
/// for the helper are printed, the helper is deleted and
/// [`Error::Timeout`] is returned; if `shutdown` is cancelled first, the
/// helper is deleted and [`Error::Interrupted`] is returned. Once a
/// settled phase is observed neither the timer nor the signal can fire.
///
/// # Errors
/// Returns [`Error::Lifecycle`] if the watch cannot be opened, otherwise
/// [`Error::Timeout`] or [`Error::Interrupted`] as above
pub async fn wait_for_helper(
    cluster: Arc<dyn ClusterApi>,
    cleanup: Arc<HelperCleanup>,
    timeout: Duration,
    shutdown: CancellationToken,
) -> Result<HelperPhase> {
    let name = cleanup.name().to_string();
    let mut phases = cluster.watch_phase(cleanup.namespace(), &name).await?;

    let done = CancellationToken::new();
    let winner = Arc::new(AtomicU8::new(UNCLAIMED));

    let responder = tokio::spawn(respond(
        Arc::clone(&cluster),
        Arc::clone(&cleanup),
        timeout,
        shutdown,
        done.clone(),
        Arc::clone(&winner),
    ));

    let mut settled = None;
    loop {
        tokio::select! {
            biased;

            () = done.cancelled() => break,

            item = phases.next() => match item {
                Some(Ok(phase)) => {
                    HelperEvent::PhaseObserved { name: name.clone(), phase }.emit_trace();

                    if phase.is_settled() && claim(&winner, READY) {
                        settled = Some(phase);
                        done.cancel();
                        break;
                    }
                }
                Some(Err(e)) => warn!(helper = %name, error = %e, "Watch error"),
                None => {
                    debug!(helper = %name, "Watch closed before the helper settled");
                    done.cancelled().await;
                    break;
                }
            },
        }
    }

    drop(phases);
    if let Err(e) = responder.await {
        warn!(helper = %name, error = %e, "Wait responder task failed");
    }

    match (winner.load(Ordering::Acquire), settled) {
        (READY, Some(phase)) => Ok(phase),
        (TIMED_OUT, _) => Err(Error::Timeout {
            name,
            after: timeout,
        }),
        _ => Err(Error::Interrupted),
    }
}

/// Background side of the race: timer and shutdown signal
async fn respond(
    cluster: Arc<dyn ClusterApi>,
    cleanup: Arc<HelperCleanup>,
    timeout: Duration,
    shutdown: CancellationToken,
    done: CancellationToken,
    winner: Arc<AtomicU8>,
) {
    let fired = tokio::select! {
        biased;

        () = done.cancelled() => return,
        () = shutdown.cancelled() => INTERRUPTED,
        () = sleep(timeout) => TIMED_OUT,
    };

    if !claim(&winner, fired) {
        return;
    }

    let name = cleanup.name().to_string();
    if fired == TIMED_OUT {
        HelperEvent::TimedOut {
            name: name.clone(),
            after: timeout,
        }
        .emit_trace();
        print_events(cluster.as_ref(), cleanup.namespace(), &name).await;
    } else {
        HelperEvent::Interrupted { name }.emit_trace();
    }

    cleanup.run().await;
    done.cancel();
}

/// Best-effort dump of the helper's recent events to stderr
async fn print_events(cluster: &dyn ClusterApi, namespace: &str, name: &str) {
    match cluster.recent_events(namespace, name).await {
        Ok(events) if events.is_empty() => eprintln!("No events recorded for {name}"),
        Ok(events) => {
            eprintln!("Events for {name}:");
            for event in events {
                eprintln!("  {event}");
            }
        }
        Err(e) => warn!(helper = %name, error = %e, "Failed to list events"),
    }
}
