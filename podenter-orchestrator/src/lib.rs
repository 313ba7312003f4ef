//! Helper workload orchestration for podenter
//!
//! This crate drives one helper workload per invocation: it resolves the
//! target container, schedules a privileged helper pod on the same node,
//! races the helper's start against a timeout and operator signals, relays
//! the helper's I/O, and deletes the helper on every exit path. A garbage
//! collector sweeps helpers left behind by killed invocations.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use podenter_orchestrator::{ExecRequest, KubeCluster, Session};
//!
//! # async fn run() -> podenter_core::Result<()> {
//! let cluster = KubeCluster::connect(None).await?;
//! let default_namespace = cluster.default_namespace().to_string();
//!
//! let session = Session::new(Arc::new(cluster), default_namespace);
//! let request = ExecRequest::new("web-0", vec!["ps".into(), "aux".into()]);
//! session.run(&request, &mut tokio::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cluster;
pub mod gc;
pub mod helper;
pub mod kubernetes;
pub mod logs;
pub mod mock;
pub mod names;
pub mod session;
pub mod target;
pub mod wait;

pub use cluster::{ClusterApi, LogStream, PhaseStream, PodSummary};
pub use gc::{GarbageCollector, GcFailure, GcReport};
pub use helper::{AgentCommand, HelperMode, HelperSpec};
pub use kubernetes::KubeCluster;
pub use logs::relay_logs;
pub use mock::{AttachOutcome, MockCluster};
pub use names::{FixedNames, NameGenerator, RandomSuffix};
pub use session::{ExecRequest, Session};
pub use target::Target;
pub use wait::{HelperCleanup, wait_for_helper};
