//! Container runtime inspection with pluggable strategies
//!
//! Given a runtime kind and a container id, resolve the container's init
//! pid, root filesystem, working directory and environment. Docker
//! containers are read through containerd's socket API; containerd (CRI)
//! and CRI-O containers through `crictl inspect`.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod direct;
pub mod inspector;
pub mod probe;

pub use direct::DirectClient;
pub use inspector::{ContainerDescriptor, RuntimeInspector, inspector_for, resolve_root_path};
pub use probe::{CliProbe, parse_inspect};
