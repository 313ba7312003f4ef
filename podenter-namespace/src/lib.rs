//! Joining the Linux namespaces of a running process
//!
//! This crate turns a description of the namespaces to join into an
//! `nsenter` invocation and executes it:
//! - [`JoinRequest`] - immutable request, rendered in canonical token order
//! - [`executor`] - replaces the current process with the join, or
//!   remounts `/proc` in a private mount namespace before exec
//! - [`NamespaceInfo`] - namespace ids of a target, read from procfs

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod config;
pub mod executor;
pub mod manager;

pub use config::{Invocation, JoinRequest, NamespaceFlags, WorkingDir};
pub use manager::NamespaceInfo;
