//! Podenter Core - Foundation types, events, and defaults
//!
//! This crate provides the core abstractions shared by the entry agent and
//! the operator-facing orchestrator.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod defaults;
pub mod error;
pub mod events;
pub mod types;

pub use error::{Error, Result};
pub use events::{ClusterEvent, HelperEvent};
pub use types::{ContainerUri, HelperPhase, ProcessId, RuntimeKind};
