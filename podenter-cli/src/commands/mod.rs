//! Subcommand implementations

pub mod exec;
pub mod gc;
