//! Podenter CLI
//!
//! Runs a command inside the namespaces of a pod's container by scheduling
//! a privileged helper pod next to it.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod signals;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // RUST_LOG wins over -v; logs go to stderr, stdout carries the command's output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute the command
    let result = match cli.command {
        Commands::Exec(args) => commands::exec::execute(args).await,
        Commands::Gc(args) => commands::gc::execute(args).await,
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("❌ Error: {e:#}");
        process::exit(1);
    }
}
