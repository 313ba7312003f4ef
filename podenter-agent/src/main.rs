//! Podenter entry agent
//!
//! Runs inside the privileged helper pod: resolves the target container
//! through its runtime, then replaces itself with an `nsenter` into the
//! container's namespaces.

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod run;

use cli::AgentArgs;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let args = AgentArgs::parse();

    // stderr lands in the helper's log, which is relayed as command output;
    // stay quiet unless asked. RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Only returns on failure
    if let Err(e) = run::execute(args).await {
        eprintln!("❌ Error: {e:#}");
        process::exit(1);
    }
}
