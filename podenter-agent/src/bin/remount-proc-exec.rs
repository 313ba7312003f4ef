//! Remount `/proc` in a private mount namespace, then exec a command
//!
//! Used in tools mode after joining a container's PID namespace, so that
//! procfs reflects the joined namespace.

use std::process;

use clap::Parser;
use podenter_namespace::executor;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "remount-proc-exec")]
#[command(about = "Remount /proc privately and exec a command", long_about = None)]
#[command(version)]
struct Args {
    /// Command to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let err = executor::remount_proc_exec(&args.command);
    eprintln!("❌ Error: {err}");
    process::exit(1);
}
