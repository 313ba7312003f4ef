//! CLI argument definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "podenter")]
#[command(about = "Run commands inside a pod's container namespaces", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command in a container through a privileged helper pod
    Exec(ExecArgs),

    /// Delete helper pods that are no longer running
    Gc(GcArgs),
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Target pod
    pub pod: String,

    /// Namespace of the target pod (default: the kubeconfig context's)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Target container (default: the pod's first container)
    #[arg(short, long)]
    pub container: Option<String>,

    /// Pass stdin to the command
    #[arg(short = 'i', long)]
    pub stdin: bool,

    /// Allocate a terminal
    #[arg(short, long)]
    pub tty: bool,

    /// Tools mode: keep the helper's filesystem, container root at /croot
    #[arg(short = 'T', long)]
    pub tools: bool,

    /// Namespace to create the helper pod in (default: the target's)
    #[arg(long)]
    pub helper_namespace: Option<String>,

    /// Helper image (default depends on the mode)
    #[arg(long)]
    pub helper_image: Option<String>,

    /// Seconds to wait for the helper pod to start
    #[arg(long, default_value = "30")]
    pub helper_timeout: u64,

    /// Path to a kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Command to run
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GcArgs {
    /// Path to a kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Print the sweep report as JSON
    #[arg(long)]
    pub json: bool,
}
