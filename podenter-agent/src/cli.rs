//! CLI argument definitions

use std::path::PathBuf;

use clap::Parser;
use podenter_core::RuntimeKind;
use podenter_namespace::{NamespaceFlags, WorkingDir};

#[derive(Parser, Debug)]
#[command(name = "podenter-agent")]
#[command(about = "Run a program inside the namespaces of a container", long_about = None)]
#[command(version)]
pub struct AgentArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enter every namespace of the container
    #[arg(short, long)]
    pub all: bool,

    /// Enter the mount namespace
    #[arg(short, long)]
    pub mount: bool,

    /// Enter the UTS namespace
    #[arg(short, long)]
    pub uts: bool,

    /// Enter the IPC namespace
    #[arg(short, long)]
    pub ipc: bool,

    /// Enter the network namespace
    #[arg(short, long)]
    pub net: bool,

    /// Enter the PID namespace
    #[arg(short, long)]
    pub pid: bool,

    /// Enter the cgroup namespace
    #[arg(short = 'C', long)]
    pub cgroup: bool,

    /// Enter the user namespace
    #[arg(short = 'U', long)]
    pub user: bool,

    /// Container runtime (docker, containerd, cri-o)
    #[arg(short = 'R', long)]
    pub runtime: RuntimeKind,

    /// Runtime container id
    #[arg(short, long)]
    pub container: String,

    /// Runtime socket (default: the runtime's own)
    #[arg(short, long)]
    pub socket: Option<String>,

    /// Expose the container root at this path
    #[arg(long)]
    pub root_symlink: Option<PathBuf>,

    /// Start in the container's working directory
    #[arg(long)]
    pub wd: bool,

    /// Path the container's working directory is taken relative to
    #[arg(long, requires = "wd")]
    pub wd_base: Option<String>,

    /// Extra environment entry (KEY=VALUE), may be repeated
    #[arg(short, long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// User id inside the container (0 keeps the current one)
    #[arg(short = 'S', long, default_value_t = 0)]
    pub setuid: u32,

    /// Group id inside the container (0 keeps the current one)
    #[arg(short = 'G', long, default_value_t = 0)]
    pub setgid: u32,

    /// Program to run
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

impl AgentArgs {
    /// Namespaces selected on the command line
    pub fn flags(&self) -> NamespaceFlags {
        [
            (self.all, NamespaceFlags::ALL),
            (self.mount, NamespaceFlags::MNT),
            (self.uts, NamespaceFlags::UTS),
            (self.ipc, NamespaceFlags::IPC),
            (self.net, NamespaceFlags::NET),
            (self.pid, NamespaceFlags::PID),
            (self.cgroup, NamespaceFlags::CGROUP),
            (self.user, NamespaceFlags::USER),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(NamespaceFlags::NONE, |acc, (_, flag)| acc | flag)
    }

    /// Working directory policy for a container's recorded cwd
    pub fn working_dir(&self, recorded: &str) -> WorkingDir {
        match (&self.wd_base, self.wd) {
            (_, false) => WorkingDir::Unchanged,
            (None, true) => WorkingDir::Recorded,
            (Some(base), true) => WorkingDir::Based {
                base: base.clone(),
                recorded: recorded.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AgentArgs {
        AgentArgs::try_parse_from(std::iter::once("podenter-agent").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_default_mode_line() {
        let args = parse(&[
            "--mount",
            "--pid",
            "--net",
            "--ipc",
            "--uts",
            "--runtime=containerd",
            "--container=abc123",
            "--wd",
            "--",
            "ps",
            "-ef",
        ]);

        assert_eq!(args.runtime, RuntimeKind::Containerd);
        assert_eq!(args.container, "abc123");
        assert_eq!(
            args.flags(),
            NamespaceFlags::MNT
                | NamespaceFlags::PID
                | NamespaceFlags::NET
                | NamespaceFlags::IPC
                | NamespaceFlags::UTS
        );
        assert_eq!(args.working_dir("/app"), WorkingDir::Recorded);
        assert_eq!(args.command, vec!["ps", "-ef"]);
    }

    #[test]
    fn test_tools_mode_line() {
        let args = parse(&[
            "--pid",
            "--runtime=cri-o",
            "--container=abc123",
            "--root-symlink",
            "/croot",
            "--wd",
            "--wd-base",
            "/croot",
            "--env",
            "TERM=xterm",
            "--",
            "remount-proc-exec",
            "sh",
        ]);

        assert_eq!(args.root_symlink, Some(PathBuf::from("/croot")));
        assert_eq!(args.env, vec!["TERM=xterm"]);
        assert_eq!(
            args.working_dir("/app"),
            WorkingDir::Based {
                base: "/croot".to_string(),
                recorded: "/app".to_string()
            }
        );
    }

    #[test]
    fn test_short_flags() {
        let args = parse(&[
            "-a", "-C", "-U", "-R", "docker", "-c", "abc", "-s", "/tmp/c.sock", "-S", "1000",
            "-G", "1000", "-e", "A=1", "-e", "B=2", "--", "id",
        ]);

        assert!(args.flags().contains(NamespaceFlags::ALL));
        assert!(args.flags().contains(NamespaceFlags::CGROUP));
        assert!(args.flags().contains(NamespaceFlags::USER));
        assert_eq!(args.socket.as_deref(), Some("/tmp/c.sock"));
        assert_eq!((args.setuid, args.setgid), (1000, 1000));
        assert_eq!(args.env, vec!["A=1", "B=2"]);
        assert_eq!(args.working_dir("/app"), WorkingDir::Unchanged);
    }

    #[test]
    fn test_rejects_unknown_runtime() {
        let result = AgentArgs::try_parse_from([
            "podenter-agent",
            "--runtime=rkt",
            "--container=abc",
            "--",
            "id",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_wd_base_requires_wd() {
        let result = AgentArgs::try_parse_from([
            "podenter-agent",
            "--runtime=docker",
            "--container=abc",
            "--wd-base",
            "/croot",
            "--",
            "id",
        ]);
        assert!(result.is_err());
    }
}
