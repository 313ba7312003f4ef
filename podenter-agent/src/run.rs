//! Resolve the target container and exec into its namespaces

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;
use std::path::Path;

use anyhow::{Context, Result, bail};
use podenter_namespace::{JoinRequest, NamespaceInfo, executor};
use podenter_runtime::{ContainerDescriptor, inspector_for};
use tracing::debug;

use crate::cli::AgentArgs;

/// Execute the agent; only returns on failure
pub async fn execute(args: AgentArgs) -> Result<()> {
    let inspector = inspector_for(args.runtime, args.socket.as_deref());
    let descriptor = inspector
        .inspect(&args.container)
        .await
        .with_context(|| {
            format!(
                "Failed to inspect {} container {}",
                args.runtime, args.container
            )
        })?;

    debug!(
        container = %descriptor.id,
        pid = %descriptor.init_pid,
        root = %descriptor.root_path.display(),
        "Resolved container"
    );

    if !descriptor.init_pid.is_valid() {
        bail!("Container {} has no running init process", descriptor.id);
    }

    let namespaces = NamespaceInfo::for_pid(descriptor.init_pid, args.flags())
        .context("Target container is no longer running")?;
    debug!("Joining {namespaces}");

    if let Some(link) = &args.root_symlink {
        link_root(link, &descriptor.root_path)?;
    }

    let invocation = join_request(&args, &descriptor)
        .render()
        .context("Invalid join request")?;

    Err(executor::exec(&invocation)).context("Failed to enter container")
}

/// Join request for a resolved container
///
/// The joined process gets the container's recorded environment, then the
/// `--env` entries, then `PWD` when a working directory base is set.
pub fn join_request(args: &AgentArgs, descriptor: &ContainerDescriptor) -> JoinRequest {
    let request = JoinRequest::new()
        .with_namespaces(args.flags())
        .with_target(descriptor.init_pid)
        .with_uid(args.setuid)
        .with_gid(args.setgid)
        .with_working_dir(args.working_dir(&descriptor.working_dir))
        .with_env(descriptor.env.iter().cloned())
        .with_program(args.command.clone());

    args.env
        .iter()
        .fold(request, |request, entry| request.with_env_override(entry.clone()))
}

/// Point `link` at the container root, replacing an existing link
fn link_root(link: &Path, root: &Path) -> Result<()> {
    if root.as_os_str().is_empty() {
        bail!("Container root path is unknown, cannot create {}", link.display());
    }

    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(link)
            .with_context(|| format!("Failed to replace {}", link.display()))?,
        Ok(_) => bail!("{} exists and is not a symlink", link.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("Failed to stat {}", link.display())),
    }

    symlink(root, link)
        .with_context(|| format!("Failed to link {} to {}", link.display(), root.display()))?;
    debug!(link = %link.display(), root = %root.display(), "Linked container root");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use podenter_core::{ProcessId, RuntimeKind};

    use super::*;

    fn descriptor() -> ContainerDescriptor {
        ContainerDescriptor {
            runtime: RuntimeKind::Containerd,
            id: "abc123".to_string(),
            init_pid: ProcessId::from_raw(4821),
            root_path: PathBuf::from(
                "/run/containerd/io.containerd.runtime.v2.task/k8s.io/abc123/rootfs",
            ),
            working_dir: "/app".to_string(),
            env: vec!["PATH=/usr/bin".to_string(), "TERM=dumb".to_string()],
        }
    }

    fn args(line: &[&str]) -> AgentArgs {
        AgentArgs::try_parse_from(std::iter::once("podenter-agent").chain(line.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_default_mode_invocation() {
        let args = args(&[
            "--mount", "--pid", "--net", "--ipc", "--uts", "--runtime=containerd",
            "--container=abc123", "--wd", "--", "ps", "-ef",
        ]);
        let invocation = join_request(&args, &descriptor()).render().unwrap();

        assert_eq!(invocation.program, "nsenter");
        assert_eq!(
            invocation.args,
            vec![
                "--target=4821", "--mount", "--uts", "--ipc", "--net", "--pid", "--wd", "--",
                "ps", "-ef"
            ]
        );
        assert_eq!(invocation.env, vec!["PATH=/usr/bin", "TERM=dumb"]);
    }

    #[test]
    fn test_tools_mode_invocation() {
        let args = args(&[
            "--pid", "--net", "--ipc", "--uts", "--runtime=containerd", "--container=abc123",
            "--root-symlink", "/croot", "--wd", "--wd-base", "/croot", "--env", "TERM=xterm",
            "--", "remount-proc-exec", "sh",
        ]);
        let invocation = join_request(&args, &descriptor()).render().unwrap();

        assert!(invocation.args.contains(&"--wd=/croot/app".to_string()));
        assert!(!invocation.args.contains(&"--mount".to_string()));
        assert_eq!(
            invocation.env,
            vec!["PATH=/usr/bin", "TERM=dumb", "TERM=xterm", "PWD=/croot/app"]
        );
    }

    #[test]
    fn test_credentials() {
        let args = args(&[
            "-p", "-R", "docker", "-c", "abc123", "-S", "1000", "-G", "2000", "--", "id",
        ]);
        let invocation = join_request(&args, &descriptor()).render().unwrap();

        assert!(invocation.args.contains(&"--setuid=1000".to_string()));
        assert!(invocation.args.contains(&"--setgid=2000".to_string()));
    }

    #[test]
    fn test_zero_pid_rejected() {
        let args = args(&["-p", "-R", "docker", "-c", "abc123", "--", "id"]);
        let mut descriptor = descriptor();
        descriptor.init_pid = ProcessId::from_raw(0);

        assert!(join_request(&args, &descriptor).render().is_err());
    }

    #[test]
    fn test_link_root_replaces_symlink() {
        let dir = std::env::temp_dir().join(format!("podenter-agent-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let link = dir.join("croot");

        link_root(&link, Path::new("/")).unwrap();
        link_root(&link, &dir).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), dir);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_link_root_requires_root() {
        assert!(link_root(Path::new("/tmp/podenter-never"), Path::new("")).is_err());
    }
}
