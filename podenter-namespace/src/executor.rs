//! Process execution in joined namespaces
//!
//! Both entry points replace the calling process image. They only return
//! when the exec itself failed.

use std::ffi::CString;
use std::os::unix::process::CommandExt;
use std::process::Command;

use nix::mount::{MntFlags, MsFlags, mount, umount2};
use nix::sched::{CloneFlags, unshare};
use podenter_core::Error;
use tracing::{debug, warn};

use crate::config::Invocation;

/// Build the command for an invocation, with exactly its environment
///
/// Entries without `=` are dropped. When a key repeats, the last entry wins.
#[must_use]
pub fn command_for(invocation: &Invocation) -> Command {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).env_clear();

    for entry in &invocation.env {
        match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                command.env(key, value);
            }
            _ => debug!(entry = %entry, "Skipping malformed environment entry"),
        }
    }

    command
}

/// Replace the current process with the invocation
///
/// Stdio is inherited, so the joined program talks directly to whatever
/// the caller is attached to.
pub fn exec(invocation: &Invocation) -> Error {
    debug!("🚀 Executing: {}", invocation.argv().join(" "));

    let err = command_for(invocation).exec();

    Error::Namespace {
        message: format!("Failed to execute {}: {err}", invocation.program),
    }
}

/// Set up a private mount namespace with a fresh `/proc`
///
/// Used after joining a PID namespace without its mount namespace, so that
/// tools reading procfs see the joined PID namespace.
pub fn remount_proc() -> Result<(), Error> {
    debug!("Unsharing mount namespace");
    unshare(CloneFlags::CLONE_NEWNS).map_err(|e| Error::Namespace {
        message: format!("Failed to unshare mount namespace: {e}"),
    })?;

    // keep the remount from propagating back to the host
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| Error::Namespace {
        message: format!("Failed to make / private: {e}"),
    })?;

    match umount2("/proc", MntFlags::MNT_DETACH) {
        Ok(()) => debug!("Detached old /proc"),
        Err(e) => debug!("Could not unmount /proc (continuing anyway): {}", e),
    }

    let flags = MsFlags::MS_NOSUID | MsFlags::MS_NODEV | MsFlags::MS_NOEXEC;
    mount(Some("proc"), "/proc", Some("proc"), flags, None::<&str>).map_err(|e| {
        Error::Namespace {
            message: format!("Failed to mount /proc: {e}"),
        }
    })?;

    debug!("✅ New /proc mounted");
    Ok(())
}

/// Remount `/proc` in a private mount namespace, then exec the command
///
/// The command is looked up on `PATH`; the environment is kept as is.
pub fn remount_proc_exec(command: &[String]) -> Error {
    let Some(program) = command.first() else {
        return Error::InvalidConfig {
            message: "Command cannot be empty".to_string(),
        };
    };

    if let Err(e) = remount_proc() {
        return e;
    }

    let program_cstring = match CString::new(program.as_bytes()) {
        Ok(s) => s,
        Err(e) => {
            return Error::InvalidConfig {
                message: format!("Invalid program name: {e}"),
            };
        }
    };

    let args_cstrings: Vec<CString> = match command
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect()
    {
        Ok(v) => v,
        Err(e) => {
            return Error::InvalidConfig {
                message: format!("Invalid argument: {e}"),
            };
        }
    };

    debug!("Calling execvp for {}", program);

    match nix::unistd::execvp(&program_cstring, &args_cstrings) {
        Ok(never) => match never {},
        Err(e) => {
            warn!("Failed to execute {}: {}", program, e);
            Error::Namespace {
                message: format!("Failed to execute {program}: {e}"),
            }
        }
    }
}
