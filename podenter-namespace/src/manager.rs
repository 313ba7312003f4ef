//! Namespace identity lookup through procfs

use std::fs;
use std::path::PathBuf;

use podenter_core::{Error, ProcessId, Result};

use crate::config::NamespaceFlags;

const NAMESPACES: [(NamespaceFlags, &str); 7] = [
    (NamespaceFlags::MNT, "mnt"),
    (NamespaceFlags::UTS, "uts"),
    (NamespaceFlags::IPC, "ipc"),
    (NamespaceFlags::NET, "net"),
    (NamespaceFlags::PID, "pid"),
    (NamespaceFlags::CGROUP, "cgroup"),
    (NamespaceFlags::USER, "user"),
];

/// Namespace ids of a process, as `type:[inode]` links
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceInfo {
    pid: u32,
    entries: Vec<(&'static str, String)>,
}

impl NamespaceInfo {
    /// Read the namespace links of a process
    ///
    /// Only the namespaces in `flags` are read; [`NamespaceFlags::ALL`]
    /// reads every kind.
    ///
    /// # Errors
    /// Returns error if the process has no readable `/proc/<pid>/ns`,
    /// which usually means it has exited
    pub fn for_pid(pid: ProcessId, flags: NamespaceFlags) -> Result<Self> {
        Self::read_from(PathBuf::from("/proc"), pid, flags)
    }

    fn read_from(proc_root: PathBuf, pid: ProcessId, flags: NamespaceFlags) -> Result<Self> {
        let base_path = proc_root.join(pid.as_raw().to_string()).join("ns");

        fs::read_dir(&base_path).map_err(|e| Error::Resolution {
            message: format!("Target process {pid} is gone: {e}"),
        })?;

        let wanted = |flag: NamespaceFlags| {
            flags.contains(NamespaceFlags::ALL) || flags.contains(flag)
        };

        let entries = NAMESPACES
            .iter()
            .filter(|(flag, _)| wanted(*flag))
            .filter_map(|(_, name)| {
                fs::read_link(base_path.join(name))
                    .ok()
                    .map(|link| (*name, link.to_string_lossy().into_owned()))
            })
            .collect();

        Ok(Self {
            pid: pid.as_raw(),
            entries,
        })
    }

    /// Namespace id for a kind (`"net"`, `"pid"`, ...)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(kind, _)| *kind == name)
            .map(|(_, id)| id.as_str())
    }

    /// Number of namespace links read
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no namespace link was readable
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for NamespaceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid {}:", self.pid)?;
        for (kind, id) in &self.entries {
            write!(f, " {kind}={id}")?;
        }
        Ok(())
    }
}
