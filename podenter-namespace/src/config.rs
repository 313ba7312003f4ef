//! Namespace-join request
//!
//! A [`JoinRequest`] is an immutable description of which namespaces of a
//! target process to join and what to run once inside. [`JoinRequest::render`]
//! turns it into an `nsenter` [`Invocation`] whose tokens always come out in
//! the same order, whatever order the request was assembled in.

use podenter_core::{Error, ProcessId, Result};

/// Executable performing the join
pub const NSENTER: &str = "nsenter";

/// Separator between join options and the program argv
pub const SEPARATOR: &str = "--";

/// Namespace flags for bitwise operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NamespaceFlags(u32);

impl NamespaceFlags {
    /// PID namespace flag
    pub const PID: Self = Self(0b0000_0001);
    /// Network namespace flag
    pub const NET: Self = Self(0b0000_0010);
    /// Mount namespace flag
    pub const MNT: Self = Self(0b0000_0100);
    /// UTS namespace flag
    pub const UTS: Self = Self(0b0000_1000);
    /// IPC namespace flag
    pub const IPC: Self = Self(0b0001_0000);
    /// User namespace flag
    pub const USER: Self = Self(0b0010_0000);
    /// CGroup namespace flag
    pub const CGROUP: Self = Self(0b0100_0000);
    /// Shortcut: every namespace the target has (`--all`)
    pub const ALL: Self = Self(0b1000_0000);

    /// No namespaces
    pub const NONE: Self = Self(0);

    /// Check if flag is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if no flag is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for NamespaceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for NamespaceFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Emission order of namespace tokens
const CANONICAL: [(NamespaceFlags, &str); 8] = [
    (NamespaceFlags::ALL, "--all"),
    (NamespaceFlags::MNT, "--mount"),
    (NamespaceFlags::UTS, "--uts"),
    (NamespaceFlags::IPC, "--ipc"),
    (NamespaceFlags::NET, "--net"),
    (NamespaceFlags::PID, "--pid"),
    (NamespaceFlags::CGROUP, "--cgroup"),
    (NamespaceFlags::USER, "--user"),
];

/// Working directory of the joined process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkingDir {
    /// Leave the working directory alone
    #[default]
    Unchanged,

    /// Use the cwd the container recorded for its init process
    Recorded,

    /// Prefix the recorded cwd with a base path and export `PWD`
    Based {
        /// Where the container root is reachable from the joining process
        base: String,
        /// Recorded cwd of the container
        recorded: String,
    },
}

impl WorkingDir {
    /// Directory the joined process starts in, when it is known up front
    #[must_use]
    pub fn resolved(&self) -> Option<String> {
        match self {
            Self::Unchanged | Self::Recorded => None,
            Self::Based { base, recorded } => {
                let base = base.trim_end_matches('/');
                let recorded = recorded.trim_start_matches('/');
                if recorded.is_empty() {
                    Some(if base.is_empty() { "/".to_string() } else { base.to_string() })
                } else {
                    Some(format!("{base}/{recorded}"))
                }
            }
        }
    }
}

/// Rendered join command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable
    pub program: String,
    /// Arguments (without the executable)
    pub args: Vec<String>,
    /// Complete environment as `KEY=VALUE` entries, in order
    pub env: Vec<String>,
}

impl Invocation {
    /// Executable followed by its arguments
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Namespace-join request
///
/// # Example
/// ```
/// use podenter_core::ProcessId;
/// use podenter_namespace::{JoinRequest, NamespaceFlags};
///
/// let invocation = JoinRequest::new()
///     .with_namespace(NamespaceFlags::PID)
///     .with_namespace(NamespaceFlags::NET)
///     .with_target(ProcessId::from_raw(4242))
///     .with_program(vec!["ps".to_string(), "aux".to_string()])
///     .render()
///     .unwrap();
///
/// assert_eq!(
///     invocation.args,
///     vec!["--target=4242", "--net", "--pid", "--", "ps", "aux"]
/// );
/// ```
///
/// A uid or gid of `0` cannot be told apart from "no override": both
/// render no `--setuid`/`--setgid` token, so the joined process keeps the
/// credentials `nsenter` itself runs with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinRequest {
    flags: NamespaceFlags,
    target: Option<ProcessId>,
    uid: u32,
    gid: u32,
    working_dir: WorkingDir,
    env: Vec<String>,
    env_overrides: Vec<String>,
    program: Vec<String>,
}

impl JoinRequest {
    /// Create an empty request
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a namespace of the target (repeating a flag is a no-op)
    #[must_use]
    pub fn with_namespace(mut self, flag: NamespaceFlags) -> Self {
        self.flags |= flag;
        self
    }

    /// Join several namespaces at once
    #[must_use]
    pub fn with_namespaces(mut self, flags: NamespaceFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the process whose namespaces are joined
    #[must_use]
    pub fn with_target(mut self, pid: ProcessId) -> Self {
        self.target = Some(pid);
        self
    }

    /// Set the uid inside the joined namespaces (`0` means no override)
    #[must_use]
    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    /// Set the gid inside the joined namespaces (`0` means no override)
    #[must_use]
    pub fn with_gid(mut self, gid: u32) -> Self {
        self.gid = gid;
        self
    }

    /// Set the working directory policy
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: WorkingDir) -> Self {
        self.working_dir = working_dir;
        self
    }

    /// Set the base environment (usually the container's recorded one)
    #[must_use]
    pub fn with_env<I, S>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env = env.into_iter().map(Into::into).collect();
        self
    }

    /// Append a `KEY=VALUE` entry after the base environment
    #[must_use]
    pub fn with_env_override(mut self, entry: impl Into<String>) -> Self {
        self.env_overrides.push(entry.into());
        self
    }

    /// Set the program argv executed after joining
    #[must_use]
    pub fn with_program(mut self, program: Vec<String>) -> Self {
        self.program = program;
        self
    }

    /// Requested namespaces
    #[must_use]
    pub const fn flags(&self) -> NamespaceFlags {
        self.flags
    }

    /// Target process, if set
    #[must_use]
    pub const fn target(&self) -> Option<ProcessId> {
        self.target
    }

    /// Working directory policy
    #[must_use]
    pub const fn working_dir(&self) -> &WorkingDir {
        &self.working_dir
    }

    /// Namespace tokens in canonical order
    #[must_use]
    pub fn namespace_tokens(&self) -> Vec<&'static str> {
        CANONICAL
            .iter()
            .filter(|(flag, _)| self.flags.contains(*flag))
            .map(|(_, token)| *token)
            .collect()
    }

    /// Render the `nsenter` invocation
    ///
    /// # Errors
    /// Returns error if the target pid is unset or zero, or the program is empty
    pub fn render(&self) -> Result<Invocation> {
        let target = self
            .target
            .filter(|pid| pid.is_valid())
            .ok_or_else(|| Error::InvalidConfig {
                message: "target pid must be set and non-zero".to_string(),
            })?;

        if self.program.is_empty() {
            return Err(Error::InvalidConfig {
                message: "program to execute cannot be empty".to_string(),
            });
        }

        let mut args = vec![format!("--target={target}")];
        args.extend(self.namespace_tokens().into_iter().map(str::to_string));

        if self.uid != 0 {
            args.push(format!("--setuid={}", self.uid));
        }
        if self.gid != 0 {
            args.push(format!("--setgid={}", self.gid));
        }

        let mut env = self.env.clone();
        env.extend(self.env_overrides.iter().cloned());

        match &self.working_dir {
            WorkingDir::Unchanged => {}
            WorkingDir::Recorded => args.push("--wd".to_string()),
            based @ WorkingDir::Based { .. } => {
                if let Some(dir) = based.resolved() {
                    args.push(format!("--wd={dir}"));
                    env.push(format!("PWD={dir}"));
                }
            }
        }

        args.push(SEPARATOR.to_string());
        args.extend(self.program.iter().cloned());

        Ok(Invocation {
            program: NSENTER.to_string(),
            args,
            env,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), "id".to_string()]
    }

    #[test]
    fn test_namespace_flags() {
        let flags = NamespaceFlags::PID | NamespaceFlags::NET;

        assert!(flags.contains(NamespaceFlags::PID));
        assert!(flags.contains(NamespaceFlags::NET));
        assert!(!flags.contains(NamespaceFlags::MNT));
        assert!(NamespaceFlags::NONE.is_empty());
    }

    #[test]
    fn test_canonical_order_ignores_call_order() {
        let a = JoinRequest::new()
            .with_namespace(NamespaceFlags::USER)
            .with_namespace(NamespaceFlags::MNT)
            .with_namespace(NamespaceFlags::PID)
            .with_target(ProcessId::from_raw(7))
            .with_program(program());
        let b = JoinRequest::new()
            .with_target(ProcessId::from_raw(7))
            .with_namespace(NamespaceFlags::PID)
            .with_namespace(NamespaceFlags::MNT)
            .with_namespace(NamespaceFlags::USER)
            .with_program(program());

        let rendered = a.render().unwrap();
        assert_eq!(rendered, b.render().unwrap());
        assert_eq!(
            rendered.args,
            vec!["--target=7", "--mount", "--pid", "--user", "--", "sh", "-c", "id"]
        );
        assert_eq!(rendered.program, NSENTER);
    }

    #[test]
    fn test_enable_is_idempotent() {
        let once = JoinRequest::new()
            .with_namespace(NamespaceFlags::IPC)
            .with_target(ProcessId::from_raw(1))
            .with_program(program());
        let twice = once.clone().with_namespace(NamespaceFlags::IPC);

        assert_eq!(once, twice);
        assert_eq!(once.render().unwrap(), twice.render().unwrap());
    }

    #[test]
    fn test_all_comes_first() {
        let rendered = JoinRequest::new()
            .with_namespace(NamespaceFlags::CGROUP)
            .with_namespace(NamespaceFlags::ALL)
            .with_target(ProcessId::from_raw(9))
            .with_uid(1000)
            .with_gid(1000)
            .with_program(vec!["date".to_string()])
            .render()
            .unwrap();

        assert_eq!(
            rendered.args,
            vec![
                "--target=9",
                "--all",
                "--cgroup",
                "--setuid=1000",
                "--setgid=1000",
                "--",
                "date"
            ]
        );
    }

    #[test]
    fn test_zero_ids_render_nothing() {
        let rendered = JoinRequest::new()
            .with_target(ProcessId::from_raw(9))
            .with_uid(0)
            .with_gid(0)
            .with_program(vec!["date".to_string()])
            .render()
            .unwrap();

        assert!(!rendered.args.iter().any(|a| a.starts_with("--setuid")));
        assert!(!rendered.args.iter().any(|a| a.starts_with("--setgid")));
    }

    #[test]
    fn test_missing_target_or_program() {
        let err = JoinRequest::new().with_program(program()).render();
        assert!(err.is_err());

        let err = JoinRequest::new()
            .with_target(ProcessId::from_raw(0))
            .with_program(program())
            .render();
        assert!(err.is_err());

        let err = JoinRequest::new()
            .with_target(ProcessId::from_raw(10))
            .render();
        assert!(err.is_err());
    }

    #[test]
    fn test_based_working_dir_exports_pwd_once() {
        let request = JoinRequest::new()
            .with_namespace(NamespaceFlags::PID)
            .with_target(ProcessId::from_raw(42))
            .with_env(["PATH=/usr/bin", "HOME=/root"])
            .with_env_override("TERM=xterm")
            .with_working_dir(WorkingDir::Based {
                base: "/croot".to_string(),
                recorded: "/app".to_string(),
            })
            .with_program(vec!["bash".to_string()]);

        let rendered = request.render().unwrap();
        assert!(rendered.args.contains(&"--wd=/croot/app".to_string()));
        assert_eq!(
            rendered.env,
            vec!["PATH=/usr/bin", "HOME=/root", "TERM=xterm", "PWD=/croot/app"]
        );

        // rendering again never accumulates entries
        let again = request.render().unwrap();
        assert_eq!(
            again.env.iter().filter(|e| e.starts_with("PWD=")).count(),
            1
        );
    }

    #[test]
    fn test_recorded_working_dir() {
        let rendered = JoinRequest::new()
            .with_target(ProcessId::from_raw(42))
            .with_working_dir(WorkingDir::Recorded)
            .with_program(vec!["pwd".to_string()])
            .render()
            .unwrap();

        assert_eq!(rendered.args, vec!["--target=42", "--wd", "--", "pwd"]);
        assert!(rendered.env.is_empty());
    }

    #[test]
    fn test_working_dir_resolution() {
        let wd = |base: &str, recorded: &str| {
            WorkingDir::Based {
                base: base.to_string(),
                recorded: recorded.to_string(),
            }
            .resolved()
        };

        assert_eq!(wd("/croot", "/app").as_deref(), Some("/croot/app"));
        assert_eq!(wd("/croot/", "/app").as_deref(), Some("/croot/app"));
        assert_eq!(wd("/croot", "").as_deref(), Some("/croot"));
        assert_eq!(wd("/croot", "/").as_deref(), Some("/croot"));
        assert_eq!(WorkingDir::Recorded.resolved(), None);
    }

    #[test]
    fn test_duplicate_env_entries_preserved() {
        let rendered = JoinRequest::new()
            .with_target(ProcessId::from_raw(3))
            .with_env(["A=1", "A=2"])
            .with_program(vec!["env".to_string()])
            .render()
            .unwrap();

        assert_eq!(rendered.env, vec!["A=1", "A=2"]);
        assert_eq!(rendered.argv()[0], NSENTER);
    }
}
