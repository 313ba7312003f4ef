//! Fixed names and defaults shared by the agent and the orchestrator

use std::time::Duration;

/// Label key carried by every helper workload
pub const HELPER_LABEL_KEY: &str = "podenter.io/role";

/// Label value carried by every helper workload
pub const HELPER_LABEL_VALUE: &str = "helper";

/// Prefix of generated helper workload names
pub const HELPER_NAME_PREFIX: &str = "podenter-";

/// Length of the random helper name suffix
pub const HELPER_NAME_SUFFIX_LEN: usize = 10;

/// Name of the single container in a helper workload
pub const HELPER_CONTAINER: &str = "agent";

/// Image used in default mode
pub const AGENT_IMAGE: &str = "podenter/agent:latest";

/// Image used in tools mode
pub const AGENT_TOOLS_IMAGE: &str = "podenter/agent-tools:latest";

/// Entry agent executable inside the helper image
pub const AGENT_BINARY: &str = "podenter-agent";

/// Helper that remounts `/proc` in a private mount namespace before exec
pub const REMOUNT_PROC_EXEC: &str = "remount-proc-exec";

/// Where tools mode exposes the target container's root
pub const TOOLS_ROOT: &str = "/croot";

/// Terminal type exported in tools mode
pub const TOOLS_TERM: &str = "TERM=xterm";

/// How long to wait for the helper workload to start
pub const HELPER_TIMEOUT: Duration = Duration::from_secs(30);

/// Label selector matching helper workloads
#[must_use]
pub fn helper_selector() -> String {
    format!("{HELPER_LABEL_KEY}={HELPER_LABEL_VALUE}")
}
