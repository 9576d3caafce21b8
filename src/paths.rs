//! Well-known agent artifact locations.
//!
//! Every path the troubleshooter reads is a fixed absolute path on the host.
//! [`AgentPaths`] can re-base all of them under another directory, which is
//! how tests and offline inspection of a mounted image work.

use std::path::{Path, PathBuf};

/// Onboarding configuration (`key=value` lines).
pub const OMSADMIN_CONF: &str = "/etc/opt/microsoft/omsagent/conf/omsadmin.conf";
/// Custom log configuration (`<source>` blocks).
pub const CUSTOMLOG_CONF: &str = "/etc/opt/microsoft/omsagent/conf/omsagent.d/customlog.conf";
/// Configuration agent log.
pub const OMSCONFIG_LOG: &str = "/var/opt/microsoft/omsconfig/omsconfig.log";
/// Configuration agent detailed log.
pub const OMSCONFIG_DETAILED_LOG: &str = "/var/opt/microsoft/omsconfig/omsconfigdetailed.log";
/// Per-workspace agent state lives in children of this directory.
pub const STATE_ROOT: &str = "/var/opt/microsoft/omsagent";
/// Agent administration script (`-l` prints onboarding status).
pub const OMSADMIN_SH: &str = "/opt/microsoft/omsagent/bin/omsadmin.sh";
/// Agent service control script.
pub const SERVICE_CONTROL: &str = "/opt/microsoft/omsagent/bin/service_control";
/// Standard OS identification file.
pub const OS_RELEASE: &str = "/etc/os-release";

/// Command an operator can run to pull configuration from the backend.
pub const MANUAL_CONFIG_PULL: &str = "sudo su omsagent -c 'python /opt/microsoft/omsconfig/Scripts/PerformRequiredConfigurationChecks.py'";

/// Resolves agent artifact paths, optionally under a root prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPaths {
    root: Option<PathBuf>,
}

impl Default for AgentPaths {
    fn default() -> Self {
        Self::host()
    }
}

impl AgentPaths {
    /// Paths on the live host.
    pub fn host() -> Self {
        Self { root: None }
    }

    /// Paths re-based under `root` (e.g. a temp dir or a mounted image).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// The root prefix, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolve an absolute agent path against the root prefix.
    pub fn resolve(&self, agent_path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(agent_path.trim_start_matches('/')),
            None => PathBuf::from(agent_path),
        }
    }

    pub fn omsadmin_conf(&self) -> PathBuf {
        self.resolve(OMSADMIN_CONF)
    }

    pub fn customlog_conf(&self) -> PathBuf {
        self.resolve(CUSTOMLOG_CONF)
    }

    pub fn omsconfig_log(&self) -> PathBuf {
        self.resolve(OMSCONFIG_LOG)
    }

    pub fn omsconfig_detailed_log(&self) -> PathBuf {
        self.resolve(OMSCONFIG_DETAILED_LOG)
    }

    pub fn state_root(&self) -> PathBuf {
        self.resolve(STATE_ROOT)
    }

    /// State directory for one workspace.
    pub fn workspace_dir(&self, workspace: &str) -> PathBuf {
        self.state_root().join(workspace)
    }

    /// The agent's own operational log for one workspace.
    pub fn agent_log(&self, workspace: &str) -> PathBuf {
        self.workspace_dir(workspace).join("log").join("omsagent.log")
    }

    pub fn omsadmin_sh(&self) -> PathBuf {
        self.resolve(OMSADMIN_SH)
    }

    pub fn service_control(&self) -> PathBuf {
        self.resolve(SERVICE_CONTROL)
    }

    pub fn os_release(&self) -> PathBuf {
        self.resolve(OS_RELEASE)
    }
}
