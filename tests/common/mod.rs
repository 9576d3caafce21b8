//! Common test utilities for omsdoctor integration tests.
//!
//! Provides `TestEnv`, a fake agent filesystem rooted in a temporary
//! directory. Every command runs with `--root` pointing at it and with an
//! isolated config file, so tests never read the real agent installation or
//! the user's `~/.config/omsdoctor/`.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

pub const CUSTOMLOG_CONF: &str = "/etc/opt/microsoft/omsagent/conf/omsagent.d/customlog.conf";
pub const OMSADMIN_CONF: &str = "/etc/opt/microsoft/omsagent/conf/omsadmin.conf";
pub const STATE_ROOT: &str = "/var/opt/microsoft/omsagent";

/// A test environment with an isolated agent root and config directory.
pub struct TestEnv {
    pub root: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the omsdoctor binary against this root.
    pub fn omsdoctor(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_omsdoctor"));
        cmd.arg("--root").arg(self.root.path());
        cmd.env("OMSDOCTOR_CONFIG", self.config_path());
        cmd.env_remove("OMSDOCTOR_LOG");
        cmd.env_remove("OMSDOCTOR_SILENT");
        cmd.env_remove("OMSDOCTOR_FORMAT");
        cmd
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("config.kdl")
    }

    /// Write omsdoctor's own config.kdl.
    pub fn write_config(&self, contents: &str) {
        fs::write(self.config_path(), contents).unwrap();
    }

    /// Map an absolute agent path into the test root.
    pub fn path(&self, agent_path: &str) -> PathBuf {
        self.root.path().join(agent_path.trim_start_matches('/'))
    }

    /// Write a file at an agent path, creating parents.
    pub fn write(&self, agent_path: &str, contents: &str) -> PathBuf {
        let path = self.path(agent_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Create a workspace directory under the agent state root.
    pub fn add_workspace(&self, id: &str) -> PathBuf {
        let path = self.path(&format!("{}/{}", STATE_ROOT, id));
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Write customlog.conf with one source block per `(log, pos_file)` pair.
    pub fn write_customlog_conf(&self, sources: &[(&Path, &Path)]) -> PathBuf {
        let mut conf = String::new();
        for (log, pos) in sources {
            conf.push_str(&format!(
                "<source>\n  type tail\n  format none\n  path {}\n  pos_file {}\n  read_from_head true\n  tag oms.blob.CustomLog.CUSTOM_LOG_BLOB.app_CL_*\n</source>\n\n",
                log.display(),
                pos.display()
            ));
        }
        self.write(CUSTOMLOG_CONF, &conf)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}
