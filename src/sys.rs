//! System utilities for external process invocation and privilege checks.
//!
//! Every OS query the troubleshooter makes (package tools, `ps`, `ls`, the
//! agent's own scripts) goes through [`CommandRunner`], so a diagnostic
//! session can be replayed against scripted output.

use crate::paths::AgentPaths;
use crate::{Error, Result};
use std::process::Command;
use std::sync::Arc;

/// Exit status used when a program cannot be found, matching the shell.
pub const NOT_FOUND_STATUS: i32 = 127;

/// Captured result of one external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// An output with the given exit code and stdout.
    pub fn new(status: i32, stdout: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// An output carrying only an exit code.
    pub fn exit(status: i32) -> Self {
        Self::new(status, "")
    }

    /// The output of a program that does not exist.
    pub fn not_found() -> Self {
        Self::exit(NOT_FOUND_STATUS)
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout followed by stderr, the way a terminal would show them.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text
    }
}

/// Runs external programs to completion.
///
/// Invocations block until the program exits; there is no timeout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs programs on the live system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        tracing::debug!(program, ?args, "running external command");

        let output = match Command::new(program).args(args).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(program, "program not found");
                return Ok(CommandOutput::not_found());
            }
            Err(e) => {
                return Err(Error::Command {
                    program: program.to_string(),
                    source: e,
                });
            }
        };

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// The machine under diagnosis: where its artifacts live and how to query it.
#[derive(Clone)]
pub struct Host {
    pub paths: AgentPaths,
    runner: Arc<dyn CommandRunner>,
}

impl Host {
    pub fn new(paths: AgentPaths, runner: Arc<dyn CommandRunner>) -> Self {
        Self { paths, runner }
    }

    /// The live system, optionally with artifact paths re-based.
    pub fn system(paths: AgentPaths) -> Self {
        Self::new(paths, Arc::new(SystemRunner))
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Convenience wrapper around [`CommandRunner::run`].
    pub fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run(program, args)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").field("paths", &self.paths).finish()
    }
}

/// Whether the process runs with root privileges.
///
/// Most agent artifacts are readable by root or the agent user only, so an
/// unprivileged run tends to end in permission diagnoses.
#[cfg(unix)]
pub fn is_elevated() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_maps_to_127() {
        let output = SystemRunner
            .run("omsdoctor-definitely-not-a-real-program", &[])
            .unwrap();
        assert_eq!(output.status, Some(NOT_FOUND_STATUS));
        assert!(!output.success());
    }

    #[test]
    #[cfg(unix)]
    fn test_system_runner_captures_stdout() {
        let output = SystemRunner.run("echo", &["hello"]).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    #[cfg(unix)]
    fn test_is_elevated_matches_euid() {
        assert_eq!(is_elevated(), nix::unistd::geteuid().is_root());
    }

    #[test]
    fn test_combined_output_order() {
        let mut output = CommandOutput::new(1, "out\n");
        output.stderr = "err\n".to_string();
        assert_eq!(output.combined(), "out\nerr\n");
    }
}
