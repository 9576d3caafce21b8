//! Standardized messages for diagnoses.
//!
//! All messages follow the format:
//! ```text
//! omsdoctor: error: <category>: <brief>
//!
//!   <details>
//!
//!   <suggestion>
//! ```

use crate::models::{Diagnosis, Evidence, Severity};
use crate::paths::MANUAL_CONFIG_PULL;
use std::fmt::Write;

/// Message category for a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// CPU, OS or package manager could not be determined
    Environment,
    /// Required packages
    Install,
    /// Files or directories absent, empty, or unreadable as expected
    Artifact,
    /// Configuration disagrees with the filesystem or itself
    Structure,
    /// The agent process itself
    Runtime,
    /// Privilege or access problems
    Access,
    /// Session-level notices
    Session,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::Install => write!(f, "install"),
            Self::Artifact => write!(f, "artifact"),
            Self::Structure => write!(f, "structure"),
            Self::Runtime => write!(f, "runtime"),
            Self::Access => write!(f, "access"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// Category a diagnosis is reported under.
pub fn category(diagnosis: Diagnosis) -> Category {
    match diagnosis {
        Diagnosis::CpuBitsUnreadable | Diagnosis::OsUnidentified | Diagnosis::NoPackageManager => {
            Category::Environment
        }
        Diagnosis::PackageMissing(_) => Category::Install,
        Diagnosis::MissingFile
        | Diagnosis::EmptyFile
        | Diagnosis::MalformedFile
        | Diagnosis::InfoUnavailable
        | Diagnosis::BackendConfigPending => Category::Artifact,
        Diagnosis::ConfigFilepathMismatch
        | Diagnosis::ConfigIdentityMismatch
        | Diagnosis::WrongWorkspace
        | Diagnosis::MultipleWorkspaces => Category::Structure,
        Diagnosis::AgentWontRun
        | Diagnosis::AgentStopped
        | Diagnosis::AgentDisabled
        | Diagnosis::HeartbeatFailed
        | Diagnosis::CertificateInvalid => Category::Runtime,
        Diagnosis::PermissionDenied | Diagnosis::FileAccessFailed => Category::Access,
        Diagnosis::Healthy | Diagnosis::FoundIssue => Category::Session,
    }
}

/// Format a standardized message.
///
/// `details` and `suggestion` are indented two spaces per line.
pub fn format_message(
    severity: Severity,
    category: Category,
    brief: &str,
    details: Option<&str>,
    suggestion: Option<&str>,
) -> String {
    let level = match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Healthy => "ok",
    };
    let mut msg = format!("omsdoctor: {}: {}: {}", level, category, brief);

    for block in [details, suggestion].into_iter().flatten() {
        msg.push_str("\n\n");
        for line in block.lines() {
            let _ = writeln!(msg, "  {}", line);
        }
        if msg.ends_with('\n') {
            msg.pop();
        }
    }

    msg
}

/// Render the message for `diagnosis` from its evidence.
pub fn render(diagnosis: Diagnosis, evidence: Option<&Evidence>) -> String {
    let field = |i: usize| {
        evidence
            .and_then(|e| e.field(i))
            .unwrap_or("<unknown>")
            .to_string()
    };
    let all = || {
        evidence
            .map(|e| e.fields().join(", "))
            .unwrap_or_default()
    };

    let (brief, details, suggestion): (String, Option<String>, Option<String>) = match diagnosis {
        Diagnosis::Healthy => ("no issues found".to_string(), None, None),
        Diagnosis::FoundIssue => (
            "a problem was found that needs operator action".to_string(),
            evidence.map(|_| all()),
            None,
        ),
        Diagnosis::CpuBitsUnreadable => (
            "could not determine CPU word width".to_string(),
            Some(format!("`{}` reported '{}', expected 32-bit or 64-bit.", field(0), field(1))),
            Some("Check that lscpu is installed and working.".to_string()),
        ),
        Diagnosis::OsUnidentified => (
            "could not determine the OS distribution or version".to_string(),
            Some(format!("Neither lsb_release nor {} identified the OS.", field(0))),
            None,
        ),
        Diagnosis::NoPackageManager => (
            "no supported package manager found".to_string(),
            Some(format!("Looked for: {}", all())),
            Some("The agent supports dpkg- and rpm-based distributions only.".to_string()),
        ),
        Diagnosis::PackageMissing(package) => (
            format!("package {} is not installed correctly", package),
            Some(format!("The {} package could not be found by the package manager.", field(1))),
            Some("Reinstall the agent bundle.".to_string()),
        ),
        Diagnosis::MissingFile => (
            format!("{} not found", field(0).to_lowercase()),
            Some(format!("Expected {} at {}", field(0), field(1))),
            None,
        ),
        Diagnosis::EmptyFile => (
            "file is empty".to_string(),
            Some(format!("{} has zero length.", field(0))),
            None,
        ),
        Diagnosis::MalformedFile => (
            "file is malformed".to_string(),
            Some(format!("Could not parse {}:\n{}", field(0), field(1))),
            None,
        ),
        Diagnosis::InfoUnavailable => (
            format!("{} is not available", field(0)),
            Some(format!("Could not read {} from {}", field(0), field(1))),
            None,
        ),
        Diagnosis::BackendConfigPending => (
            "configuration has not been applied from the backend yet".to_string(),
            Some(format!("Check {} for errors.", all())),
            Some(format!(
                "Configuration can take up to 15 minutes to arrive. To pull it manually:\n  $ {}",
                MANUAL_CONFIG_PULL
            )),
        ),
        Diagnosis::ConfigFilepathMismatch => (
            "position file records a different log path".to_string(),
            Some(format!("{} does not refer to {} (configured in {}).", field(0), field(1), field(2))),
            None,
        ),
        Diagnosis::ConfigIdentityMismatch => (
            "log file identity does not match its position file".to_string(),
            Some(format!(
                "{} has inode {}, but {} records {} (configured in {}).",
                field(0),
                field(1),
                field(2),
                field(3),
                field(4)
            )),
            Some("The log was replaced or rotated; remove the stale position file.".to_string()),
        ),
        Diagnosis::WrongWorkspace => (
            "agent is configured for a different workspace".to_string(),
            Some(format!("Found workspace {}, expected {}.", field(0), field(1))),
            Some("Re-onboard the agent to the intended workspace.".to_string()),
        ),
        Diagnosis::MultipleWorkspaces => (
            "agent is configured for more than one workspace".to_string(),
            Some(format!("Workspaces found: {}", all())),
            Some("Multihoming is not supported; offboard the extra workspaces.".to_string()),
        ),
        Diagnosis::AgentWontRun => (
            "agent is not running and could not be started".to_string(),
            evidence.map(|_| all()),
            None,
        ),
        Diagnosis::AgentStopped => (
            "agent is registered but stopped".to_string(),
            evidence.map(|_| all()),
            Some("Start it with: service_control start".to_string()),
        ),
        Diagnosis::AgentDisabled => (
            "agent is not registered; workspace configuration is only saved".to_string(),
            evidence.map(|_| all()),
            Some("Enable it with: service_control enable".to_string()),
        ),
        Diagnosis::HeartbeatFailed => (
            "agent failed to send heartbeats".to_string(),
            Some(format!("{}:\n{}", field(0), field(1))),
            None,
        ),
        Diagnosis::CertificateInvalid => (
            "agent could not authenticate to the backend".to_string(),
            Some(format!("{}:\n{}", field(0), field(1))),
            Some("Renew the agent certificate by re-onboarding.".to_string()),
        ),
        Diagnosis::PermissionDenied => (
            "insufficient privileges".to_string(),
            Some(format!("Could not access {}", all())),
            Some("Re-run as root or as the omsagent user.".to_string()),
        ),
        Diagnosis::FileAccessFailed => (
            "could not read agent output".to_string(),
            Some(all()),
            None,
        ),
    };

    format_message(
        diagnosis.severity(),
        category(diagnosis),
        &brief,
        details.as_deref().filter(|d| !d.is_empty()),
        suggestion.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_indents_blocks() {
        let msg = format_message(
            Severity::Error,
            Category::Structure,
            "brief",
            Some("line one\nline two"),
            Some("fix it"),
        );
        assert_eq!(
            msg,
            "omsdoctor: error: structure: brief\n\n  line one\n  line two\n\n  fix it"
        );
    }

    #[test]
    fn test_render_identity_mismatch_uses_all_fields() {
        let evidence = Evidence::new([
            "/var/log/app.log",
            "a1b2",
            "/var/log/app.log.pos",
            "ffff",
            "/etc/customlog.conf",
        ]);
        let msg = render(Diagnosis::ConfigIdentityMismatch, Some(&evidence));
        assert!(msg.contains("inode a1b2"));
        assert!(msg.contains("records ffff"));
        assert!(msg.starts_with("omsdoctor: error: structure:"));
    }

    #[test]
    fn test_render_without_evidence_does_not_panic() {
        let msg = render(Diagnosis::WrongWorkspace, None);
        assert!(msg.contains("<unknown>"));
    }

    #[test]
    fn test_backend_config_pending_is_warning() {
        let msg = render(Diagnosis::BackendConfigPending, None);
        assert!(msg.starts_with("omsdoctor: warning: artifact:"));
        assert!(msg.contains("PerformRequiredConfigurationChecks.py"));
    }
}
