//! Core diagnostic data types.
//!
//! A check produces a [`Diagnosis`] and, for anything other than
//! [`Diagnosis::Healthy`], exactly one [`Evidence`] entry explaining it.

mod evidence;

pub use evidence::{Evidence, EvidenceSink, Outcome};

use serde::{Serialize, Serializer};

/// Agent packages that must be installed, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Package {
    Omsconfig,
    Omi,
    Scx,
    Omsagent,
}

impl Package {
    /// Required packages in check order.
    pub const REQUIRED: [Package; 4] = [
        Package::Omsconfig,
        Package::Omi,
        Package::Scx,
        Package::Omsagent,
    ];

    /// Name as known to the package manager.
    pub fn name(&self) -> &'static str {
        match self {
            Package::Omsconfig => "omsconfig",
            Package::Omi => "omi",
            Package::Scx => "scx",
            Package::Omsagent => "omsagent",
        }
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a diagnosis affects the session verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Nothing wrong
    Healthy,
    /// A problem exists but probing may continue
    Warning,
    /// Terminal; no later check can change it
    Error,
}

/// Outcome kind of one diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    /// No problem found
    Healthy,
    /// A problem exists; the evidence sink says which
    FoundIssue,

    // Environment
    CpuBitsUnreadable,
    OsUnidentified,
    NoPackageManager,
    PackageMissing(Package),

    // Missing or unusable artifacts
    MissingFile,
    EmptyFile,
    MalformedFile,
    InfoUnavailable,
    BackendConfigPending,

    // Structural inconsistencies
    ConfigFilepathMismatch,
    ConfigIdentityMismatch,
    WrongWorkspace,
    MultipleWorkspaces,

    // Runtime
    AgentWontRun,
    AgentStopped,
    AgentDisabled,
    HeartbeatFailed,
    CertificateInvalid,

    // Access
    PermissionDenied,
    FileAccessFailed,
}

impl Diagnosis {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnosis::Healthy => "healthy",
            Diagnosis::FoundIssue => "found_issue",
            Diagnosis::CpuBitsUnreadable => "cpu_bits_unreadable",
            Diagnosis::OsUnidentified => "os_unidentified",
            Diagnosis::NoPackageManager => "no_package_manager",
            Diagnosis::PackageMissing(Package::Omsconfig) => "omsconfig_missing",
            Diagnosis::PackageMissing(Package::Omi) => "omi_missing",
            Diagnosis::PackageMissing(Package::Scx) => "scx_missing",
            Diagnosis::PackageMissing(Package::Omsagent) => "omsagent_missing",
            Diagnosis::MissingFile => "missing_file",
            Diagnosis::EmptyFile => "empty_file",
            Diagnosis::MalformedFile => "malformed_file",
            Diagnosis::InfoUnavailable => "info_unavailable",
            Diagnosis::BackendConfigPending => "backend_config_pending",
            Diagnosis::ConfigFilepathMismatch => "config_filepath_mismatch",
            Diagnosis::ConfigIdentityMismatch => "config_identity_mismatch",
            Diagnosis::WrongWorkspace => "wrong_workspace",
            Diagnosis::MultipleWorkspaces => "multiple_workspaces",
            Diagnosis::AgentWontRun => "agent_wont_run",
            Diagnosis::AgentStopped => "agent_stopped",
            Diagnosis::AgentDisabled => "agent_disabled",
            Diagnosis::HeartbeatFailed => "heartbeat_failed",
            Diagnosis::CertificateInvalid => "certificate_invalid",
            Diagnosis::PermissionDenied => "permission_denied",
            Diagnosis::FileAccessFailed => "file_access_failed",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Diagnosis::Healthy => Severity::Healthy,
            Diagnosis::FoundIssue | Diagnosis::BackendConfigPending => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn is_healthy(&self) -> bool {
        *self == Diagnosis::Healthy
    }

    /// Terminal diagnoses end a check chain.
    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    /// Fold a later step's (rendered) result into a running session verdict.
    ///
    /// A verdict never improves: once a problem has been seen the session
    /// cannot turn back into `Healthy`.
    pub fn combine(self, later: Diagnosis) -> Diagnosis {
        if later.severity() >= self.severity() {
            later
        } else {
            self
        }
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for Diagnosis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}
