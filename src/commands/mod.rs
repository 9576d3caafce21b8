//! Command implementations for the omsdoctor CLI.
//!
//! Each command runs inside a [`Session`] and returns a result that can be
//! printed as JSON or as human text:
//! - `heartbeat` - agent heartbeat / health check
//! - `custom_logs` - custom log configuration check
//! - `multihoming` - workspace multihoming check
//! - `facts` - dump the system fact cache

use crate::checks::{check_customlog_conf, detect_multihoming};
use crate::domains::{OnboardingConnectionCheck, PackageInstallCheck};
use crate::facts::{Facts, keys};
use crate::heartbeat::HeartbeatCheck;
use crate::models::{Diagnosis, Evidence};
use crate::report::Finding;
use crate::session::Session;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Exit status for a run that found nothing wrong.
pub const EXIT_HEALTHY: i32 = 0;
/// Exit status for an unclassified fault.
pub const EXIT_FAULT: i32 = 1;
/// Exit status for a run that diagnosed a problem.
pub const EXIT_DIAGNOSED: i32 = 2;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_or_error<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Result of one top-level check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub check: &'static str,
    pub diagnosis: Diagnosis,
    pub healthy: bool,
    pub findings: Vec<Finding>,
    pub generated_at: DateTime<Utc>,
}

impl CheckReport {
    pub fn new(check: &'static str, diagnosis: Diagnosis, findings: Vec<Finding>) -> Self {
        Self {
            check,
            diagnosis,
            healthy: diagnosis.is_healthy(),
            findings,
            generated_at: Utc::now(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.healthy {
            EXIT_HEALTHY
        } else {
            EXIT_DIAGNOSED
        }
    }
}

impl CommandResult for CheckReport {
    fn to_json(&self) -> String {
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        if self.healthy {
            return format!("{} check complete: no issues found.", self.check);
        }
        let count = self.findings.len();
        format!(
            "{} check complete: {} ({} finding{}).",
            self.check,
            self.diagnosis,
            count,
            if count == 1 { "" } else { "s" }
        )
    }
}

/// The fact cache contents.
#[derive(Debug, Clone, Serialize)]
pub struct FactsReport {
    pub facts: Facts,
    /// Why the refresh failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Diagnosis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    pub generated_at: DateTime<Utc>,
}

impl FactsReport {
    pub fn new(facts: Facts, failure: Option<Diagnosis>, findings: Vec<Finding>) -> Self {
        Self {
            facts,
            failure,
            findings,
            generated_at: Utc::now(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.failure.is_some() {
            EXIT_DIAGNOSED
        } else {
            EXIT_HEALTHY
        }
    }
}

impl CommandResult for FactsReport {
    fn to_json(&self) -> String {
        json_or_error(self)
    }

    fn to_human(&self) -> String {
        self.facts
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run the heartbeat / health check.
pub fn heartbeat(session: &mut Session<'_>) -> Result<Diagnosis> {
    HeartbeatCheck::new(&PackageInstallCheck, &OnboardingConnectionCheck)
        .run(session, Diagnosis::Healthy)
}

/// Run the custom log configuration check.
pub fn custom_logs(session: &mut Session<'_>) -> Result<Diagnosis> {
    let diagnosis = check_customlog_conf(session)?;
    session.render(diagnosis);
    Ok(diagnosis)
}

/// Run the multihoming check against `workspace`, or the onboarded one.
pub fn multihoming(session: &mut Session<'_>, workspace: Option<String>) -> Result<Diagnosis> {
    let workspace = match workspace {
        Some(ws) => ws,
        None => match session.facts.lookup(keys::WORKSPACE_ID)? {
            Some(ws) => ws,
            None => {
                if let Some(failure) = session.facts.take_failure() {
                    return Ok(session.settle(failure));
                }
                let conf = session.paths().omsadmin_conf();
                session
                    .evidence
                    .push(Evidence::new(["Workspace ID".to_string(), conf.display().to_string()]));
                return Ok(session.render(Diagnosis::InfoUnavailable));
            }
        },
    };

    let diagnosis = detect_multihoming(&session.host.paths, &workspace, &mut session.evidence)?;
    Ok(session.render(diagnosis))
}

/// Gather system facts, optionally narrowed to one key.
pub fn facts(session: &mut Session<'_>, key: Option<&str>) -> Result<(Facts, Option<Diagnosis>)> {
    let mut facts = session.facts.all()?.clone();
    let failure = session.facts.take_failure().map(|outcome| session.settle(outcome));

    if let Some(key) = key {
        match facts.remove(key) {
            Some(value) => facts = Facts::from([(key.to_string(), value)]),
            None if failure.is_none() => {
                return Err(Error::InvalidInput(format!("Unknown fact: {}", key)));
            }
            None => facts.clear(),
        }
    }

    Ok((facts, failure))
}
