//! Heartbeat and health check.
//!
//! Steps run in a fixed order and each non-healthy step is rendered before
//! the check moves on or delegates:
//!
//! 1. agent installed, else delegate to installation
//! 2. workspace id known, else delegate to connectivity
//! 3. multihoming (terminal)
//! 4. agent running, with one enable-and-start attempt
//! 5. agent log signatures; heartbeat failures delegate to connectivity

pub mod logs;
pub mod running;

pub use logs::check_log_heartbeat;
pub use running::{check_agent_running, parse_status_output, start_agent};

use crate::Result;
use crate::checks::detect_multihoming;
use crate::domains::{ConnectionCheck, InstallCheck};
use crate::facts::keys;
use crate::models::{Diagnosis, Evidence, Package};
use crate::session::Session;

const DOMAIN: &str = "heartbeat";

/// The heartbeat state machine with its delegation targets.
pub struct HeartbeatCheck<'d> {
    install: &'d dyn InstallCheck,
    connection: &'d dyn ConnectionCheck,
}

impl<'d> HeartbeatCheck<'d> {
    pub fn new(install: &'d dyn InstallCheck, connection: &'d dyn ConnectionCheck) -> Self {
        Self {
            install,
            connection,
        }
    }

    /// Run the check, folding each step into `prior`.
    pub fn run(&self, session: &mut Session<'_>, prior: Diagnosis) -> Result<Diagnosis> {
        tracing::info!(interactive = session.interactive, "checking heartbeat");
        session.note("CHECKING HEARTBEAT / HEALTH...");
        let mut verdict = prior;

        session.note("Checking if installed correctly...");
        if self.install.installed_version(&session.host)?.is_none() {
            session
                .evidence
                .push(Evidence::new(["package", Package::Omsagent.name()]));
            session.render(Diagnosis::PackageMissing(Package::Omsagent));
            session.hand_off(DOMAIN, "installation");
            return self.install.diagnose(session, Diagnosis::FoundIssue);
        }

        let Some(workspace) = session.facts.lookup(keys::WORKSPACE_ID)? else {
            if let Some(failure) = session.facts.take_failure() {
                session.settle(failure);
            }
            let conf = session.paths().omsadmin_conf();
            session
                .evidence
                .push(Evidence::new(["Workspace ID".to_string(), conf.display().to_string()]));
            session.render(Diagnosis::InfoUnavailable);
            session.hand_off(DOMAIN, "connection");
            return self.connection.diagnose(session, false, Diagnosis::FoundIssue);
        };

        session.note("Checking if omsagent is trying to run multihoming...");
        let multihoming = detect_multihoming(&session.host.paths, &workspace, &mut session.evidence)?;
        let rendered = session.render(multihoming);
        if multihoming.is_error() {
            return Ok(multihoming);
        }
        verdict = verdict.combine(rendered);

        session.note("Checking if omsagent is running...");
        let mut running = check_agent_running(&session.host, &workspace)?;
        if running.diagnosis == Diagnosis::AgentWontRun {
            session.note("Agent currently not running. Attempting to start omsagent...");
            running = start_agent(&session.host, &workspace)?;
        }
        let running_diagnosis = running.diagnosis;
        let rendered = session.settle(running);
        if running_diagnosis.is_error() {
            return Ok(running_diagnosis);
        }
        verdict = verdict.combine(rendered);

        session.note("Checking for errors in omsagent.log...");
        let log_scan = check_log_heartbeat(session.paths(), &workspace)?;
        let log_diagnosis = log_scan.diagnosis;
        let rendered = session.settle(log_scan);
        if log_diagnosis == Diagnosis::HeartbeatFailed {
            session.hand_off(DOMAIN, "connection");
            return self.connection.diagnose(session, false, Diagnosis::FoundIssue);
        }
        if log_diagnosis.is_error() {
            return Ok(log_diagnosis);
        }

        Ok(verdict.combine(rendered))
    }
}
