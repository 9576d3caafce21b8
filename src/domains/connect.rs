use super::ConnectionCheck;
use crate::Result;
use crate::facts::keys;
use crate::models::{Diagnosis, Evidence};
use crate::session::Session;

/// Onboarding keys a connected agent needs, with their display names.
const ONBOARDING_KEYS: [(&str, &str); 2] = [
    (keys::WORKSPACE_ID, "Workspace ID"),
    (keys::OMS_ENDPOINT, "OMS Endpoint"),
];

/// Connectivity check limited to the onboarding configuration.
///
/// Verifies that `omsadmin.conf` names a workspace and an endpoint. It does
/// not probe the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnboardingConnectionCheck;

impl ConnectionCheck for OnboardingConnectionCheck {
    fn diagnose(
        &self,
        session: &mut Session<'_>,
        carry_errors: bool,
        prior: Diagnosis,
    ) -> Result<Diagnosis> {
        tracing::info!("checking agent connection configuration");
        if !carry_errors {
            let discarded = session.evidence.drain();
            if !discarded.is_empty() {
                tracing::debug!(count = discarded.len(), "discarding pending evidence");
            }
        }
        session.note("CHECKING CONNECTION...");

        for (key, label) in ONBOARDING_KEYS {
            if session.facts.lookup(key)?.is_some() {
                continue;
            }
            if let Some(failure) = session.facts.take_failure() {
                return Ok(session.settle(failure));
            }
            let conf = session.paths().omsadmin_conf();
            session
                .evidence
                .push(Evidence::new([label.to_string(), conf.display().to_string()]));
            return Ok(session.render(Diagnosis::InfoUnavailable));
        }

        Ok(prior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;
    use crate::report::Report;
    use crate::test_utils::{ScriptedPrompter, StaticFacts, TestHost};

    const WS: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_complete_onboarding_keeps_prior() {
        let test = TestHost::new();
        let mut report = Report::new();
        let mut prompter = ScriptedPrompter::default();
        let facts = StaticFacts::new([
            (keys::WORKSPACE_ID, WS),
            (keys::OMS_ENDPOINT, "https://example.ods.opinsights.azure.com/OperationalData.svc/PostJsonDataItems"),
        ]);
        let mut session = Session::new(test.host(), &mut report, &mut prompter, false)
            .with_facts(facts.into_cache());

        assert_eq!(
            OnboardingConnectionCheck
                .diagnose(&mut session, false, Diagnosis::FoundIssue)
                .unwrap(),
            Diagnosis::FoundIssue
        );
    }

    #[test]
    fn test_missing_endpoint() {
        let test = TestHost::new();
        let mut report = Report::new();
        let mut prompter = ScriptedPrompter::default();
        let facts = StaticFacts::new([(keys::WORKSPACE_ID, WS)]);
        let mut session = Session::new(test.host(), &mut report, &mut prompter, false)
            .with_facts(facts.into_cache());

        assert_eq!(
            OnboardingConnectionCheck
                .diagnose(&mut session, false, Diagnosis::FoundIssue)
                .unwrap(),
            Diagnosis::InfoUnavailable
        );
        drop(session);
        assert_eq!(report.findings()[0].evidence[0].field(0), Some("OMS Endpoint"));
    }

    #[test]
    fn test_refresh_failure_is_reported() {
        let test = TestHost::new();
        let mut report = Report::new();
        let mut prompter = ScriptedPrompter::default();
        let conf = test.paths().omsadmin_conf();
        let facts = StaticFacts::failing(Outcome::issue(
            Diagnosis::MissingFile,
            Evidence::missing("file", &conf),
        ));
        let mut session = Session::new(test.host(), &mut report, &mut prompter, false)
            .with_facts(facts.into_cache());

        assert_eq!(
            OnboardingConnectionCheck
                .diagnose(&mut session, false, Diagnosis::FoundIssue)
                .unwrap(),
            Diagnosis::MissingFile
        );
    }

    #[test]
    fn test_pending_evidence_is_dropped() {
        let test = TestHost::new();
        let mut report = Report::new();
        let mut prompter = ScriptedPrompter::default();
        let facts = StaticFacts::new([(keys::WORKSPACE_ID, WS), (keys::OMS_ENDPOINT, "x")]);
        let mut session = Session::new(test.host(), &mut report, &mut prompter, false)
            .with_facts(facts.into_cache());
        session.evidence.push(Evidence::new(["stale"]));

        OnboardingConnectionCheck
            .diagnose(&mut session, false, Diagnosis::Healthy)
            .unwrap();
        assert!(session.evidence.is_empty());
    }
}
