//! Diagnostic session state shared by every check in one run.

use crate::Result;
use crate::facts::FactCache;
use crate::models::{Diagnosis, EvidenceSink, Outcome};
use crate::paths::AgentPaths;
use crate::prompt::Prompter;
use crate::report::Reporter;
use crate::sys::Host;

/// One diagnostic run.
///
/// Owns the fact cache and the evidence sink; borrows the reporting and
/// prompting collaborators. Sessions are single-threaded by construction.
pub struct Session<'a> {
    pub host: Host,
    pub facts: FactCache,
    pub evidence: EvidenceSink,
    /// When false, any branch that would prompt takes the conservative path
    pub interactive: bool,
    reporter: &'a mut dyn Reporter,
    prompter: &'a mut dyn Prompter,
}

impl<'a> Session<'a> {
    pub fn new(
        host: Host,
        reporter: &'a mut dyn Reporter,
        prompter: &'a mut dyn Prompter,
        interactive: bool,
    ) -> Self {
        let facts = FactCache::for_host(&host);
        Self {
            host,
            facts,
            evidence: EvidenceSink::new(),
            interactive,
            reporter,
            prompter,
        }
    }

    /// Replace the fact cache (e.g. with a pre-seeded source).
    pub fn with_facts(mut self, facts: FactCache) -> Self {
        self.facts = facts;
        self
    }

    pub fn paths(&self) -> &AgentPaths {
        &self.host.paths
    }

    /// Show a progress line to the operator.
    pub fn note(&mut self, message: &str) {
        self.reporter.note(message);
    }

    /// Render `diagnosis` with the pending evidence.
    pub fn render(&mut self, diagnosis: Diagnosis) -> Diagnosis {
        self.reporter.record_and_render(diagnosis, &mut self.evidence)
    }

    /// Commit an outcome's evidence and render it.
    pub fn settle(&mut self, outcome: Outcome) -> Diagnosis {
        let diagnosis = outcome.commit(&mut self.evidence);
        self.render(diagnosis)
    }

    /// Ask the operator; only valid in interactive mode.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        debug_assert!(self.interactive, "prompted in silent mode");
        self.prompter.confirm(question)
    }

    /// Announce that another diagnostic domain takes over the verdict.
    pub fn hand_off(&mut self, from: &str, to: &str) {
        tracing::info!(from, to, "delegating diagnosis to another domain");
        self.reporter.note(&format!(
            "Running the {} part of the troubleshooter in order to find the issue...",
            to
        ));
    }
}
