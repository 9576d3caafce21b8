//! Reporting of diagnoses to the operator.
//!
//! The engine hands every non-healthy step result to a [`Reporter`] before
//! moving on (or delegating), so partial progress is visible even when the
//! final verdict comes from another diagnostic domain.

pub mod messages;

use crate::models::{Diagnosis, Evidence, EvidenceSink, Severity};
use serde::Serialize;
use std::io::Write;

/// Displays diagnoses and folds them into a session verdict.
pub trait Reporter {
    /// Show a progress line.
    fn note(&mut self, message: &str);

    /// Render `diagnosis` with the evidence accumulated since the last
    /// render, then clear that evidence.
    ///
    /// Returns the value to accumulate into the session verdict: errors
    /// come back unchanged, warnings are downgraded to
    /// [`Diagnosis::FoundIssue`].
    fn record_and_render(&mut self, diagnosis: Diagnosis, evidence: &mut EvidenceSink) -> Diagnosis;
}

/// A rendered diagnosis.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub diagnosis: Diagnosis,
    pub evidence: Vec<Evidence>,
    pub message: String,
}

/// Collects findings in order, optionally streaming them to a writer.
#[derive(Default)]
pub struct Report {
    findings: Vec<Finding>,
    notes: Vec<String>,
    live: Option<Box<dyn Write>>,
    notes_only: bool,
}

impl Report {
    /// A report that only collects.
    pub fn new() -> Self {
        Self::default()
    }

    /// A report that also writes notes and messages to `writer` as they happen.
    pub fn live(writer: Box<dyn Write>) -> Self {
        Self {
            live: Some(writer),
            ..Self::default()
        }
    }

    /// A report that writes only progress notes to `writer`.
    pub fn live_notes(writer: Box<dyn Write>) -> Self {
        Self {
            live: Some(writer),
            notes_only: true,
            ..Self::default()
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    fn emit(&mut self, text: &str) {
        if let Some(writer) = self.live.as_mut()
            && let Err(e) = writeln!(writer, "{}", text)
        {
            tracing::warn!(error = %e, "failed to write report output");
        }
    }
}

impl Reporter for Report {
    fn note(&mut self, message: &str) {
        self.emit(message);
        self.notes.push(message.to_string());
    }

    fn record_and_render(&mut self, diagnosis: Diagnosis, evidence: &mut EvidenceSink) -> Diagnosis {
        let evidence = evidence.drain();
        if diagnosis.is_healthy() {
            if !evidence.is_empty() {
                tracing::debug!(count = evidence.len(), "discarding evidence for healthy result");
            }
            return Diagnosis::Healthy;
        }

        let message = messages::render(diagnosis, evidence.last());
        if !self.notes_only {
            self.emit(&message);
        }
        self.findings.push(Finding {
            diagnosis,
            evidence,
            message,
        });

        match diagnosis.severity() {
            Severity::Healthy => Diagnosis::Healthy,
            Severity::Warning => Diagnosis::FoundIssue,
            Severity::Error => diagnosis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Writer that shares its buffer so tests can inspect live output.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_render_drains_evidence() {
        let mut report = Report::new();
        let mut sink = EvidenceSink::new();
        sink.push(Evidence::new(["a".repeat(32), "b".repeat(32)]));

        let result = report.record_and_render(Diagnosis::MultipleWorkspaces, &mut sink);
        assert_eq!(result, Diagnosis::MultipleWorkspaces);
        assert!(sink.is_empty());
        assert_eq!(report.findings().len(), 1);
        assert_eq!(report.findings()[0].evidence.len(), 1);
    }

    #[test]
    fn test_healthy_records_nothing() {
        let mut report = Report::new();
        let mut sink = EvidenceSink::new();
        assert_eq!(
            report.record_and_render(Diagnosis::Healthy, &mut sink),
            Diagnosis::Healthy
        );
        assert!(report.findings().is_empty());
    }

    #[test]
    fn test_warning_is_downgraded() {
        let mut report = Report::new();
        let mut sink = EvidenceSink::new();
        sink.push(Evidence::new(["/var/opt/microsoft/omsconfig/omsconfig.log"]));
        assert_eq!(
            report.record_and_render(Diagnosis::BackendConfigPending, &mut sink),
            Diagnosis::FoundIssue
        );
        assert_eq!(report.findings()[0].diagnosis, Diagnosis::BackendConfigPending);
    }

    #[test]
    fn test_live_report_streams_notes_and_messages() {
        let buf = SharedBuf::default();
        let mut report = Report::live(Box::new(buf.clone()));
        let mut sink = EvidenceSink::new();

        report.note("Checking if omsagent is running...");
        sink.push(Evidence::new(["found-ws", "expected-ws"]));
        report.record_and_render(Diagnosis::WrongWorkspace, &mut sink);

        let text = String::from_utf8(buf.0.borrow().clone()).unwrap();
        assert!(text.starts_with("Checking if omsagent is running...\n"));
        assert!(text.contains("Found workspace found-ws, expected expected-ws."));
    }

    #[test]
    fn test_live_notes_report_keeps_messages_for_the_result() {
        let buf = SharedBuf::default();
        let mut report = Report::live_notes(Box::new(buf.clone()));
        let mut sink = EvidenceSink::new();

        report.note("Checking for errors in omsagent.log...");
        sink.push(Evidence::new(["found-ws", "expected-ws"]));
        report.record_and_render(Diagnosis::WrongWorkspace, &mut sink);

        let text = String::from_utf8(buf.0.borrow().clone()).unwrap();
        assert_eq!(text, "Checking for errors in omsagent.log...\n");
        assert!(report.findings()[0].message.contains("Found workspace found-ws"));
    }
}
