//! Evidence entries and the session-scoped evidence sink.

use super::Diagnosis;
use serde::Serialize;
use std::path::Path;

/// One ordered tuple of facts explaining why a check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Evidence(Vec<String>);

impl Evidence {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// A `(kind, path)` pair, as used for missing artifacts.
    pub fn missing(kind: &str, path: &Path) -> Self {
        Self::new([kind.to_string(), path.display().to_string()])
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

/// A diagnosis paired with the evidence that must accompany it.
///
/// Checks with fallback tiers build `Outcome`s so that only the result they
/// finally settle on reaches the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub diagnosis: Diagnosis,
    pub evidence: Option<Evidence>,
}

impl Outcome {
    pub fn healthy() -> Self {
        Self {
            diagnosis: Diagnosis::Healthy,
            evidence: None,
        }
    }

    pub fn issue(diagnosis: Diagnosis, evidence: Evidence) -> Self {
        Self {
            diagnosis,
            evidence: Some(evidence),
        }
    }

    /// Append the evidence (if any) to `sink` and hand back the diagnosis.
    pub fn commit(self, sink: &mut EvidenceSink) -> Diagnosis {
        if let Some(evidence) = self.evidence {
            sink.push(evidence);
        }
        self.diagnosis
    }
}

/// Ordered, append-only evidence buffer for one diagnostic session.
///
/// The reporting layer drains it each time it renders a diagnosis.
#[derive(Debug, Default, Clone)]
pub struct EvidenceSink {
    entries: Vec<Evidence>,
}

impl EvidenceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, evidence: Evidence) {
        self.entries.push(evidence);
    }

    pub fn entries(&self) -> &[Evidence] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Evidence> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every entry, leaving the sink empty.
    pub fn drain(&mut self) -> Vec<Evidence> {
        std::mem::take(&mut self.entries)
    }
}
