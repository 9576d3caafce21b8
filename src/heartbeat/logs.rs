//! Agent operational log scan.

use crate::Result;
use crate::models::{Diagnosis, Evidence, Outcome};
use crate::paths::AgentPaths;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::LazyLock;

struct Signature {
    pattern: Regex,
    diagnosis: Diagnosis,
}

static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    [
        (r"(?i)\[error\].*heartbeat", Diagnosis::HeartbeatFailed),
        (r"(?i)\[error\].*(permission denied|EACCES)", Diagnosis::PermissionDenied),
        (
            r"(?i)\[error\].*(certificate|ssl|unauthorized|403)",
            Diagnosis::CertificateInvalid,
        ),
    ]
    .into_iter()
    .map(|(pattern, diagnosis)| Signature {
        pattern: Regex::new(pattern).expect("Invalid regex"),
        diagnosis,
    })
    .collect()
});

/// First signature matching `line`, in table order.
pub fn classify_line(line: &str) -> Option<Diagnosis> {
    SIGNATURES
        .iter()
        .find(|sig| sig.pattern.is_match(line))
        .map(|sig| sig.diagnosis)
}

/// Scan the workspace's `omsagent.log` for known failure signatures.
///
/// The most recent matching line decides the result.
pub fn check_log_heartbeat(paths: &AgentPaths, workspace: &str) -> Result<Outcome> {
    let log = paths.agent_log(workspace);
    if !log.is_file() {
        return Ok(Outcome::issue(Diagnosis::MissingFile, Evidence::missing("file", &log)));
    }

    // Lines are decoded lossily; payloads echoed into the log need not be UTF-8.
    let mut last = None;
    for line in BufReader::new(File::open(&log)?).split(b'\n') {
        let line = String::from_utf8_lossy(&line?).into_owned();
        if let Some(diagnosis) = classify_line(&line) {
            last = Some((diagnosis, line));
        }
    }

    Ok(match last {
        Some((diagnosis, line)) => {
            tracing::debug!(%diagnosis, "failure signature found in agent log");
            Outcome::issue(
                diagnosis,
                Evidence::new([log.display().to_string(), line.trim().to_string()]),
            )
        }
        None => Outcome::healthy(),
    })
}
