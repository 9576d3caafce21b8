//! Workspace multihoming detection.
//!
//! Each workspace the agent has been onboarded to leaves a directory named
//! by its workspace id under the agent state root.

use crate::Result;
use crate::models::{Diagnosis, Evidence, EvidenceSink};
use crate::paths::AgentPaths;
use std::fs;
use std::io;
use std::path::Path;

/// Shorter directory names are agent bookkeeping, not workspaces.
pub const WORKSPACE_ID_MIN_LEN: usize = 32;

/// Names of workspace directories under `state_root`, sorted.
///
/// A missing state root has no workspaces.
pub fn workspace_candidates(state_root: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(state_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        // Follows symlinks, so a linked workspace directory still counts.
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.chars().count() >= WORKSPACE_ID_MIN_LEN {
            candidates.push(name);
        }
    }
    candidates.sort();
    Ok(candidates)
}

/// Classify the agent's workspace directories against `expected`.
pub fn detect_multihoming(
    paths: &AgentPaths,
    expected: &str,
    sink: &mut EvidenceSink,
) -> Result<Diagnosis> {
    let candidates = workspace_candidates(&paths.state_root())?;
    tracing::debug!(count = candidates.len(), "workspace directories found");

    match candidates.as_slice() {
        [] => {
            sink.push(Evidence::missing("Directory", &paths.workspace_dir(expected)));
            Ok(Diagnosis::MissingFile)
        }
        [found] if found != expected => {
            sink.push(Evidence::new([found.as_str(), expected]));
            Ok(Diagnosis::WrongWorkspace)
        }
        [_] => Ok(Diagnosis::Healthy),
        many => {
            sink.push(Evidence::new([many.join(", ")]));
            Ok(Diagnosis::MultipleWorkspaces)
        }
    }
}
