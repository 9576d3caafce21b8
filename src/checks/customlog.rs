//! Custom log configuration validation.
//!
//! `customlog.conf` holds one `<source>` block per tailed log. Each block
//! names the log (`path`) and its checkpoint (`pos_file`). The position file
//! records the path and inode it was tracking, so a replaced or rotated log
//! shows up as a mismatch between the recorded and live inode.

use crate::Result;
use crate::models::{Diagnosis, Evidence, EvidenceSink, Outcome};
use crate::paths::MANUAL_CONFIG_PULL;
use crate::session::Session;
use crate::sys::Host;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

const SOURCE_OPEN: &str = "<source>";
const SOURCE_CLOSE: &str = "</source>";

const MISSING_CONFIG_GUIDANCE: &str = "\
 The troubleshooter cannot find the customlog.conf file. If the custom log
 configuration was just applied in portal, it takes up to 15 minutes for the
 agent to pick the new configuration.
 You can manually pull the config from the OMS backend by running this command:";

/// The fields of one `<source>` block that the validator cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLogRecord {
    pub path: String,
    pub pos_file: String,
}

impl CustomLogRecord {
    /// Build a record from a block's key/value pairs.
    ///
    /// Blocks without both `path` and `pos_file` are not file-tail sources.
    fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            path: fields.get("path")?.clone(),
            pos_file: fields.get("pos_file")?.clone(),
        })
    }
}

/// Parsed contents of a position file: `<path> <size> <inode-hex>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRecord {
    pub path: String,
    pub size: String,
    pub identity: String,
}

impl PositionRecord {
    /// Returns `None` if fewer than three fields are present.
    pub fn parse(contents: &str) -> Option<Self> {
        let mut fields = contents.split_whitespace();
        Some(Self {
            path: fields.next()?.to_string(),
            size: fields.next()?.to_string(),
            identity: fields.next()?.to_string(),
        })
    }
}

/// Parse `<key> <value>` inside a block, ignoring blanks and comments.
fn parse_block_line(line: &str) -> Option<(String, String)> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let mut parts = line.split_whitespace();
    let key = parts.next()?;
    let value = parts.next()?;
    Some((key.to_string(), value.to_string()))
}

/// Recorded and live identities agree (numerically when both are hex).
fn identities_match(recorded: &str, live: &str) -> bool {
    match (
        u64::from_str_radix(recorded, 16),
        u64::from_str_radix(live, 16),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => recorded == live,
    }
}

enum BlockState {
    Outside,
    Inside(HashMap<String, String>),
}

/// Validates a custom log configuration file against the filesystem.
pub struct CustomLogValidator<'h> {
    host: &'h Host,
}

impl<'h> CustomLogValidator<'h> {
    pub fn new(host: &'h Host) -> Self {
        Self { host }
    }

    /// Check every `<source>` block in `config_path`, stopping at the first
    /// inconsistent one.
    pub fn validate(&self, config_path: &Path, sink: &mut EvidenceSink) -> Result<Diagnosis> {
        let contents = String::from_utf8_lossy(&fs::read(config_path)?).into_owned();
        let mut state = BlockState::Outside;

        for line in contents.lines() {
            let delimiter = line.trim();
            state = match state {
                BlockState::Outside if delimiter == SOURCE_OPEN => BlockState::Inside(HashMap::new()),
                BlockState::Outside => BlockState::Outside,
                BlockState::Inside(fields) if delimiter == SOURCE_CLOSE => {
                    match CustomLogRecord::from_fields(&fields) {
                        Some(record) => {
                            let outcome = self.check_record(&record, config_path)?;
                            if !outcome.diagnosis.is_healthy() {
                                return Ok(outcome.commit(sink));
                            }
                        }
                        None => tracing::debug!("skipping source block without path and pos_file"),
                    }
                    BlockState::Outside
                }
                BlockState::Inside(mut fields) => {
                    if let Some((key, value)) = parse_block_line(line) {
                        fields.insert(key, value);
                    }
                    BlockState::Inside(fields)
                }
            };
        }

        if matches!(state, BlockState::Inside(_)) {
            tracing::debug!(path = %config_path.display(), "unterminated source block ignored");
        }
        Ok(Diagnosis::Healthy)
    }

    /// Validate one record against its log file and position file.
    pub fn check_record(&self, record: &CustomLogRecord, config_path: &Path) -> Result<Outcome> {
        let log_path = Path::new(&record.path);
        if !log_path.is_file() {
            return Ok(Outcome::issue(
                Diagnosis::MissingFile,
                Evidence::missing("file", log_path),
            ));
        }

        let pos_path = Path::new(&record.pos_file);
        if !pos_path.is_file() {
            return Ok(Outcome::issue(
                Diagnosis::MissingFile,
                Evidence::missing("file", pos_path),
            ));
        }

        let contents = match fs::read(pos_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Ok(Outcome::issue(
                    Diagnosis::PermissionDenied,
                    Evidence::new([record.pos_file.clone()]),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let Some(position) = PositionRecord::parse(&contents) else {
            return Ok(Outcome::issue(
                Diagnosis::MalformedFile,
                Evidence::new([record.pos_file.clone(), contents.trim().to_string()]),
            ));
        };

        if position.path != record.path {
            return Ok(Outcome::issue(
                Diagnosis::ConfigFilepathMismatch,
                Evidence::new([
                    record.pos_file.clone(),
                    record.path.clone(),
                    config_path.display().to_string(),
                ]),
            ));
        }

        let listing = self.host.run("ls", &["-li", &record.path])?;
        let inode = listing
            .stdout
            .split_whitespace()
            .next()
            .and_then(|field| field.parse::<u64>().ok());
        let Some(inode) = inode.filter(|_| listing.success()) else {
            return Ok(Outcome::issue(
                Diagnosis::FileAccessFailed,
                Evidence::new([record.path.clone(), listing.combined().trim().to_string()]),
            ));
        };
        let live = format!("{:x}", inode);

        if !identities_match(&position.identity, &live) {
            return Ok(Outcome::issue(
                Diagnosis::ConfigIdentityMismatch,
                Evidence::new([
                    record.path.clone(),
                    live,
                    record.pos_file.clone(),
                    position.identity,
                    config_path.display().to_string(),
                ]),
            ));
        }

        Ok(Outcome::healthy())
    }
}

/// Walk the operator through a missing customlog.conf.
///
/// Returns `Healthy` only if the file exists afterwards.
fn no_customlog_conf(session: &mut Session) -> Result<Diagnosis> {
    let conf = session.paths().customlog_conf();
    let config_logs = Evidence::new([
        session.paths().omsconfig_log().display().to_string(),
        session.paths().omsconfig_detailed_log().display().to_string(),
    ]);

    session.note(&format!("{}\n\n  $ {}\n", MISSING_CONFIG_GUIDANCE, MANUAL_CONFIG_PULL));

    if !session.interactive {
        session.note(" (NOTE: if you aren't using custom logs, please ignore this message.)");
        session.evidence.push(config_logs);
        return Ok(Diagnosis::BackendConfigPending);
    }

    if !session.confirm("Have you already tried pulling the config manually?")? {
        session.note(" Please try running the above command to pull the config file.");
        session.evidence.push(Evidence::new([MANUAL_CONFIG_PULL]));
        return Ok(Diagnosis::FoundIssue);
    }

    if conf.is_file() {
        session.note("The config file has been pulled successfully.");
        session.note("Continuing on with troubleshooter...");
        return Ok(Diagnosis::Healthy);
    }

    session.evidence.push(config_logs);
    Ok(Diagnosis::BackendConfigPending)
}

/// Check the agent's custom log configuration end to end.
pub fn check_customlog_conf(session: &mut Session) -> Result<Diagnosis> {
    tracing::info!("checking custom log configuration");
    let conf = session.paths().customlog_conf();

    if !conf.is_file() {
        let pulled = no_customlog_conf(session)?;
        if !pulled.is_healthy() {
            return Ok(pulled);
        }
    }

    if fs::metadata(&conf)?.len() == 0 {
        session
            .evidence
            .push(Evidence::new([conf.display().to_string()]));
        return Ok(Diagnosis::EmptyFile);
    }

    CustomLogValidator::new(&session.host).validate(&conf, &mut session.evidence)
}
