//! omsdoctor - A troubleshooter for the Linux monitoring agent.
//!
//! This library provides the diagnostic engine behind the `omsdoctor` CLI:
//! a shared system fact cache, structural validators for custom log and
//! workspace configuration, and the heartbeat health-check state machine.

pub mod checks;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domains;
pub mod facts;
pub mod heartbeat;
pub mod models;
pub mod paths;
pub mod prompt;
pub mod report;
pub mod session;
pub mod sys;


/// Library-level error type for omsdoctor operations.
///
/// These are unclassified faults. Anything the troubleshooter can explain is
/// reported as a [`models::Diagnosis`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to run {program}: {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for omsdoctor operations.
pub type Result<T> = std::result::Result<T, Error>;
