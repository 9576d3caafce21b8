//! Structural validators.
//!
//! These reconcile declarative agent configuration against the live
//! filesystem. Each pushes exactly one evidence entry before returning a
//! non-healthy diagnosis.

pub mod customlog;
pub mod multihoming;

pub use customlog::{CustomLogRecord, CustomLogValidator, PositionRecord, check_customlog_conf};
pub use multihoming::{WORKSPACE_ID_MIN_LEN, detect_multihoming, workspace_candidates};
