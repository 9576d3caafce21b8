//! Tool configuration.
//!
//! Agent artifact locations are fixed (see [`crate::paths`]). This module
//! only covers how omsdoctor itself behaves.
//!
//! ## config.kdl
//!
//! Located at `~/.config/omsdoctor/config.kdl`, or wherever
//! `OMSDOCTOR_CONFIG` points. Contains:
//! - `output-format` - "json" or "human"
//! - `log-level` - `tracing` filter directive
//! - `silent` - never prompt
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_PATH_ENV, DEFAULT_LOG_LEVEL, FORMAT_ENV, LOG_LEVEL_ENV, Resolved, ResolvedSettings,
    SILENT_ENV, SettingsOverrides, ValueSource, config_path, resolve_settings,
    resolve_settings_with,
};
pub use schema::{DoctorConfig, OutputFormat};
