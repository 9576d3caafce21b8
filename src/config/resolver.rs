//! Precedence resolution for tool settings.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`OMSDOCTOR_LOG`, `OMSDOCTOR_SILENT`, `OMSDOCTOR_FORMAT`)
//! 3. config.kdl (`~/.config/omsdoctor/config.kdl`, or `OMSDOCTOR_CONFIG`)
//! 4. Built-in defaults

use crate::Result;
use crate::config::{DoctorConfig, OutputFormat};
use std::path::PathBuf;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "OMSDOCTOR_CONFIG";
/// Environment variable holding a `tracing` filter directive.
pub const LOG_LEVEL_ENV: &str = "OMSDOCTOR_LOG";
/// Environment variable forcing silent mode ("1"/"true").
pub const SILENT_ENV: &str = "OMSDOCTOR_SILENT";
/// Environment variable selecting the output format.
pub const FORMAT_ENV: &str = "OMSDOCTOR_FORMAT";

/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Settings for one run, with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub output_format: Resolved<OutputFormat>,
    pub log_level: Resolved<String>,
    pub silent: Resolved<bool>,
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            log_level: Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default),
            silent: Resolved::new(false, ValueSource::Default),
        }
    }
}

impl ResolvedSettings {
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn log_level(&self) -> &str {
        &self.log_level.value
    }

    pub fn silent(&self) -> bool {
        self.silent.value
    }
}

/// CLI overrides for settings resolution.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub output_format: Option<OutputFormat>,
    pub log_level: Option<String>,
    pub silent: Option<bool>,
}

impl SettingsOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = Some(silent);
        self
    }
}

/// Location of config.kdl.
pub fn config_path(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(path) = env(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("omsdoctor").join("config.kdl"))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Resolve settings from overrides, environment and an already-loaded config.
///
/// `env` looks up environment variables; tests pass a closure over a map.
pub fn resolve_settings_with(
    overrides: &SettingsOverrides,
    env: impl Fn(&str) -> Option<String>,
    config: &DoctorConfig,
) -> ResolvedSettings {
    let mut result = ResolvedSettings::default();
    let env_var = |name: &str| ValueSource::EnvVar(name.to_string());

    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = env(FORMAT_ENV).as_deref().and_then(OutputFormat::parse) {
        result.output_format = Resolved::new(format, env_var(FORMAT_ENV));
    } else if let Some(format) = config.output_format {
        result.output_format = Resolved::new(format, ValueSource::ConfigFile);
    }

    if let Some(ref level) = overrides.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::CliFlag);
    } else if let Some(level) = env(LOG_LEVEL_ENV).filter(|l| !l.trim().is_empty()) {
        result.log_level = Resolved::new(level, env_var(LOG_LEVEL_ENV));
    } else if let Some(ref level) = config.log_level {
        result.log_level = Resolved::new(level.clone(), ValueSource::ConfigFile);
    }

    if let Some(silent) = overrides.silent {
        result.silent = Resolved::new(silent, ValueSource::CliFlag);
    } else if let Some(silent) = env(SILENT_ENV).as_deref().and_then(parse_flag) {
        result.silent = Resolved::new(silent, env_var(SILENT_ENV));
    } else if let Some(silent) = config.silent {
        result.silent = Resolved::new(silent, ValueSource::ConfigFile);
    }

    result
}

/// Resolve settings against the process environment and config.kdl.
pub fn resolve_settings(overrides: &SettingsOverrides) -> Result<ResolvedSettings> {
    let env = |name: &str| std::env::var(name).ok();
    let config = match config_path(env) {
        Some(path) => DoctorConfig::load(&path)?.unwrap_or_default(),
        None => DoctorConfig::default(),
    };
    Ok(resolve_settings_with(overrides, env, &config))
}
