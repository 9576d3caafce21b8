//! KDL schema for config.kdl.
//!
//! ```kdl
//! output-format "human"  // or "json"
//! log-level "omsdoctor=debug"
//! silent #true
//! ```

use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool preferences stored in config.kdl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// `tracing` filter directive (e.g. "info", "omsdoctor=debug")
    pub log_level: Option<String>,

    /// Never prompt; take the conservative branch instead
    pub silent: Option<bool>,
}

fn first_value<'d>(doc: &'d KdlDocument, name: &str) -> Option<&'d KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(KdlEntry::value)
}

impl DoctorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document. Unknown or mistyped nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_value(doc, "output-format").and_then(KdlValue::as_string) {
            config.output_format = OutputFormat::parse(s);
        }

        if let Some(s) = first_value(doc, "log-level").and_then(KdlValue::as_string)
            && !s.trim().is_empty()
        {
            config.log_level = Some(s.to_string());
        }

        if let Some(b) = first_value(doc, "silent").and_then(KdlValue::as_bool) {
            config.silent = Some(b);
        }

        config
    }

    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            let mut node = KdlNode::new("output-format");
            node.push(KdlEntry::new(KdlValue::String(format.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(ref level) = self.log_level {
            let mut node = KdlNode::new("log-level");
            node.push(KdlEntry::new(KdlValue::String(level.clone())));
            doc.nodes_mut().push(node);
        }

        if let Some(silent) = self.silent {
            let mut node = KdlNode::new("silent");
            node.push(KdlEntry::new(KdlValue::Bool(silent)));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Parse config.kdl text.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Config(format!("Failed to parse KDL: {}", e)))?;
        Ok(Self::from_kdl(&doc))
    }

    /// Load config from `path`. A missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        let doc: KdlDocument = content.parse().map_err(|e| {
            Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e))
        })?;
        Ok(Some(Self::from_kdl(&doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn test_config_from_kdl_empty() {
        let doc = KdlDocument::new();
        assert_eq!(DoctorConfig::from_kdl(&doc), DoctorConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            output-format "human"
            log-level "omsdoctor=debug"
            silent #true
        "#;
        let config = DoctorConfig::parse(kdl).unwrap();

        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.log_level.as_deref(), Some("omsdoctor=debug"));
        assert_eq!(config.silent, Some(true));
    }

    #[test]
    fn test_config_ignores_mistyped_values() {
        let kdl = r#"
            output-format "xml"
            silent "yes"
        "#;
        let config = DoctorConfig::parse(kdl).unwrap();
        assert_eq!(config, DoctorConfig::default());
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = DoctorConfig {
            output_format: Some(OutputFormat::Json),
            log_level: Some("info".to_string()),
            silent: Some(false),
        };
        let parsed = DoctorConfig::parse(&config.to_kdl().to_string()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert_eq!(DoctorConfig::load(&temp.path().join("config.kdl")).unwrap(), None);
    }

    #[test]
    fn test_load_invalid_kdl() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.kdl");
        std::fs::write(&path, "output-format \"human").unwrap();
        let err = DoctorConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse KDL"));
    }
}
