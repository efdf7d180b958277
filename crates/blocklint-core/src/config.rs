//! Configuration types for blocklint.

use crate::declarative::config_dto::{ClassRuleDto, StyleDefDto};
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Top-level configuration for blocklint.
///
/// ```toml
/// fail_on = "warn"
///
/// [engine]
/// mode = "auto"
///
/// [[classifiers]]
/// class = "title"
/// match = { position = 0 }
///
/// [styles.".title"]
/// font = { name_eastasia = "黑体", size = "二号" }
///
/// [overrides.STYLE-FONT-NAME-TITLE]
/// severity = "info"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Severity threshold for a failing run (default: error).
    #[serde(default)]
    pub fail_on: Option<Severity>,

    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Classifier rules, in declaration order.
    #[serde(default)]
    pub classifiers: Vec<ClassRuleDto>,

    /// Style definitions keyed by `.label`.
    #[serde(default)]
    pub styles: BTreeMap<String, StyleDefDto>,

    /// Explicit rule instances.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    /// Document structure expanded into rules by the generator.
    #[serde(default)]
    pub document: Option<toml::Table>,

    /// Per-code overrides.
    #[serde(default)]
    pub overrides: HashMap<String, RuleOverride>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// The severity at or above which a run fails.
    #[must_use]
    pub fn fail_threshold(&self) -> Severity {
        self.fail_on.unwrap_or(Severity::Error)
    }

    /// Returns true if any rules would be produced by this configuration.
    #[must_use]
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty() || self.document.is_some()
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Which evaluation pipeline to run.
    #[serde(default)]
    pub mode: EngineMode,
}

/// Evaluation pipeline selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineMode {
    /// Class-style when styles are configured, rules otherwise.
    #[default]
    Auto,
    /// Classify, then check `[styles]`.
    ClassStyle,
    /// Optionally classify, then run rule instances.
    Rules,
}

/// Per-code override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleOverride {
    /// Whether issues with this code are reported.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Severity replacing the emitted one.
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// One `[[rules]]` entry: a rule kind plus its parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Registry key (e.g. "heading-numbering").
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,

    /// Instance id used as issue code; derived from the kind when absent.
    #[serde(default, alias = "code")]
    pub id: Option<String>,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// Default severity for rules that take one.
    #[serde(default)]
    pub severity: Option<Severity>,

    /// Rule-specific options as key-value pairs.
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl RuleSpec {
    /// Creates a spec of the given kind with no options.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Sets the instance id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets an option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Deserializes all options into a typed parameter struct.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when an option has the wrong shape.
    pub fn params<T: serde::de::DeserializeOwned>(&self) -> Result<T, toml::de::Error> {
        let table: toml::Table = self
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        toml::Value::Table(table).try_into()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    #[diagnostic(code(blocklint::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    #[diagnostic(
        code(blocklint::config::parse),
        help("run `blocklint init` for an annotated example configuration")
    )]
    Parse {
        /// Parse error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.mode, EngineMode::Auto);
        assert_eq!(config.fail_threshold(), Severity::Error);
        assert!(config.rules.is_empty());
        assert!(!config.has_rules());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
fail_on = "warning"

[engine]
mode = "class-style"

[[classifiers]]
class = "title"
match = { position = 0 }

[styles.".title"]
font = { name_eastasia = "黑体", size = "二号", bold = true }

[[rules]]
type = "heading-numbering"
id = "HDG-001"
numbering_patterns = ['^(\d+)\s', '^(\d+\.\d+)\s']
report_regressions = true

[overrides.HDG-001]
severity = "info"

[overrides.STYLE-FONT-BOLD-TITLE]
enabled = false
"#;

        let config = Config::parse(toml).expect("Failed to parse");
        assert_eq!(config.fail_threshold(), Severity::Warn);
        assert_eq!(config.engine.mode, EngineMode::ClassStyle);
        assert_eq!(config.classifiers.len(), 1);
        assert!(config.styles.contains_key(".title"));

        let spec = &config.rules[0];
        assert_eq!(spec.kind, "heading-numbering");
        assert_eq!(spec.id.as_deref(), Some("HDG-001"));
        assert_eq!(spec.options["report_regressions"].as_bool(), Some(true));
        assert_eq!(
            spec.options["numbering_patterns"].as_array().map(Vec::len),
            Some(2)
        );

        assert_eq!(config.overrides["HDG-001"].severity, Some(Severity::Info));
        let overrides = crate::engine::Overrides::new(config.overrides.clone());
        assert!(!overrides.is_enabled("STYLE-FONT-BOLD-TITLE"));
        assert!(overrides.is_enabled("STYLE-FONT-NAME-TITLE"));
    }

    #[test]
    fn test_typed_params() {
        #[derive(Deserialize)]
        struct Params {
            min: i64,
            #[serde(default)]
            styles: Vec<String>,
        }

        let spec = RuleSpec::new("counting")
            .with_option("min", 2)
            .with_option("styles", vec!["Caption".to_string()]);
        let params: Params = spec.params().unwrap();
        assert_eq!(params.min, 2);
        assert_eq!(params.styles, ["Caption"]);

        let missing: Result<Params, _> = RuleSpec::new("counting").params();
        assert!(missing.is_err());
    }

    #[test]
    fn test_parse_error() {
        let err = Config::parse("[engine]\nmode = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
