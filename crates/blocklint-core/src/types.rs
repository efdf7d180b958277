//! Core types for lint issues and results.

use crate::block::Block;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of characters of block text kept in a location hint.
pub const HINT_LEN: usize = 50;

/// Free-form structured evidence attached to an issue.
pub type Evidence = serde_json::Map<String, serde_json::Value>;

/// Severity level for issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail lint.
    Info,
    /// Warning that should be addressed.
    #[serde(alias = "warning")]
    Warn,
    /// Error that must be fixed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Error returned when a severity name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity `{0}`, expected: error, warn, info")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// Where an issue was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Block index, or `-1` for the whole document.
    pub block_index: i64,
    /// Kind of location ("paragraph", "table", "document", ...).
    pub kind: String,
    /// Short excerpt or description to help find the spot.
    pub hint: String,
}

impl Location {
    /// Creates a location with explicit values.
    #[must_use]
    pub fn new(block_index: i64, kind: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            block_index,
            kind: kind.into(),
            hint: hint.into(),
        }
    }

    /// A whole-document location.
    #[must_use]
    pub fn document(hint: impl Into<String>) -> Self {
        Self::new(-1, "document", hint)
    }

    /// The location of a block, hinted with the start of its text.
    #[must_use]
    pub fn of_block(block: &Block) -> Self {
        Self::new(
            i64::from(block.index()),
            block.kind().to_string(),
            block.hint(HINT_LEN),
        )
    }

    /// Returns true if this location refers to the whole document.
    #[must_use]
    pub fn is_document(&self) -> bool {
        self.block_index < 0
    }
}

/// One finding produced by rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Rule code (e.g., "HDG_SEQ-004").
    pub code: String,
    /// Severity of this issue.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Where the issue was found.
    pub location: Location,
    /// Optional structured evidence (expected/actual values, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

impl Issue {
    /// Creates a new issue.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            location,
            evidence: None,
        }
    }

    /// Attaches evidence. Non-object values are stored under `"value"`.
    #[must_use]
    pub fn with_evidence(mut self, evidence: serde_json::Value) -> Self {
        let map = match evidence {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = Evidence::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        self.evidence = Some(map);
        self
    }

    /// Looks up one evidence field.
    #[must_use]
    pub fn evidence_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.evidence.as_ref().and_then(|e| e.get(key))
    }

    /// Formats the issue for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = if self.location.is_document() {
            format!("{} at document\n", self.code)
        } else {
            format!(
                "{} at block {} ({})\n",
                self.code, self.location.block_index, self.location.kind
            )
        };
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        if !self.location.hint.is_empty() {
            let _ = writeln!(output, "  = near: {}", self.location.hint);
        }
        if let Some(evidence) = &self.evidence {
            let _ = writeln!(
                output,
                "  = evidence: {}",
                serde_json::Value::Object(evidence.clone())
            );
        }
        output
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.location.block_index,
            self.location.kind,
            self.severity,
            self.code,
            self.message
        )
    }
}

/// Result of one lint run.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LintReport {
    /// All issues, in emission order.
    pub issues: Vec<Issue>,
    /// Number of blocks visited.
    pub blocks_checked: usize,
}

impl LintReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if any issue meets or exceeds the given severity threshold.
    #[must_use]
    pub fn has_issues_at(&self, severity: Severity) -> bool {
        self.issues.iter().any(|i| i.severity >= severity)
    }

    /// Returns issues filtered by severity.
    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect()
    }

    /// Counts issues as `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        self.issues
            .iter()
            .fold((0, 0, 0), |(e, w, i), issue| match issue.severity {
                Severity::Error => (e + 1, w, i),
                Severity::Warn => (e, w + 1, i),
                Severity::Info => (e, w, i + 1),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Paragraph;
    use serde_json::json;

    fn make_issue(severity: Severity) -> Issue {
        Issue::new(
            "HDG_SEQ-001",
            severity,
            "level 1 numbering jumps",
            Location::new(4, "paragraph", "4 结论"),
        )
    }

    #[test]
    fn severity_parses_warning_alias() {
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("WARN".parse::<Severity>(), Ok(Severity::Warn));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn severity_orders_by_weight() {
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
    }

    #[test]
    fn location_of_block_uses_hint_len() {
        let long = "字".repeat(80);
        let block = crate::Block::paragraph(2, Paragraph::new(long));
        let location = Location::of_block(&block);
        assert_eq!(location.block_index, 2);
        assert_eq!(location.kind, "paragraph");
        assert_eq!(location.hint.chars().count(), HINT_LEN);
    }

    #[test]
    fn evidence_wraps_scalars() {
        let issue = make_issue(Severity::Info).with_evidence(json!(3));
        assert_eq!(issue.evidence_value("value"), Some(&json!(3)));
    }

    #[test]
    fn issue_serializes_without_empty_evidence() {
        let issue = make_issue(Severity::Warn);
        let value = serde_json::to_value(&issue).unwrap();
        assert!(value.get("evidence").is_none());
        assert_eq!(value["severity"], json!("warn"));
    }

    #[test]
    fn display_is_compact() {
        let issue = make_issue(Severity::Error);
        insta::assert_snapshot!(
            issue.to_string(),
            @"4:paragraph: error [HDG_SEQ-001] level 1 numbering jumps"
        );
    }

    #[test]
    fn count_by_severity_counts_each_level() {
        let mut report = LintReport::new();
        report.issues.push(make_issue(Severity::Error));
        report.issues.push(make_issue(Severity::Warn));
        report.issues.push(make_issue(Severity::Warn));
        assert_eq!(report.count_by_severity(), (1, 2, 0));
        assert!(report.has_issues_at(Severity::Warn));
        assert!(report.has_issues_at(Severity::Error));
    }

    #[test]
    fn has_issues_at_error_only() {
        let mut report = LintReport::new();
        report.issues.push(make_issue(Severity::Warn));
        assert!(!report.has_issues_at(Severity::Error));
    }
}
