//! Label-driven formatting checks.
//!
//! A [`StyleChecker`] maps labels to [`StyleDef`]s and compares each labeled
//! paragraph's first run and paragraph format against the definition.
//! Tables are not style-checked.

use crate::block::{Alignment, Block, Font, Paragraph};
use crate::types::{Issue, Location, Severity};
use crate::units::LineSpacing;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Maximum half-point difference tolerated for font sizes.
const SIZE_TOLERANCE: f64 = 0.5;
/// Maximum twips difference tolerated for indents and spacing.
const TWIPS_TOLERANCE: i32 = 10;
/// Maximum difference tolerated for line spacing multiples.
const LINE_SPACING_TOLERANCE: f64 = 0.05;

/// An expected value together with the text it was configured as.
#[derive(Debug, Clone, PartialEq)]
pub struct Expected<T> {
    /// Value as written in the configuration (`"三号"`, `"2字符"`).
    pub written: String,
    /// Converted value.
    pub value: T,
}

impl<T> Expected<T> {
    /// Pairs a converted value with its source text.
    #[must_use]
    pub fn new(written: impl Into<String>, value: T) -> Self {
        Self {
            written: written.into(),
            value,
        }
    }
}

/// Expected character formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontStyle {
    /// East-Asian font name.
    pub east_asia: Option<String>,
    /// Western font name.
    pub ascii: Option<String>,
    /// Size in half-points.
    pub size: Option<Expected<u32>>,
    /// Bold flag.
    pub bold: Option<bool>,
    /// Italic flag.
    pub italic: Option<bool>,
}

/// Expected paragraph formatting. Lengths are in twips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphStyle {
    /// Alignment.
    pub alignment: Option<Expected<Alignment>>,
    /// Line spacing.
    pub line_spacing: Option<Expected<LineSpacing>>,
    /// First-line indent.
    pub first_line_indent: Option<Expected<i32>>,
    /// Space before.
    pub space_before: Option<Expected<i32>>,
    /// Space after.
    pub space_after: Option<Expected<i32>>,
}

/// Formatting expected of every block carrying one label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDef {
    /// Character formatting, checked against the first run.
    pub font: Option<FontStyle>,
    /// Paragraph formatting.
    pub paragraph: Option<ParagraphStyle>,
}

/// Checks labeled blocks against their style definitions.
#[derive(Debug, Clone, Default)]
pub struct StyleChecker {
    styles: BTreeMap<String, StyleDef>,
}

impl StyleChecker {
    /// Creates a checker from definitions keyed by label (without the dot).
    #[must_use]
    pub fn new(styles: BTreeMap<String, StyleDef>) -> Self {
        Self { styles }
    }

    /// Returns true if no styles are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Number of style definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// The definition for `label`, if any.
    #[must_use]
    pub fn style(&self, label: &str) -> Option<&StyleDef> {
        self.styles.get(label)
    }

    /// Checks every block, in document order then label order.
    #[must_use]
    pub fn check(&self, blocks: &[Block]) -> Vec<Issue> {
        let mut issues = Vec::new();
        for block in blocks {
            let Some(paragraph) = block.as_paragraph() else {
                continue;
            };
            for label in block.labels() {
                let Some(style) = self.styles.get(label) else {
                    continue;
                };
                let site = Site {
                    block,
                    paragraph,
                    label,
                };
                if let Some(font) = &style.font {
                    site.check_font(font, &mut issues);
                }
                if let Some(format) = &style.paragraph {
                    site.check_paragraph(format, &mut issues);
                }
            }
        }
        debug!(issues = issues.len(), "Style check finished");
        issues
    }
}

struct Site<'a> {
    block: &'a Block,
    paragraph: &'a Paragraph,
    label: &'a str,
}

impl Site<'_> {
    fn issue(
        &self,
        check: &str,
        severity: Severity,
        message: String,
        evidence: serde_json::Value,
    ) -> Issue {
        let mut issue = Issue::new(
            format!("STYLE-{check}-{}", self.label.to_uppercase()),
            severity,
            message,
            Location::of_block(self.block),
        )
        .with_evidence(evidence);
        if let Some(map) = issue.evidence.as_mut() {
            map.insert("class".to_string(), json!(self.label));
        }
        issue
    }

    fn check_font(&self, expected: &FontStyle, issues: &mut Vec<Issue>) {
        let Some(run) = self.paragraph.runs.first() else {
            return;
        };
        let font: &Font = &run.font;
        let label = self.label;

        if let Some(name) = &expected.east_asia {
            if let Some(actual) = font.display_name() {
                if actual != name {
                    issues.push(self.issue(
                        "FONT-NAME",
                        Severity::Error,
                        format!(".{label} East-Asian font should be {name}, found {actual}"),
                        json!({ "expected": name, "actual": actual }),
                    ));
                }
            }
        }

        if let Some(name) = &expected.ascii {
            if let Some(actual) = font.name.as_deref() {
                if actual != name {
                    issues.push(self.issue(
                        "FONT-NAME-ASCII",
                        Severity::Error,
                        format!(".{label} western font should be {name}, found {actual}"),
                        json!({ "expected": name, "actual": actual }),
                    ));
                }
            }
        }

        if let (Some(size), Some(actual)) = (&expected.size, font.size) {
            if (f64::from(actual) - f64::from(size.value)).abs() > SIZE_TOLERANCE {
                issues.push(self.issue(
                    "FONT-SIZE",
                    Severity::Error,
                    format!(
                        ".{label} font size should be {}, found {}pt",
                        size.written,
                        f64::from(actual) / 2.0
                    ),
                    json!({
                        "expected": size.written,
                        "expected_half_pt": size.value,
                        "actual_half_pt": actual,
                    }),
                ));
            }
        }

        for (check, what, want, actual) in [
            ("FONT-BOLD", "bold", expected.bold, font.bold),
            ("FONT-ITALIC", "italic", expected.italic, font.italic),
        ] {
            if let Some(want) = want {
                if actual != Some(want) {
                    issues.push(self.issue(
                        check,
                        Severity::Error,
                        format!(".{label} {what} should be {want}, found {}", describe(actual)),
                        json!({ "expected": want, "actual": actual }),
                    ));
                }
            }
        }
    }

    fn check_paragraph(&self, expected: &ParagraphStyle, issues: &mut Vec<Issue>) {
        let format = &self.paragraph.format;
        let label = self.label;

        if let Some(alignment) = &expected.alignment {
            if format.alignment != Some(alignment.value) {
                let actual = format.alignment.map(Alignment::as_str);
                issues.push(self.issue(
                    "PARA-ALIGN",
                    Severity::Error,
                    format!(
                        ".{label} alignment should be {}, found {}",
                        alignment.written,
                        describe(actual)
                    ),
                    json!({ "expected": alignment.written, "actual": actual }),
                ));
            }
        }

        if let Some(spacing) = &expected.line_spacing {
            let mismatch = match (spacing.value, format.line_spacing) {
                (_, None) => true,
                (LineSpacing::Multiple(want), Some(actual)) => {
                    (actual - want).abs() > LINE_SPACING_TOLERANCE
                }
                (LineSpacing::Exact(_) | LineSpacing::AtLeast(_), Some(_)) => false,
            };
            if mismatch {
                issues.push(self.issue(
                    "PARA-LINE-SPACING",
                    Severity::Warn,
                    format!(".{label} line spacing should be {}", spacing.written),
                    json!({ "expected": spacing.written, "actual": format.line_spacing }),
                ));
            }
        }

        for (check, what, severity, want, actual) in [
            (
                "PARA-FIRST-INDENT",
                "first-line indent",
                Severity::Error,
                &expected.first_line_indent,
                format.first_line_indent,
            ),
            (
                "PARA-SPACE-BEFORE",
                "space before",
                Severity::Warn,
                &expected.space_before,
                format.space_before,
            ),
            (
                "PARA-SPACE-AFTER",
                "space after",
                Severity::Warn,
                &expected.space_after,
                format.space_after,
            ),
        ] {
            let Some(want) = want else { continue };
            let actual = actual.unwrap_or(0);
            if (actual - want.value).abs() > TWIPS_TOLERANCE {
                issues.push(self.issue(
                    check,
                    severity,
                    format!(
                        ".{label} {what} should be {}, found {actual} twips",
                        want.written
                    ),
                    json!({
                        "expected": want.written,
                        "expected_twips": want.value,
                        "actual_twips": actual,
                    }),
                ));
            }
        }
    }
}

fn describe<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "unset".to_string(), |v| v.to_string())
}
