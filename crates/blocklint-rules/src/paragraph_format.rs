//! Rule checking paragraph-level formatting.
//!
//! # Configuration
//!
//! - `target_styles`, `target_blocks`, `target_range`: see font-style
//! - `line_spacing`: expected multiple (`1.5`, `"1.5倍"`)
//! - `line_spacing_tolerance`: accepted difference (default: 0.05)
//! - `alignment`: `left`, `center`, `right`, `justify`, `distribute` or the
//!   Chinese names
//! - `first_line_indent`, `left_indent`, `right_indent`, `space_before`,
//!   `space_after`: expected values in twips
//! - `indent_tolerance`: accepted difference in twips (default: 72)

use crate::common::{self, prefixed, Targets};
use crate::error::RuleBuildError;
use blocklint_core::units::{self, LineSpacing, Measure};
use blocklint_core::{
    Alignment, Block, Context, Issue, Location, Rule, RuleBox, RuleSpec, Severity,
};
use serde::Deserialize;
use serde_json::json;

/// Registry key for paragraph-format.
pub const KIND: &str = "paragraph-format";

const DEFAULT_LINE_SPACING_TOLERANCE: f64 = 0.05;
const DEFAULT_INDENT_TOLERANCE: i32 = 72;

/// Expected twips values, keyed by what they measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Indents {
    /// First-line indent.
    pub first_line: Option<i32>,
    /// Left indent.
    pub left: Option<i32>,
    /// Right indent.
    pub right: Option<i32>,
    /// Space before.
    pub space_before: Option<i32>,
    /// Space after.
    pub space_after: Option<i32>,
}

/// Checks line spacing, alignment, indents and paragraph spacing.
///
/// Line spacing mismatches are warnings; everything else is informational.
/// Values the paragraph leaves unset are not checked, except alignment.
#[derive(Debug, Clone)]
pub struct ParagraphFormatRule {
    id: String,
    description: String,
    targets: Targets,
    line_spacing: Option<LineSpacing>,
    line_spacing_tolerance: f64,
    alignment: Option<Alignment>,
    indents: Indents,
    indent_tolerance: i32,
}

impl ParagraphFormatRule {
    /// Creates a rule with no expectations.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            targets: Targets::new(),
            line_spacing: None,
            line_spacing_tolerance: DEFAULT_LINE_SPACING_TOLERANCE,
            alignment: None,
            indents: Indents::default(),
            indent_tolerance: DEFAULT_INDENT_TOLERANCE,
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the targeted paragraphs.
    #[must_use]
    pub fn targets(mut self, targets: Targets) -> Self {
        self.targets = targets;
        self
    }

    /// Sets the expected line spacing. Only multiples are compared.
    #[must_use]
    pub fn line_spacing(mut self, spacing: LineSpacing) -> Self {
        self.line_spacing = Some(spacing);
        self
    }

    /// Sets the expected alignment.
    #[must_use]
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Sets the expected indents and spacing.
    #[must_use]
    pub fn indents(mut self, indents: Indents) -> Self {
        self.indents = indents;
        self
    }

    fn issue(&self, block: &Block, severity: Severity, message: String) -> Issue {
        Issue::new(
            &self.id,
            severity,
            prefixed(&self.description, message),
            Location::of_block(block),
        )
    }
}

impl Rule for ParagraphFormatRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn description(&self) -> &'static str {
        "Checks line spacing, alignment, indents and spacing"
    }

    fn applies_to(&self, block: &Block, _ctx: &Context<'_>) -> bool {
        block
            .as_paragraph()
            .is_some_and(|p| self.targets.accepts(block, p))
    }

    fn check(&self, block: &Block, _ctx: &Context<'_>) -> Vec<Issue> {
        let Some(paragraph) = block.as_paragraph() else {
            return Vec::new();
        };
        let format = &paragraph.format;
        let mut issues = Vec::new();

        if let (Some(LineSpacing::Multiple(expected)), Some(actual)) =
            (self.line_spacing, format.line_spacing)
        {
            if (actual - expected).abs() > self.line_spacing_tolerance {
                issues.push(
                    self.issue(
                        block,
                        Severity::Warn,
                        format!("expected line spacing {expected}x, found {actual}x"),
                    )
                    .with_evidence(json!({ "expected": expected, "actual": actual })),
                );
            }
        }

        if let Some(expected) = self.alignment {
            if format.alignment != Some(expected) {
                let actual = format.alignment.map(Alignment::as_str);
                issues.push(
                    self.issue(block, Severity::Info, format!("expected alignment '{expected}'"))
                        .with_evidence(json!({ "expected": expected.as_str(), "actual": actual })),
                );
            }
        }

        for (what, expected, actual) in [
            ("first-line indent", self.indents.first_line, format.first_line_indent),
            ("left indent", self.indents.left, format.left_indent),
            ("right indent", self.indents.right, format.right_indent),
            ("space before", self.indents.space_before, format.space_before),
            ("space after", self.indents.space_after, format.space_after),
        ] {
            let (Some(expected), Some(actual)) = (expected, actual) else {
                continue;
            };
            if (actual - expected).abs() > self.indent_tolerance {
                issues.push(
                    self.issue(
                        block,
                        Severity::Info,
                        format!("{what} should be {expected} twips, found {actual}"),
                    )
                    .with_evidence(json!({ "expected": expected, "actual": actual })),
                );
            }
        }

        issues
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    #[serde(default)]
    target_styles: Vec<String>,
    #[serde(default)]
    target_blocks: Vec<u32>,
    #[serde(default)]
    target_range: Option<[u32; 2]>,
    #[serde(default)]
    line_spacing: Option<Measure>,
    #[serde(default)]
    line_spacing_tolerance: Option<f64>,
    #[serde(default)]
    alignment: Option<String>,
    #[serde(default)]
    first_line_indent: Option<i32>,
    #[serde(default)]
    left_indent: Option<i32>,
    #[serde(default)]
    right_indent: Option<i32>,
    #[serde(default)]
    space_before: Option<i32>,
    #[serde(default)]
    space_after: Option<i32>,
    #[serde(default)]
    indent_tolerance: Option<i32>,
}

pub(crate) fn build(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;

    let mut rule = ParagraphFormatRule::new(&id)
        .description(spec.description.clone().unwrap_or_default())
        .targets(Targets::from_params(p.target_styles, p.target_blocks, p.target_range))
        .indents(Indents {
            first_line: p.first_line_indent,
            left: p.left_indent,
            right: p.right_indent,
            space_before: p.space_before,
            space_after: p.space_after,
        });
    if let Some(spacing) = p.line_spacing {
        let parsed = units::parse_line_spacing(&spacing.as_text()).ok_or_else(|| {
            RuleBuildError::invalid(&id, format!("cannot read `{spacing}` as a line spacing"))
        })?;
        rule = rule.line_spacing(parsed);
    }
    if let Some(alignment) = p.alignment {
        let parsed = alignment
            .parse()
            .map_err(|source| RuleBuildError::Alignment {
                id: id.clone(),
                source,
            })?;
        rule = rule.alignment(parsed);
    }
    if let Some(tolerance) = p.line_spacing_tolerance {
        rule.line_spacing_tolerance = tolerance;
    }
    if let Some(tolerance) = p.indent_tolerance {
        rule.indent_tolerance = tolerance;
    }
    Ok(Box::new(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::{Paragraph, ParagraphFormat};

    fn check(rule: &ParagraphFormatRule, format: ParagraphFormat) -> Vec<Issue> {
        let blocks = vec![Block::paragraph(3, Paragraph::new("正文").with_format(format))];
        rule.check(&blocks[0], &Context::new(&blocks))
    }

    #[test]
    fn line_spacing_uses_tolerance() {
        let rule = ParagraphFormatRule::new("PAR-001").line_spacing(LineSpacing::Multiple(1.5));
        let near = ParagraphFormat {
            line_spacing: Some(1.52),
            ..ParagraphFormat::default()
        };
        assert!(check(&rule, near).is_empty());

        let far = ParagraphFormat {
            line_spacing: Some(1.0),
            ..ParagraphFormat::default()
        };
        let issues = check(&rule, far);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warn);
        assert_eq!(issues[0].location.block_index, 3);
    }

    #[test]
    fn unset_values_are_skipped_except_alignment() {
        let rule = ParagraphFormatRule::new("PAR-002")
            .line_spacing(LineSpacing::Multiple(1.5))
            .alignment(Alignment::Justify)
            .indents(Indents {
                first_line: Some(480),
                ..Indents::default()
            });
        let issues = check(&rule, ParagraphFormat::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "expected alignment 'justify'");
        assert_eq!(issues[0].severity, Severity::Info);
    }

    #[test]
    fn indents_use_twips_tolerance() {
        let rule = ParagraphFormatRule::new("PAR-003").indents(Indents {
            first_line: Some(480),
            space_after: Some(0),
            ..Indents::default()
        });
        let format = ParagraphFormat {
            first_line_indent: Some(420),
            space_after: Some(240),
            ..ParagraphFormat::default()
        };
        let issues = check(&rule, format);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "space after should be 0 twips, found 240");
    }

    #[test]
    fn builds_from_spec() {
        let spec = RuleSpec::new(KIND)
            .with_option("line_spacing", "1.5倍")
            .with_option("alignment", "两端对齐");
        assert!(build(&spec).is_ok());

        let bad = RuleSpec::new(KIND).with_option("alignment", "diagonal");
        assert!(matches!(build(&bad), Err(RuleBuildError::Alignment { .. })));

        let typo = RuleSpec::new(KIND).with_option("line_spaceing", 1.5);
        assert!(matches!(build(&typo), Err(RuleBuildError::Params { .. })));
    }
}
