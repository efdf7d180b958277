//! Rule checking run-level font formatting.
//!
//! # Configuration
//!
//! - `target_styles`: paragraph styles to check (default: all)
//! - `target_blocks`: block indices to check (default: all)
//! - `target_range`: `[start, end)` block index range
//! - `font_name`: expected East-Asian font name
//! - `font_name_alternatives`: other accepted names (usually western)
//! - `font_size`: expected size (`"小四"`, `"12pt"`, `12`)
//! - `bold`, `italic`: expected flags

use crate::common::{self, prefixed, Targets};
use crate::error::RuleBuildError;
use blocklint_core::units::{self, Measure};
use blocklint_core::{Block, Context, Font, Issue, Location, Rule, RuleBox, RuleSpec, Severity};
use serde::Deserialize;
use serde_json::json;

/// Registry key for font-style.
pub const KIND: &str = "font-style";

/// Size difference in half-points still accepted (0.5pt).
const SIZE_TOLERANCE: u32 = 1;

/// Checks font name, size, bold and italic of every run in targeted
/// paragraphs. Each attribute is reported at most once per block.
#[derive(Debug, Clone)]
pub struct FontStyleRule {
    id: String,
    description: String,
    targets: Targets,
    font_name: Option<String>,
    alternatives: Vec<String>,
    size: Option<u32>,
    bold: Option<bool>,
    italic: Option<bool>,
}

impl FontStyleRule {
    /// Creates a rule with no expectations.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            targets: Targets::new(),
            font_name: None,
            alternatives: Vec::new(),
            size: None,
            bold: None,
            italic: None,
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

    /// Sets the expected font name and accepted alternatives.
    #[must_use]
    pub fn font_name(mut self, name: impl Into<String>, alternatives: Vec<String>) -> Self {
        self.font_name = Some(name.into());
        self.alternatives = alternatives;
        self
    }

    /// Sets the expected size in half-points.
    #[must_use]
    pub fn size_half_points(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the expected bold flag.
    #[must_use]
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    /// Sets the expected italic flag.
    #[must_use]
    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    fn name_accepted(&self, expected: &str, font: &Font) -> bool {
        [font.east_asia.as_deref(), font.name.as_deref()]
            .into_iter()
            .flatten()
            .any(|actual| actual == expected || self.alternatives.iter().any(|a| a == actual))
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

impl Rule for FontStyleRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn description(&self) -> &'static str {
        "Checks run font name, size, bold and italic"
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
        let fonts: Vec<&Font> = paragraph.runs.iter().map(|r| &r.font).collect();
        let mut issues = Vec::new();

        if let Some(expected) = &self.font_name {
            let wrong = fonts
                .iter()
                .filter(|f| f.display_name().is_some())
                .find(|f| !self.name_accepted(expected, f));
            if let Some(font) = wrong {
                let actual = font.display_name().unwrap_or_default();
                issues.push(
                    self.issue(
                        block,
                        Severity::Warn,
                        format!("expected font '{expected}', found '{actual}'"),
                    )
                    .with_evidence(json!({ "expected": expected, "actual": actual })),
                );
            }
        }

        if let Some(expected) = self.size {
            let wrong = fonts
                .iter()
                .filter_map(|f| f.size)
                .find(|actual| actual.abs_diff(expected) > SIZE_TOLERANCE);
            if let Some(actual) = wrong {
                issues.push(
                    self.issue(
                        block,
                        Severity::Warn,
                        format!(
                            "expected font size {}pt, found {}pt",
                            f64::from(expected) / 2.0,
                            f64::from(actual) / 2.0
                        ),
                    )
                    .with_evidence(json!({ "expected": expected, "actual": actual })),
                );
            }
        }

        for (what, expected, actual) in [
            ("bold", self.bold, fonts.iter().map(|f| f.bold).collect::<Vec<_>>()),
            ("italic", self.italic, fonts.iter().map(|f| f.italic).collect()),
        ] {
            let Some(expected) = expected else { continue };
            if actual.iter().any(|a| a.unwrap_or(false) != expected) {
                let negation = if expected { "" } else { "not " };
                issues.push(
                    self.issue(block, Severity::Info, format!("expected {negation}{what}"))
                        .with_evidence(json!({ "expected": expected })),
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
    font_name: Option<String>,
    #[serde(default)]
    font_name_alternatives: Vec<String>,
    #[serde(default)]
    font_size: Option<Measure>,
    #[serde(default)]
    bold: Option<bool>,
    #[serde(default)]
    italic: Option<bool>,
}

pub(crate) fn build(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;

    let mut rule = FontStyleRule::new(&id)
        .description(spec.description.clone().unwrap_or_default())
        .targets(Targets::from_params(p.target_styles, p.target_blocks, p.target_range));
    if let Some(name) = p.font_name {
        rule = rule.font_name(name, p.font_name_alternatives);
    }
    if let Some(size) = p.font_size {
        let half_points = units::parse_font_size(&size.as_text())
            .ok_or_else(|| RuleBuildError::invalid(&id, format!("cannot read `{size}` as a font size")))?;
        rule = rule.size_half_points(half_points);
    }
    rule.bold = p.bold;
    rule.italic = p.italic;
    Ok(Box::new(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::{Paragraph, Run};

    fn run(name: &str, size: u32, bold: Option<bool>) -> Run {
        Run::new(
            "x",
            Font {
                east_asia: Some(name.to_string()),
                size: Some(size),
                bold,
                ..Font::default()
            },
        )
    }

    fn check(rule: &FontStyleRule, paragraph: Paragraph) -> Vec<Issue> {
        let blocks = vec![Block::paragraph(0, paragraph)];
        let ctx = Context::new(&blocks);
        assert!(rule.applies_to(&blocks[0], &ctx));
        rule.check(&blocks[0], &ctx)
    }

    #[test]
    fn reports_each_attribute_once() {
        let rule = FontStyleRule::new("FONT-001")
            .description("Title font")
            .font_name("黑体", vec![])
            .size_half_points(44)
            .bold(true);
        let paragraph = Paragraph::new("x")
            .with_run(run("宋体", 32, Some(false)))
            .with_run(run("楷体", 30, None));

        let issues = check(&rule, paragraph);
        let summary: Vec<_> = issues.iter().map(|i| (i.severity, i.message.as_str())).collect();
        insta::assert_debug_snapshot!(summary, @r###"
        [
            (
                Warn,
                "Title font: expected font '黑体', found '宋体'",
            ),
            (
                Warn,
                "Title font: expected font size 22pt, found 16pt",
            ),
            (
                Info,
                "Title font: expected bold",
            ),
        ]
        "###);
    }

    #[test]
    fn alternatives_and_tolerance_are_accepted() {
        let rule = FontStyleRule::new("FONT-002")
            .font_name("宋体", vec!["Times New Roman".to_string()])
            .size_half_points(24);
        let western = Run::new(
            "abc",
            Font {
                name: Some("Times New Roman".to_string()),
                size: Some(25),
                ..Font::default()
            },
        );
        assert!(check(&rule, Paragraph::new("x").with_run(western)).is_empty());
    }

    #[test]
    fn targets_limit_blocks() {
        let rule = FontStyleRule::new("FONT-003").targets(Targets::new().with_styles(["Heading 1"]));
        let blocks = vec![Block::paragraph(0, Paragraph::new("x").with_style("Normal"))];
        assert!(!rule.applies_to(&blocks[0], &Context::new(&blocks)));
    }

    #[test]
    fn builds_from_spec() {
        let spec = RuleSpec::new(KIND)
            .with_id("HDG1_FONT-001")
            .with_option("target_styles", vec!["Heading 1".to_string()])
            .with_option("font_size", "三号");
        let rule = build(&spec).unwrap();
        assert_eq!(rule.id(), "HDG1_FONT-001");
        assert_eq!(rule.kind(), KIND);

        let bad = RuleSpec::new(KIND).with_option("font_size", "huge");
        assert!(matches!(build(&bad), Err(RuleBuildError::Invalid { .. })));
    }
}
