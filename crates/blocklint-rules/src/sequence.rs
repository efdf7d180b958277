//! Rule checking that heading numbers at each level form a sequence.
//!
//! Unlike `heading-numbering`, levels come from the position of the style
//! in `heading_styles` and counters never reset, which suits documents that
//! number chapters only.
//!
//! # Configuration
//!
//! - `heading_styles`: level 1, 2, ... styles (default: `Heading 1..3`)
//! - `numbering_pattern`: start-anchored, group 1 is the number (default: `(\d+)`)
//! - `numbering_levels`: levels to check (default: `[1, 2, 3]`)
//! - `start_from`: first expected number (default: 1)
//! - `allow_skips`: accept gaps, report only repeats and regressions
//! - `check_continuity`: set to false to disable the rule

use crate::common::{self, prefixed, truncate};
use crate::error::RuleBuildError;
use blocklint_core::{
    AnchoredPattern, Block, Context, FinalizeRule, Issue, Location, Rule, RuleBox, RuleSpec,
    Severity, HINT_LEN,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Registry key for sequence.
pub const KIND: &str = "sequence";

const DEFAULT_PATTERN: &str = r"(\d+)";

/// Checks consecutive numbering of headings, level by level.
#[derive(Debug, Clone)]
pub struct SequenceRule {
    id: String,
    description: String,
    heading_styles: Vec<String>,
    pattern: AnchoredPattern,
    levels: Vec<u32>,
    start_from: u32,
    allow_skips: bool,
}

impl SequenceRule {
    /// Creates a rule over `heading_styles`, where the first style is level 1.
    ///
    /// # Errors
    ///
    /// Returns [`blocklint_core::PatternError`] if `pattern` does not compile.
    pub fn new(
        id: impl Into<String>,
        heading_styles: Vec<String>,
        pattern: &str,
    ) -> Result<Self, blocklint_core::PatternError> {
        Ok(Self {
            id: id.into(),
            description: String::new(),
            heading_styles,
            pattern: AnchoredPattern::new(pattern)?,
            levels: vec![1, 2, 3],
            start_from: 1,
            allow_skips: false,
        })
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the levels to check.
    #[must_use]
    pub fn levels(mut self, levels: Vec<u32>) -> Self {
        self.levels = levels;
        self
    }

    /// Sets the first expected number.
    #[must_use]
    pub fn start_from(mut self, start: u32) -> Self {
        self.start_from = start;
        self
    }

    /// Accepts gaps in the numbering.
    #[must_use]
    pub fn allow_skips(mut self, allow: bool) -> Self {
        self.allow_skips = allow;
        self
    }

    fn level_of(&self, block: &Block) -> Option<u32> {
        let style = block.as_paragraph()?.style_name();
        let position = self.heading_styles.iter().position(|s| s == style)?;
        let level = u32::try_from(position + 1).ok()?;
        self.levels.contains(&level).then_some(level)
    }
}

impl Rule for SequenceRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn description(&self) -> &'static str {
        "Checks heading numbers form a sequence per style level"
    }

    fn applies_to(&self, _block: &Block, _ctx: &Context<'_>) -> bool {
        false
    }

    fn check(&self, _block: &Block, _ctx: &Context<'_>) -> Vec<Issue> {
        Vec::new()
    }

    fn as_finalize(&self) -> Option<&dyn FinalizeRule> {
        Some(self)
    }
}

impl FinalizeRule for SequenceRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let mut by_level: BTreeMap<u32, Vec<(&Block, &str, u32)>> = BTreeMap::new();
        for (block, paragraph) in ctx.paragraphs() {
            let Some(level) = self.level_of(block) else {
                continue;
            };
            let text = paragraph.text.trim();
            let Some(number) = self.pattern.first_group(text).and_then(|g| g.parse().ok()) else {
                continue;
            };
            by_level.entry(level).or_default().push((block, text, number));
        }

        let mut issues = Vec::new();
        for (level, headings) in &by_level {
            let mut expected = self.start_from;
            for &(block, text, number) in headings {
                let reported = if self.allow_skips {
                    number < expected
                } else {
                    number != expected
                };
                if reported {
                    issues.push(
                        Issue::new(
                            &self.id,
                            Severity::Error,
                            prefixed(
                                &self.description,
                                format!("level {level} number should be {expected}, found {number}"),
                            ),
                            Location::new(i64::from(block.index()), "heading", truncate(text, HINT_LEN)),
                        )
                        .with_evidence(json!({ "expected": expected, "actual": number, "level": level })),
                    );
                }
                expected = number.saturating_add(1);
            }
        }
        // Report in document order, not level order.
        issues.sort_by_key(|i| i.location.block_index);
        issues
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    #[serde(default = "default_heading_styles")]
    heading_styles: Vec<String>,
    #[serde(default = "default_pattern")]
    numbering_pattern: String,
    #[serde(default = "default_levels")]
    numbering_levels: Vec<u32>,
    #[serde(default = "default_start")]
    start_from: u32,
    #[serde(default)]
    allow_skips: bool,
    #[serde(default = "default_true")]
    check_continuity: bool,
}

fn default_heading_styles() -> Vec<String> {
    ["Heading 1", "Heading 2", "Heading 3"]
        .map(String::from)
        .to_vec()
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_levels() -> Vec<u32> {
    vec![1, 2, 3]
}

fn default_start() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

pub(crate) fn build(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;
    let levels = if p.check_continuity {
        p.numbering_levels
    } else {
        Vec::new()
    };
    let rule = SequenceRule::new(&id, p.heading_styles, &p.numbering_pattern)
        .map_err(|e| RuleBuildError::pattern(&id, "numbering_pattern", e))?
        .description(spec.description.clone().unwrap_or_default())
        .levels(levels)
        .start_from(p.start_from)
        .allow_skips(p.allow_skips);
    Ok(Box::new(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::Paragraph;

    fn chapters(texts: &[&str]) -> Vec<Block> {
        texts
            .iter()
            .zip(0u32..)
            .map(|(t, i)| {
                let style = if t.contains('.') { "Heading 2" } else { "Heading 1" };
                Block::paragraph(i, Paragraph::new(*t).with_style(style))
            })
            .collect()
    }

    fn finalize(rule: &SequenceRule, blocks: &[Block]) -> Vec<Issue> {
        rule.finalize(&Context::new(blocks))
    }

    fn rule() -> SequenceRule {
        SequenceRule::new("SEQ-001", default_heading_styles(), DEFAULT_PATTERN).unwrap()
    }

    #[test]
    fn gap_is_reported_once() {
        let issues = finalize(&rule(), &chapters(&["1 引言", "2 方法", "4 结论", "5 展望"]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location.block_index, 2);
        assert_eq!(issues[0].location.kind, "heading");
        assert_eq!(issues[0].evidence_value("expected"), Some(&json!(3)));
    }

    #[test]
    fn start_from_and_skips() {
        let blocks = chapters(&["0 概述", "1 引言", "3 方法", "2 结果"]);
        let strict = finalize(&rule().start_from(0), &blocks);
        assert_eq!(strict.len(), 2);

        let lenient = finalize(&rule().start_from(0).allow_skips(true), &blocks);
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].evidence_value("actual"), Some(&json!(2)));
    }

    #[test]
    fn unlisted_levels_are_ignored() {
        let blocks = chapters(&["1 引言", "1.1 背景", "1.5 目标"]);
        assert_eq!(finalize(&rule(), &blocks).len(), 1);
        assert!(finalize(&rule().levels(vec![1]), &blocks).is_empty());
    }

    #[test]
    fn disabled_rule_reports_nothing() {
        let spec = RuleSpec::new(KIND).with_option("check_continuity", false);
        let rule = build(&spec).unwrap();
        let blocks = chapters(&["2 方法"]);
        let ctx = Context::new(&blocks);
        assert!(rule.as_finalize().unwrap().finalize(&ctx).is_empty());
    }
}
