//! Rules checking numbered headings.
//!
//! Both rules read the level from the heading style name (`"Heading 2"` → 2)
//! and extract the number with the pattern configured for that level. The
//! first capture group is the numbering (`"2.3"`), parsed into `[2, 3]`.
//! Headings without a pattern for their level, or whose text does not
//! match, are skipped.
//!
//! # Configuration
//!
//! - `numbering_patterns`: one start-anchored pattern per level
//! - `heading_styles`: only consider these styles (default: all headings)
//! - `report_regressions` (`heading-numbering` only): also warn when a
//!   number repeats or goes backwards

use crate::common::{self, prefixed, truncate};
use crate::error::RuleBuildError;
use blocklint_core::{
    style_level, AnchoredPattern, Block, Context, FinalizeRule, Issue, Location, Rule, RuleBox,
    RuleSpec, Severity, HINT_LEN,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Registry key for heading-numbering.
pub const NUMBERING_KIND: &str = "heading-numbering";
/// Registry key for heading-hierarchy.
pub const HIERARCHY_KIND: &str = "heading-hierarchy";

const PARENT_HINT_LEN: usize = 30;

/// Patterns used when none are configured: `1`, `1.1`, `1.1.1`.
pub const DEFAULT_NUMBERING_PATTERNS: [&str; 3] = [
    r"(\d+)(?:\s|$)",
    r"(\d+\.\d+)(?:\s|$)",
    r"(\d+\.\d+\.\d+)(?:\s|$)",
];

// ────────────────────────────────────────────
// Heading scan
// ────────────────────────────────────────────

/// A heading whose text carries a parsable number.
#[derive(Debug, Clone)]
struct NumberedHeading<'a> {
    block: &'a Block,
    text: &'a str,
    level: u32,
    numbering: &'a str,
    nums: Vec<u32>,
}

/// How headings and their numbers are recognized.
#[derive(Debug, Clone)]
pub struct HeadingNumbers {
    patterns: Vec<AnchoredPattern>,
    styles: Vec<String>,
}

impl HeadingNumbers {
    /// Uses one pattern per level; `patterns[0]` is level 1.
    #[must_use]
    pub fn new(patterns: Vec<AnchoredPattern>) -> Self {
        Self {
            patterns,
            styles: Vec::new(),
        }
    }

    /// Restricts to headings with one of these styles.
    #[must_use]
    pub fn with_styles(mut self, styles: Vec<String>) -> Self {
        self.styles = styles;
        self
    }

    fn scan<'a>(&self, ctx: &Context<'a>) -> Vec<NumberedHeading<'a>> {
        ctx.paragraphs()
            .filter(|(block, _)| Context::is_heading(block))
            .filter_map(|(block, paragraph)| {
                let style = paragraph.style_name().trim();
                if !self.styles.is_empty() && !self.styles.iter().any(|s| s == style) {
                    return None;
                }
                let level = style_level(style)?;
                let pattern = self.patterns.get(usize::try_from(level).ok()?.checked_sub(1)?)?;
                let text = paragraph.text.trim();
                let numbering = pattern.first_group(text)?;
                let nums = parse_numbering(numbering);
                (!nums.is_empty()).then_some(NumberedHeading {
                    block,
                    text,
                    level,
                    numbering,
                    nums,
                })
            })
            .collect()
    }
}

impl Default for HeadingNumbers {
    fn default() -> Self {
        let patterns = DEFAULT_NUMBERING_PATTERNS
            .iter()
            .filter_map(|p| AnchoredPattern::new(p).ok())
            .collect();
        Self::new(patterns)
    }
}

/// `"1.2.3."` → `[1, 2, 3]`; empty when any part is not a number.
fn parse_numbering(numbering: &str) -> Vec<u32> {
    numbering
        .trim_end_matches('.')
        .split('.')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .unwrap_or_default()
}

fn heading_location(heading: &NumberedHeading<'_>) -> Location {
    Location::new(
        i64::from(heading.block.index()),
        "paragraph",
        truncate(heading.text, HINT_LEN),
    )
}

// ────────────────────────────────────────────
// heading-numbering
// ────────────────────────────────────────────

/// Checks that numbers at each level count up by one.
///
/// Counters of deeper levels reset whenever a heading is seen, so `2.1`
/// after `1.3` is expected.
#[derive(Debug, Clone)]
pub struct HeadingNumberingRule {
    id: String,
    description: String,
    numbers: HeadingNumbers,
    report_regressions: bool,
}

impl HeadingNumberingRule {
    /// Creates a rule with the default numbering patterns.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            numbers: HeadingNumbers::default(),
            report_regressions: false,
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the heading recognition.
    #[must_use]
    pub fn numbers(mut self, numbers: HeadingNumbers) -> Self {
        self.numbers = numbers;
        self
    }

    /// Also warns on repeated or decreasing numbers.
    #[must_use]
    pub fn report_regressions(mut self, report: bool) -> Self {
        self.report_regressions = report;
        self
    }
}

impl Rule for HeadingNumberingRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        NUMBERING_KIND
    }

    fn description(&self) -> &'static str {
        "Checks heading numbers are consecutive per level"
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

impl FinalizeRule for HeadingNumberingRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let mut counters: BTreeMap<u32, u32> = BTreeMap::new();
        let mut issues = Vec::new();

        for heading in self.numbers.scan(ctx) {
            let level = heading.level;
            let expected = counters.get(&level).copied().unwrap_or(0).saturating_add(1);
            let actual = heading.nums.last().copied().unwrap_or(0);

            let severity = if actual > expected {
                Some(Severity::Error)
            } else if actual < expected && self.report_regressions {
                Some(Severity::Warn)
            } else {
                None
            };
            if let Some(severity) = severity {
                issues.push(
                    Issue::new(
                        &self.id,
                        severity,
                        prefixed(
                            &self.description,
                            format!("level {level} heading number should be {expected}, found {actual}"),
                        ),
                        heading_location(&heading),
                    )
                    .with_evidence(json!({ "expected": expected, "actual": actual, "level": level })),
                );
            }

            counters.insert(level, actual);
            counters.retain(|l, _| *l <= level);
        }
        issues
    }
}

// ────────────────────────────────────────────
// heading-hierarchy
// ────────────────────────────────────────────

/// Checks that multi-part numbers start with their parent's number
/// (`2.3.1` under `2.3`, not under `2.4`).
#[derive(Debug, Clone)]
pub struct HeadingHierarchyRule {
    id: String,
    description: String,
    numbers: HeadingNumbers,
}

impl HeadingHierarchyRule {
    /// Creates a rule with the default numbering patterns.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            numbers: HeadingNumbers::default(),
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the heading recognition.
    #[must_use]
    pub fn numbers(mut self, numbers: HeadingNumbers) -> Self {
        self.numbers = numbers;
        self
    }
}

impl Rule for HeadingHierarchyRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        HIERARCHY_KIND
    }

    fn description(&self) -> &'static str {
        "Checks sub-heading numbers extend their parent's number"
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

impl FinalizeRule for HeadingHierarchyRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let mut stack: Vec<NumberedHeading<'_>> = Vec::new();
        let mut issues = Vec::new();

        for heading in self.numbers.scan(ctx) {
            while stack.last().is_some_and(|top| top.level >= heading.level) {
                stack.pop();
            }

            let parent = (heading.nums.len() > 1)
                .then(|| {
                    stack
                        .iter()
                        .rev()
                        .find(|p| p.level.checked_add(1) == Some(heading.level))
                })
                .flatten();
            if let Some(parent) = parent {
                let prefix_len = parent.nums.len().min(heading.nums.len());
                let actual_prefix = &heading.nums[..prefix_len];
                if actual_prefix != parent.nums.as_slice() {
                    let expected_prefix = join(&parent.nums);
                    issues.push(
                        Issue::new(
                            &self.id,
                            Severity::Error,
                            prefixed(
                                &self.description,
                                format!(
                                    "heading number '{}' should start with '{expected_prefix}'",
                                    heading.numbering
                                ),
                            ),
                            heading_location(&heading),
                        )
                        .with_evidence(json!({
                            "actual_numbering": heading.numbering,
                            "expected_prefix": expected_prefix,
                            "actual_prefix": join(actual_prefix),
                            "parent_numbering": parent.numbering,
                            "parent_text": truncate(parent.text, PARENT_HINT_LEN),
                        })),
                    );
                }
            }

            stack.push(heading);
        }
        issues
    }
}

fn join(nums: &[u32]) -> String {
    nums.iter().map(u32::to_string).collect::<Vec<_>>().join(".")
}

// ────────────────────────────────────────────
// Construction
// ────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    #[serde(default)]
    numbering_patterns: Vec<String>,
    #[serde(default)]
    heading_styles: Vec<String>,
    #[serde(default)]
    report_regressions: bool,
}

fn numbers(id: &str, p: &Params) -> Result<HeadingNumbers, RuleBuildError> {
    if p.numbering_patterns.is_empty() {
        return Ok(HeadingNumbers::default().with_styles(p.heading_styles.clone()));
    }
    let patterns = p
        .numbering_patterns
        .iter()
        .map(|pattern| common::anchored(id, "numbering_patterns", pattern))
        .collect::<Result<_, _>>()?;
    Ok(HeadingNumbers::new(patterns).with_styles(p.heading_styles.clone()))
}

pub(crate) fn build_numbering(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;
    Ok(Box::new(
        HeadingNumberingRule::new(&id)
            .description(spec.description.clone().unwrap_or_default())
            .numbers(numbers(&id, &p)?)
            .report_regressions(p.report_regressions),
    ))
}

pub(crate) fn build_hierarchy(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;
    if p.report_regressions {
        return Err(RuleBuildError::invalid(
            &id,
            "`report_regressions` only applies to heading-numbering",
        ));
    }
    Ok(Box::new(
        HeadingHierarchyRule::new(&id)
            .description(spec.description.clone().unwrap_or_default())
            .numbers(numbers(&id, &p)?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::Paragraph;

    fn headings(items: &[(&str, &str)]) -> Vec<Block> {
        items
            .iter()
            .zip(0u32..)
            .map(|((style, text), i)| Block::paragraph(i, Paragraph::new(*text).with_style(*style)))
            .collect()
    }

    fn finalize(rule: &dyn Rule, blocks: &[Block]) -> Vec<Issue> {
        let ctx = Context::new(blocks);
        rule.as_finalize().map(|f| f.finalize(&ctx)).unwrap_or_default()
    }

    #[test]
    fn parses_numbering() {
        assert_eq!(parse_numbering("1.2.3"), vec![1, 2, 3]);
        assert_eq!(parse_numbering("4."), vec![4]);
        assert!(parse_numbering("A.1").is_empty());
    }

    #[test]
    fn skipped_number_is_one_error() {
        let blocks = headings(&[
            ("Heading 1", "1 引言"),
            ("Normal", "正文"),
            ("Heading 1", "2 方法"),
            ("Heading 1", "4 结论"),
        ]);
        let issues = finalize(&HeadingNumberingRule::new("HDG_SEQ-001"), &blocks);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].location.block_index, 3);
        assert_eq!(issues[0].evidence_value("expected"), Some(&json!(3)));
        assert_eq!(issues[0].evidence_value("actual"), Some(&json!(4)));
        assert_eq!(issues[0].evidence_value("level"), Some(&json!(1)));
    }

    #[test]
    fn deeper_counters_reset() {
        let blocks = headings(&[
            ("Heading 1", "1 引言"),
            ("Heading 2", "1.1 背景"),
            ("Heading 2", "1.2 目标"),
            ("Heading 1", "2 方法"),
            ("Heading 2", "2.1 数据"),
        ]);
        assert!(finalize(&HeadingNumberingRule::new("HDG_SEQ-001"), &blocks).is_empty());
    }

    #[test]
    fn regressions_only_when_enabled() {
        let blocks = headings(&[("Heading 1", "1 引言"), ("Heading 1", "1 重复")]);
        assert!(finalize(&HeadingNumberingRule::new("A"), &blocks).is_empty());

        let issues = finalize(&HeadingNumberingRule::new("A").report_regressions(true), &blocks);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warn);
    }

    #[test]
    fn largest_heading_number_does_not_overflow() {
        let blocks = headings(&[
            ("Heading 1", "4294967295 引言"),
            ("Heading 1", "4294967295 重复"),
        ]);
        let issues = finalize(&HeadingNumberingRule::new("A").report_regressions(true), &blocks);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location.block_index, 0);
        assert_eq!(issues[0].evidence_value("actual"), Some(&json!(u32::MAX)));
    }

    #[test]
    fn unnumbered_headings_are_skipped() {
        let blocks = headings(&[
            ("Heading 1", "前言"),
            ("Heading 1", "1 引言"),
            ("Heading 1", "参考文献"),
        ]);
        assert!(finalize(&HeadingNumberingRule::new("A"), &blocks).is_empty());
    }

    #[test]
    fn hierarchy_checks_parent_prefix() {
        let blocks = headings(&[
            ("Heading 1", "2 方法"),
            ("Heading 2", "2.1 数据"),
            ("Heading 3", "2.2.1 采样"),
        ]);
        let issues = finalize(&HeadingHierarchyRule::new("HDG_HIER-002"), &blocks);
        assert_eq!(issues.len(), 1);
        let evidence = issues[0].evidence.clone().unwrap();
        insta::assert_json_snapshot!(evidence, @r###"
        {
          "actual_numbering": "2.2.1",
          "actual_prefix": "2.2",
          "expected_prefix": "2.1",
          "parent_numbering": "2.1",
          "parent_text": "2.1 数据"
        }
        "###);
    }

    #[test]
    fn hierarchy_without_parent_passes() {
        let blocks = headings(&[("Heading 2", "3.1 孤立")]);
        assert!(finalize(&HeadingHierarchyRule::new("A"), &blocks).is_empty());
    }

    #[test]
    fn builds_with_custom_patterns() {
        let spec = RuleSpec::new(NUMBERING_KIND)
            .with_option("numbering_patterns", vec![r"第(\d+)章".to_string()]);
        let rule = build_numbering(&spec).unwrap();
        let blocks = headings(&[("Heading 1", "第1章 绪论"), ("Heading 1", "第3章 方法")]);
        assert_eq!(finalize(rule.as_ref(), &blocks).len(), 1);

        let bad = RuleSpec::new(HIERARCHY_KIND).with_option("numbering_patterns", vec!["(".to_string()]);
        assert!(matches!(build_hierarchy(&bad), Err(RuleBuildError::Pattern { .. })));
    }
}
