//! Rule checking how many blocks of a kind the document has.
//!
//! # Configuration
//!
//! - `target_type`: `paragraph` (default), `table` or `heading`
//! - `pattern`: only count paragraphs whose trimmed text contains a match
//! - `target_styles`: only count paragraphs with these styles
//! - `exact_count`, `min_count`, `max_count`: bounds; the first one set and
//!   violated, in this order, is reported

use crate::common::{self, prefixed};
use crate::error::RuleBuildError;
use blocklint_core::{
    Block, Context, FinalizeRule, Issue, Location, Rule, RuleBox, RuleSpec, Severity,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

/// Registry key for counting.
pub const KIND: &str = "counting";

/// What is counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Paragraph blocks.
    #[default]
    Paragraph,
    /// Table blocks.
    Table,
    /// Paragraphs with a heading style.
    Heading,
}

impl TargetType {
    fn accepts(self, block: &Block) -> bool {
        match self {
            Self::Paragraph => block.as_paragraph().is_some(),
            Self::Table => block.as_table().is_some(),
            Self::Heading => Context::is_heading(block),
        }
    }
}

/// Count bounds. Exact and minimum violations are errors, maximum
/// violations are warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountBounds {
    /// Required count.
    pub exact: Option<usize>,
    /// Lowest accepted count.
    pub min: Option<usize>,
    /// Highest accepted count.
    pub max: Option<usize>,
}

/// Counts matching blocks over the whole document.
#[derive(Debug, Clone)]
pub struct CountingRule {
    id: String,
    description: String,
    target: TargetType,
    pattern: Option<Regex>,
    styles: Vec<String>,
    bounds: CountBounds,
}

impl CountingRule {
    /// Creates a rule counting `target` blocks.
    #[must_use]
    pub fn new(id: impl Into<String>, target: TargetType, bounds: CountBounds) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            target,
            pattern: None,
            styles: Vec::new(),
            bounds,
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Only counts paragraphs containing a match of `pattern`.
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Only counts paragraphs with one of these styles.
    #[must_use]
    pub fn styles(mut self, styles: Vec<String>) -> Self {
        self.styles = styles;
        self
    }

    fn counts(&self, block: &Block) -> bool {
        if !self.target.accepts(block) {
            return false;
        }
        // Style and pattern filters never exclude tables.
        let Some(paragraph) = block.as_paragraph() else {
            return true;
        };
        if !self.styles.is_empty() && !self.styles.iter().any(|s| s == paragraph.style_name()) {
            return false;
        }
        self.pattern
            .as_ref()
            .map_or(true, |re| re.is_match(paragraph.text.trim()))
    }

    fn issue(&self, severity: Severity, message: String, evidence: serde_json::Value) -> Issue {
        Issue::new(
            &self.id,
            severity,
            prefixed(&self.description, message),
            Location::document("(document)"),
        )
        .with_evidence(evidence)
    }
}

impl Rule for CountingRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn description(&self) -> &'static str {
        "Checks the number of paragraphs, tables or headings"
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

impl FinalizeRule for CountingRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let count = ctx.blocks.iter().filter(|b| self.counts(b)).count();
        let CountBounds { exact, min, max } = self.bounds;

        let issue = if let Some(expected) = exact.filter(|e| count != *e) {
            self.issue(
                Severity::Error,
                format!("expected {expected}, found {count}"),
                json!({ "expected": expected, "actual": count }),
            )
        } else if let Some(min) = min.filter(|m| count < *m) {
            self.issue(
                Severity::Error,
                format!("expected at least {min}, found {count}"),
                json!({ "min": min, "actual": count }),
            )
        } else if let Some(max) = max.filter(|m| count > *m) {
            self.issue(
                Severity::Warn,
                format!("expected at most {max}, found {count}"),
                json!({ "max": max, "actual": count }),
            )
        } else {
            return Vec::new();
        };
        vec![issue]
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    #[serde(default)]
    target_type: TargetType,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    target_styles: Vec<String>,
    #[serde(default)]
    exact_count: Option<usize>,
    #[serde(default)]
    min_count: Option<usize>,
    #[serde(default)]
    max_count: Option<usize>,
}

pub(crate) fn build(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;
    if let (Some(min), Some(max)) = (p.min_count, p.max_count) {
        if min > max {
            return Err(RuleBuildError::invalid(
                &id,
                format!("min_count {min} is greater than max_count {max}"),
            ));
        }
    }

    let bounds = CountBounds {
        exact: p.exact_count,
        min: p.min_count,
        max: p.max_count,
    };
    let mut rule = CountingRule::new(&id, p.target_type, bounds)
        .description(spec.description.clone().unwrap_or_default())
        .styles(p.target_styles);
    if let Some(pattern) = p.pattern {
        rule = rule.pattern(common::unanchored(&id, "pattern", &pattern)?);
    }
    Ok(Box::new(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::{Paragraph, Table};

    fn document() -> Vec<Block> {
        vec![
            Block::paragraph(0, Paragraph::new("1 引言").with_style("Heading 1")),
            Block::paragraph(1, Paragraph::new("见表 1。")),
            Block::table(2, Table::new(vec![vec!["a".into()]])),
            Block::paragraph(3, Paragraph::new("2 方法").with_style("Heading 1")),
            Block::paragraph(4, Paragraph::new("见表 2。")),
        ]
    }

    fn finalize(rule: &CountingRule) -> Vec<Issue> {
        let blocks = document();
        rule.finalize(&Context::new(&blocks))
    }

    fn bounds(exact: Option<usize>, min: Option<usize>, max: Option<usize>) -> CountBounds {
        CountBounds { exact, min, max }
    }

    #[test]
    fn counts_each_target_type() {
        let exact = |t, n| CountingRule::new("C", t, bounds(Some(n), None, None));
        assert!(finalize(&exact(TargetType::Paragraph, 4)).is_empty());
        assert!(finalize(&exact(TargetType::Table, 1)).is_empty());
        assert!(finalize(&exact(TargetType::Heading, 2)).is_empty());
    }

    #[test]
    fn pattern_and_styles_filter_paragraphs() {
        let refs = CountingRule::new("C", TargetType::Paragraph, bounds(Some(2), None, None))
            .pattern(Regex::new("见表").unwrap());
        assert!(finalize(&refs).is_empty());

        let normal = CountingRule::new("C", TargetType::Paragraph, bounds(None, Some(3), None))
            .styles(vec!["Normal".to_string()]);
        let issues = finalize(&normal);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].evidence_value("min"), Some(&json!(3)));
        assert_eq!(issues[0].evidence_value("actual"), Some(&json!(2)));
    }

    #[test]
    fn exact_takes_precedence_and_max_warns() {
        let both = CountingRule::new("C", TargetType::Table, bounds(Some(2), Some(5), None))
            .description("Tables");
        let issues = finalize(&both);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Tables: expected 2, found 1");
        assert!(issues[0].location.is_document());

        let max = CountingRule::new("C", TargetType::Heading, bounds(None, None, Some(1)));
        assert_eq!(finalize(&max)[0].severity, Severity::Warn);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let spec = RuleSpec::new(KIND)
            .with_option("min_count", 3)
            .with_option("max_count", 1);
        assert!(matches!(build(&spec), Err(RuleBuildError::Invalid { .. })));
    }
}
