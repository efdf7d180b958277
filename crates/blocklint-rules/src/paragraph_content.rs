//! Rule checking the text of paragraphs at fixed positions.
//!
//! # Configuration
//!
//! - `target_blocks`: block indices to check (required)
//! - `required`: the paragraph must not be empty (default: true)
//! - `min_length`, `max_length`: character count bounds

use crate::common::{self, prefixed, trimmed, truncate};
use crate::error::RuleBuildError;
use blocklint_core::{Block, Context, Issue, Location, Rule, RuleBox, RuleSpec, Severity};
use serde::Deserialize;
use serde_json::json;

/// Registry key for paragraph-content.
pub const KIND: &str = "paragraph-content";

const CONTENT_HINT_LEN: usize = 30;

/// Checks presence and length of paragraph text at the listed indices.
#[derive(Debug, Clone)]
pub struct ParagraphContentRule {
    id: String,
    description: String,
    target_blocks: Vec<u32>,
    required: bool,
    min_length: usize,
    max_length: Option<usize>,
}

impl ParagraphContentRule {
    /// Creates a rule for the given block indices.
    #[must_use]
    pub fn new(id: impl Into<String>, target_blocks: Vec<u32>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            target_blocks,
            required: true,
            min_length: 0,
            max_length: None,
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets whether empty paragraphs are errors.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the length bounds, in characters.
    #[must_use]
    pub fn length(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }
}

impl Rule for ParagraphContentRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn description(&self) -> &'static str {
        "Checks paragraph text is present and within length bounds"
    }

    fn applies_to(&self, block: &Block, _ctx: &Context<'_>) -> bool {
        block.as_paragraph().is_some() && self.target_blocks.contains(&block.index())
    }

    fn check(&self, block: &Block, _ctx: &Context<'_>) -> Vec<Issue> {
        let Some(paragraph) = block.as_paragraph() else {
            return Vec::new();
        };
        let text = trimmed(paragraph);
        let index = block.index();

        if text.is_empty() {
            if !self.required {
                return Vec::new();
            }
            return vec![Issue::new(
                &self.id,
                Severity::Error,
                prefixed(&self.description, "paragraph must not be empty"),
                Location::new(i64::from(index), "paragraph", format!("(block {index})")),
            )];
        }

        let length = text.chars().count();
        let location = || Location::new(i64::from(index), "paragraph", truncate(text, CONTENT_HINT_LEN));
        let mut issues = Vec::new();

        if length < self.min_length {
            issues.push(
                Issue::new(
                    &self.id,
                    Severity::Warn,
                    prefixed(
                        &self.description,
                        format!("too short ({length} characters, at least {})", self.min_length),
                    ),
                    location(),
                )
                .with_evidence(json!({ "actual_length": length, "min_length": self.min_length })),
            );
        }
        if let Some(max) = self.max_length.filter(|max| length > *max) {
            issues.push(
                Issue::new(
                    &self.id,
                    Severity::Warn,
                    prefixed(
                        &self.description,
                        format!("too long ({length} characters, at most {max})"),
                    ),
                    location(),
                )
                .with_evidence(json!({ "actual_length": length, "max_length": max })),
            );
        }
        issues
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    target_blocks: Vec<u32>,
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default)]
    min_length: usize,
    #[serde(default)]
    max_length: Option<usize>,
}

fn default_true() -> bool {
    true
}

pub(crate) fn build(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;
    Ok(Box::new(
        ParagraphContentRule::new(&id, p.target_blocks)
            .description(spec.description.clone().unwrap_or_default())
            .required(p.required)
            .length(p.min_length, p.max_length),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::Paragraph;

    fn run(rule: &ParagraphContentRule, texts: &[&str]) -> Vec<Issue> {
        let blocks: Vec<Block> = texts
            .iter()
            .zip(0u32..)
            .map(|(t, i)| Block::paragraph(i, Paragraph::new(*t)))
            .collect();
        let ctx = Context::new(&blocks);
        blocks
            .iter()
            .filter(|b| rule.applies_to(b, &ctx))
            .flat_map(|b| rule.check(b, &ctx))
            .collect()
    }

    #[test]
    fn empty_required_paragraph_is_error() {
        let rule = ParagraphContentRule::new("CONTENT-001", vec![1]).description("Abstract");
        let issues = run(&rule, &["Title", "   ", ""]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].message, "Abstract: paragraph must not be empty");
        assert_eq!(issues[0].location.hint, "(block 1)");
    }

    #[test]
    fn optional_empty_paragraph_passes() {
        let rule = ParagraphContentRule::new("CONTENT-002", vec![0]).required(false);
        assert!(run(&rule, &[""]).is_empty());
    }

    #[test]
    fn length_bounds_count_characters() {
        let rule = ParagraphContentRule::new("CONTENT-003", vec![0, 1]).length(3, Some(4));
        let issues = run(&rule, &["摘要", "文档检查方法"]);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].evidence_value("actual_length"), Some(&json!(2)));
        assert_eq!(issues[0].evidence_value("min_length"), Some(&json!(3)));
        assert_eq!(issues[1].evidence_value("max_length"), Some(&json!(4)));
    }

    #[test]
    fn target_blocks_are_required() {
        assert!(matches!(
            build(&RuleSpec::new(KIND)),
            Err(RuleBuildError::Params { .. })
        ));
    }
}
