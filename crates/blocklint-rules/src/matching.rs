//! Rule checking paragraph text against a regular expression.
//!
//! # Configuration
//!
//! - `pattern`: regular expression (required)
//! - `match_type`: `contains` (default), `full`, `starts` or `ends`
//! - `target_styles`: paragraph styles to check (default: all)
//! - `case_sensitive`: default true
//! - `negate`: report matches instead of non-matches

use crate::common::{self, prefixed, trimmed, Targets};
use crate::error::RuleBuildError;
use blocklint_core::{Block, Context, Issue, Location, PatternError, Rule, RuleBox, RuleSpec, Severity};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// Registry key for matching.
pub const KIND: &str = "matching";

/// Where the pattern has to match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Anywhere in the text.
    #[default]
    Contains,
    /// The whole text.
    Full,
    /// At the start.
    Starts,
    /// At the end.
    Ends,
}

impl MatchType {
    fn wrap(self, pattern: &str) -> String {
        match self {
            Self::Contains => pattern.to_string(),
            Self::Full => format!("^(?:{pattern})$"),
            Self::Starts => format!("^(?:{pattern})"),
            Self::Ends => format!("(?:{pattern})$"),
        }
    }
}

/// Reports paragraphs that do not match (or, negated, that do match).
#[derive(Debug, Clone)]
pub struct MatchingRule {
    id: String,
    description: String,
    pattern: String,
    regex: Regex,
    targets: Targets,
    negate: bool,
}

impl MatchingRule {
    /// Creates a rule.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the pattern does not compile.
    pub fn new(
        id: impl Into<String>,
        pattern: &str,
        match_type: MatchType,
        case_sensitive: bool,
    ) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(&match_type.wrap(pattern))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            id: id.into(),
            description: String::new(),
            pattern: pattern.to_string(),
            regex,
            targets: Targets::new(),
            negate: false,
        })
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

    /// Reports matches instead of non-matches.
    #[must_use]
    pub fn negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }
}

impl Rule for MatchingRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn description(&self) -> &'static str {
        "Checks paragraph text against a regular expression"
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
        let matched = self.regex.is_match(trimmed(paragraph));
        if matched != self.negate {
            return Vec::new();
        }

        let message = if self.negate {
            format!("must not match pattern '{}'", self.pattern)
        } else {
            format!("should match pattern '{}'", self.pattern)
        };
        vec![Issue::new(
            &self.id,
            Severity::Warn,
            prefixed(&self.description, message),
            Location::of_block(block),
        )]
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    pattern: String,
    #[serde(default)]
    match_type: MatchType,
    #[serde(default)]
    target_styles: Vec<String>,
    #[serde(default = "default_true")]
    case_sensitive: bool,
    #[serde(default)]
    negate: bool,
}

fn default_true() -> bool {
    true
}

pub(crate) fn build(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;
    let rule = MatchingRule::new(&id, &p.pattern, p.match_type, p.case_sensitive)
        .map_err(|e| RuleBuildError::pattern(&id, "pattern", e))?
        .description(spec.description.clone().unwrap_or_default())
        .targets(Targets::new().with_styles(p.target_styles))
        .negate(p.negate);
    Ok(Box::new(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::Paragraph;

    fn reported(rule: &MatchingRule, text: &str) -> bool {
        let blocks = vec![Block::paragraph(0, Paragraph::new(text))];
        !rule.check(&blocks[0], &Context::new(&blocks)).is_empty()
    }

    #[test]
    fn match_types() {
        let rule = |t| MatchingRule::new("M", "abc", t, true).unwrap();
        assert!(!reported(&rule(MatchType::Contains), "xabcx"));
        assert!(reported(&rule(MatchType::Full), "xabc"));
        assert!(!reported(&rule(MatchType::Full), " abc "));
        assert!(!reported(&rule(MatchType::Starts), "abcx"));
        assert!(reported(&rule(MatchType::Starts), "xabc"));
        assert!(!reported(&rule(MatchType::Ends), "xabc"));
        assert!(reported(&rule(MatchType::Ends), "abcx"));
    }

    #[test]
    fn case_and_negation() {
        let insensitive = MatchingRule::new("M", "keywords", MatchType::Starts, false).unwrap();
        assert!(!reported(&insensitive, "Keywords: a; b"));

        let forbidden = MatchingRule::new("M", r"\s{2,}", MatchType::Contains, true)
            .unwrap()
            .negate(true);
        assert!(reported(&forbidden, "two  spaces"));
        assert!(!reported(&forbidden, "one space"));
    }

    #[test]
    fn message_names_the_pattern() {
        let rule = MatchingRule::new("KW-001", "关键词：", MatchType::Starts, true)
            .unwrap()
            .description("Keywords");
        let blocks = vec![Block::paragraph(0, Paragraph::new("关键字：a"))];
        let issues = rule.check(&blocks[0], &Context::new(&blocks));
        assert_eq!(issues[0].message, "Keywords: should match pattern '关键词：'");
        assert_eq!(issues[0].severity, Severity::Warn);
    }

    #[test]
    fn invalid_pattern_fails_to_build() {
        let spec = RuleSpec::new(KIND).with_option("pattern", "(");
        assert!(matches!(build(&spec), Err(RuleBuildError::Pattern { field: "pattern", .. })));
    }
}
