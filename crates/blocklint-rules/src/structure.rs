//! Document structure rules: required elements and page number order in
//! tables of contents and figure lists.

use crate::common::{self, prefixed, truncate};
use crate::error::RuleBuildError;
use blocklint_core::{
    Block, Context, FinalizeRule, Issue, Location, Paragraph, Rule, RuleBox, RuleSpec, Severity,
    HINT_LEN,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

/// Registry key for presence.
pub const PRESENCE_KIND: &str = "presence";
/// Registry key for page-continuity.
pub const PAGE_CONTINUITY_KIND: &str = "page-continuity";

const DEFAULT_PAGE_PATTERN: &str = r"(\d+)\s*$";

fn has_style_prefix(paragraph: &Paragraph, prefixes: &[String]) -> bool {
    let style = paragraph.style_name().trim();
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && style.starts_with(prefix.as_str()))
}

// ────────────────────────────────────────────
// presence
// ────────────────────────────────────────────

/// Ways a required element can be recognized. A paragraph matching any of
/// the configured ways counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceMatch {
    /// Exact trimmed text.
    pub title_text: Option<String>,
    /// Style name prefixes.
    pub style_prefixes: Vec<String>,
    /// Substrings, any of which is enough.
    pub keywords: Vec<String>,
}

impl PresenceMatch {
    fn matches(&self, paragraph: &Paragraph) -> bool {
        let text = paragraph.text.trim();
        self.title_text.as_deref() == Some(text)
            || has_style_prefix(paragraph, &self.style_prefixes)
            || self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Reports a document-level error when no paragraph matches.
///
/// # Configuration
///
/// - `title_text`, `style_prefixes`, `keywords`: see [`PresenceMatch`]
/// - `check_first_n_blocks`: only look at the first N blocks
/// - `required`: set to false to disable the rule
#[derive(Debug, Clone)]
pub struct PresenceRule {
    id: String,
    description: String,
    matcher: PresenceMatch,
    first_n: Option<usize>,
    required: bool,
}

impl PresenceRule {
    /// Creates a rule requiring a paragraph matched by `matcher`.
    #[must_use]
    pub fn new(id: impl Into<String>, matcher: PresenceMatch) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            matcher,
            first_n: None,
            required: true,
        }
    }

    /// Sets the description, which is also the issue message.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Only looks at the first `n` blocks.
    #[must_use]
    pub fn within_first(mut self, n: usize) -> Self {
        self.first_n = Some(n);
        self
    }

    /// Sets whether the element is required.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

impl Rule for PresenceRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        PRESENCE_KIND
    }

    fn description(&self) -> &'static str {
        "Checks a required element is present"
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

impl FinalizeRule for PresenceRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        if !self.required {
            return Vec::new();
        }
        let scope = &ctx.blocks[..self.first_n.unwrap_or(usize::MAX).min(ctx.blocks.len())];
        let found = scope
            .iter()
            .filter_map(Block::as_paragraph)
            .any(|p| self.matcher.matches(p));
        if found {
            return Vec::new();
        }

        let message = if self.description.is_empty() {
            "required element not found".to_string()
        } else {
            self.description.clone()
        };
        vec![Issue::new(
            &self.id,
            Severity::Error,
            message,
            Location::document("(document)"),
        )]
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PresenceParams {
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default)]
    title_text: Option<String>,
    #[serde(default)]
    style_prefixes: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    check_first_n_blocks: Option<usize>,
}

fn default_true() -> bool {
    true
}

pub(crate) fn build_presence(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: PresenceParams = common::params(spec, &id)?;
    let matcher = PresenceMatch {
        title_text: p.title_text,
        style_prefixes: p.style_prefixes,
        keywords: p.keywords,
    };
    if matcher == PresenceMatch::default() {
        return Err(RuleBuildError::invalid(
            &id,
            "set at least one of `title_text`, `style_prefixes` or `keywords`",
        ));
    }

    let mut rule = PresenceRule::new(&id, matcher)
        .description(spec.description.clone().unwrap_or_default())
        .required(p.required);
    if let Some(n) = p.check_first_n_blocks {
        rule = rule.within_first(n);
    }
    Ok(Box::new(rule))
}

// ────────────────────────────────────────────
// page-continuity
// ────────────────────────────────────────────

/// Reports entries whose page number is lower than the previous entry's.
///
/// Entries are paragraphs with one of `style_prefixes`, or, without
/// prefixes, every paragraph after the paragraph whose text is
/// `title_text`.
///
/// # Configuration
///
/// - `title_text`: section title; entries before it are ignored
/// - `style_prefixes`: entry styles
/// - `page_pattern`: group 1 is the page (default: trailing digits)
/// - `check_continuity`: set to false to disable the rule
#[derive(Debug, Clone)]
pub struct PageContinuityRule {
    id: String,
    description: String,
    title_text: Option<String>,
    style_prefixes: Vec<String>,
    page_pattern: Regex,
}

impl PageContinuityRule {
    /// Creates a rule with the default page pattern.
    ///
    /// # Errors
    ///
    /// Returns a regex error if `page_pattern` does not compile.
    pub fn new(id: impl Into<String>, page_pattern: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            id: id.into(),
            description: String::new(),
            title_text: None,
            style_prefixes: Vec::new(),
            page_pattern: Regex::new(page_pattern.unwrap_or(DEFAULT_PAGE_PATTERN))?,
        })
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the section title.
    #[must_use]
    pub fn title_text(mut self, title: impl Into<String>) -> Self {
        self.title_text = Some(title.into());
        self
    }

    /// Sets the entry styles.
    #[must_use]
    pub fn style_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.style_prefixes = prefixes;
        self
    }

    fn page_of(&self, text: &str) -> Option<u32> {
        self.page_pattern
            .captures(text)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }
}

impl Rule for PageContinuityRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        PAGE_CONTINUITY_KIND
    }

    fn description(&self) -> &'static str {
        "Checks page numbers of list entries never decrease"
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

impl FinalizeRule for PageContinuityRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let mut in_section = self.title_text.is_none();
        let mut previous: Option<u32> = None;
        let mut issues = Vec::new();

        for (block, paragraph) in ctx.paragraphs() {
            let text = paragraph.text.trim();
            if !in_section {
                in_section = self.title_text.as_deref() == Some(text);
                continue;
            }
            if !self.style_prefixes.is_empty() && !has_style_prefix(paragraph, &self.style_prefixes) {
                continue;
            }
            let Some(page) = self.page_of(text) else {
                continue;
            };

            if let Some(prev) = previous.filter(|prev| page < *prev) {
                issues.push(
                    Issue::new(
                        &self.id,
                        Severity::Error,
                        prefixed(
                            &self.description,
                            format!("page number goes back from {prev} to {page}"),
                        ),
                        Location::new(i64::from(block.index()), "paragraph", truncate(text, HINT_LEN)),
                    )
                    .with_evidence(json!({ "prev_page": prev, "curr_page": page })),
                );
            }
            previous = Some(page);
        }
        issues
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PageParams {
    #[serde(default = "default_true")]
    check_continuity: bool,
    #[serde(default)]
    title_text: Option<String>,
    #[serde(default)]
    style_prefixes: Vec<String>,
    #[serde(default)]
    page_pattern: Option<String>,
}

/// Finalize-only rule that reports nothing, for disabled checks.
struct Disabled(String, &'static str);

impl Rule for Disabled {
    fn id(&self) -> &str {
        &self.0
    }

    fn kind(&self) -> &'static str {
        self.1
    }

    fn applies_to(&self, _block: &Block, _ctx: &Context<'_>) -> bool {
        false
    }

    fn check(&self, _block: &Block, _ctx: &Context<'_>) -> Vec<Issue> {
        Vec::new()
    }
}

pub(crate) fn build_page_continuity(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: PageParams = common::params(spec, &id)?;
    if let Some(pattern) = &p.page_pattern {
        common::unanchored(&id, "page_pattern", pattern)?;
    }
    if !p.check_continuity {
        return Ok(Box::new(Disabled(id, PAGE_CONTINUITY_KIND)));
    }

    let mut rule = PageContinuityRule::new(&id, p.page_pattern.as_deref())
        .map_err(|source| {
            RuleBuildError::pattern(
                &id,
                "page_pattern",
                blocklint_core::PatternError {
                    pattern: p.page_pattern.clone().unwrap_or_default(),
                    source,
                },
            )
        })?
        .description(spec.description.clone().unwrap_or_default())
        .style_prefixes(p.style_prefixes);
    if let Some(title) = p.title_text {
        rule = rule.title_text(title);
    }
    Ok(Box::new(rule))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(items: &[(&str, &str)]) -> Vec<Block> {
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
    fn presence_by_title_style_or_keyword() {
        let blocks = paragraphs(&[("Title", "论文题目"), ("Normal", "学号：2024001"), ("TOC 1", "1 引言 1")]);

        let title = PresenceMatch {
            title_text: Some("论文题目".to_string()),
            ..PresenceMatch::default()
        };
        assert!(finalize(&PresenceRule::new("P", title), &blocks).is_empty());

        let toc = PresenceMatch {
            style_prefixes: vec!["TOC".to_string()],
            ..PresenceMatch::default()
        };
        assert!(finalize(&PresenceRule::new("P", toc), &blocks).is_empty());

        let cover = PresenceMatch {
            keywords: vec!["学号".to_string(), "指导教师".to_string()],
            ..PresenceMatch::default()
        };
        assert!(finalize(&PresenceRule::new("P", cover.clone()), &blocks).is_empty());
        assert_eq!(finalize(&PresenceRule::new("P", cover).within_first(1), &blocks).len(), 1);
    }

    #[test]
    fn missing_element_uses_description() {
        let matcher = PresenceMatch {
            title_text: Some("目录".to_string()),
            ..PresenceMatch::default()
        };
        let rule = PresenceRule::new("TOC-001", matcher).description("Table of contents is missing");
        let issues = finalize(&rule, &paragraphs(&[("Normal", "正文")]));
        assert_eq!(issues[0].message, "Table of contents is missing");
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].location.hint, "(document)");

        assert!(finalize(&rule.required(false), &[]).is_empty());
    }

    #[test]
    fn presence_needs_a_criterion() {
        assert!(matches!(
            build_presence(&RuleSpec::new(PRESENCE_KIND)),
            Err(RuleBuildError::Invalid { .. })
        ));
    }

    #[test]
    fn page_numbers_may_repeat_but_not_go_back() {
        let blocks = paragraphs(&[
            ("TOC 1", "1 引言 ........ 1"),
            ("TOC 2", "1.1 背景 ...... 1"),
            ("TOC 1", "2 方法 ........ 5"),
            ("TOC 1", "3 结论 ........ 4"),
            ("Normal", "正文 2"),
        ]);
        let rule = PageContinuityRule::new("TOC_PAGE-001", None)
            .unwrap()
            .style_prefixes(vec!["TOC".to_string()]);
        let issues = finalize(&rule, &blocks);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location.block_index, 3);
        assert_eq!(issues[0].evidence_value("prev_page"), Some(&json!(5)));
        assert_eq!(issues[0].evidence_value("curr_page"), Some(&json!(4)));
    }

    #[test]
    fn title_starts_the_section() {
        let blocks = paragraphs(&[
            ("Normal", "封面 9"),
            ("Normal", "图目录"),
            ("Normal", "图 1 结构 3"),
            ("Normal", "图 2 流程 2"),
        ]);
        let rule = PageContinuityRule::new("FIG_PAGE-001", None).unwrap().title_text("图目录");
        let issues = finalize(&rule, &blocks);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location.block_index, 3);
    }

    #[test]
    fn disabled_continuity_builds_a_silent_rule() {
        let spec = RuleSpec::new(PAGE_CONTINUITY_KIND).with_option("check_continuity", false);
        let rule = build_page_continuity(&spec).unwrap();
        assert_eq!(rule.kind(), PAGE_CONTINUITY_KIND);
        assert!(rule.as_finalize().is_none());
    }
}
