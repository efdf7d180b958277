//! Reference list rules.
//!
//! The reference section starts at the first heading whose trimmed text is
//! the configured title (default `参考文献`) and ends at the next heading.
//! Entries are paragraphs starting with `[n]`; citations are `[n]` anywhere
//! in paragraphs before the section. Documents without a section, or with
//! an empty one, are left to `references-heading`.

use crate::common::{self, prefixed, truncate};
use crate::error::RuleBuildError;
use blocklint_core::{
    Block, Context, FinalizeRule, Issue, Location, Rule, RuleBox, RuleSpec, Severity, HINT_LEN,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Registry key for references-heading.
pub const HEADING_KIND: &str = "references-heading";
/// Registry key for references-citation.
pub const CITATION_KIND: &str = "references-citation";
/// Registry key for citation-validity.
pub const VALIDITY_KIND: &str = "citation-validity";
/// Registry key for references-heading-level.
pub const LEVEL_KIND: &str = "references-heading-level";

/// Default title of the reference section.
pub const DEFAULT_HEADING: &str = "参考文献";

const CITATION_PATTERN: &str = r"\[(\d+)\]";

#[allow(clippy::expect_used)]
fn entry_pattern() -> &'static Regex {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    ENTRY.get_or_init(|| Regex::new(r"^\[(\d+)\]").expect("valid entry regex"))
}

fn is_title(block: &Block, title: &str) -> bool {
    Context::is_heading(block) && block.text().trim() == title
}

// ────────────────────────────────────────────
// Section scan
// ────────────────────────────────────────────

/// The located reference section.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReferenceSection {
    /// Index of the section heading.
    start: u32,
    /// Entry numbers listed in the section.
    entries: BTreeSet<u32>,
}

impl ReferenceSection {
    fn find(ctx: &Context<'_>, title: &str) -> Option<Self> {
        let heading = ctx.blocks.iter().find(|b| is_title(b, title))?;
        let start = heading.index();

        let entries = ctx
            .paragraphs()
            .filter(|(b, _)| b.index() > start)
            .map(|(b, p)| (b, p.text.trim()))
            .filter(|(_, text)| !text.is_empty())
            .take_while(|(b, _)| !Context::is_heading(b))
            .filter_map(|(_, text)| entry_pattern().captures(text)?.get(1)?.as_str().parse().ok())
            .collect::<BTreeSet<u32>>();

        (!entries.is_empty()).then_some(Self { start, entries })
    }

    /// Citation numbers before the section, with the blocks citing them.
    fn citations(&self, ctx: &Context<'_>, pattern: &Regex) -> BTreeMap<u32, Vec<u32>> {
        let mut citations: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (block, paragraph) in ctx.paragraphs().filter(|(b, _)| b.index() < self.start) {
            for caps in pattern.captures_iter(paragraph.text.trim()) {
                let Some(number) = caps.get(1).and_then(|m| m.as_str().parse().ok()) else {
                    continue;
                };
                citations.entry(number).or_default().push(block.index());
            }
        }
        citations
    }
}

macro_rules! finalize_only {
    ($ty:ty, $kind:expr, $description:literal) => {
        impl Rule for $ty {
            fn id(&self) -> &str {
                &self.id
            }

            fn kind(&self) -> &'static str {
                $kind
            }

            fn description(&self) -> &'static str {
                $description
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
    };
}

// ────────────────────────────────────────────
// references-heading
// ────────────────────────────────────────────

/// Requires a heading with the reference section title.
#[derive(Debug, Clone)]
pub struct ReferencesHeadingRule {
    id: String,
    description: String,
    heading: String,
}

impl ReferencesHeadingRule {
    /// Creates a rule requiring a heading titled `heading`.
    #[must_use]
    pub fn new(id: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            heading: heading.into(),
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

finalize_only!(ReferencesHeadingRule, HEADING_KIND, "Checks the reference section exists");

impl FinalizeRule for ReferencesHeadingRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        if ctx.blocks.iter().any(|b| is_title(b, &self.heading)) {
            return Vec::new();
        }
        vec![Issue::new(
            &self.id,
            Severity::Error,
            prefixed(
                &self.description,
                format!("no '{}' section found", self.heading),
            ),
            Location::document("(document)"),
        )]
    }
}

// ────────────────────────────────────────────
// references-citation
// ────────────────────────────────────────────

/// Warns once about reference entries never cited before the section.
#[derive(Debug, Clone)]
pub struct ReferencesCitationRule {
    id: String,
    description: String,
    heading: String,
}

impl ReferencesCitationRule {
    /// Creates a rule for the section titled `heading`.
    #[must_use]
    pub fn new(id: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            heading: heading.into(),
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

finalize_only!(ReferencesCitationRule, CITATION_KIND, "Checks every reference is cited");

impl FinalizeRule for ReferencesCitationRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let Some(section) = ReferenceSection::find(ctx, &self.heading) else {
            return Vec::new();
        };
        let pattern = citation_pattern();
        let cited = section.citations(ctx, pattern);
        let unreferenced: Vec<u32> = section
            .entries
            .iter()
            .copied()
            .filter(|n| !cited.contains_key(n))
            .collect();
        if unreferenced.is_empty() {
            return Vec::new();
        }

        vec![Issue::new(
            &self.id,
            Severity::Warn,
            prefixed(
                &self.description,
                format!("{} reference(s) never cited: {unreferenced:?}", unreferenced.len()),
            ),
            Location::new(i64::from(section.start), "document", "(references)"),
        )
        .with_evidence(json!({ "unreferenced": unreferenced }))]
    }
}

#[allow(clippy::expect_used)]
fn citation_pattern() -> &'static Regex {
    static CITATION: OnceLock<Regex> = OnceLock::new();
    CITATION.get_or_init(|| Regex::new(CITATION_PATTERN).expect("valid citation regex"))
}

// ────────────────────────────────────────────
// citation-validity
// ────────────────────────────────────────────

/// Reports each cited number missing from the reference list, at its first
/// occurrence.
#[derive(Debug, Clone)]
pub struct CitationValidationRule {
    id: String,
    description: String,
    heading: String,
    pattern: Regex,
}

impl CitationValidationRule {
    /// Creates a rule for the section titled `heading`.
    #[must_use]
    pub fn new(id: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            heading: heading.into(),
            pattern: citation_pattern().clone(),
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the citation pattern; group 1 is the number.
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = pattern;
        self
    }
}

finalize_only!(
    CitationValidationRule,
    VALIDITY_KIND,
    "Checks every citation has a reference entry"
);

impl FinalizeRule for CitationValidationRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let Some(section) = ReferenceSection::find(ctx, &self.heading) else {
            return Vec::new();
        };
        let available: Vec<u32> = section.entries.iter().copied().collect();

        section
            .citations(ctx, &self.pattern)
            .into_iter()
            .filter(|(number, _)| !section.entries.contains(number))
            .filter_map(|(number, occurrences)| {
                let first = *occurrences.first()?;
                Some(
                    Issue::new(
                        &self.id,
                        Severity::Error,
                        prefixed(
                            &self.description,
                            format!("citation [{number}] is not in the reference list"),
                        ),
                        Location::new(i64::from(first), "paragraph", format!("(block {first})")),
                    )
                    .with_evidence(json!({
                        "citation_number": number,
                        "all_occurrences": occurrences,
                        "available_references": available,
                    })),
                )
            })
            .collect()
    }
}

// ────────────────────────────────────────────
// references-heading-level
// ────────────────────────────────────────────

/// Checks the reference section heading has the required level.
///
/// For level 1 the style must be one of `level1_styles`; other levels are
/// compared with the level read from the style name.
#[derive(Debug, Clone)]
pub struct ReferencesHeadingLevelRule {
    id: String,
    description: String,
    heading: String,
    required_level: u32,
    level1_styles: Vec<String>,
}

impl ReferencesHeadingLevelRule {
    /// Creates a rule requiring a level 1 heading.
    #[must_use]
    pub fn new(id: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            heading: heading.into(),
            required_level: 1,
            level1_styles: default_level1_styles(),
        }
    }

    /// Sets the description used as message prefix.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the required level.
    #[must_use]
    pub fn required_level(mut self, level: u32) -> Self {
        self.required_level = level;
        self
    }

    /// Sets the styles accepted as level 1.
    #[must_use]
    pub fn level1_styles(mut self, styles: Vec<String>) -> Self {
        self.level1_styles = styles;
        self
    }

    fn level_ok(&self, block: &Block, style: &str) -> bool {
        if self.required_level == 1 {
            self.level1_styles.iter().any(|s| s == style)
        } else {
            Context::heading_level(block) == Some(self.required_level)
        }
    }
}

finalize_only!(
    ReferencesHeadingLevelRule,
    LEVEL_KIND,
    "Checks the reference section heading level"
);

impl FinalizeRule for ReferencesHeadingLevelRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        let Some((block, paragraph)) = ctx
            .paragraphs()
            .find(|(b, _)| is_title(b, &self.heading))
        else {
            return Vec::new();
        };
        let style = paragraph.style_name().trim();
        if self.level_ok(block, style) {
            return Vec::new();
        }

        let required_styles: Vec<&str> = if self.required_level == 1 {
            self.level1_styles.iter().map(String::as_str).collect()
        } else {
            Vec::new()
        };
        vec![Issue::new(
            &self.id,
            Severity::Error,
            prefixed(
                &self.description,
                format!(
                    "'{}' should be a level {} heading, style is '{style}'",
                    self.heading, self.required_level
                ),
            ),
            Location::new(
                i64::from(block.index()),
                "paragraph",
                truncate(paragraph.text.trim(), HINT_LEN),
            ),
        )
        .with_evidence(json!({
            "style_name": style,
            "required_styles": required_styles,
            "required_level": self.required_level,
        }))]
    }
}

fn default_level1_styles() -> Vec<String> {
    vec!["Heading 1".to_string(), "标题 1".to_string()]
}

// ────────────────────────────────────────────
// Construction
// ────────────────────────────────────────────

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

fn default_heading() -> String {
    DEFAULT_HEADING.to_string()
}

fn default_true() -> bool {
    true
}

fn default_level() -> u32 {
    1
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct HeadingParams {
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default = "default_heading")]
    heading_text: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CitationParams {
    #[serde(default = "default_true")]
    check_superscript_citation: bool,
    #[serde(default = "default_heading")]
    reference_heading: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ValidityParams {
    #[serde(default = "default_heading")]
    reference_heading: String,
    #[serde(default)]
    citation_pattern: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelParams {
    #[serde(default = "default_true")]
    check_heading_level: bool,
    #[serde(default = "default_heading")]
    reference_heading: String,
    #[serde(default = "default_level")]
    required_level: u32,
    #[serde(default = "default_level1_styles")]
    level1_styles: Vec<String>,
}

fn description(spec: &RuleSpec) -> String {
    spec.description.clone().unwrap_or_default()
}

pub(crate) fn build_heading(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: HeadingParams = common::params(spec, &id)?;
    if !p.required {
        return Ok(Box::new(Disabled(id, HEADING_KIND)));
    }
    Ok(Box::new(
        ReferencesHeadingRule::new(&id, p.heading_text).description(description(spec)),
    ))
}

pub(crate) fn build_citation(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: CitationParams = common::params(spec, &id)?;
    if !p.check_superscript_citation {
        return Ok(Box::new(Disabled(id, CITATION_KIND)));
    }
    Ok(Box::new(
        ReferencesCitationRule::new(&id, p.reference_heading).description(description(spec)),
    ))
}

pub(crate) fn build_validity(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: ValidityParams = common::params(spec, &id)?;
    let mut rule =
        CitationValidationRule::new(&id, p.reference_heading).description(description(spec));
    if let Some(pattern) = p.citation_pattern {
        let regex = common::unanchored(&id, "citation_pattern", &pattern)?;
        if regex.captures_len() < 2 {
            return Err(RuleBuildError::invalid(
                &id,
                "`citation_pattern` needs a capture group for the number",
            ));
        }
        rule = rule.pattern(regex);
    }
    Ok(Box::new(rule))
}

pub(crate) fn build_level(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: LevelParams = common::params(spec, &id)?;
    if !p.check_heading_level {
        return Ok(Box::new(Disabled(id, LEVEL_KIND)));
    }
    if p.required_level == 0 {
        return Err(RuleBuildError::invalid(&id, "`required_level` starts at 1"));
    }
    Ok(Box::new(
        ReferencesHeadingLevelRule::new(&id, p.reference_heading)
            .description(description(spec))
            .required_level(p.required_level)
            .level1_styles(p.level1_styles),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::Paragraph;

    fn document(heading_style: &str) -> Vec<Block> {
        [
            ("Heading 1", "1 引言"),
            ("Normal", "已有研究[1]，另见[4]。"),
            ("Normal", "再次引用[4]和[2]。"),
            (heading_style, "参考文献"),
            ("Normal", "[1] 作者. 题名."),
            ("Normal", ""),
            ("Normal", "[2] 作者. 题名."),
            ("Normal", "[3] 作者. 题名."),
            ("Heading 1", "致谢"),
            ("Normal", "[9] 不是参考文献"),
        ]
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
    fn section_scan_stops_at_next_heading() {
        let blocks = document("Heading 1");
        let ctx = Context::new(&blocks);
        let section = ReferenceSection::find(&ctx, DEFAULT_HEADING).unwrap();
        assert_eq!(section.start, 3);
        assert_eq!(section.entries.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        let cited = section.citations(&ctx, citation_pattern());
        assert_eq!(cited.get(&4), Some(&vec![1, 2]));
    }

    #[test]
    fn missing_heading_is_document_error() {
        let rule = ReferencesHeadingRule::new("REF-001", DEFAULT_HEADING);
        assert!(finalize(&rule, &document("Heading 1")).is_empty());

        // A body paragraph with the title text is not a heading.
        let issues = finalize(&rule, &document("Normal"));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].location.is_document());
    }

    #[test]
    fn uncited_references_are_one_warning() {
        let issues = finalize(&ReferencesCitationRule::new("REF_CIT-001", DEFAULT_HEADING), &document("Heading 1"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warn);
        assert_eq!(issues[0].location.block_index, 3);
        assert_eq!(issues[0].location.hint, "(references)");
        assert_eq!(issues[0].evidence_value("unreferenced"), Some(&json!([3])));
    }

    #[test]
    fn invalid_citation_reported_at_first_occurrence() {
        let issues = finalize(
            &CitationValidationRule::new("REF_VAL-001", DEFAULT_HEADING),
            &document("Heading 1"),
        );
        assert_eq!(issues.len(), 1);
        insta::assert_json_snapshot!(issues[0], @r###"
        {
          "code": "REF_VAL-001",
          "severity": "error",
          "message": "citation [4] is not in the reference list",
          "location": {
            "block_index": 1,
            "kind": "paragraph",
            "hint": "(block 1)"
          },
          "evidence": {
            "all_occurrences": [
              1,
              2
            ],
            "available_references": [
              1,
              2,
              3
            ],
            "citation_number": 4
          }
        }
        "###);
    }

    #[test]
    fn no_section_means_no_citation_issues() {
        let blocks = vec![Block::paragraph(0, Paragraph::new("见[7]。"))];
        assert!(finalize(&CitationValidationRule::new("V", DEFAULT_HEADING), &blocks).is_empty());
        assert!(finalize(&ReferencesCitationRule::new("C", DEFAULT_HEADING), &blocks).is_empty());
    }

    #[test]
    fn heading_level_checks_style() {
        let rule = ReferencesHeadingLevelRule::new("REF_LVL-001", DEFAULT_HEADING);
        assert!(finalize(&rule, &document("标题 1")).is_empty());

        let issues = finalize(&rule, &document("Heading 2"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].evidence_value("style_name"), Some(&json!("Heading 2")));

        let level2 = ReferencesHeadingLevelRule::new("REF_LVL-002", DEFAULT_HEADING).required_level(2);
        assert!(finalize(&level2, &document("Heading 2")).is_empty());
    }

    #[test]
    fn validity_pattern_needs_a_group() {
        let spec = RuleSpec::new(VALIDITY_KIND).with_option("citation_pattern", r"\[\d+\]");
        assert!(matches!(build_validity(&spec), Err(RuleBuildError::Invalid { .. })));
    }
}
