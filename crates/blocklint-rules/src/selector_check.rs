//! Rule checking blocks picked by a selector.
//!
//! ```toml
//! [[rules]]
//! type = "selector-check"
//! id = "FIG-002"
//! selector = ".figure-caption"
//! condition = { selector = ".figure-list", count = ">= 1" }
//! check = { count_equals = { selector = ".figure-list-item", method = "count" } }
//! severity = "error"
//! message = "Figure list does not match the figures"
//! ```
//!
//! # Configuration
//!
//! - `selector`: blocks to check (required)
//! - `condition`: only run when `{ selector, pattern }` finds a block whose
//!   text contains the pattern, or `{ selector, count }` holds
//! - `check`: exactly one of
//!   - `pattern`: every selected block's text must match at its start
//!   - `exists`: whether any block must be selected
//!   - `count`: count expression (`">= 2"`, `"!= 0"`, `3`)
//!   - `count_equals`: `{ selector, extract, method }` where `method` is
//!     `count` (blocks), `max` (largest extracted number) or `sum`
//!     (number of extracted tokens)
//! - `severity`: default `warn`
//! - `message`: default `Rule <id> failed`

use crate::common;
use crate::error::RuleBuildError;
use blocklint_core::{
    AnchoredPattern, Block, Context, FinalizeRule, Issue, Location, Query, Rule, RuleBox, RuleSpec,
    Severity,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Registry key for selector-check.
pub const KIND: &str = "selector-check";

// ────────────────────────────────────────────
// Count expressions
// ────────────────────────────────────────────

/// Comparison operator of a [`CountExpr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOp {
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `==`, or a bare number
    Eq,
    /// `!=`
    Ne,
}

impl CountOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// A comparison such as `>= 2`, applied to a block count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountExpr {
    /// Operator.
    pub op: CountOp,
    /// Right-hand side.
    pub value: usize,
}

impl CountExpr {
    /// Returns true if `count` satisfies the expression.
    #[must_use]
    pub fn holds(self, count: usize) -> bool {
        match self.op {
            CountOp::Ge => count >= self.value,
            CountOp::Le => count <= self.value,
            CountOp::Gt => count > self.value,
            CountOp::Lt => count < self.value,
            CountOp::Eq => count == self.value,
            CountOp::Ne => count != self.value,
        }
    }
}

impl fmt::Display for CountExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.symbol(), self.value)
    }
}

/// Error returned for a malformed count expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid count expression `{0}`, expected e.g. `>= 2`, `== 0` or `3`")]
pub struct InvalidCountExpr(pub String);

impl FromStr for CountExpr {
    type Err = InvalidCountExpr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expr = s.trim();
        // Two-character operators first so `>=` is not read as `>`.
        let (op, rest) = [
            (">=", CountOp::Ge),
            ("<=", CountOp::Le),
            ("==", CountOp::Eq),
            ("!=", CountOp::Ne),
            (">", CountOp::Gt),
            ("<", CountOp::Lt),
        ]
        .into_iter()
        .find_map(|(symbol, op)| expr.strip_prefix(symbol).map(|rest| (op, rest)))
        .unwrap_or((CountOp::Eq, expr));

        let value = rest
            .trim()
            .parse()
            .map_err(|_| InvalidCountExpr(s.to_string()))?;
        Ok(Self { op, value })
    }
}

// ────────────────────────────────────────────
// Checks
// ────────────────────────────────────────────

/// How a reference count is derived in a `count_equals` check.
#[derive(Debug, Clone)]
pub enum RefCount {
    /// Number of reference blocks.
    Count,
    /// Largest number extracted from the reference blocks' text.
    Max(Regex),
    /// Number of extracted tokens over all reference blocks.
    Sum(Regex),
}

/// Gate evaluated before the check runs.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Some selected block's text contains a match.
    Pattern(Query, Regex),
    /// The number of selected blocks satisfies the expression.
    Count(Query, CountExpr),
}

/// What is verified about the selected blocks.
#[derive(Debug, Clone)]
pub enum Check {
    /// Every block's text matches at its start.
    Pattern(AnchoredPattern),
    /// Whether any block is selected.
    Exists(bool),
    /// The number of blocks satisfies the expression.
    Count(CountExpr),
    /// The number of blocks equals a count derived from other blocks.
    CountEquals(Query, RefCount),
}

/// Runs one [`Check`] over the blocks a [`Query`] selects.
#[derive(Debug, Clone)]
pub struct SelectorCheckRule {
    id: String,
    query: Query,
    condition: Option<Condition>,
    check: Check,
    severity: Severity,
    message: String,
}

impl SelectorCheckRule {
    /// Creates a rule with severity `warn` and the default message.
    #[must_use]
    pub fn new(id: impl Into<String>, query: Query, check: Check) -> Self {
        let id = id.into();
        Self {
            message: format!("Rule {id} failed"),
            id,
            query,
            condition: None,
            check,
            severity: Severity::Warn,
        }
    }

    /// Only runs the check when `condition` holds.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the severity of reported issues.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the message of reported issues.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn condition_holds(&self, ctx: &Context<'_>) -> bool {
        match &self.condition {
            None => true,
            Some(Condition::Pattern(query, pattern)) => ctx
                .selector()
                .query(query)
                .iter()
                .any(|b| pattern.is_match(&b.text())),
            Some(Condition::Count(query, expr)) => expr.holds(ctx.selector().query(query).len()),
        }
    }

    fn issue(&self, location: Location, expected: String, actual: String) -> Issue {
        Issue::new(&self.id, self.severity, &self.message, location)
            .with_evidence(json!({ "expected": expected, "actual": actual }))
    }
}

impl Rule for SelectorCheckRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn description(&self) -> &'static str {
        "Checks blocks selected by a CSS-like selector"
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

impl FinalizeRule for SelectorCheckRule {
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
        if !self.condition_holds(ctx) {
            debug!(rule = %self.id, "Condition not met, skipping");
            return Vec::new();
        }
        let selected = ctx.selector().query(&self.query);

        match &self.check {
            Check::Pattern(pattern) => selected
                .iter()
                .filter_map(|block| {
                    let text = block.text();
                    (!pattern.is_match(&text)).then(|| {
                        self.issue(
                            Location::of_block(block),
                            format!("Pattern: {}", pattern.as_str()),
                            text.into_owned(),
                        )
                    })
                })
                .collect(),
            Check::Exists(expected) => {
                let exists = !selected.is_empty();
                if exists == *expected {
                    return Vec::new();
                }
                vec![self.issue(
                    Location::document("existence check"),
                    format!("Exists: {expected}"),
                    format!("Exists: {exists}"),
                )]
            }
            Check::Count(expr) => {
                if expr.holds(selected.len()) {
                    return Vec::new();
                }
                vec![self.issue(
                    Location::document("count check"),
                    format!("Count {expr}"),
                    format!("Count: {}", selected.len()),
                )]
            }
            Check::CountEquals(reference, method) => {
                let references = ctx.selector().query(reference);
                let expected = match method {
                    RefCount::Count => references.len(),
                    RefCount::Max(extract) => references
                        .iter()
                        .flat_map(|b| extracted(extract, &b.text()))
                        .filter_map(|token| token.parse::<usize>().ok())
                        .max()
                        .unwrap_or(0),
                    RefCount::Sum(extract) => references
                        .iter()
                        .map(|b| extracted(extract, &b.text()).len())
                        .sum(),
                };
                if expected == selected.len() {
                    return Vec::new();
                }
                vec![self.issue(
                    Location::document("count comparison"),
                    format!("Count: {expected}"),
                    format!("Count: {}", selected.len()),
                )]
            }
        }
    }
}

/// Every match of `extract` in `text`: group 1 when the pattern has one,
/// the whole match otherwise.
fn extracted(extract: &Regex, text: &str) -> Vec<String> {
    extract
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str().to_string())
        .collect()
}

// ────────────────────────────────────────────
// Construction
// ────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum CountValue {
    Number(usize),
    Text(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionParams {
    selector: String,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    count: Option<CountValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Method {
    Count,
    Max,
    Sum,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CountEqualsParams {
    selector: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default = "default_method")]
    method: Method,
}

fn default_method() -> Method {
    Method::Count
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckParams {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    exists: Option<bool>,
    #[serde(default)]
    count: Option<CountValue>,
    #[serde(default, alias = "count-equals")]
    count_equals: Option<CountEqualsParams>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    selector: String,
    #[serde(default)]
    condition: Option<ConditionParams>,
    check: CheckParams,
    #[serde(default)]
    message: Option<String>,
}

fn query(id: &str, field: &'static str, selector: &str) -> Result<Query, RuleBuildError> {
    Query::parse(selector).map_err(|source| RuleBuildError::Selector {
        id: id.to_string(),
        field,
        source,
    })
}

fn count_expr(id: &str, value: CountValue) -> Result<CountExpr, RuleBuildError> {
    match value {
        CountValue::Number(value) => Ok(CountExpr {
            op: CountOp::Eq,
            value,
        }),
        CountValue::Text(text) => text
            .parse()
            .map_err(|e: InvalidCountExpr| RuleBuildError::invalid(id, e.to_string())),
    }
}

fn condition(id: &str, p: ConditionParams) -> Result<Option<Condition>, RuleBuildError> {
    let selector = query(id, "condition.selector", &p.selector)?;
    match (p.pattern, p.count) {
        (Some(_), Some(_)) => Err(RuleBuildError::invalid(
            id,
            "`condition` takes either `pattern` or `count`, not both",
        )),
        (Some(pattern), None) => Ok(Some(Condition::Pattern(
            selector,
            common::unanchored(id, "condition.pattern", &pattern)?,
        ))),
        (None, Some(count)) => Ok(Some(Condition::Count(selector, count_expr(id, count)?))),
        (None, None) => Ok(None),
    }
}

fn check(id: &str, p: CheckParams) -> Result<Check, RuleBuildError> {
    let set = [
        p.pattern.is_some(),
        p.exists.is_some(),
        p.count.is_some(),
        p.count_equals.is_some(),
    ];
    if set.iter().filter(|s| **s).count() != 1 {
        return Err(RuleBuildError::invalid(
            id,
            "`check` needs exactly one of `pattern`, `exists`, `count` or `count_equals`",
        ));
    }

    if let Some(pattern) = p.pattern {
        return Ok(Check::Pattern(common::anchored(id, "check.pattern", &pattern)?));
    }
    if let Some(exists) = p.exists {
        return Ok(Check::Exists(exists));
    }
    if let Some(count) = p.count {
        return Ok(Check::Count(count_expr(id, count)?));
    }
    let Some(equals) = p.count_equals else {
        return Err(RuleBuildError::invalid(id, "`check` is empty"));
    };
    let reference = query(id, "check.count_equals.selector", &equals.selector)?;
    let extract = equals
        .extract
        .as_deref()
        .map(|pattern| common::unanchored(id, "check.count_equals.extract", pattern))
        .transpose()?;
    let method = match (equals.method, extract) {
        (Method::Count, _) => RefCount::Count,
        (Method::Max, Some(extract)) => RefCount::Max(extract),
        (Method::Sum, Some(extract)) => RefCount::Sum(extract),
        (Method::Max | Method::Sum, None) => {
            return Err(RuleBuildError::invalid(
                id,
                "`count_equals` with method `max` or `sum` needs `extract`",
            ))
        }
    };
    Ok(Check::CountEquals(reference, method))
}

pub(crate) fn build(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
    let id = common::spec_id(spec);
    let p: Params = common::params(spec, &id)?;

    let mut rule = SelectorCheckRule::new(&id, query(&id, "selector", &p.selector)?, check(&id, p.check)?)
        .severity(spec.severity.unwrap_or(Severity::Warn));
    if let Some(condition) = p.condition.map(|c| condition(&id, c)).transpose()?.flatten() {
        rule = rule.condition(condition);
    }
    if let Some(message) = p.message {
        rule = rule.message(message);
    }
    Ok(Box::new(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::Paragraph;

    fn document() -> Vec<Block> {
        [
            ("插图目录", "figure-list"),
            ("图1 系统结构 3", "figure-list-item"),
            ("图2 数据流程 5", "figure-list-item"),
            ("图1 系统结构", "figure-caption"),
            ("正文", "body"),
            ("图2 数据流程", "figure-caption"),
            ("图3 实验结果", "figure-caption"),
        ]
        .iter()
        .zip(0u32..)
        .map(|((text, label), i)| Block::paragraph(i, Paragraph::new(*text)).with_label(*label))
        .collect()
    }

    fn build_rule(options: &str) -> Result<RuleBox, RuleBuildError> {
        let table: toml::Table = toml::from_str(options).unwrap();
        let mut spec = RuleSpec::new(KIND).with_id("SEL-001");
        for (key, value) in table {
            spec = spec.with_option(key, value);
        }
        build(&spec)
    }

    fn finalize(options: &str) -> Vec<Issue> {
        let rule = build_rule(options).unwrap();
        let blocks = document();
        let ctx = Context::new(&blocks);
        rule.as_finalize().unwrap().finalize(&ctx)
    }

    #[test]
    fn count_expressions() {
        let parse = |s: &str| s.parse::<CountExpr>().unwrap();
        assert!(parse(">= 2").holds(2));
        assert!(!parse(">2").holds(2));
        assert!(parse("<= 1").holds(0));
        assert!(parse("< 1").holds(0));
        assert!(parse("!= 0").holds(3));
        assert!(parse("== 3").holds(3));
        assert!(parse(" 3 ").holds(3));
        assert_eq!(parse(">=2").to_string(), ">= 2");
        assert!("about 3".parse::<CountExpr>().is_err());
        assert!(">= -1".parse::<CountExpr>().is_err());
    }

    #[test]
    fn pattern_check_reports_each_block() {
        let issues = finalize(
            r#"
            selector = ".figure-caption"
            check = { pattern = '图\d+ \S+结构' }
            message = "Caption must name the structure"
            "#,
        );
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].message, "Caption must name the structure");
        assert_eq!(issues[0].severity, Severity::Warn);
        assert_eq!(issues[0].location.block_index, 5);
        assert_eq!(issues[0].evidence_value("actual"), Some(&json!("图2 数据流程")));
    }

    #[test]
    fn exists_and_count() {
        let issues = finalize(
            r#"
            selector = ".table-caption"
            check = { exists = true }
            "#,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Rule SEL-001 failed");
        assert_eq!(issues[0].location.hint, "existence check");
        assert_eq!(issues[0].evidence_value("actual"), Some(&json!("Exists: false")));

        let issues = finalize(
            r#"
            selector = ".figure-caption"
            check = { count = "<= 2" }
            "#,
        );
        assert_eq!(issues[0].evidence_value("expected"), Some(&json!("Count <= 2")));
        assert_eq!(issues[0].evidence_value("actual"), Some(&json!("Count: 3")));

        assert!(finalize(
            r#"
            selector = ".figure-caption"
            check = { count = 3 }
            "#
        )
        .is_empty());
    }

    #[test]
    fn count_equals_methods() {
        let by_count = finalize(
            r#"
            selector = ".figure-caption"
            check = { count_equals = { selector = ".figure-list-item" } }
            "#,
        );
        assert_eq!(by_count[0].evidence_value("expected"), Some(&json!("Count: 2")));

        let by_max = finalize(
            r#"
            selector = ".figure-list-item"
            check = { count_equals = { selector = ".figure-caption", extract = '图(\d+)', method = "max" } }
            "#,
        );
        assert_eq!(by_max[0].evidence_value("expected"), Some(&json!("Count: 3")));

        let by_sum = finalize(
            r#"
            selector = ".figure-caption"
            check = { count_equals = { selector = ".figure-caption", extract = '图\d+', method = "sum" } }
            "#,
        );
        assert!(by_sum.is_empty());
    }

    #[test]
    fn condition_gates_the_check() {
        let skipped = finalize(
            r#"
            selector = ".table-caption"
            condition = { selector = ".table-list", count = ">= 1" }
            check = { exists = true }
            "#,
        );
        assert!(skipped.is_empty());

        let gated = finalize(
            r#"
            selector = ".table-caption"
            condition = { selector = ".figure-list", pattern = "目录" }
            check = { exists = true }
            "#,
        );
        assert_eq!(gated.len(), 1);
    }

    #[test]
    fn severity_comes_from_the_spec() {
        let spec = RuleSpec {
            severity: Some(Severity::Error),
            ..RuleSpec::new(KIND)
        }
        .with_option("selector", ".x")
        .with_option("check", toml::Value::Table(toml::toml! { exists = false }));
        let blocks = vec![Block::paragraph(0, Paragraph::new("x")).with_label("x")];
        let ctx = Context::new(&blocks);
        let issues = build(&spec).unwrap().as_finalize().unwrap().finalize(&ctx);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].code, "SELECTOR_CHECK");
    }

    #[test]
    fn invalid_configurations_fail_at_load() {
        let cases = [
            ("selector = 'figure'\ncheck = { exists = true }", "selector"),
            ("selector = '.x'\ncheck = { count = '>= many' }", "count"),
            ("selector = '.x'\ncheck = { exists = true, count = 1 }", "exactly one"),
            ("selector = '.x'\ncheck = {}", "exactly one"),
            (
                "selector = '.x'\ncheck = { count_equals = { selector = '.y', method = 'max' } }",
                "extract",
            ),
        ];
        for (options, needle) in cases {
            let err = build_rule(options).err().unwrap();
            assert!(err.to_string().contains(needle), "{options}: {err}");
        }
    }
}
