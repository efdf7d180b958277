//! Rule engine: visits every block once, then runs whole-document passes.

use crate::block::Block;
use crate::config::{Config, RuleOverride};
use crate::context::Context;
use crate::rule::{Rule, RuleBox};
use crate::types::{Issue, LintReport};

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while assembling an [`Engine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two rules share an id, so their issues could not be told apart.
    #[error("duplicate rule id `{id}`")]
    DuplicateRule {
        /// The repeated id.
        id: String,
    },
}

/// Builder for configuring an [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    rules: Vec<RuleBox>,
    overrides: HashMap<String, RuleOverride>,
}

impl EngineBuilder {
    /// Creates a new builder with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed rule.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds several boxed rules, keeping their order.
    #[must_use]
    pub fn rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = RuleBox>,
    {
        self.rules.extend(rules);
        self
    }

    /// Adds an override for one issue code.
    #[must_use]
    pub fn override_code(mut self, code: impl Into<String>, value: RuleOverride) -> Self {
        self.overrides.insert(code.into(), value);
        self
    }

    /// Takes the overrides from a configuration.
    #[must_use]
    pub fn config(mut self, config: &Config) -> Self {
        self.overrides
            .extend(config.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Builds the engine.
    ///
    /// Rules disabled through an override are dropped here.
    ///
    /// # Errors
    ///
    /// Returns an error if two rules share an id.
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id().to_string()) {
                return Err(EngineError::DuplicateRule {
                    id: rule.id().to_string(),
                });
            }
        }

        let overrides = Overrides(self.overrides);
        let rules = self
            .rules
            .into_iter()
            .filter(|rule| {
                let enabled = overrides.is_enabled(rule.id());
                if !enabled {
                    debug!("Skipping disabled rule: {}", rule.id());
                }
                enabled
            })
            .collect();

        Ok(Engine { rules, overrides })
    }
}

/// Per-code `enabled`/`severity` overrides applied to emitted issues.
#[derive(Debug, Clone, Default)]
pub struct Overrides(HashMap<String, RuleOverride>);

impl Overrides {
    /// Wraps a code → override map.
    #[must_use]
    pub fn new(map: HashMap<String, RuleOverride>) -> Self {
        Self(map)
    }

    /// Returns true unless the code is disabled.
    #[must_use]
    pub fn is_enabled(&self, code: &str) -> bool {
        self.0
            .get(code)
            .map_or(true, |o| o.enabled.unwrap_or(true))
    }

    /// Drops disabled issues and rewrites overridden severities.
    #[must_use]
    pub fn apply(&self, issues: Vec<Issue>) -> Vec<Issue> {
        if self.0.is_empty() {
            return issues;
        }
        issues
            .into_iter()
            .filter(|issue| self.is_enabled(&issue.code))
            .map(|mut issue| {
                if let Some(severity) = self.0.get(&issue.code).and_then(|o| o.severity) {
                    issue.severity = severity;
                }
                issue
            })
            .collect()
    }
}

/// Evaluates registered rules over a block sequence.
///
/// Use [`Engine::builder()`] to construct an instance.
pub struct Engine {
    rules: Vec<RuleBox>,
    overrides: Overrides,
}

impl Engine {
    /// Creates a new builder for configuring an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Registered rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(AsRef::as_ref)
    }

    /// Runs every rule over `blocks`.
    ///
    /// Issues come out in document order, then finalize issues in rule
    /// registration order.
    #[must_use]
    pub fn run(&self, blocks: &[Block]) -> LintReport {
        info!(
            "Running {} rules over {} blocks",
            self.rules.len(),
            blocks.len()
        );

        let ctx = Context::new(blocks);
        let mut issues = Vec::new();

        for block in blocks {
            for rule in &self.rules {
                if rule.applies_to(block, &ctx) {
                    issues.extend(rule.check(block, &ctx));
                }
            }
        }

        for rule in &self.rules {
            if let Some(finalize) = rule.as_finalize() {
                let found = finalize.finalize(&ctx);
                debug!("Rule {} finalized with {} issues", rule.id(), found.len());
                issues.extend(found);
            }
        }

        let report = LintReport {
            issues: self.overrides.apply(issues),
            blocks_checked: blocks.len(),
        };

        info!(
            "Rule run complete: {} issues in {} blocks",
            report.issues.len(),
            report.blocks_checked
        );
        report
    }
}
