//! Semantic tagging of blocks.
//!
//! A [`ClassRule`] pairs a label with a conjunction of [`Matcher`]s. Rules
//! run strictly in declaration order, so a rule may anchor on labels that an
//! earlier rule assigned. Children of a rule are evaluated against the span
//! from the first to the last block the parent matched.

use crate::block::Block;
use crate::matcher::{Matcher, Scope};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// One labeling rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRule {
    label: String,
    matchers: Vec<Matcher>,
    children: Vec<ClassRule>,
}

impl ClassRule {
    /// Creates a rule with no matchers; it matches every block until
    /// matchers are added.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            matchers: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a matcher to the conjunction.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Adds a child rule evaluated inside this rule's span.
    #[must_use]
    pub fn with_child(mut self, child: ClassRule) -> Self {
        self.children.push(child);
        self
    }

    /// The label assigned on match.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The matchers of this rule.
    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Child rules.
    #[must_use]
    pub fn children(&self) -> &[ClassRule] {
        &self.children
    }

    fn is_match(&self, block: &Block, scope: Scope<'_>) -> bool {
        self.matchers.iter().all(|m| m.matches(block, scope))
    }
}

/// A label reference that cannot be satisfied by an earlier rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Label of the rule holding the reference.
    pub rule: String,
    /// The referenced label.
    pub label: String,
    /// True when a later rule assigns the label.
    pub defined_later: bool,
}

/// Finds anchors that reference labels not assigned before the rule runs.
#[must_use]
pub fn unresolved_references(rules: &[ClassRule]) -> Vec<UnresolvedReference> {
    fn all_labels<'r>(rules: &'r [ClassRule], out: &mut HashSet<&'r str>) {
        for rule in rules {
            out.insert(rule.label());
            all_labels(rule.children(), out);
        }
    }

    fn walk<'r>(
        rules: &'r [ClassRule],
        assigned: &mut HashSet<&'r str>,
        everywhere: &HashSet<&'r str>,
        out: &mut Vec<UnresolvedReference>,
    ) {
        for rule in rules {
            for label in rule.matchers().iter().flat_map(Matcher::referenced_labels) {
                if !assigned.contains(label) && label != rule.label() {
                    out.push(UnresolvedReference {
                        rule: rule.label().to_string(),
                        label: label.to_string(),
                        defined_later: everywhere.contains(label),
                    });
                }
            }
            assigned.insert(rule.label());
            walk(rule.children(), assigned, everywhere, out);
        }
    }

    let mut everywhere = HashSet::new();
    all_labels(rules, &mut everywhere);
    let mut out = Vec::new();
    walk(rules, &mut HashSet::new(), &everywhere, &mut out);
    out
}

/// Applies `rules` in order, adding labels in place.
///
/// Returns the same slice for chaining. Classifying twice with the same
/// rules leaves label sets unchanged.
pub fn classify<'b>(rules: &[ClassRule], blocks: &'b mut [Block]) -> &'b mut [Block] {
    if let Some(last) = blocks.len().checked_sub(1) {
        for rule in rules {
            apply(rule, blocks, 0..=last);
        }
    }
    blocks
}

/// Labels the blocks of `span` matching `rule`; `span` holds slice offsets
/// into the whole document.
fn apply(rule: &ClassRule, blocks: &mut [Block], span: RangeInclusive<usize>) {
    let view: &[Block] = blocks;
    let scope = Scope::within(view, &view[span.clone()]);
    let offset = *span.start();
    let matched: Vec<usize> = scope
        .span()
        .iter()
        .enumerate()
        .filter(|(_, block)| rule.is_match(block, scope))
        .map(|(at, _)| offset + at)
        .collect();

    debug!(label = rule.label(), matched = matched.len(), "Applied class rule");

    for &at in &matched {
        blocks[at].add_label(rule.label());
    }

    if rule.children.is_empty() {
        return;
    }
    if let (Some(&first), Some(&last)) = (matched.first(), matched.last()) {
        for child in &rule.children {
            apply(child, blocks, first..=last);
        }
    }
}

/// An ordered rule set, validated once and reusable across documents.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: Vec<ClassRule>,
}

impl Classifier {
    /// Creates a classifier, warning about anchors on labels that no earlier
    /// rule assigns.
    #[must_use]
    pub fn new(rules: Vec<ClassRule>) -> Self {
        for reference in unresolved_references(&rules) {
            if reference.defined_later {
                warn!(
                    rule = %reference.rule,
                    label = %reference.label,
                    "Class rule anchors on a label assigned by a later rule; it will not be visible"
                );
            } else {
                warn!(
                    rule = %reference.rule,
                    label = %reference.label,
                    "Class rule anchors on a label no rule assigns"
                );
            }
        }
        Self { rules }
    }

    /// The rules in execution order.
    #[must_use]
    pub fn rules(&self) -> &[ClassRule] {
        &self.rules
    }

    /// Returns true if no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Labels `blocks` in place.
    pub fn classify<'b>(&self, blocks: &'b mut [Block]) -> &'b mut [Block] {
        classify(&self.rules, blocks)
    }
}
