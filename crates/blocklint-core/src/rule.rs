//! Rule traits for defining lint rules.

use crate::block::Block;
use crate::context::Context;
use crate::types::Issue;

/// A per-block lint rule.
///
/// The engine visits every block once, in document order, and calls
/// [`check`](Rule::check) for each block where
/// [`applies_to`](Rule::applies_to) returns true.
///
/// # Example
///
/// ```
/// use blocklint_core::{Block, Context, Issue, Location, Rule, Severity};
///
/// pub struct NoEmptyParagraphs;
///
/// impl Rule for NoEmptyParagraphs {
///     fn id(&self) -> &str { "EMPTY-001" }
///     fn kind(&self) -> &'static str { "no-empty-paragraphs" }
///
///     fn applies_to(&self, block: &Block, _ctx: &Context<'_>) -> bool {
///         block.as_paragraph().is_some()
///     }
///
///     fn check(&self, block: &Block, _ctx: &Context<'_>) -> Vec<Issue> {
///         if block.text().trim().is_empty() {
///             vec![Issue::new(self.id(), Severity::Warn, "empty paragraph", Location::of_block(block))]
///         } else {
///             vec![]
///         }
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the instance id used as issue code (e.g., "HDG_SEQ-004").
    fn id(&self) -> &str;

    /// Returns the kebab-case rule kind (e.g., "heading-numbering").
    fn kind(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Cheap filter deciding whether [`check`](Rule::check) runs for `block`.
    fn applies_to(&self, _block: &Block, _ctx: &Context<'_>) -> bool {
        true
    }

    /// Checks a single block and returns any issues found.
    fn check(&self, block: &Block, ctx: &Context<'_>) -> Vec<Issue>;

    /// Returns the whole-document capability, if this rule has one.
    fn as_finalize(&self) -> Option<&dyn FinalizeRule> {
        None
    }
}

/// A rule with a whole-document pass.
///
/// [`finalize`](FinalizeRule::finalize) runs exactly once, after every block
/// was visited. Implementors return `Some(self)` from
/// [`Rule::as_finalize`].
pub trait FinalizeRule: Rule {
    /// Checks the whole document.
    fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue>;
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Paragraph;
    use crate::types::{Location, Severity};

    struct CountParagraphs;

    impl Rule for CountParagraphs {
        fn id(&self) -> &str {
            "COUNT-001"
        }
        fn kind(&self) -> &'static str {
            "count-paragraphs"
        }
        fn check(&self, _block: &Block, _ctx: &Context<'_>) -> Vec<Issue> {
            vec![]
        }
        fn as_finalize(&self) -> Option<&dyn FinalizeRule> {
            Some(self)
        }
    }

    impl FinalizeRule for CountParagraphs {
        fn finalize(&self, ctx: &Context<'_>) -> Vec<Issue> {
            vec![Issue::new(
                self.id(),
                Severity::Info,
                format!("{} paragraphs", ctx.paragraphs().count()),
                Location::document(""),
            )]
        }
    }

    #[test]
    fn finalize_capability_is_discoverable() {
        let blocks = vec![Block::paragraph(0, Paragraph::new("a"))];
        let ctx = Context::new(&blocks);
        let rule: RuleBox = Box::new(CountParagraphs);
        assert!(rule.applies_to(&blocks[0], &ctx));
        let issues = rule.as_finalize().map(|f| f.finalize(&ctx)).unwrap();
        assert_eq!(issues[0].message, "1 paragraphs");
        assert_eq!(rule.description(), "");
    }
}
