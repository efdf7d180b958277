//! # blocklint-rules
//!
//! Built-in rule kinds for blocklint.
//!
//! Each kind can be instantiated from a `[[rules]]` entry through the
//! [`RuleRegistry`], constructed directly with its builder, or produced by
//! the [`RuleGenerator`] from a `[document]` description.
//!
//! ## Available Kinds
//!
//! | Kind | Scope | Description |
//! |------|-------|-------------|
//! | `font-style` | block | Run font name, size, bold and italic |
//! | `paragraph-format` | block | Line spacing, alignment, indents and spacing |
//! | `paragraph-content` | block | Paragraph text presence and length |
//! | `matching` | block | Paragraph text against a regex |
//! | `heading-numbering` | document | Consecutive heading numbers per level |
//! | `heading-hierarchy` | document | Sub-heading numbers extend their parent's |
//! | `sequence` | document | Heading number sequence per style level |
//! | `counting` | document | Number of paragraphs, tables or headings |
//! | `presence` | document | A required element is present |
//! | `page-continuity` | document | Page numbers of list entries never decrease |
//! | `references-heading` | document | The reference section exists |
//! | `references-citation` | document | Every reference is cited |
//! | `citation-validity` | document | Every citation has a reference entry |
//! | `references-heading-level` | document | Reference section heading level |
//! | `selector-check` | document | Selector with a pattern, exists, count or count_equals check |
//!
//! ## Usage
//!
//! ```
//! use blocklint_core::{Block, Context, Paragraph, RuleSpec};
//! use blocklint_rules::RuleRegistry;
//!
//! let registry = RuleRegistry::with_builtins();
//! let spec = RuleSpec::new("paragraph-content")
//!     .with_id("ABSTRACT")
//!     .with_option("target_blocks", vec![0_i64])
//!     .with_option("min_length", 10_i64);
//! let rule = registry.build(&spec).unwrap();
//!
//! let blocks = vec![Block::paragraph(0, Paragraph::new("摘要"))];
//! let ctx = Context::new(&blocks);
//! assert!(rule.applies_to(&blocks[0], &ctx));
//! assert_eq!(rule.check(&blocks[0], &ctx).len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod common;
mod counting;
mod error;
mod font_style;
mod generator;
mod heading;
mod matching;
mod paragraph_content;
mod paragraph_format;
mod references;
mod registry;
mod selector_check;
mod sequence;
mod structure;

pub use common::Targets;
pub use counting::{CountBounds, CountingRule, TargetType};
pub use error::{GenerateError, RuleBuildError};
pub use font_style::FontStyleRule;
pub use generator::RuleGenerator;
pub use heading::{
    HeadingHierarchyRule, HeadingNumberingRule, HeadingNumbers, DEFAULT_NUMBERING_PATTERNS,
};
pub use matching::{MatchType, MatchingRule};
pub use paragraph_content::ParagraphContentRule;
pub use paragraph_format::{Indents, ParagraphFormatRule};
pub use references::{
    CitationValidationRule, ReferencesCitationRule, ReferencesHeadingLevelRule,
    ReferencesHeadingRule, DEFAULT_HEADING,
};
pub use registry::{RuleFactory, RuleRegistry};
pub use selector_check::{
    Check, Condition, CountExpr, CountOp, InvalidCountExpr, RefCount, SelectorCheckRule,
};
pub use sequence::SequenceRule;
pub use structure::{PageContinuityRule, PresenceMatch, PresenceRule};

/// Re-export core types for convenience.
pub use blocklint_core::{FinalizeRule, Rule, RuleBox, RuleSpec, Severity};
