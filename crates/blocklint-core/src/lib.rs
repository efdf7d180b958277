//! # blocklint-core
//!
//! Core framework for labeling, querying and linting the flattened block
//! sequence of a structured document.
//!
//! This crate provides the foundational types and engines:
//!
//! - [`Block`] and [`Issue`] for the document model and findings
//! - [`Matcher`] and [`Classifier`] for semantic labeling
//! - [`Selector`] for CSS-like queries over labels
//! - [`Rule`] / [`FinalizeRule`] and [`Engine`] for rule evaluation
//! - [`StyleChecker`] for label-scoped formatting checks
//!
//! ## Example
//!
//! ```
//! use blocklint_core::{classify, Block, ClassRule, Matcher, Paragraph, Position, Selector};
//!
//! let mut blocks = vec![
//!     Block::paragraph(0, Paragraph::new("论文题目")),
//!     Block::paragraph(1, Paragraph::new("摘要")),
//! ];
//! let rules = [ClassRule::new("title").with_matcher(Matcher::Position(Position::Index(0)))];
//! classify(&rules, &mut blocks);
//!
//! let selector = Selector::new(&blocks);
//! assert_eq!(selector.select_one(".title").map(Block::index), Some(0));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod block;
mod classifier;
mod config;
mod context;
mod engine;
mod matcher;
mod rule;
mod style;
mod types;

/// Declarative classifier and style loading.
pub mod declarative;
/// CSS-like selector engine.
pub mod selector;
/// Unit conversion for font sizes and spacing.
pub mod units;
/// Element sources.
pub mod walker;

pub use block::{
    rebuild_indices, Alignment, Block, BlockKind, Element, Font, Labels, Paragraph,
    ParagraphBlock, ParagraphFormat, Run, Table, TableBlock, UnknownAlignment, UnknownBlockKind,
};
pub use classifier::{classify, unresolved_references, ClassRule, Classifier, UnresolvedReference};
pub use config::{Config, ConfigError, EngineConfig, EngineMode, RuleOverride, RuleSpec};
pub use context::{is_heading_style, style_level, Context};
pub use engine::{Engine, EngineBuilder, EngineError, Overrides};
pub use matcher::{Anchor, AnchoredPattern, Direction, Matcher, PatternError, Position, Scope};
pub use rule::{FinalizeRule, Rule, RuleBox};
pub use selector::{Query, Selector, SelectorError};
pub use style::{Expected, FontStyle, ParagraphStyle, StyleChecker, StyleDef};
pub use types::{Evidence, Issue, LintReport, Location, Severity, UnknownSeverity, HINT_LEN};
pub use walker::{blocks_from_elements, JsonWalker, WalkError, Walker};
