//! # blocklint
//!
//! Semantic labeling, CSS-like querying and style linting for the flattened
//! block sequence of a structured document.
//!
//! This is the main facade crate that re-exports the core engine and the
//! built-in rules, and adds the [`Linter`] orchestrator.
//!
//! ## Quick Start
//!
//! ```toml
//! # blocklint.toml
//! [[classifiers]]
//! class = "heading-intro"
//! match = { pattern = '摘\s*要$' }
//!
//! [[classifiers]]
//! class = "body-intro"
//! match = { type = "paragraph", after = { class = "heading-intro" } }
//!
//! [styles.".body-intro"]
//! paragraph = { line_spacing = "1.5倍", first_line_indent = "2字符" }
//! ```
//!
//! ```no_run
//! use blocklint::walker::{JsonWalker, Walker};
//! use blocklint::{Config, Linter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file("blocklint.toml".as_ref())?;
//! let linter = Linter::from_config(&config)?;
//! let mut blocks = JsonWalker::from_path("thesis.json").blocks()?;
//! let report = linter.run(&mut blocks);
//! for issue in &report.issues {
//!     println!("{issue}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modes
//!
//! - **class-style**: classifiers label the blocks, then every `[styles]`
//!   entry is checked against the blocks carrying its label.
//! - **rules**: classifiers run if configured, then `[[rules]]` instances and
//!   the rules generated from `[document]` are evaluated.
//!
//! `[engine] mode = "auto"` picks class-style whenever `[styles]` is present.

#![forbid(unsafe_code)]

// Re-export core types and traits
pub use blocklint_core::*;

/// Built-in rule kinds, registry and generator.
pub mod rules {
    pub use blocklint_rules::*;
}

mod linter;

pub use linter::{LintError, Linter, Mode, Phase};
