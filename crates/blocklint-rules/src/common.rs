//! Helpers shared by the built-in rules.

use crate::error::RuleBuildError;
use blocklint_core::{AnchoredPattern, Block, Paragraph, RuleSpec};
use serde::de::DeserializeOwned;
use std::fmt::Display;

/// Paragraph selection by style name and block index.
///
/// An empty filter accepts everything; filters that are set must all pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    styles: Vec<String>,
    blocks: Vec<u32>,
    range: Option<(u32, u32)>,
}

impl Targets {
    /// Accepts every paragraph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to paragraphs whose style is one of `styles`.
    #[must_use]
    pub fn with_styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.styles.extend(styles.into_iter().map(Into::into));
        self
    }

    /// Restricts to the listed block indices.
    #[must_use]
    pub fn with_blocks(mut self, blocks: impl IntoIterator<Item = u32>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    /// Restricts to indices in `start..end`.
    #[must_use]
    pub fn with_range(mut self, start: u32, end: u32) -> Self {
        self.range = Some((start, end));
        self
    }

    /// Returns true if no filter is set.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.styles.is_empty() && self.blocks.is_empty() && self.range.is_none()
    }

    /// Tests a paragraph block.
    #[must_use]
    pub fn accepts(&self, block: &Block, paragraph: &Paragraph) -> bool {
        let index = block.index();
        if let Some((start, end)) = self.range {
            if !(start..end).contains(&index) {
                return false;
            }
        }
        if !self.blocks.is_empty() && !self.blocks.contains(&index) {
            return false;
        }
        self.styles.is_empty() || self.styles.iter().any(|s| s == paragraph.style_name())
    }

    pub(crate) fn from_params(styles: Vec<String>, blocks: Vec<u32>, range: Option<[u32; 2]>) -> Self {
        let targets = Self::new().with_styles(styles).with_blocks(blocks);
        match range {
            Some([start, end]) => targets.with_range(start, end),
            None => targets,
        }
    }
}

/// `"{description}: {message}"`, or just the message without a description.
pub(crate) fn prefixed(description: &str, message: impl Display) -> String {
    if description.is_empty() {
        message.to_string()
    } else {
        format!("{description}: {message}")
    }
}

/// Instance id of a spec, falling back to the upper-cased kind.
pub(crate) fn spec_id(spec: &RuleSpec) -> String {
    spec.id
        .clone()
        .unwrap_or_else(|| spec.kind.to_uppercase().replace('-', "_"))
}

/// Deserializes the options of `spec` into `T`.
pub(crate) fn params<T: DeserializeOwned>(spec: &RuleSpec, id: &str) -> Result<T, RuleBuildError> {
    spec.params().map_err(|e| RuleBuildError::Params {
        id: id.to_string(),
        message: e.to_string().trim().to_string(),
    })
}

/// Compiles a start-anchored pattern parameter.
pub(crate) fn anchored(id: &str, field: &'static str, pattern: &str) -> Result<AnchoredPattern, RuleBuildError> {
    AnchoredPattern::new(pattern).map_err(|e| RuleBuildError::pattern(id, field, e))
}

/// Compiles an unanchored pattern parameter.
pub(crate) fn unanchored(id: &str, field: &'static str, pattern: &str) -> Result<regex::Regex, RuleBuildError> {
    regex::Regex::new(pattern).map_err(|source| {
        RuleBuildError::pattern(
            id,
            field,
            blocklint_core::PatternError {
                pattern: pattern.to_string(),
                source,
            },
        )
    })
}

/// The trimmed text of a paragraph.
pub(crate) fn trimmed(paragraph: &Paragraph) -> &str {
    paragraph.text.trim()
}

/// The first `n` characters of `text`.
pub(crate) fn truncate(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
