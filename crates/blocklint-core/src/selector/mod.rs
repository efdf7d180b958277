//! CSS-like queries over labeled blocks.
//!
//! Grammar: whitespace-separated `.class[:pseudo]`, `[type="table"]` and the
//! combinators `>`, `+`, `~`. Two simple tokens in a row are joined by an
//! implicit descendant combinator.
//!
//! Blocks form a flat sequence with no nesting, so `>` and the descendant
//! combinator both reduce to filtering the current candidates. `+` maps each
//! candidate to its document-order successor; `~` maps candidates to every
//! later block.
//!
//! [`Selector::select`] and its shorthands are permissive: tokens outside the
//! grammar are skipped and leave the candidates unchanged. [`Query::parse`]
//! rejects them, for selectors checked when a configuration is loaded.
//!
//! ```
//! use blocklint_core::{Block, Paragraph, Selector};
//!
//! let blocks = vec![
//!     Block::paragraph(0, Paragraph::new("摘要")).with_label("heading-intro"),
//!     Block::paragraph(1, Paragraph::new("本文……")).with_label("body-intro"),
//! ];
//! let selector = Selector::new(&blocks);
//! let found = selector.select(".heading-intro + .body-intro");
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].index(), 1);
//! ```

mod parser;

pub use parser::{tokenize, tokenize_lenient, AttrFilter, Pseudo, SelectorError, SelectorToken};

use crate::block::Block;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A parsed selector, validated once and reusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    source: String,
    tokens: Vec<SelectorToken>,
}

impl Query {
    /// Parses a selector string.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] if the string is outside the grammar.
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            source: selector.trim().to_string(),
            tokens: tokenize(selector)?,
        })
    }

    /// Parses a selector string, skipping tokens outside the grammar.
    #[must_use]
    pub fn lenient(selector: &str) -> Self {
        Self {
            source: selector.trim().to_string(),
            tokens: tokenize_lenient(selector),
        }
    }

    /// The tokens in evaluation order.
    #[must_use]
    pub fn tokens(&self) -> &[SelectorToken] {
        &self.tokens
    }

    /// The selector as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for Query {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Evaluates queries against a block sequence.
///
/// Results borrow from the sequence and keep document order. Nothing is
/// cached, so queries always reflect the current labels.
#[derive(Debug, Clone, Copy)]
pub struct Selector<'a> {
    blocks: &'a [Block],
}

impl<'a> Selector<'a> {
    /// Creates a selector over `blocks`.
    #[must_use]
    pub fn new(blocks: &'a [Block]) -> Self {
        Self { blocks }
    }

    /// The underlying blocks.
    #[must_use]
    pub fn blocks(&self) -> &'a [Block] {
        self.blocks
    }

    /// All blocks matching `selector`.
    ///
    /// Unknown tokens are skipped; a selector with nothing selectable left
    /// matches nothing.
    #[must_use]
    pub fn select(&self, selector: &str) -> Vec<&'a Block> {
        let query = Query::lenient(selector);
        if query.tokens().is_empty() {
            debug!(selector, "Selector has no usable tokens");
            return Vec::new();
        }
        self.query(&query)
    }

    /// The first block matching `selector`.
    #[must_use]
    pub fn select_one(&self, selector: &str) -> Option<&'a Block> {
        self.select(selector).into_iter().next()
    }

    /// Returns true if any block matches `selector`.
    #[must_use]
    pub fn exists(&self, selector: &str) -> bool {
        !self.select(selector).is_empty()
    }

    /// Number of blocks matching `selector`.
    #[must_use]
    pub fn count(&self, selector: &str) -> usize {
        self.select(selector).len()
    }

    /// Evaluates a parsed query.
    #[must_use]
    pub fn query(&self, query: &Query) -> Vec<&'a Block> {
        let mut candidates: Vec<&'a Block> = self.blocks.iter().collect();
        let mut tokens = query.tokens().iter();

        while let Some(token) = tokens.next() {
            candidates = match token {
                SelectorToken::Class(_) | SelectorToken::Attr(_) => filter(candidates, token),
                SelectorToken::Pseudo(pseudo) => apply_pseudo(candidates, *pseudo),
                SelectorToken::Child | SelectorToken::Descendant => match tokens.next() {
                    Some(next) => filter(candidates, next),
                    None => candidates,
                },
                SelectorToken::Adjacent => match tokens.next() {
                    Some(next) => self.successors(&candidates, next),
                    None => candidates,
                },
                SelectorToken::Sibling => match tokens.next() {
                    Some(next) => self.later_siblings(&candidates, next),
                    None => candidates,
                },
            };
        }

        debug!(selector = query.as_str(), matched = candidates.len(), "Evaluated selector");
        candidates
    }

    fn position_of(&self, block: &Block) -> Option<usize> {
        self.blocks
            .binary_search_by_key(&block.index(), Block::index)
            .ok()
    }

    fn successors(&self, candidates: &[&'a Block], token: &SelectorToken) -> Vec<&'a Block> {
        candidates
            .iter()
            .filter_map(|b| self.position_of(b))
            .filter_map(|at| self.blocks.get(at + 1))
            .filter(|next| passes(next, token))
            .collect()
    }

    fn later_siblings(&self, candidates: &[&'a Block], token: &SelectorToken) -> Vec<&'a Block> {
        let Some(start) = candidates.iter().filter_map(|b| self.position_of(b)).min() else {
            return Vec::new();
        };
        self.blocks[start + 1..]
            .iter()
            .filter(|b| passes(b, token))
            .collect()
    }
}

fn passes(block: &Block, token: &SelectorToken) -> bool {
    match token {
        SelectorToken::Class(name) => block.has_label(name),
        SelectorToken::Attr(AttrFilter::Type(kind)) => block.kind() == *kind,
        _ => true,
    }
}

fn filter<'a>(candidates: Vec<&'a Block>, token: &SelectorToken) -> Vec<&'a Block> {
    candidates.into_iter().filter(|b| passes(b, token)).collect()
}

fn apply_pseudo(candidates: Vec<&Block>, pseudo: Pseudo) -> Vec<&Block> {
    let picked = match pseudo {
        Pseudo::First => candidates.first(),
        Pseudo::Last => candidates.last(),
        Pseudo::Nth(n) | Pseudo::NthOfType(n) => {
            usize::try_from(n).ok().and_then(|n| candidates.get(n))
        }
    };
    picked.copied().into_iter().collect()
}
