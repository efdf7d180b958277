//! Block predicates used by the classifier.
//!
//! Every [`Matcher`] is a pure function of a block and the [`Scope`] it is
//! evaluated in. Anchors are re-resolved on each call so that labels
//! assigned by earlier classifier rules are visible to later ones.

use crate::block::{Block, BlockKind};
use regex::Regex;
use std::fmt;

// ────────────────────────────────────────────
// Anchored patterns
// ────────────────────────────────────────────

/// Error returned when a pattern is not a valid regular expression.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid pattern `{pattern}`: {source}")]
pub struct PatternError {
    /// The pattern as written in the configuration.
    pub pattern: String,
    /// Underlying regex error.
    #[source]
    pub source: regex::Error,
}

/// A regex that must match at the start of the text, not necessarily the
/// whole text.
#[derive(Clone)]
pub struct AnchoredPattern {
    source: String,
    regex: Regex,
}

impl AnchoredPattern {
    /// Compiles `pattern` anchored at the start of the input.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if the pattern matches at the start of `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Returns the first capture group of a match at the start of `text`.
    #[must_use]
    pub fn first_group<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for AnchoredPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnchoredPattern").field(&self.source).finish()
    }
}

impl PartialEq for AnchoredPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

fn paragraph_matches(block: &Block, pattern: &AnchoredPattern) -> bool {
    block
        .as_paragraph()
        .is_some_and(|p| pattern.is_match(&p.text))
}

// ────────────────────────────────────────────
// Scope
// ────────────────────────────────────────────

/// The blocks a matcher is evaluated against.
///
/// `document` is the whole block list and `span` the part a classifier rule
/// iterates over. They are the same slice at the top level; inside
/// `children` the span is the parent's range.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'b> {
    document: &'b [Block],
    span: &'b [Block],
}

impl<'b> Scope<'b> {
    /// Scope covering the whole document.
    #[must_use]
    pub fn document(blocks: &'b [Block]) -> Self {
        Self {
            document: blocks,
            span: blocks,
        }
    }

    /// Scope restricted to `span`, a contiguous part of `document`.
    #[must_use]
    pub fn within(document: &'b [Block], span: &'b [Block]) -> Self {
        Self { document, span }
    }

    /// Every block of the document.
    #[must_use]
    pub fn blocks(&self) -> &'b [Block] {
        self.document
    }

    /// Blocks of the evaluated span.
    #[must_use]
    pub fn span(&self) -> &'b [Block] {
        self.span
    }
}

// ────────────────────────────────────────────
// Positions and anchors
// ────────────────────────────────────────────

/// A position in a block sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Zero-based index; negative values count from the end.
    Index(i64),
    /// The first block.
    First,
    /// The last block.
    Last,
}

impl Position {
    /// Resolves to a concrete index for a sequence of `len` blocks.
    ///
    /// The result may be out of range; callers compare rather than index.
    #[must_use]
    pub fn resolve(self, len: usize) -> i64 {
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        match self {
            Self::Index(n) if n < 0 => len + n,
            Self::Index(n) => n,
            Self::First => 0,
            Self::Last => len - 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(n) => write!(f, "{n}"),
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// How a reference block is located.
#[derive(Debug, Clone, PartialEq)]
pub enum Anchor {
    /// First block of the document carrying the label.
    Label(String),
    /// Last block of the span carrying the label.
    LastLabel(String),
    /// Block at a document index (negative counts from the end).
    Position(i64),
    /// First paragraph of the document whose text matches.
    Pattern(AnchoredPattern),
    /// Block at a position within the span.
    Nth(i64),
}

impl Anchor {
    /// Finds the anchor block.
    #[must_use]
    pub fn resolve<'b>(&self, scope: Scope<'b>) -> Option<&'b Block> {
        let document = scope.blocks();
        match self {
            Self::Label(label) => document.iter().find(|b| b.has_label(label)),
            Self::LastLabel(label) => scope.span().iter().rev().find(|b| b.has_label(label)),
            Self::Position(n) => {
                let target = Position::Index(*n).resolve(document.len());
                document.iter().find(|b| i64::from(b.index()) == target)
            }
            Self::Pattern(pattern) => document.iter().find(|b| paragraph_matches(b, pattern)),
            Self::Nth(n) => {
                let span = scope.span();
                usize::try_from(Position::Index(*n).resolve(span.len()))
                    .ok()
                    .and_then(|at| span.get(at))
            }
        }
    }

    /// The referenced label, if this anchor is label-based.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Label(label) | Self::LastLabel(label) => Some(label),
            Self::Position(_) | Self::Pattern(_) | Self::Nth(_) => None,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, ".{label}"),
            Self::LastLabel(label) => write!(f, ".{label}:last"),
            Self::Position(n) => write!(f, "#{n}"),
            Self::Pattern(p) => write!(f, "/{}/", p.as_str()),
            Self::Nth(n) => write!(f, ":nth({n})"),
        }
    }
}

/// Side of the anchor a relative matcher looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Blocks following the anchor.
    After,
    /// Blocks preceding the anchor.
    Before,
}

// ────────────────────────────────────────────
// Matchers
// ────────────────────────────────────────────

/// A block predicate. A classifier rule ANDs several of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Block index equals the position resolved against the document.
    Position(Position),
    /// Position within the span (used inside a parent span).
    Nth(Position),
    /// Paragraph text matches at its start.
    Pattern(AnchoredPattern),
    /// Block variant equals the kind.
    Type(BlockKind),
    /// Block sits `offset` blocks away from the anchor, in `direction`.
    Relative {
        /// Reference block.
        anchor: Anchor,
        /// Side of the anchor.
        direction: Direction,
        /// Extra distance; `0` means immediately adjacent.
        offset: i64,
    },
    /// Block lies between two anchors.
    Range {
        /// Lower bound.
        after: Anchor,
        /// Upper bound.
        before: Anchor,
        /// Whether the lower anchor itself matches.
        include_after: bool,
        /// Whether the upper anchor itself matches.
        include_before: bool,
    },
}

impl Matcher {
    /// A range that excludes both anchors.
    #[must_use]
    pub fn between(after: Anchor, before: Anchor) -> Self {
        Self::Range {
            after,
            before,
            include_after: false,
            include_before: false,
        }
    }

    /// Tests `block` within `scope`.
    #[must_use]
    pub fn matches(&self, block: &Block, scope: Scope<'_>) -> bool {
        let index = i64::from(block.index());
        match self {
            Self::Position(position) => index == position.resolve(scope.blocks().len()),
            Self::Nth(position) => {
                let span = scope.span();
                span.binary_search_by_key(&block.index(), Block::index)
                    .ok()
                    .and_then(|at| i64::try_from(at).ok())
                    .is_some_and(|at| at == position.resolve(span.len()))
            }
            Self::Pattern(pattern) => paragraph_matches(block, pattern),
            Self::Type(kind) => block.kind() == *kind,
            Self::Relative {
                anchor,
                direction,
                offset,
            } => anchor.resolve(scope).is_some_and(|a| {
                let a = i64::from(a.index());
                let target = match direction {
                    Direction::After => a.checked_add(1).and_then(|t| t.checked_add(*offset)),
                    Direction::Before => a.checked_sub(1).and_then(|t| t.checked_sub(*offset)),
                };
                target == Some(index)
            }),
            Self::Range {
                after,
                before,
                include_after,
                include_before,
            } => {
                let (Some(lo), Some(hi)) = (after.resolve(scope), before.resolve(scope)) else {
                    return false;
                };
                let (lo, hi) = (i64::from(lo.index()), i64::from(hi.index()));
                let above = if *include_after { index >= lo } else { index > lo };
                let below = if *include_before { index <= hi } else { index < hi };
                above && below
            }
        }
    }

    /// Labels this matcher depends on.
    #[must_use]
    pub fn referenced_labels(&self) -> Vec<&str> {
        match self {
            Self::Relative { anchor, .. } => anchor.label().into_iter().collect(),
            Self::Range { after, before, .. } => {
                after.label().into_iter().chain(before.label()).collect()
            }
            Self::Position(_) | Self::Nth(_) | Self::Pattern(_) | Self::Type(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Paragraph, Table};

    fn doc(texts: &[&str]) -> Vec<Block> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Block::paragraph(u32::try_from(i).unwrap(), Paragraph::new(*t)))
            .collect()
    }

    fn matching(matcher: &Matcher, blocks: &[Block]) -> Vec<u32> {
        blocks
            .iter()
            .filter(|b| matcher.matches(b, Scope::document(blocks)))
            .map(Block::index)
            .collect()
    }

    fn matching_within(matcher: &Matcher, blocks: &[Block], span: &[Block]) -> Vec<u32> {
        span.iter()
            .filter(|b| matcher.matches(b, Scope::within(blocks, span)))
            .map(Block::index)
            .collect()
    }

    #[test]
    fn position_supports_negative_and_keywords() {
        let blocks = doc(&["a", "b", "c", "d"]);
        assert_eq!(matching(&Matcher::Position(Position::Index(1)), &blocks), [1]);
        assert_eq!(matching(&Matcher::Position(Position::Index(-1)), &blocks), [3]);
        assert_eq!(matching(&Matcher::Position(Position::Last), &blocks), [3]);
        assert_eq!(matching(&Matcher::Position(Position::First), &blocks), [0]);
        assert!(matching(&Matcher::Position(Position::Index(9)), &blocks).is_empty());
    }

    #[test]
    fn pattern_is_anchored_but_not_full() {
        let blocks = doc(&["摘要：本文", "本文摘要", "摘要"]);
        let m = Matcher::Pattern(AnchoredPattern::new("摘要").unwrap());
        assert_eq!(matching(&m, &blocks), [0, 2]);
    }

    #[test]
    fn pattern_skips_tables() {
        let blocks = vec![Block::table(0, Table::new(vec![vec!["摘要".into()]]))];
        let m = Matcher::Pattern(AnchoredPattern::new("摘要").unwrap());
        assert!(matching(&m, &blocks).is_empty());
    }

    #[test]
    fn invalid_pattern_fails_at_construction() {
        let err = AnchoredPattern::new("(unclosed").unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
    }

    #[test]
    fn relative_after_and_before_with_offset() {
        let mut blocks = doc(&["a", "b", "c", "d", "e"]);
        blocks[2] = blocks[2].clone().with_label("mid");
        let after = Matcher::Relative {
            anchor: Anchor::Label("mid".into()),
            direction: Direction::After,
            offset: 1,
        };
        let before = Matcher::Relative {
            anchor: Anchor::Label("mid".into()),
            direction: Direction::Before,
            offset: 0,
        };
        assert_eq!(matching(&after, &blocks), [4]);
        assert_eq!(matching(&before, &blocks), [1]);
    }

    #[test]
    fn relative_without_anchor_matches_nothing() {
        let blocks = doc(&["a", "b"]);
        let m = Matcher::Relative {
            anchor: Anchor::Label("missing".into()),
            direction: Direction::After,
            offset: 0,
        };
        assert!(matching(&m, &blocks).is_empty());
    }

    #[test]
    fn range_excludes_anchors() {
        let blocks = doc(&["目录", "x", "y", "参考文献", "z"]);
        let m = Matcher::between(
            Anchor::Pattern(AnchoredPattern::new("目录").unwrap()),
            Anchor::Pattern(AnchoredPattern::new("参考文献").unwrap()),
        );
        assert_eq!(matching(&m, &blocks), [1, 2]);
    }

    #[test]
    fn range_bounds_can_be_inclusive() {
        let blocks = doc(&["a", "b", "c", "d"]);
        let m = Matcher::Range {
            after: Anchor::Position(1),
            before: Anchor::Position(-1),
            include_after: true,
            include_before: false,
        };
        assert_eq!(matching(&m, &blocks), [1, 2]);
    }

    #[test]
    fn nth_uses_position_in_span() {
        let blocks = doc(&["a", "b", "c", "d"]);
        let span = &blocks[1..3];
        let m = Matcher::Nth(Position::Index(-1));
        assert_eq!(matching_within(&m, &blocks, span), [2]);
    }

    #[test]
    fn document_positions_ignore_the_span() {
        let blocks = doc(&["a", "b", "c", "d", "e"]);
        let span = &blocks[1..=2];
        let last = Matcher::Position(Position::Index(-1));
        assert!(matching_within(&last, &blocks, span).is_empty());

        let after_second_to_last = Matcher::Relative {
            anchor: Anchor::Position(-3),
            direction: Direction::After,
            offset: 0,
        };
        assert!(matching_within(&after_second_to_last, &blocks, span).is_empty());
        let before_last = Matcher::Relative {
            anchor: Anchor::Position(-3),
            direction: Direction::Before,
            offset: 0,
        };
        assert_eq!(matching_within(&before_last, &blocks, span), [1]);
    }

    #[test]
    fn last_label_bounds_use_the_final_occurrence_in_span() {
        let mut blocks = doc(&["T", "作者甲", "作者乙", "单位", "通讯作者", "END"]);
        for at in [1, 2] {
            blocks[at] = blocks[at].clone().with_label("author");
        }
        blocks[4] = blocks[4].clone().with_label("corr");
        let span = &blocks[1..=4];

        let first = Matcher::between(Anchor::Label("author".into()), Anchor::Label("corr".into()));
        assert_eq!(matching_within(&first, &blocks, span), [2, 3]);

        let last = Matcher::between(
            Anchor::LastLabel("author".into()),
            Anchor::LastLabel("corr".into()),
        );
        assert_eq!(matching_within(&last, &blocks, span), [3]);
    }

    #[test]
    fn extreme_offsets_match_nothing() {
        let mut blocks = doc(&["a", "b", "c"]);
        blocks[1] = blocks[1].clone().with_label("mid");
        for (direction, offset) in [(Direction::After, i64::MAX), (Direction::Before, i64::MAX)] {
            let m = Matcher::Relative {
                anchor: Anchor::Label("mid".into()),
                direction,
                offset,
            };
            assert!(matching(&m, &blocks).is_empty());
        }
        let m = Matcher::Relative {
            anchor: Anchor::Label("mid".into()),
            direction: Direction::Before,
            offset: i64::MIN,
        };
        assert!(matching(&m, &blocks).is_empty());
    }

    #[test]
    fn referenced_labels_from_anchors() {
        let m = Matcher::between(Anchor::Label("a".into()), Anchor::Position(0));
        assert_eq!(m.referenced_labels(), ["a"]);
    }
}
