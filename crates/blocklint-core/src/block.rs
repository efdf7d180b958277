//! Document block model.
//!
//! A [`Block`] is one top-level element of a document (a paragraph or a
//! table) at a fixed position in document order. Content is shared through
//! `Arc`, so cloning a block list for a second analysis pass is cheap and the
//! content itself is never mutated after the walker produced it.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ────────────────────────────────────────────
// Labels
// ────────────────────────────────────────────

/// Insertion-ordered set of semantic labels attached to a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Labels(Vec<String>);

impl Labels {
    /// Creates an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label. Returns `false` if it was already present.
    pub fn insert(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.contains(&label) {
            return false;
        }
        self.0.push(label);
        true
    }

    /// Returns true if the label is present.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    /// Iterates labels in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no labels are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Labels {
    fn from(values: Vec<String>) -> Self {
        let mut labels = Self::new();
        for value in values {
            labels.insert(value);
        }
        labels
    }
}

impl From<Labels> for Vec<String> {
    fn from(labels: Labels) -> Self {
        labels.0
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&String) -> &str>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(String::as_str)
    }
}

// ────────────────────────────────────────────
// Block kinds and alignment
// ────────────────────────────────────────────

/// The variant of a block, without its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// A paragraph-like element (body text, heading, caption, ...).
    Paragraph,
    /// A table.
    Table,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paragraph => write!(f, "paragraph"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// Error returned when a block kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown block kind `{0}`, expected: paragraph, table")]
pub struct UnknownBlockKind(pub String);

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "paragraph" => Ok(Self::Paragraph),
            "table" => Ok(Self::Table),
            other => Err(UnknownBlockKind(other.to_string())),
        }
    }
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Alignment {
    /// Left aligned.
    Left,
    /// Centered.
    Center,
    /// Right aligned.
    Right,
    /// Justified on both edges.
    Justify,
    /// Distributed (justified including the last line).
    Distribute,
}

impl Alignment {
    /// Returns the lowercase English name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
            Self::Distribute => "distribute",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an alignment name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alignment `{0}`")]
pub struct UnknownAlignment(pub String);

impl FromStr for Alignment {
    type Err = UnknownAlignment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "left" | "start" | "左对齐" => Ok(Self::Left),
            "center" | "centre" | "居中" => Ok(Self::Center),
            "right" | "end" | "右对齐" => Ok(Self::Right),
            "justify" | "both" | "两端对齐" => Ok(Self::Justify),
            "distribute" | "分散对齐" => Ok(Self::Distribute),
            _ => Err(UnknownAlignment(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for Alignment {
    type Error = UnknownAlignment;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ────────────────────────────────────────────
// Content
// ────────────────────────────────────────────

/// Character formatting of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Font {
    /// Western (ASCII) font name.
    pub name: Option<String>,
    /// East-Asian font name.
    pub east_asia: Option<String>,
    /// Font size in half-points.
    pub size: Option<u32>,
    /// Bold flag, `None` when inherited.
    pub bold: Option<bool>,
    /// Italic flag, `None` when inherited.
    pub italic: Option<bool>,
}

impl Font {
    /// Returns the East-Asian name if set, else the western name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.east_asia.as_deref().or(self.name.as_deref())
    }
}

/// A run of uniformly formatted text inside a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Run {
    /// Run text.
    pub text: String,
    /// Run formatting.
    pub font: Font,
}

impl Run {
    /// Creates a run with the given text and font.
    #[must_use]
    pub fn new(text: impl Into<String>, font: Font) -> Self {
        Self {
            text: text.into(),
            font,
        }
    }
}

/// Paragraph-level formatting. Indents and spacing are in twips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphFormat {
    /// Horizontal alignment.
    pub alignment: Option<Alignment>,
    /// Line spacing as a multiple of single spacing.
    pub line_spacing: Option<f64>,
    /// First-line indent.
    pub first_line_indent: Option<i32>,
    /// Left indent.
    pub left_indent: Option<i32>,
    /// Right indent.
    pub right_indent: Option<i32>,
    /// Space before the paragraph.
    pub space_before: Option<i32>,
    /// Space after the paragraph.
    pub space_after: Option<i32>,
}

/// A paragraph as extracted by the walker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paragraph {
    /// Full paragraph text.
    pub text: String,
    /// Paragraph style name (e.g. "Heading 1").
    pub style: Option<String>,
    /// Formatted runs.
    pub runs: Vec<Run>,
    /// Paragraph formatting.
    pub format: ParagraphFormat,
}

impl Paragraph {
    /// Creates a plain paragraph with the given text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Sets the style name.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Appends a run.
    #[must_use]
    pub fn with_run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    /// Sets the paragraph formatting.
    #[must_use]
    pub fn with_format(mut self, format: ParagraphFormat) -> Self {
        self.format = format;
        self
    }

    /// Returns the style name, or an empty string when unset.
    #[must_use]
    pub fn style_name(&self) -> &str {
        self.style.as_deref().unwrap_or("").trim()
    }
}

/// A table as extracted by the walker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    /// Cell texts, row by row.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table from rows of cell text.
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// All cell texts joined by a single space.
    #[must_use]
    pub fn text(&self) -> String {
        self.rows
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Walker output element: block content without position or labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    /// A paragraph.
    Paragraph(Paragraph),
    /// A table.
    Table(Table),
}

// ────────────────────────────────────────────
// Blocks
// ────────────────────────────────────────────

/// A paragraph at a position in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphBlock {
    index: u32,
    labels: Labels,
    paragraph: Arc<Paragraph>,
}

impl ParagraphBlock {
    /// The paragraph content.
    #[must_use]
    pub fn paragraph(&self) -> &Paragraph {
        &self.paragraph
    }
}

/// A table at a position in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBlock {
    index: u32,
    labels: Labels,
    table: Arc<Table>,
}

impl TableBlock {
    /// The table content.
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }
}

/// One document element in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    /// A paragraph block.
    Paragraph(ParagraphBlock),
    /// A table block.
    Table(TableBlock),
}

impl Block {
    /// Creates a paragraph block.
    #[must_use]
    pub fn paragraph(index: u32, paragraph: Paragraph) -> Self {
        Self::Paragraph(ParagraphBlock {
            index,
            labels: Labels::new(),
            paragraph: Arc::new(paragraph),
        })
    }

    /// Creates a table block.
    #[must_use]
    pub fn table(index: u32, table: Table) -> Self {
        Self::Table(TableBlock {
            index,
            labels: Labels::new(),
            table: Arc::new(table),
        })
    }

    /// Creates a block from a walker element.
    #[must_use]
    pub fn from_element(index: u32, element: Element) -> Self {
        match element {
            Element::Paragraph(p) => Self::paragraph(index, p),
            Element::Table(t) => Self::table(index, t),
        }
    }

    /// Adds a label while building a block list.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels_mut().insert(label);
        self
    }

    /// Zero-based position in document order.
    #[must_use]
    pub fn index(&self) -> u32 {
        match self {
            Self::Paragraph(b) => b.index,
            Self::Table(b) => b.index,
        }
    }

    /// The block variant.
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Paragraph(_) => BlockKind::Paragraph,
            Self::Table(_) => BlockKind::Table,
        }
    }

    /// Semantic labels assigned so far.
    #[must_use]
    pub fn labels(&self) -> &Labels {
        match self {
            Self::Paragraph(b) => &b.labels,
            Self::Table(b) => &b.labels,
        }
    }

    /// Returns true if the block carries `label`.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels().contains(label)
    }

    pub(crate) fn add_label(&mut self, label: &str) -> bool {
        self.labels_mut().insert(label)
    }

    fn labels_mut(&mut self) -> &mut Labels {
        match self {
            Self::Paragraph(b) => &mut b.labels,
            Self::Table(b) => &mut b.labels,
        }
    }

    fn set_index(&mut self, index: u32) {
        match self {
            Self::Paragraph(b) => b.index = index,
            Self::Table(b) => b.index = index,
        }
    }

    /// Paragraph content, if this is a paragraph.
    #[must_use]
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Self::Paragraph(b) => Some(&b.paragraph),
            Self::Table(_) => None,
        }
    }

    /// Table content, if this is a table.
    #[must_use]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Paragraph(_) => None,
            Self::Table(b) => Some(&b.table),
        }
    }

    /// Plain text: paragraph text, or all table cells joined by spaces.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Paragraph(b) => Cow::Borrowed(b.paragraph.text.as_str()),
            Self::Table(b) => Cow::Owned(b.table.text()),
        }
    }

    /// The first `max_chars` characters of the trimmed text.
    #[must_use]
    pub fn hint(&self, max_chars: usize) -> String {
        self.text().trim().chars().take(max_chars).collect()
    }
}

/// Reassigns indices so they equal each block's position in the slice.
pub fn rebuild_indices(blocks: &mut [Block]) {
    for (position, block) in blocks.iter_mut().enumerate() {
        block.set_index(u32::try_from(position).unwrap_or(u32::MAX));
    }
}
