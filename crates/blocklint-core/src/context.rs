//! Context passed to rules during evaluation.

use crate::block::{Block, Paragraph};
use crate::selector::Selector;

const CAPTION_STYLES: &[&str] = &["caption", "题注", "图题", "表题"];

/// Read-only view of the document handed to every rule.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// All blocks, in document order.
    pub blocks: &'a [Block],
    selector: Selector<'a>,
}

impl<'a> Context<'a> {
    /// Creates a context over `blocks`.
    #[must_use]
    pub fn new(blocks: &'a [Block]) -> Self {
        Self {
            blocks,
            selector: Selector::new(blocks),
        }
    }

    /// Selector over the same blocks.
    #[must_use]
    pub fn selector(&self) -> &Selector<'a> {
        &self.selector
    }

    /// Paragraph blocks with their content, in document order.
    pub fn paragraphs(&self) -> impl Iterator<Item = (&'a Block, &'a Paragraph)> + 'a {
        self.blocks
            .iter()
            .filter_map(|b| b.as_paragraph().map(|p| (b, p)))
    }

    /// Returns true if the block is a paragraph with a heading style.
    #[must_use]
    pub fn is_heading(block: &Block) -> bool {
        block
            .as_paragraph()
            .is_some_and(|p| is_heading_style(p.style_name()))
    }

    /// Returns true if the block is a paragraph with a caption style.
    #[must_use]
    pub fn is_caption(block: &Block) -> bool {
        block.as_paragraph().is_some_and(|p| {
            let name = p.style_name().to_lowercase();
            CAPTION_STYLES.contains(&name.as_str()) || name.contains("caption")
        })
    }

    /// Heading level of the block, when it has a heading style with a number.
    #[must_use]
    pub fn heading_level(block: &Block) -> Option<u32> {
        block
            .as_paragraph()
            .map(Paragraph::style_name)
            .filter(|style| is_heading_style(style))
            .and_then(style_level)
    }
}

/// Returns true for style names beginning with "heading" (any case) or "标题".
#[must_use]
pub fn is_heading_style(style: &str) -> bool {
    let name = style.trim().to_lowercase();
    name.starts_with("heading") || name.starts_with("标题")
}

/// The first run of ASCII digits in a style name (`"Heading 2"` → 2).
#[must_use]
pub fn style_level(style: &str) -> Option<u32> {
    let start = style.find(|c: char| c.is_ascii_digit())?;
    let digits: String = style[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
