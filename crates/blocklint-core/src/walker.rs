//! Sources of blocks.
//!
//! Extracting paragraphs and tables from a document file happens outside
//! this crate. A [`Walker`] hands over the extracted elements in document
//! order; [`JsonWalker`] reads them from a JSON array such as:
//!
//! ```json
//! [
//!   {"type": "paragraph", "text": "摘要", "style": "Heading 1"},
//!   {"type": "table", "rows": [["a", "b"]]}
//! ]
//! ```

use crate::block::{Block, Element};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors produced while reading elements.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// The input file could not be read.
    #[error("Failed to read blocks file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The input is not a JSON array of elements.
    #[error("Invalid block list: {0}")]
    Json(#[from] serde_json::Error),
}

/// Produces document elements in document order.
pub trait Walker {
    /// Returns every element of the document.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError`] when the source cannot be read.
    fn elements(&self) -> Result<Vec<Element>, WalkError>;

    /// Returns every element wrapped as an unlabeled block.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError`] when the source cannot be read.
    fn blocks(&self) -> Result<Vec<Block>, WalkError> {
        Ok(blocks_from_elements(self.elements()?))
    }
}

/// Wraps elements as blocks numbered from zero.
#[must_use]
pub fn blocks_from_elements(elements: impl IntoIterator<Item = Element>) -> Vec<Block> {
    elements
        .into_iter()
        .zip(0u32..)
        .map(|(element, index)| Block::from_element(index, element))
        .collect()
}

/// Reads elements from JSON text.
#[derive(Debug, Clone)]
pub struct JsonWalker {
    source: JsonSource,
}

#[derive(Debug, Clone)]
enum JsonSource {
    Path(PathBuf),
    Text(String),
}

impl JsonWalker {
    /// Reads elements from a file.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: JsonSource::Path(path.into()),
        }
    }

    /// Reads elements from an in-memory JSON string.
    #[must_use]
    pub fn from_json(text: impl Into<String>) -> Self {
        Self {
            source: JsonSource::Text(text.into()),
        }
    }

    /// The file being read, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            JsonSource::Path(path) => Some(path),
            JsonSource::Text(_) => None,
        }
    }
}

impl Walker for JsonWalker {
    fn elements(&self) -> Result<Vec<Element>, WalkError> {
        let elements: Vec<Element> = match &self.source {
            JsonSource::Path(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| WalkError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                serde_json::from_str(&content)?
            }
            JsonSource::Text(text) => serde_json::from_str(text)?,
        };
        debug!("Read {} elements", elements.len());
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;

    #[test]
    fn reads_paragraphs_and_tables() {
        let walker = JsonWalker::from_json(
            r#"[
                {"type": "paragraph", "text": "标题", "style": "Title",
                 "runs": [{"text": "标题", "font": {"east_asia": "黑体", "size": 44, "bold": true}}],
                 "format": {"alignment": "center", "line_spacing": 1.5}},
                {"type": "table", "rows": [["a", "b"], ["c"]]},
                {"type": "paragraph", "text": "正文"}
            ]"#,
        );
        let blocks = walker.blocks().unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks.iter().map(Block::index).collect::<Vec<_>>(),
            [0, 1, 2]
        );
        assert_eq!(blocks[1].kind(), BlockKind::Table);
        assert_eq!(blocks[1].text(), "a b c");

        let title = blocks[0].as_paragraph().unwrap();
        assert_eq!(title.style_name(), "Title");
        assert_eq!(title.runs[0].font.size, Some(44));
        assert_eq!(title.format.line_spacing, Some(1.5));
        assert!(blocks.iter().all(|b| b.labels().is_empty()));
    }

    #[test]
    fn rejects_unknown_element_type() {
        let err = JsonWalker::from_json(r#"[{"type": "image"}]"#)
            .elements()
            .unwrap_err();
        assert!(matches!(err, WalkError::Json(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let walker = JsonWalker::from_path("/nonexistent/blocks.json");
        assert!(walker.path().is_some());
        assert!(matches!(walker.blocks(), Err(WalkError::Io { .. })));
    }
}
