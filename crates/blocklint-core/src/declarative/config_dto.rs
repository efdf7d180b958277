//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde. They are converted to
//! [`ClassRule`](crate::ClassRule)s and [`StyleDef`](crate::StyleDef)s by the
//! loader, which performs all validation.

use crate::units::Measure;
use serde::{Deserialize, Serialize};

/// One `[[classifiers]]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassRuleDto {
    /// Label assigned to matching blocks.
    pub class: String,
    /// Matcher conjunction.
    #[serde(rename = "match", default)]
    pub matcher: MatchDto,
    /// Rules evaluated inside the span of this rule's matches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ClassRuleDto>,
}

/// The `match` table of a classifier rule. Every present key adds a matcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchDto {
    /// Block type: `"paragraph"` or `"table"`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Position in integer, keyword or table form.
    #[serde(default)]
    pub position: Option<PositionDto>,
    /// Regex matched at the start of paragraph text.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Anchor the block must follow.
    #[serde(default)]
    pub after: Option<AnchorDto>,
    /// Anchor the block must precede.
    #[serde(default)]
    pub before: Option<AnchorDto>,
    /// Distance from `after`/`before` anchors (default 0).
    #[serde(default)]
    pub offset: Option<i64>,
    /// Open range between two anchors.
    #[serde(default)]
    pub range: Option<RangeDto>,
}

/// `position = 0`, `position = "last"` or `position = { type = ..., ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionDto {
    /// Integer index; negative counts from the end.
    Index(i64),
    /// `"first"` or `"last"`.
    Keyword(String),
    /// Table form.
    Spec(PositionSpecDto),
}

/// Table form of a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionSpecDto {
    /// `absolute`, `relative`, `next` or `prev`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Index or range expression (`absolute`, `relative`).
    #[serde(default)]
    pub index: Option<IndexDto>,
    /// Anchor label (`next`, `prev`).
    #[serde(default)]
    pub class: Option<String>,
    /// Distance from the anchor (`next`, `prev`).
    #[serde(default)]
    pub offset: i64,
}

/// An index that may be a number or an expression string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexDto {
    /// Integer index.
    Number(i64),
    /// Keyword or range expression such as `"(a, b]"`.
    Expr(String),
}

/// Anchor position. Exactly one field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchorDto {
    /// First block carrying this label.
    #[serde(default)]
    pub class: Option<String>,
    /// Block at this index.
    #[serde(default)]
    pub position: Option<i64>,
    /// First paragraph matching this regex.
    #[serde(default)]
    pub pattern: Option<String>,
}

/// `range = { after = {...}, before = {...} }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeDto {
    /// Lower anchor (excluded).
    pub after: AnchorDto,
    /// Upper anchor (excluded).
    pub before: AnchorDto,
}

/// One `[styles.".label"]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleDefDto {
    /// Character formatting.
    #[serde(default)]
    pub font: Option<FontDto>,
    /// Paragraph formatting.
    #[serde(default)]
    pub paragraph: Option<ParagraphDto>,
}

/// Expected character formatting as written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontDto {
    /// East-Asian font name.
    #[serde(default)]
    pub name_eastasia: Option<String>,
    /// Western font name.
    #[serde(default)]
    pub name_ascii: Option<String>,
    /// Font size (`"三号"`, `"16pt"`, `16`).
    #[serde(default)]
    pub size: Option<Measure>,
    /// Bold flag.
    #[serde(default)]
    pub bold: Option<bool>,
    /// Italic flag.
    #[serde(default)]
    pub italic: Option<bool>,
}

/// Expected paragraph formatting as written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParagraphDto {
    /// Alignment name, English or Chinese.
    #[serde(default)]
    pub alignment: Option<String>,
    /// Line spacing (`1.5`, `"1.5倍"`, `"20pt"`).
    #[serde(default)]
    pub line_spacing: Option<Measure>,
    /// First-line indent (`"2字符"`).
    #[serde(default)]
    pub first_line_indent: Option<Measure>,
    /// Space before (`"0.5行"`, `"6pt"`).
    #[serde(default)]
    pub space_before: Option<Measure>,
    /// Space after.
    #[serde(default)]
    pub space_after: Option<Measure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Doc {
        #[serde(default)]
        classifiers: Vec<ClassRuleDto>,
    }

    #[test]
    fn deserialize_position_forms() {
        let doc: Doc = toml::from_str(
            r#"
[[classifiers]]
class = "title"
match = { type = "paragraph", position = 0 }

[[classifiers]]
class = "last"
match = { position = "last" }

[[classifiers]]
class = "body"
match = { position = { type = "next", class = "title", offset = 1 } }

[[classifiers]]
class = "authors"
match = { position = { type = "relative", index = "(title, abstract]" } }
"#,
        )
        .unwrap();
        assert_eq!(doc.classifiers.len(), 4);
        assert!(matches!(doc.classifiers[0].matcher.position, Some(PositionDto::Index(0))));
        assert!(matches!(
            &doc.classifiers[1].matcher.position,
            Some(PositionDto::Keyword(k)) if k == "last"
        ));
        let Some(PositionDto::Spec(spec)) = &doc.classifiers[2].matcher.position else {
            panic!("expected table form");
        };
        assert_eq!(spec.kind, "next");
        assert_eq!(spec.offset, 1);
        let Some(PositionDto::Spec(spec)) = &doc.classifiers[3].matcher.position else {
            panic!("expected table form");
        };
        assert!(matches!(&spec.index, Some(IndexDto::Expr(e)) if e == "(title, abstract]"));
    }

    #[test]
    fn deserialize_children_and_range() {
        let doc: Doc = toml::from_str(
            r#"
[[classifiers]]
class = "chapter"
match = { range = { after = { class = "toc" }, before = { pattern = "^参考文献" } } }
children = [ { class = "chapter-first", match = { position = 0 } } ]
"#,
        )
        .unwrap();
        let rule = &doc.classifiers[0];
        let range = rule.matcher.range.as_ref().unwrap();
        assert_eq!(range.after.class.as_deref(), Some("toc"));
        assert_eq!(rule.children.len(), 1);
    }

    #[test]
    fn rejects_unknown_match_keys() {
        let result: Result<Doc, _> = toml::from_str(
            r#"
[[classifiers]]
class = "x"
match = { colour = "red" }
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn style_accepts_numbers_and_strings() {
        let style: StyleDefDto = toml::from_str(
            r#"
font = { name_eastasia = "黑体", size = "三号", bold = true }
paragraph = { alignment = "居中", line_spacing = 1.5, first_line_indent = "2字符" }
"#,
        )
        .unwrap();
        let font = style.font.unwrap();
        assert_eq!(font.size, Some(Measure::Text("三号".into())));
        let paragraph = style.paragraph.unwrap();
        assert_eq!(paragraph.line_spacing, Some(Measure::Number(1.5)));
    }
}
