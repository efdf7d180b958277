//! Expansion of a `[document]` description into rule instances.
//!
//! The description says what the document should look like; the generator
//! turns it into font, paragraph, content, heading and reference rules.
//!
//! ```toml
//! [document.defaults]
//! font_size = "小四"
//!
//! [[document.structure]]
//! name = "Title"
//! font = { name_eastasia = "黑体", size = "二号", bold = true }
//! paragraph = { alignment = "居中" }
//!
//! [[document.structure]]
//! name = "Abstract"
//! content = { min_length = 50 }
//! paragraph = { first_line_indent = "2字符" }
//!
//! [document.headings]
//! styles = ["Heading 1", "Heading 2"]
//! numbering_patterns = ['(\d+)\s', '(\d+\.\d+)\s']
//! formats = [{ level = 1, font = { name_eastasia = "黑体", size = "三号" } }]
//!
//! [document.references]
//! heading = "参考文献"
//! ```
//!
//! Structure entries apply to the block at the same position. Rule ids
//! share one counter: `FONT-001`, `PAR-002`, `CONTENT-003`, `HDG_SEQ-004`...

use crate::common::Targets;
use crate::error::GenerateError;
use crate::font_style::FontStyleRule;
use crate::heading::{HeadingHierarchyRule, HeadingNumberingRule, HeadingNumbers};
use crate::paragraph_content::ParagraphContentRule;
use crate::paragraph_format::{Indents, ParagraphFormatRule};
use crate::references::{CitationValidationRule, ReferencesCitationRule, DEFAULT_HEADING};
use blocklint_core::declarative::config_dto::FontDto;
use blocklint_core::units::{self, Measure, DEFAULT_FONT_PT};
use blocklint_core::{style_level, Alignment, AnchoredPattern, RuleBox};
use serde::Deserialize;
use std::cell::Cell;
use tracing::{debug, info};

// ────────────────────────────────────────────
// Document description
// ────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentDto {
    #[serde(default)]
    defaults: DefaultsDto,
    #[serde(default)]
    structure: Vec<ElementDto>,
    #[serde(default)]
    headings: Option<HeadingsDto>,
    #[serde(default)]
    references: Option<ReferencesDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultsDto {
    #[serde(default)]
    font_size: Option<Measure>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ElementDto {
    /// Free-form element type, informational only.
    #[serde(default, rename = "type")]
    _kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content: Option<ContentDto>,
    #[serde(default)]
    font: Option<FontDto>,
    #[serde(default)]
    paragraph: Option<LayoutDto>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentDto {
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default)]
    min_length: usize,
    #[serde(default)]
    max_length: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutDto {
    #[serde(default)]
    alignment: Option<String>,
    #[serde(default)]
    line_spacing: Option<Measure>,
    #[serde(default)]
    first_line_indent: Option<Measure>,
    #[serde(default)]
    left_indent: Option<Measure>,
    #[serde(default)]
    right_indent: Option<Measure>,
    #[serde(default)]
    space_before: Option<Measure>,
    #[serde(default)]
    space_after: Option<Measure>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeadingsDto {
    #[serde(default)]
    styles: Vec<String>,
    #[serde(default)]
    numbering_patterns: Vec<String>,
    #[serde(default = "default_true")]
    check_sequence: bool,
    #[serde(default = "default_true")]
    check_hierarchy: bool,
    #[serde(default)]
    formats: Vec<HeadingFormatDto>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeadingFormatDto {
    level: u32,
    #[serde(default)]
    font: Option<FontDto>,
    #[serde(default)]
    paragraph: Option<LayoutDto>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReferencesDto {
    #[serde(default = "default_heading")]
    heading: String,
    #[serde(default = "default_true")]
    check_citations: bool,
    #[serde(default = "default_true")]
    check_citation_validity: bool,
}

fn default_true() -> bool {
    true
}

fn default_heading() -> String {
    DEFAULT_HEADING.to_string()
}

// ────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────

/// Turns a `[document]` table into rules.
#[derive(Debug, Default)]
pub struct RuleGenerator {
    counter: Cell<usize>,
}

impl RuleGenerator {
    /// Creates a generator whose ids start at 001.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates rules for `document`: structure entries first, then
    /// headings, then references.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the table has unknown keys or a value
    /// cannot be converted.
    pub fn generate(&self, document: &toml::Table) -> Result<Vec<RuleBox>, GenerateError> {
        let dto: DocumentDto = toml::Value::Table(document.clone())
            .try_into()
            .map_err(|e: toml::de::Error| GenerateError::Document {
                message: e.to_string().trim().to_string(),
            })?;

        let default_pt = match &dto.defaults.font_size {
            Some(size) => points(size, "document.defaults.font_size")?,
            None => DEFAULT_FONT_PT,
        };

        let mut rules: Vec<RuleBox> = Vec::new();
        for (index, element) in dto.structure.iter().enumerate() {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            self.element_rules(element, index, default_pt, &mut rules)?;
        }
        if let Some(headings) = &dto.headings {
            self.heading_rules(headings, &mut rules)?;
        }
        if let Some(references) = &dto.references {
            self.reference_rules(references, &mut rules);
        }

        info!(rules = rules.len(), "Generated rules from document description");
        Ok(rules)
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        format!("{prefix}-{n:03}")
    }

    fn element_rules(
        &self,
        element: &ElementDto,
        index: u32,
        default_pt: f64,
        rules: &mut Vec<RuleBox>,
    ) -> Result<(), GenerateError> {
        let name = element
            .name
            .clone()
            .unwrap_or_else(|| format!("element {index}"));
        let context = format!("document.structure[{index}]");
        let targets = Targets::new().with_blocks([index]);

        if let Some(content) = &element.content {
            rules.push(Box::new(
                ParagraphContentRule::new(self.next_id("CONTENT"), vec![index])
                    .description(format!("{name} content"))
                    .required(content.required)
                    .length(content.min_length, content.max_length),
            ));
        }

        let mut font_pt = default_pt;
        if let Some(font) = &element.font {
            if let Some(size) = &font.size {
                font_pt = points(size, &format!("{context}.font.size"))?;
            }
            let rule = font_rule(self.next_id("FONT"), font, &format!("{context}.font"))?
                .description(format!("{name} font"))
                .targets(targets.clone());
            rules.push(Box::new(rule));
        }

        if let Some(layout) = &element.paragraph {
            let rule = layout_rule(
                self.next_id("PAR"),
                layout,
                font_pt,
                &format!("{context}.paragraph"),
            )?
            .description(format!("{name} paragraph format"))
            .targets(targets);
            rules.push(Box::new(rule));
        }
        Ok(())
    }

    fn heading_rules(
        &self,
        headings: &HeadingsDto,
        rules: &mut Vec<RuleBox>,
    ) -> Result<(), GenerateError> {
        let numbers = if headings.numbering_patterns.is_empty() {
            HeadingNumbers::default()
        } else {
            let patterns = headings
                .numbering_patterns
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    AnchoredPattern::new(p).map_err(|source| GenerateError::Pattern {
                        context: format!("document.headings.numbering_patterns[{i}]"),
                        source,
                    })
                })
                .collect::<Result<_, _>>()?;
            HeadingNumbers::new(patterns)
        }
        .with_styles(headings.styles.clone());

        if headings.check_sequence {
            rules.push(Box::new(
                HeadingNumberingRule::new(self.next_id("HDG_SEQ"))
                    .description("Heading numbering")
                    .numbers(numbers.clone()),
            ));
        }
        if headings.check_hierarchy {
            rules.push(Box::new(
                HeadingHierarchyRule::new(self.next_id("HDG_HIER"))
                    .description("Heading hierarchy")
                    .numbers(numbers),
            ));
        }

        for format in &headings.formats {
            let level = format.level;
            let styles: Vec<String> = headings
                .styles
                .iter()
                .filter(|s| style_level(s) == Some(level))
                .cloned()
                .collect();
            if styles.is_empty() {
                debug!(level, "No heading style for level, skipping format");
                continue;
            }
            let context = format!("document.headings.formats[level {level}]");
            let targets = Targets::new().with_styles(styles);

            let mut font_pt = DEFAULT_FONT_PT;
            if let Some(font) = &format.font {
                if let Some(size) = &font.size {
                    font_pt = points(size, &format!("{context}.font.size"))?;
                }
                let rule = font_rule(
                    self.next_id(&format!("HDG{level}_FONT")),
                    font,
                    &format!("{context}.font"),
                )?
                .description(format!("Level {level} heading font"))
                .targets(targets.clone());
                rules.push(Box::new(rule));
            }
            if let Some(layout) = &format.paragraph {
                let rule = layout_rule(
                    self.next_id(&format!("HDG{level}_PAR")),
                    layout,
                    font_pt,
                    &format!("{context}.paragraph"),
                )?
                .description(format!("Level {level} heading paragraph format"))
                .targets(targets);
                rules.push(Box::new(rule));
            }
        }
        Ok(())
    }

    fn reference_rules(&self, references: &ReferencesDto, rules: &mut Vec<RuleBox>) {
        if references.check_citations {
            rules.push(Box::new(
                ReferencesCitationRule::new(self.next_id("REF_CIT"), &references.heading)
                    .description("Reference citations"),
            ));
        }
        if references.check_citation_validity {
            rules.push(Box::new(
                CitationValidationRule::new(self.next_id("REF_VAL"), &references.heading)
                    .description("Citation validity"),
            ));
        }
    }
}

// ────────────────────────────────────────────
// Conversions
// ────────────────────────────────────────────

fn half_points(size: &Measure, context: &str) -> Result<u32, GenerateError> {
    units::parse_font_size(&size.as_text()).ok_or_else(|| GenerateError::Measure {
        context: context.to_string(),
        value: size.to_string(),
        expected: "a font size",
    })
}

fn points(size: &Measure, context: &str) -> Result<f64, GenerateError> {
    half_points(size, context).map(|hp| f64::from(hp) / 2.0)
}

fn twips(value: &Measure, font_pt: f64, context: String) -> Result<i32, GenerateError> {
    units::parse_spacing(&value.as_text(), Some(font_pt)).ok_or_else(|| GenerateError::Measure {
        context,
        value: value.to_string(),
        expected: "a length",
    })
}

fn font_rule(id: String, font: &FontDto, context: &str) -> Result<FontStyleRule, GenerateError> {
    let mut rule = FontStyleRule::new(id);
    if let Some(name) = &font.name_eastasia {
        rule = rule.font_name(name, font.name_ascii.iter().cloned().collect());
    } else if let Some(name) = &font.name_ascii {
        rule = rule.font_name(name, Vec::new());
    }
    if let Some(size) = &font.size {
        rule = rule.size_half_points(half_points(size, &format!("{context}.size"))?);
    }
    if let Some(bold) = font.bold {
        rule = rule.bold(bold);
    }
    if let Some(italic) = font.italic {
        rule = rule.italic(italic);
    }
    Ok(rule)
}

fn layout_rule(
    id: String,
    layout: &LayoutDto,
    font_pt: f64,
    context: &str,
) -> Result<ParagraphFormatRule, GenerateError> {
    let length = |value: &Option<Measure>, key: &str| {
        value
            .as_ref()
            .map(|v| twips(v, font_pt, format!("{context}.{key}")))
            .transpose()
    };

    let mut rule = ParagraphFormatRule::new(id).indents(Indents {
        first_line: length(&layout.first_line_indent, "first_line_indent")?,
        left: length(&layout.left_indent, "left_indent")?,
        right: length(&layout.right_indent, "right_indent")?,
        space_before: length(&layout.space_before, "space_before")?,
        space_after: length(&layout.space_after, "space_after")?,
    });
    if let Some(spacing) = &layout.line_spacing {
        let parsed = units::parse_line_spacing(&spacing.as_text()).ok_or_else(|| {
            GenerateError::Measure {
                context: format!("{context}.line_spacing"),
                value: spacing.to_string(),
                expected: "a line spacing",
            }
        })?;
        rule = rule.line_spacing(parsed);
    }
    if let Some(alignment) = &layout.alignment {
        let parsed = alignment
            .parse::<Alignment>()
            .map_err(|source| GenerateError::Alignment {
                context: format!("{context}.alignment"),
                source,
            })?;
        rule = rule.alignment(parsed);
    }
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::{Block, Context, Font, Paragraph, ParagraphFormat, Run, Severity};

    fn generate(document: &str) -> Result<Vec<RuleBox>, GenerateError> {
        let table: toml::Table = toml::from_str(document).unwrap();
        RuleGenerator::new().generate(&table)
    }

    fn ids(rules: &[RuleBox]) -> Vec<&str> {
        rules.iter().map(|r| r.id()).collect()
    }

    const THESIS: &str = r#"
        [defaults]
        font_size = "小四"

        [[structure]]
        name = "Title"
        font = { name_eastasia = "黑体", name_ascii = "Arial", size = "二号", bold = true }
        paragraph = { alignment = "居中" }

        [[structure]]
        name = "Abstract"
        content = { min_length = 4 }
        paragraph = { first_line_indent = "2字符" }

        [headings]
        styles = ["Heading 1", "Heading 2"]
        formats = [
            { level = 1, font = { name_eastasia = "黑体", size = "三号" }, paragraph = { space_before = "0.5行" } },
            { level = 3, font = { size = "小四" } },
        ]

        [references]
        check_citations = false
    "#;

    #[test]
    fn ids_share_one_counter() {
        let rules = generate(THESIS).unwrap();
        assert_eq!(
            ids(&rules),
            [
                "FONT-001",
                "PAR-002",
                "CONTENT-003",
                "PAR-004",
                "HDG_SEQ-005",
                "HDG_HIER-006",
                "HDG1_FONT-007",
                "HDG1_PAR-008",
                "REF_VAL-009",
            ]
        );
    }

    #[test]
    fn structure_rules_target_their_position() {
        let rules = generate(THESIS).unwrap();
        let title = Paragraph::new("论文题目")
            .with_run(Run::new(
                "论文题目",
                Font {
                    east_asia: Some("宋体".to_string()),
                    size: Some(44),
                    bold: Some(true),
                    ..Font::default()
                },
            ))
            .with_format(ParagraphFormat {
                alignment: Some(Alignment::Center),
                ..ParagraphFormat::default()
            });
        let blocks = vec![
            Block::paragraph(0, title),
            Block::paragraph(1, Paragraph::new("摘要")),
        ];
        let ctx = Context::new(&blocks);

        let issues: Vec<_> = blocks
            .iter()
            .flat_map(|b| {
                rules
                    .iter()
                    .filter(|r| r.applies_to(b, &ctx))
                    .flat_map(|r| r.check(b, &ctx))
                    .collect::<Vec<_>>()
            })
            .map(|i| (i.code, i.severity, i.message))
            .collect();
        insta::assert_debug_snapshot!(issues, @r###"
        [
            (
                "FONT-001",
                Warn,
                "Title font: expected font '黑体', found '宋体'",
            ),
            (
                "CONTENT-003",
                Warn,
                "Abstract content: too short (2 characters, at least 4)",
            ),
        ]
        "###);
    }

    #[test]
    fn relative_units_use_the_element_font() {
        let rules = generate(
            r#"
            [[structure]]
            font = { size = "三号" }
            paragraph = { first_line_indent = "2字符" }
            "#,
        )
        .unwrap();
        // 2 characters of 16pt is 640 twips.
        let indented = |twips| {
            vec![Block::paragraph(
                0,
                Paragraph::new("x").with_format(ParagraphFormat {
                    first_line_indent: Some(twips),
                    ..ParagraphFormat::default()
                }),
            )]
        };
        let check = |blocks: &[Block]| {
            let ctx = Context::new(blocks);
            rules[1].check(&blocks[0], &ctx)
        };
        assert!(check(&indented(640)).is_empty());
        let issues = check(&indented(420));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
    }

    #[test]
    fn heading_patterns_reach_the_numbering_rules() {
        let rules = generate(
            r#"
            [headings]
            numbering_patterns = ['第(\d+)章']
            check_hierarchy = false
            "#,
        )
        .unwrap();
        assert_eq!(ids(&rules), ["HDG_SEQ-001"]);

        let blocks: Vec<Block> = ["第1章 绪论", "第3章 方法"]
            .iter()
            .zip(0u32..)
            .map(|(t, i)| Block::paragraph(i, Paragraph::new(*t).with_style("Heading 1")))
            .collect();
        let ctx = Context::new(&blocks);
        let issues = rules[0].as_finalize().unwrap().finalize(&ctx);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.starts_with("Heading numbering: "));
    }

    #[test]
    fn bad_values_name_their_location() {
        let err = generate("[[structure]]\nfont = { size = \"huge\" }").err().unwrap();
        assert_eq!(
            err.to_string(),
            "document.structure[0].font.size: cannot read `huge` as a font size"
        );

        let err = generate("[headings]\nnumbering_patterns = ['(']").err().unwrap();
        assert!(err.to_string().starts_with("document.headings.numbering_patterns[0]"));

        let err = generate("[[structure]]\ncolour = \"red\"").err().unwrap();
        assert!(matches!(err, GenerateError::Document { .. }));
    }
}
