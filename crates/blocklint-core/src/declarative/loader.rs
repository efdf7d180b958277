//! DTO → domain model conversion with validation.

use crate::block::{Alignment, BlockKind, UnknownAlignment, UnknownBlockKind};
use crate::classifier::ClassRule;
use crate::matcher::{Anchor, AnchoredPattern, Direction, Matcher, PatternError, Position};
use crate::style::{Expected, FontStyle, ParagraphStyle, StyleDef};
use crate::units::{self, Measure};
use std::collections::BTreeMap;

use super::config_dto::{
    AnchorDto, ClassRuleDto, FontDto, IndexDto, MatchDto, ParagraphDto, PositionDto,
    PositionSpecDto, StyleDefDto,
};

/// Font size used to resolve relative spacing units when a style sets none.
const STYLE_FALLBACK_FONT_PT: f64 = 12.0;

/// Errors during DTO → domain conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A regex did not compile.
    #[error("{context}: {source}")]
    Pattern {
        /// Where the error occurred (e.g., "classifiers[0].match.pattern").
        context: String,
        /// The underlying regex error.
        source: PatternError,
    },

    /// Unknown block type in a `type` matcher.
    #[error("{context}: {source}")]
    BlockKind {
        /// Where the error occurred.
        context: String,
        /// The underlying parse error.
        source: UnknownBlockKind,
    },

    /// A position that cannot be interpreted in its context.
    #[error("{context}: invalid position: {message}")]
    Position {
        /// Where the error occurred.
        context: String,
        /// What is wrong with it.
        message: String,
    },

    /// A malformed range expression.
    #[error("{context}: invalid range expression `{value}`, expected `(a, b)` with `[`/`]` for inclusive bounds")]
    RangeExpression {
        /// Where the error occurred.
        context: String,
        /// The expression as written.
        value: String,
    },

    /// An anchor with zero or several of `class`/`position`/`pattern`.
    #[error("{context}: exactly one of `class`, `position` or `pattern` must be set")]
    AmbiguousAnchor {
        /// Where the error occurred.
        context: String,
    },

    /// A `[styles]` key that is not a class selector.
    #[error("styles.\"{key}\": style keys must be class selectors such as \".title\"")]
    StyleKey {
        /// The offending key.
        key: String,
    },

    /// A measurement that cannot be converted.
    #[error("{context}: cannot read `{value}` as {expected}")]
    Measure {
        /// Where the error occurred.
        context: String,
        /// The value as written.
        value: String,
        /// What kind of value was expected.
        expected: &'static str,
    },

    /// Unknown alignment name.
    #[error("{context}: {source}")]
    Alignment {
        /// Where the error occurred.
        context: String,
        /// The underlying parse error.
        source: UnknownAlignment,
    },
}

// ────────────────────────────────────────────
// Classifiers
// ────────────────────────────────────────────

/// Converts `[[classifiers]]` entries into validated rules, preserving order.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load_classifiers(dtos: &[ClassRuleDto]) -> Result<Vec<ClassRule>, LoadError> {
    dtos.iter()
        .enumerate()
        .map(|(i, dto)| convert_class_rule(dto, &format!("classifiers[{i}]"), false))
        .collect()
}

fn convert_class_rule(dto: &ClassRuleDto, ctx: &str, nested: bool) -> Result<ClassRule, LoadError> {
    let mut rule = ClassRule::new(&dto.class);
    for matcher in convert_match(&dto.matcher, &format!("{ctx}.match"), nested)? {
        rule = rule.with_matcher(matcher);
    }
    for (j, child) in dto.children.iter().enumerate() {
        rule = rule.with_child(convert_class_rule(
            child,
            &format!("{ctx}.children[{j}]"),
            true,
        )?);
    }
    Ok(rule)
}

fn convert_match(dto: &MatchDto, ctx: &str, nested: bool) -> Result<Vec<Matcher>, LoadError> {
    let mut matchers = Vec::new();

    if let Some(kind) = &dto.kind {
        let kind = kind.parse::<BlockKind>().map_err(|e| LoadError::BlockKind {
            context: format!("{ctx}.type"),
            source: e,
        })?;
        matchers.push(Matcher::Type(kind));
    }

    if let Some(position) = &dto.position {
        matchers.push(convert_position(position, &format!("{ctx}.position"), nested)?);
    }

    if let Some(pattern) = &dto.pattern {
        matchers.push(Matcher::Pattern(compile(pattern, &format!("{ctx}.pattern"))?));
    }

    let offset = dto.offset.unwrap_or(0);
    for (key, anchor, direction) in [
        ("after", &dto.after, Direction::After),
        ("before", &dto.before, Direction::Before),
    ] {
        if let Some(anchor) = anchor {
            matchers.push(Matcher::Relative {
                anchor: convert_anchor(anchor, &format!("{ctx}.{key}"))?,
                direction,
                offset,
            });
        }
    }

    if let Some(range) = &dto.range {
        matchers.push(Matcher::between(
            convert_anchor(&range.after, &format!("{ctx}.range.after"))?,
            convert_anchor(&range.before, &format!("{ctx}.range.before"))?,
        ));
    }

    Ok(matchers)
}

/// Plain positions are document indices at the top level and positions
/// within the parent span inside `children`.
fn positional(position: Position, nested: bool) -> Matcher {
    if nested {
        Matcher::Nth(position)
    } else {
        Matcher::Position(position)
    }
}

fn keyword(value: &str, ctx: &str) -> Result<Position, LoadError> {
    match value.trim() {
        "first" => Ok(Position::First),
        "last" => Ok(Position::Last),
        other => Err(LoadError::Position {
            context: ctx.to_string(),
            message: format!("unknown keyword `{other}`, expected `first` or `last`"),
        }),
    }
}

fn convert_position(dto: &PositionDto, ctx: &str, nested: bool) -> Result<Matcher, LoadError> {
    match dto {
        PositionDto::Index(n) => Ok(positional(Position::Index(*n), nested)),
        PositionDto::Keyword(word) => Ok(positional(keyword(word, ctx)?, nested)),
        PositionDto::Spec(spec) => convert_position_spec(spec, ctx, nested),
    }
}

fn convert_position_spec(
    spec: &PositionSpecDto,
    ctx: &str,
    nested: bool,
) -> Result<Matcher, LoadError> {
    let missing = |field: &str| LoadError::Position {
        context: ctx.to_string(),
        message: format!("`type = \"{}\"` requires `{field}`", spec.kind),
    };

    match spec.kind.as_str() {
        "absolute" if nested => Err(LoadError::Position {
            context: format!("{ctx}.type"),
            message: "absolute positions are not available inside `children`, use `relative`"
                .to_string(),
        }),
        "absolute" => match &spec.index {
            Some(IndexDto::Number(n)) => Ok(Matcher::Position(Position::Index(*n))),
            Some(IndexDto::Expr(word)) => Ok(Matcher::Position(keyword(word, ctx)?)),
            None => Err(missing("index")),
        },
        "relative" => match &spec.index {
            Some(IndexDto::Expr(expr)) if is_range_expression(expr) => {
                parse_range_expression(expr, nested).ok_or_else(|| LoadError::RangeExpression {
                    context: format!("{ctx}.index"),
                    value: expr.clone(),
                })
            }
            Some(_) if !nested => Err(LoadError::Position {
                context: ctx.to_string(),
                message: "a relative index is only meaningful inside `children`".to_string(),
            }),
            Some(IndexDto::Number(n)) => Ok(Matcher::Nth(Position::Index(*n))),
            Some(IndexDto::Expr(word)) => Ok(Matcher::Nth(keyword(word, ctx)?)),
            None => Err(missing("index")),
        },
        "next" | "prev" => {
            let class = spec.class.as_ref().ok_or_else(|| missing("class"))?;
            Ok(Matcher::Relative {
                anchor: Anchor::Label(class.clone()),
                direction: if spec.kind == "next" {
                    Direction::After
                } else {
                    Direction::Before
                },
                offset: spec.offset,
            })
        }
        other => Err(LoadError::Position {
            context: format!("{ctx}.type"),
            message: format!("unknown type `{other}`, expected: absolute, relative, next, prev"),
        }),
    }
}

fn is_range_expression(expr: &str) -> bool {
    expr.contains(['(', ')', '[', ']'])
}

/// Parses `"(a, b)"`, `"[a, b)"`, `"(a, b]"` or `"[a, b]"`.
///
/// Bounds are labels, or integers naming positions within the evaluated
/// span. Square brackets include the bound. Label bounds resolve to the
/// first labeled block of the document, or to the last labeled block of
/// the parent span when `within_span` is set.
#[must_use]
pub fn parse_range_expression(expr: &str, within_span: bool) -> Option<Matcher> {
    let expr = expr.trim();
    let include_after = match expr.chars().next()? {
        '[' => true,
        '(' => false,
        _ => return None,
    };
    let include_before = match expr.chars().last()? {
        ']' => true,
        ')' => false,
        _ => return None,
    };
    let inner = expr.get(1..expr.len() - 1)?;
    let (lo, hi) = inner.split_once(',')?;
    Some(Matcher::Range {
        after: range_bound(lo, within_span)?,
        before: range_bound(hi, within_span)?,
        include_after,
        include_before,
    })
}

fn range_bound(token: &str, within_span: bool) -> Option<Anchor> {
    let token = token.trim();
    if let Ok(n) = token.parse::<i64>() {
        return Some(Anchor::Nth(n));
    }
    let valid = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    let label = token.to_string();
    valid.then(|| {
        if within_span {
            Anchor::LastLabel(label)
        } else {
            Anchor::Label(label)
        }
    })
}

fn convert_anchor(dto: &AnchorDto, ctx: &str) -> Result<Anchor, LoadError> {
    match (&dto.class, dto.position, &dto.pattern) {
        (Some(class), None, None) => Ok(Anchor::Label(class.clone())),
        (None, Some(position), None) => Ok(Anchor::Position(position)),
        (None, None, Some(pattern)) => Ok(Anchor::Pattern(compile(
            pattern,
            &format!("{ctx}.pattern"),
        )?)),
        _ => Err(LoadError::AmbiguousAnchor {
            context: ctx.to_string(),
        }),
    }
}

fn compile(pattern: &str, ctx: &str) -> Result<AnchoredPattern, LoadError> {
    AnchoredPattern::new(pattern).map_err(|e| LoadError::Pattern {
        context: ctx.to_string(),
        source: e,
    })
}

// ────────────────────────────────────────────
// Styles
// ────────────────────────────────────────────

/// Converts `[styles]` tables keyed by `".label"` into definitions keyed by
/// label, converting every measurement up front.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load_styles(
    dtos: &BTreeMap<String, StyleDefDto>,
) -> Result<BTreeMap<String, StyleDef>, LoadError> {
    dtos.iter()
        .map(|(key, dto)| {
            let label = key
                .strip_prefix('.')
                .filter(|l| !l.is_empty())
                .ok_or_else(|| LoadError::StyleKey { key: key.clone() })?;
            let ctx = format!("styles.\"{key}\"");
            Ok((label.to_string(), convert_style(dto, &ctx)?))
        })
        .collect()
}

fn convert_style(dto: &StyleDefDto, ctx: &str) -> Result<StyleDef, LoadError> {
    let font = dto
        .font
        .as_ref()
        .map(|f| convert_font(f, &format!("{ctx}.font")))
        .transpose()?;
    let font_pt = font
        .as_ref()
        .and_then(|f: &FontStyle| f.size.as_ref())
        .map(|s| f64::from(s.value) / 2.0);
    let paragraph = dto
        .paragraph
        .as_ref()
        .map(|p| convert_paragraph(p, &format!("{ctx}.paragraph"), font_pt))
        .transpose()?;
    Ok(StyleDef { font, paragraph })
}

fn convert_font(dto: &FontDto, ctx: &str) -> Result<FontStyle, LoadError> {
    let size = dto
        .size
        .as_ref()
        .map(|size| {
            measure(size, &format!("{ctx}.size"), "a font size", |text| {
                units::parse_font_size(text)
            })
        })
        .transpose()?;
    Ok(FontStyle {
        east_asia: dto.name_eastasia.clone(),
        ascii: dto.name_ascii.clone(),
        size,
        bold: dto.bold,
        italic: dto.italic,
    })
}

fn convert_paragraph(
    dto: &ParagraphDto,
    ctx: &str,
    font_pt: Option<f64>,
) -> Result<ParagraphStyle, LoadError> {
    let font_pt = font_pt.unwrap_or(STYLE_FALLBACK_FONT_PT);
    let alignment = dto
        .alignment
        .as_ref()
        .map(|a| {
            a.parse::<Alignment>()
                .map(|value| Expected::new(a.as_str(), value))
                .map_err(|e| LoadError::Alignment {
                    context: format!("{ctx}.alignment"),
                    source: e,
                })
        })
        .transpose()?;
    let line_spacing = dto
        .line_spacing
        .as_ref()
        .map(|m| {
            measure(m, &format!("{ctx}.line_spacing"), "a line spacing", |text| {
                units::parse_line_spacing(text)
            })
        })
        .transpose()?;
    let spacing = |value: &Option<Measure>, key: &str| {
        value
            .as_ref()
            .map(|m| {
                measure(m, &format!("{ctx}.{key}"), "a length", |text| {
                    units::parse_spacing(text, Some(font_pt))
                })
            })
            .transpose()
    };
    Ok(ParagraphStyle {
        alignment,
        line_spacing,
        first_line_indent: spacing(&dto.first_line_indent, "first_line_indent")?,
        space_before: spacing(&dto.space_before, "space_before")?,
        space_after: spacing(&dto.space_after, "space_after")?,
    })
}

fn measure<T>(
    value: &Measure,
    ctx: &str,
    expected: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<Expected<T>, LoadError> {
    let text = value.as_text();
    parse(&text)
        .map(|converted| Expected::new(text.as_ref(), converted))
        .ok_or_else(|| LoadError::Measure {
            context: ctx.to_string(),
            value: text.to_string(),
            expected,
        })
}
