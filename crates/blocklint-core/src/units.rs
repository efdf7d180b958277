//! Conversion from human-readable typographic units to internal units.
//!
//! Font sizes are stored in half-points and lengths in twips (1/20 pt), the
//! units the walker reports. Configuration values may be written as
//! `"16pt"`, `"三号"`, `"0.5行"`, `"2字符"`, `"1cm"` and so on.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Twips per point.
pub const TWIPS_PER_POINT: f64 = 20.0;

/// Font size assumed when a relative unit has no font context (五号).
pub const DEFAULT_FONT_PT: f64 = 10.5;

const LINE_HEIGHT_RATIO: f64 = 1.2;
const CHAR_WIDTH_RATIO: f64 = 1.0;
const POINTS_PER_CM: f64 = 28.35;
const POINTS_PER_INCH: f64 = 72.0;

/// Chinese font size names (GB/T 9704-2012) and their point sizes.
const CHINESE_SIZES: &[(&str, f64)] = &[
    ("初号", 42.0),
    ("小初", 36.0),
    ("一号", 26.0),
    ("小一", 24.0),
    ("二号", 22.0),
    ("小二", 18.0),
    ("三号", 16.0),
    ("小三", 15.0),
    ("四号", 14.0),
    ("小四", 12.0),
    ("五号", 10.5),
    ("小五", 9.0),
    ("六号", 7.5),
    ("小六", 6.5),
    ("七号", 5.5),
    ("八号", 5.0),
];

/// A configuration value that may be written as a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    /// Bare number.
    Number(f64),
    /// Text with an optional unit suffix.
    Text(String),
}

impl Measure {
    /// Returns the value as text, formatting numbers without a trailing `.0`.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Measure {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Measure {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Expected line spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSpacing {
    /// Multiple of single spacing (1.0, 1.5, 2.0, ...).
    Multiple(f64),
    /// Exact line height in twips.
    Exact(i32),
    /// Minimum line height in twips.
    AtLeast(i32),
}

impl fmt::Display for LineSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multiple(m) => write!(f, "{m}x"),
            Self::Exact(t) => write!(f, "exactly {t} twips"),
            Self::AtLeast(t) => write!(f, "at least {t} twips"),
        }
    }
}

/// Point size of a Chinese font size name.
#[must_use]
pub fn chinese_size_points(name: &str) -> Option<f64> {
    CHINESE_SIZES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, pt)| *pt)
}

/// Splits `"12.5 pt"` into `(12.5, "pt")`.
fn split_number(value: &str) -> Option<(f64, &str)> {
    let value = value.trim();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    if end == 0 {
        return None;
    }
    let number = value[..end].parse::<f64>().ok()?;
    Some((number, value[end..].trim()))
}

#[allow(clippy::cast_possible_truncation)]
fn to_twips(points: f64) -> i32 {
    (points * TWIPS_PER_POINT).round() as i32
}

/// Parses a font size into half-points.
///
/// Accepts `"16pt"`, `"16磅"`, `"16"`, Chinese names such as `"小四"`, and
/// `"N号"` when `N` is one of the standard point sizes.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_font_size(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Some(pt) = chinese_size_points(value) {
        return Some((pt * 2.0) as u32);
    }
    let (number, unit) = split_number(value)?;
    match unit.to_ascii_lowercase().as_str() {
        "" | "pt" | "磅" => Some((number * 2.0) as u32),
        "号" if CHINESE_SIZES.iter().any(|(_, pt)| (*pt - number).abs() < f64::EPSILON) => {
            Some((number * 2.0) as u32)
        }
        _ => None,
    }
}

/// Parses a spacing or indent value into twips.
///
/// Relative units (`行`, `字符`) are resolved against `font_pt`, falling back
/// to [`DEFAULT_FONT_PT`].
#[must_use]
pub fn parse_spacing(value: &str, font_pt: Option<f64>) -> Option<i32> {
    let (number, unit) = split_number(value)?;
    let font_pt = font_pt.unwrap_or(DEFAULT_FONT_PT);
    let points = match unit.to_ascii_lowercase().as_str() {
        "" | "pt" | "磅" | "点" => number,
        "行" | "line" | "lines" => number * font_pt * LINE_HEIGHT_RATIO,
        "字符" | "字" | "char" | "chars" | "character" | "characters" => {
            number * font_pt * CHAR_WIDTH_RATIO
        }
        "cm" | "厘米" => number * POINTS_PER_CM,
        "in" | "inch" | "inches" | "英寸" => number * POINTS_PER_INCH,
        _ => return None,
    };
    Some(to_twips(points))
}

/// Parses a line spacing value.
///
/// Bare numbers and `"N倍"` are multiples, `"Npt"` is an exact height and
/// `"N最少"` / `"N atleast"` a minimum height. Unknown suffixes fall back to
/// a multiple.
#[must_use]
pub fn parse_line_spacing(value: &str) -> Option<LineSpacing> {
    let value = value.trim();
    match value {
        "单倍" => return Some(LineSpacing::Multiple(1.0)),
        "双倍" => return Some(LineSpacing::Multiple(2.0)),
        _ => {}
    }
    let (number, unit) = split_number(value)?;
    Some(match unit.to_ascii_lowercase().as_str() {
        "pt" | "磅" | "点" => LineSpacing::Exact(to_twips(number)),
        "最少" | "atleast" => LineSpacing::AtLeast(to_twips(number)),
        _ => LineSpacing::Multiple(number),
    })
}
