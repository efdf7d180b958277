//! Tokenizer for selector strings.

use crate::block::BlockKind;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Errors produced while parsing a selector string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// The selector contains no tokens.
    #[error("empty selector")]
    Empty,

    /// A token that is neither a class, an attribute nor a combinator.
    #[error("unexpected `{0}`, expected `.class`, `[attr=value]`, `>`, `+` or `~`")]
    BareWord(String),

    /// `.` with no class name.
    #[error("missing class name in `{0}`")]
    EmptyClass(String),

    /// Unsupported pseudo-class.
    #[error("unknown pseudo-class `:{0}`, expected: first, last, nth(i), nth-of-type(i)")]
    UnknownPseudo(String),

    /// Unsupported attribute filter.
    #[error("unsupported attribute filter `[{0}]`, expected type=\"paragraph\" or type=\"table\"")]
    UnknownAttr(String),

    /// A combinator that does not follow a class or attribute.
    #[error("combinator `{0}` must follow a class or attribute")]
    MisplacedCombinator(String),

    /// A combinator with nothing after it.
    #[error("combinator `{0}` must be followed by a class or attribute")]
    DanglingCombinator(String),
}

/// Positional pseudo-class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    /// First candidate.
    First,
    /// Last candidate.
    Last,
    /// Zero-based candidate.
    Nth(i64),
    /// Same as [`Pseudo::Nth`]; candidates are not grouped by type.
    NthOfType(i64),
}

impl FromStr for Pseudo {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || SelectorError::UnknownPseudo(s.to_string());
        match s {
            "first" => return Ok(Self::First),
            "last" => return Ok(Self::Last),
            _ => {}
        }
        let (name, arg) = s
            .strip_suffix(')')
            .and_then(|rest| rest.split_once('('))
            .ok_or_else(unknown)?;
        let n = arg.trim().parse::<i64>().map_err(|_| unknown())?;
        match name {
            "nth" => Ok(Self::Nth(n)),
            "nth-of-type" => Ok(Self::NthOfType(n)),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for Pseudo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
            Self::Nth(n) => write!(f, "nth({n})"),
            Self::NthOfType(n) => write!(f, "nth-of-type({n})"),
        }
    }
}

/// Attribute filter. Only the block type is addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrFilter {
    /// `[type="paragraph"]` or `[type="table"]`.
    Type(BlockKind),
}

impl FromStr for AttrFilter {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || SelectorError::UnknownAttr(s.to_string());
        let (key, value) = s.split_once('=').ok_or_else(unknown)?;
        let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
        match key.trim() {
            "type" => value.parse().map(Self::Type).map_err(|_| unknown()),
            _ => Err(unknown()),
        }
    }
}

/// One lexical unit of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorToken {
    /// `.name`
    Class(String),
    /// `:first`, `:nth(2)`, ... attached to the preceding class.
    Pseudo(Pseudo),
    /// `>`
    Child,
    /// Whitespace between two simple tokens.
    Descendant,
    /// `+`
    Adjacent,
    /// `~`
    Sibling,
    /// `[key=value]`
    Attr(AttrFilter),
}

impl SelectorToken {
    /// Returns true for the relational tokens.
    #[must_use]
    pub fn is_combinator(&self) -> bool {
        matches!(
            self,
            Self::Child | Self::Descendant | Self::Adjacent | Self::Sibling
        )
    }
}

/// Splits a selector into tokens.
///
/// # Errors
///
/// Returns [`SelectorError`] for anything outside the grammar.
pub fn tokenize(selector: &str) -> Result<Vec<SelectorToken>, SelectorError> {
    scan(selector, true)
}

/// Splits a selector into tokens, dropping what [`tokenize`] rejects.
///
/// Bare words, unknown pseudo-classes, unknown attribute filters and
/// combinators with nothing to join are skipped, so they leave the
/// candidates unchanged. An empty result means nothing was selectable.
#[must_use]
pub fn tokenize_lenient(selector: &str) -> Vec<SelectorToken> {
    scan(selector, false).unwrap_or_default()
}

fn scan(selector: &str, strict: bool) -> Result<Vec<SelectorToken>, SelectorError> {
    let reject = |err: SelectorError| {
        if strict {
            Err(err)
        } else {
            debug!(selector, skipped = %err, "Ignoring selector token");
            Ok(())
        }
    };
    let mut tokens: Vec<SelectorToken> = Vec::new();

    for part in selector.split_whitespace() {
        let combinator = match part {
            ">" => Some(SelectorToken::Child),
            "+" => Some(SelectorToken::Adjacent),
            "~" => Some(SelectorToken::Sibling),
            _ => None,
        };
        if let Some(combinator) = combinator {
            if tokens.last().map_or(true, SelectorToken::is_combinator) {
                reject(SelectorError::MisplacedCombinator(part.to_string()))?;
                continue;
            }
            tokens.push(combinator);
            continue;
        }

        let simple = match simple_tokens(part) {
            Ok(simple) => simple,
            Err(SelectorError::UnknownPseudo(pseudo)) if !strict => {
                debug!(selector, pseudo = %pseudo, "Ignoring unknown pseudo-class");
                let class = part.split_once(':').map_or(part, |(class, _)| class);
                simple_tokens(class).unwrap_or_default()
            }
            Err(err) => {
                reject(err)?;
                continue;
            }
        };

        if tokens.last().is_some_and(|t| !t.is_combinator()) {
            tokens.push(SelectorToken::Descendant);
        }
        tokens.extend(simple);
    }

    if tokens.last().is_some_and(SelectorToken::is_combinator) {
        if let Some(last) = tokens.pop() {
            reject(SelectorError::DanglingCombinator(combinator_text(&last).to_string()))?;
        }
    }
    if tokens.is_empty() {
        reject(SelectorError::Empty)?;
    }
    Ok(tokens)
}

/// Tokens of one whitespace-free part that is not a combinator.
fn simple_tokens(part: &str) -> Result<Vec<SelectorToken>, SelectorError> {
    if let Some(class) = part.strip_prefix('.') {
        let (name, pseudo) = match class.split_once(':') {
            Some((name, pseudo)) => (name, Some(pseudo)),
            None => (class, None),
        };
        if name.is_empty() {
            return Err(SelectorError::EmptyClass(part.to_string()));
        }
        let mut tokens = vec![SelectorToken::Class(name.to_string())];
        if let Some(pseudo) = pseudo {
            tokens.push(SelectorToken::Pseudo(pseudo.parse()?));
        }
        Ok(tokens)
    } else if let Some(attr) = part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
        Ok(vec![SelectorToken::Attr(attr.parse()?)])
    } else {
        Err(SelectorError::BareWord(part.to_string()))
    }
}

fn combinator_text(token: &SelectorToken) -> &'static str {
    match token {
        SelectorToken::Child => ">",
        SelectorToken::Adjacent => "+",
        SelectorToken::Sibling => "~",
        _ => " ",
    }
}
