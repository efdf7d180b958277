//! Errors raised while turning configuration into rule instances.

use blocklint_core::{PatternError, SelectorError, UnknownAlignment};

/// Errors produced when a `[[rules]]` entry cannot become a rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleBuildError {
    /// No rule kind is registered under this name.
    #[error("unknown rule type `{kind}`, expected one of: {known}")]
    UnknownKind {
        /// The requested kind.
        kind: String,
        /// Comma-separated registered kinds.
        known: String,
    },

    /// Parameters do not have the expected shape.
    #[error("rule `{id}`: {message}")]
    Params {
        /// Rule instance id.
        id: String,
        /// Deserialization message.
        message: String,
    },

    /// A regex parameter does not compile.
    #[error("rule `{id}`: `{field}` {source}")]
    Pattern {
        /// Rule instance id.
        id: String,
        /// Parameter name.
        field: &'static str,
        /// Underlying error.
        #[source]
        source: PatternError,
    },

    /// A selector parameter is outside the selector grammar.
    #[error("rule `{id}`: `{field}` is not a valid selector: {source}")]
    Selector {
        /// Rule instance id.
        id: String,
        /// Parameter name.
        field: &'static str,
        /// Underlying error.
        #[source]
        source: SelectorError,
    },

    /// An alignment name is not recognized.
    #[error("rule `{id}`: {source}")]
    Alignment {
        /// Rule instance id.
        id: String,
        /// Underlying error.
        #[source]
        source: UnknownAlignment,
    },

    /// Parameters are well-formed but inconsistent.
    #[error("rule `{id}`: {message}")]
    Invalid {
        /// Rule instance id.
        id: String,
        /// What is wrong.
        message: String,
    },
}

impl RuleBuildError {
    pub(crate) fn pattern(id: &str, field: &'static str, source: PatternError) -> Self {
        Self::Pattern {
            id: id.to_string(),
            field,
            source,
        }
    }

    pub(crate) fn invalid(id: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// Errors produced while expanding a `[document]` table into rules.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The table does not have the expected shape.
    #[error("document: {message}")]
    Document {
        /// Deserialization message.
        message: String,
    },

    /// A measurement could not be converted.
    #[error("{context}: cannot read `{value}` as {expected}")]
    Measure {
        /// Dotted path of the offending value.
        context: String,
        /// The value as written.
        value: String,
        /// What kind of value was expected.
        expected: &'static str,
    },

    /// A numbering pattern does not compile.
    #[error("{context}: {source}")]
    Pattern {
        /// Dotted path of the offending value.
        context: String,
        /// Underlying error.
        #[source]
        source: PatternError,
    },

    /// An alignment name is not recognized.
    #[error("{context}: {source}")]
    Alignment {
        /// Dotted path of the offending value.
        context: String,
        /// Underlying error.
        #[source]
        source: UnknownAlignment,
    },
}
