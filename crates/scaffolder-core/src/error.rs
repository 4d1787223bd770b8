//! Error types for the generation pipeline
//!
//! Validation rejections never show up here: they are handled by re-asking the
//! question. Unresolvable conditions are not errors either, they evaluate falsy.

use thiserror::Error;

/// Fatal failure of a generation run, surfaced once to the orchestrator
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The interactive input channel failed while asking `key`
    #[error("failed to ask '{key}': {source}")]
    Presentation {
        key: String,
        #[source]
        source: PresentationError,
    },

    /// Substitution failed for `path`. `rendered` lists the files that had
    /// rendered successfully before the failure; none of them were committed.
    #[error("failed to render '{path}': {source}")]
    Render {
        path: String,
        rendered: Vec<String>,
        #[source]
        source: RenderError,
    },

    /// The run was cancelled through its cancellation token
    #[error("generation cancelled")]
    Cancelled,
}

/// Failure of the question-presentation collaborator
#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("input error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no choices available for '{0}'")]
    NoChoices(String),

    /// Non-interactive mode has no answer for a prompt without a usable default
    #[error("no default answer for '{0}'")]
    NoDefault(String),

    /// The presenter cannot re-ask after a validation rejection
    #[error("answer rejected: {0}")]
    Rejected(String),
}

/// Failure of the template renderer
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A condition expression that does not parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("empty condition")]
    Empty,

    #[error("unexpected character '{found}' at offset {offset} in '{source_text}'")]
    UnexpectedChar {
        found: char,
        offset: usize,
        source_text: String,
    },

    #[error("unterminated string literal in '{0}'")]
    UnterminatedString(String),

    #[error("expected {expected} in '{source_text}'")]
    Expected {
        expected: &'static str,
        source_text: String,
    },

    #[error("trailing input after condition in '{0}'")]
    Trailing(String),
}

/// Schema entries that are rejected at load time
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid file glob '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("unclosed brace set in file glob '{0}'")]
    UnclosedBrace(String),

    #[error("invalid validation pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
