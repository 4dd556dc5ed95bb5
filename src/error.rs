//! Error types for query parsing, compilation and execution.

use thiserror::Error;

/// A malformed query string.
///
/// `position` is the byte offset into the query string where parsing
/// stopped; `found` is the character at that offset, or `None` at the end
/// of input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at position {position}: expected {expected}, found {}", describe_found(.found))]
pub struct SyntaxError {
    pub position: usize,
    pub expected: String,
    pub found: Option<char>,
}

fn describe_found(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("{:?}", c),
        None => "end of input".to_string(),
    }
}

/// Errors raised by the query pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// An adapter without a usable name, or one whose name is taken.
    #[error("malformed adapter: {0}")]
    MalformedAdapter(String),

    #[error("adapter {0:?} hasn't been registered")]
    UnknownAdapter(String),

    /// No adapter was named and the registry has no default.
    #[error("no adapter specified and no default adapter is set")]
    NoAdapter,

    #[error("{0:?} is the default adapter; set another default before removing it")]
    DefaultAdapterInUse(String),

    /// A postfix filter stream that cannot reduce to a single boolean.
    #[error("malformed filter expression at token {index}: {reason}")]
    MalformedFilterExpression { index: usize, reason: String },

    /// Data handed to an executing adapter was not a sequence of records.
    #[error("data must be an array of records, got {found}")]
    InvalidInputKind { found: &'static str },

    #[error("no value for placeholder {0:?} in the context")]
    MissingContextValue(String),

    /// A placeholder rendered to text that is not valid where it appears.
    #[error("placeholder substitution produced an invalid {position}: {value:?}")]
    InvalidSubstitution { position: &'static str, value: String },

    #[error("limit must be an integer, got {0:?}")]
    InvalidLimit(String),

    #[error("invalid regular expression /{pattern}/: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid template marker pattern: {0}")]
    InvalidTemplatePattern(String),

    #[error("adapter {0:?} is compile-only and cannot run queries")]
    RunNotSupported(String),

    /// The backend query was produced by a different kind of adapter.
    #[error("adapter {adapter:?} cannot execute this kind of backend query")]
    IncompatibleBackendQuery { adapter: String },

    #[error("adapter {adapter:?} does not support {feature}")]
    Unsupported { adapter: String, feature: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError {
            position: 7,
            expected: "'}'".into(),
            found: Some('?'),
        };
        assert_eq!(
            err.to_string(),
            "syntax error at position 7: expected '}', found '?'"
        );
    }

    #[test]
    fn test_syntax_error_display_end_of_input() {
        let err = SyntaxError {
            position: 3,
            expected: "path".into(),
            found: None,
        };
        assert!(err.to_string().ends_with("found end of input"));
    }

    #[test]
    fn test_syntax_error_converts() {
        let err: Error = SyntaxError {
            position: 0,
            expected: "'/'".into(),
            found: None,
        }
        .into();
        assert!(matches!(err, Error::Syntax(ref s) if s.position == 0));
    }
}
