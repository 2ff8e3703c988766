//! Error results that can be returned from the grammar compiler and the matcher

use crate::byte_stream::Location;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A malformed grammar: the construct the lexer or parser expected, and where in the grammar text
/// it was missing. Matching never produces one, a value that does not fit is a plain no-match.
#[derive(Clone, Debug, PartialEq)]
pub struct GrammarError {
    /// Error message
    pub message: String,
    /// Location of the error, if available (during lexing and parsing mostly)
    pub location: Option<Location>,
}

impl GrammarError {
    #[must_use]
    pub fn new(message: &str) -> Self {
        GrammarError {
            message: message.to_string(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(message: &str, location: Location) -> Self {
        GrammarError {
            message: message.to_string(),
            location: Some(location),
        }
    }
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {}", self.message, location),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for GrammarError {}

pub type GrammarResult<T> = Result<T, GrammarError>;

/// Serious errors and errors from third-party libraries
#[derive(Debug, Error)]
pub enum Error {
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("token stream error: {0}")]
    TokenStream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_location() {
        let err = GrammarError::with_location("expected ']'", Location::new(1, 7, 6));
        assert_eq!(err.to_string(), "expected ']' at 1:7");

        let err = GrammarError::new("expected a number");
        assert_eq!(err.to_string(), "expected a number");
    }

    #[test]
    fn wraps_grammar_errors() {
        let err: Error = GrammarError::new("expected '>'").into();
        assert!(matches!(err, Error::Grammar(_)));
        assert_eq!(err.to_string(), "grammar error: expected '>'");
    }
}
