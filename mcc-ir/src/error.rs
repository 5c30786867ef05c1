//! Frontend error types

use mcc_common::{CompilerError, SourceLocation};
use thiserror::Error;

/// Errors produced while lexing or parsing textual IR
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at {location}")]
    UnexpectedChar { ch: char, location: SourceLocation },

    #[error("integer literal out of range at {location}")]
    IntOutOfRange { location: SourceLocation },

    #[error("unexpected {found} at {location}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        location: SourceLocation,
    },

    #[error("unknown operation '{name}' at {location}")]
    UnknownOperation { name: String, location: SourceLocation },

    #[error("value %{name} is defined twice at {location}")]
    Redefinition { name: String, location: SourceLocation },

    #[error("unknown value %{name} at {location}")]
    UnknownValue { name: String, location: SourceLocation },

    #[error("unknown block ^{name} at {location}")]
    UnknownBlock { name: String, location: SourceLocation },

    #[error("duplicate block ^{name} at {location}")]
    DuplicateBlock { name: String, location: SourceLocation },

    #[error("block ^{name} has no terminator")]
    MissingTerminator { name: String },

    #[error("instruction after terminator in block ^{name} at {location}")]
    InstructionAfterTerminator { name: String, location: SourceLocation },

    #[error("unexpected end of input")]
    UnexpectedEof,
}

impl ParseError {
    /// The source location this error points at, when it has one
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            ParseError::UnexpectedChar { location, .. }
            | ParseError::IntOutOfRange { location }
            | ParseError::UnexpectedToken { location, .. }
            | ParseError::UnknownOperation { location, .. }
            | ParseError::Redefinition { location, .. }
            | ParseError::UnknownValue { location, .. }
            | ParseError::UnknownBlock { location, .. }
            | ParseError::DuplicateBlock { location, .. }
            | ParseError::InstructionAfterTerminator { location, .. } => Some(location),
            ParseError::MissingTerminator { .. } | ParseError::UnexpectedEof => None,
        }
    }
}

impl From<ParseError> for CompilerError {
    fn from(err: ParseError) -> Self {
        let location = err
            .location()
            .cloned()
            .unwrap_or_else(SourceLocation::dummy);
        CompilerError::ParseError {
            message: err.to_string(),
            location,
        }
    }
}
