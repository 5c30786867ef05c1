//! Error handling for the MicroC IR compiler
//!
//! This module defines the top-level error type that the driver reports.
//! Each phase has its own error enum (`ParseError` in `mcc-ir`,
//! `LoweringError` in `mcc-backend`) which converts into `CompilerError`.

use crate::source_loc::SourceLocation;
use thiserror::Error;

/// Main compiler error type that encompasses all phases of compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("Parse error at {location}: {message}")]
    ParseError {
        location: SourceLocation,
        message: String,
    },

    #[error("Lowering error in function '{function}': {message}")]
    LoweringError { function: String, message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompilerError {
    /// Create a parse error
    pub fn parse_error(message: String, location: SourceLocation) -> Self {
        CompilerError::ParseError { location, message }
    }

    /// Create a lowering error tagged with the failing function
    pub fn lowering_error(function: &str, message: String) -> Self {
        CompilerError::LoweringError {
            function: function.to_string(),
            message,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError {
            message: err.to_string(),
        }
    }
}

/// Convert from String (for simple error cases)
impl From<String> for CompilerError {
    fn from(message: String) -> Self {
        CompilerError::InternalError { message }
    }
}
