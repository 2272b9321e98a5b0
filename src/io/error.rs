use std::fmt;

use super::Format;

/// Failure to turn input bytes into a [`Structure`](crate::structure::Structure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The format tag is not one of the recognised formats.
    UnsupportedFormat(String),
    /// A record could not be parsed.
    MalformedInput {
        /// Format being parsed.
        format: Format,
        /// 1-based line number of the offending record.
        line: usize,
        /// What was wrong with it.
        message: String,
    },
    /// The input was empty or declared no atoms.
    EmptyStructure,
}

impl ParseError {
    /// Shorthand for [`ParseError::MalformedInput`].
    pub fn malformed(format: Format, line: usize, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            format,
            line,
            message: message.into(),
        }
    }

    /// Line number carried by a malformed-input error.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedInput { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat(tag) => {
                write!(
                    f,
                    "unsupported format '{tag}' (expected one of: {})",
                    Format::TAGS.join(", ")
                )
            }
            Self::MalformedInput {
                format,
                line,
                message,
            } => write!(f, "malformed {format} input at line {line}: {message}"),
            Self::EmptyStructure => write!(f, "input contains no atoms"),
        }
    }
}

impl std::error::Error for ParseError {}
