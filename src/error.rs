//! Error types shared by the parser and the serializer.

use std::fmt;
use thiserror::Error;

/// Line/column location in the input, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}:{}", self.line, self.column)
    }
}

impl From<(usize, usize)> for Position {
    fn from((line, column): (usize, usize)) -> Self {
        Position { line, column }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Lexical or syntactic violation in the input. Fatal to the parser.
    #[error("{message} {position}")]
    Malformed { message: String, position: Position },

    /// Unknown feature or unsupported configuration value.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Serializer calls issued out of sequence.
    #[error("illegal call sequence: {0}")]
    Misuse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn malformed(message: impl Into<String>, position: Position) -> Self {
        Error::Malformed {
            message: message.into(),
            position,
        }
    }

    /// Position of a malformed-input error, if this is one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Malformed { position, .. } => Some(*position),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_position() {
        let err = Error::malformed("expected: '>'", Position::new(3, 14));
        assert_eq!(err.to_string(), "expected: '>' @3:14");
        assert_eq!(err.position(), Some(Position::new(3, 14)));
    }

    #[test]
    fn test_io_error_wraps() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.position().is_none());
    }
}
