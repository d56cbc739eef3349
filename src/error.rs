//! Error types for the paraminfer crate.

use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type for the paraminfer crate.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source unit could not be parsed. Fatal for the whole unit.
    #[error("Parse error in {file} at {line}:{column}: {message}")]
    Parse {
        /// Synthetic or real file name of the unit.
        file: String,
        /// 1-based line of the first syntax error.
        line: usize,
        /// 1-based column of the first syntax error.
        column: usize,
        /// Human-readable description.
        message: String,
    },

    /// The tree-sitter grammar could not be loaded.
    #[error("Language error: {0}")]
    Language(String),

    /// Malformed or inconsistent configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration JSON could not be decoded.
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new parse error.
    pub fn parse_error(
        file: impl Into<String>,
        line: usize,
        column: usize,
        msg: impl Into<String>,
    ) -> Self {
        Self::Parse { file: file.into(), line, column, message: msg.into() }
    }

    /// Creates a new configuration error.
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true when this error aborted parsing of a source unit.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse_error("dummy.ts", 2, 14, "unexpected token");
        assert_eq!(err.to_string(), "Parse error in dummy.ts at 2:14: unexpected token");
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::config_error("unknown strategy `fast`");
        assert_eq!(err.to_string(), "Configuration error: unknown strategy `fast`");
        assert!(!err.is_parse_error());
    }
}
