//! Error types for the EAD hierarchy builder.
//!
//! Library crates use [`EadHierError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all hierarchy-builder operations.
#[derive(Debug, thiserror::Error)]
pub enum EadHierError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Markup that a conforming XML parser rejected.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Path expression rejected by the query evaluator.
    #[error("query error in '{path}': {message}")]
    Query { path: String, message: String },

    /// Invocation context does not match the fixed import target.
    #[error("context error: {message}")]
    Context { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON/TOML encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EadHierError>;

impl EadHierError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a query error for the given path expression.
    pub fn query(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Query {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a context-mismatch error.
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context {
            message: msg.into(),
        }
    }

    /// Create a serialization error from any displayable message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for EadHierError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<toml::ser::Error> for EadHierError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = EadHierError::config("levels table missing");
        assert_eq!(err.to_string(), "config error: levels table missing");

        let err = EadHierError::query("unittitle[", "unclosed predicate");
        assert_eq!(
            err.to_string(),
            "query error in 'unittitle[': unclosed predicate"
        );

        let err = EadHierError::context("destination must be ca_collections._children");
        assert!(err.to_string().contains("ca_collections._children"));
    }

    #[test]
    fn json_errors_convert_to_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EadHierError = json_err.into();
        assert!(matches!(err, EadHierError::Serialization(_)));
        assert!(err.to_string().starts_with("serialization error:"));
    }
}
