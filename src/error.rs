//! Error types for the glaive library.

use std::io;

use thiserror::Error;

/// The main error type for glaive operations.
#[derive(Error, Debug)]
pub enum GlaiveError {
    /// Invalid schema, flag combination or writer setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The write lock (or another named lock) could not be obtained.
    #[error("Lock error: {0}")]
    Lock(String),

    /// I/O errors from the underlying store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed query text.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unknown field, file or document.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Index metadata or segment data does not match what was expected.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// A query expanded to more clauses than allowed.
    #[error("Too many clauses: {message} (limit {limit})")]
    TooManyClauses { limit: usize, message: String },

    /// Store misuse (closed store, bad file name).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Analyzer construction errors.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Invalid query construction.
    #[error("Query error: {0}")]
    Query(String),

    /// Metadata encoding errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`GlaiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Lock,
    Io,
    Parse,
    NotFound,
    CorruptIndex,
    TooManyClauses,
    Storage,
    Analysis,
    Query,
}

/// Result type alias for operations that may fail with GlaiveError.
pub type Result<T> = std::result::Result<T, GlaiveError>;

impl GlaiveError {
    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Configuration(msg.into())
    }

    /// Create a new lock error.
    pub fn lock<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Lock(msg.into())
    }

    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Parse(msg.into())
    }

    /// Create a new not-found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        GlaiveError::NotFound(msg.into())
    }

    /// Create a new corrupt-index error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        GlaiveError::CorruptIndex(msg.into())
    }

    /// Create a new too-many-clauses error.
    pub fn too_many_clauses<S: Into<String>>(limit: usize, msg: S) -> Self {
        GlaiveError::TooManyClauses {
            limit,
            message: msg.into(),
        }
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Storage(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Analysis(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Query(msg.into())
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GlaiveError::Configuration(_) => ErrorKind::Configuration,
            GlaiveError::Lock(_) => ErrorKind::Lock,
            GlaiveError::Io(_) => ErrorKind::Io,
            GlaiveError::Parse(_) => ErrorKind::Parse,
            GlaiveError::NotFound(_) => ErrorKind::NotFound,
            GlaiveError::CorruptIndex(_) | GlaiveError::Json(_) => ErrorKind::CorruptIndex,
            GlaiveError::TooManyClauses { .. } => ErrorKind::TooManyClauses,
            GlaiveError::Storage(_) => ErrorKind::Storage,
            GlaiveError::Analysis(_) => ErrorKind::Analysis,
            GlaiveError::Query(_) => ErrorKind::Query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = GlaiveError::lock("write.lock is held");
        assert_eq!(error.to_string(), "Lock error: write.lock is held");
        assert_eq!(error.kind(), ErrorKind::Lock);

        let error = GlaiveError::too_many_clauses(4, "title:ab*");
        assert_eq!(error.kind(), ErrorKind::TooManyClauses);
        assert!(error.to_string().contains("limit 4"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "segments");
        let error: GlaiveError = io_error.into();

        match error {
            GlaiveError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }
    }

    #[test]
    fn test_json_errors_count_as_corruption() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: GlaiveError = err.into();
        assert_eq!(error.kind(), ErrorKind::CorruptIndex);
    }
}
