//! Error types for the lexmatch library.
//!
//! Every fallible operation returns [`Result`], whose error side is the
//! [`LexmatchError`] enum. The variants follow the failure categories of a
//! query evaluation: bad arguments are caught while building queries and
//! options, capability errors surface the first time an unsupported
//! combination is compiled or run, and backend errors propagate unchanged
//! from the exact posting-list call that raised them.
//!
//! # Examples
//!
//! ```
//! use lexmatch::error::{LexmatchError, Result};
//!
//! fn scale(factor: f64) -> Result<f64> {
//!     if factor < 0.0 {
//!         return Err(LexmatchError::invalid_argument("negative scale factor"));
//!     }
//!     Ok(factor)
//! }
//!
//! assert!(scale(-1.0).is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for lexmatch operations.
#[derive(Error, Debug)]
pub enum LexmatchError {
    /// I/O errors (corpus files, CLI output).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A caller-supplied argument is out of range or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested combination of features is not supported.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The operation is not valid in the current configuration.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A wildcard or edit-distance expansion exceeded its limit.
    #[error("Wildcard expansion error: {0}")]
    WildcardExpansion(String),

    /// The storage backend failed while being read.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A term lookup named something that cannot be a query term.
    #[error("No such term: {0}")]
    NoSuchTerm(String),

    /// A serialised query, weight or source could not be decoded.
    #[error("Serialisation error: {0}")]
    Serialisation(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error.
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with LexmatchError.
pub type Result<T> = std::result::Result<T, LexmatchError>;

impl LexmatchError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        LexmatchError::InvalidArgument(msg.into())
    }

    /// Create a new unimplemented error.
    pub fn unimplemented<S: Into<String>>(msg: S) -> Self {
        LexmatchError::Unimplemented(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        LexmatchError::InvalidOperation(msg.into())
    }

    /// Create a new wildcard expansion error.
    pub fn wildcard<S: Into<String>>(msg: S) -> Self {
        LexmatchError::WildcardExpansion(msg.into())
    }

    /// Create a new backend error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        LexmatchError::Backend(msg.into())
    }

    /// Create a new "no such term" error.
    pub fn no_such_term<S: Into<String>>(msg: S) -> Self {
        LexmatchError::NoSuchTerm(msg.into())
    }

    /// Create a new serialisation error.
    pub fn serialisation<S: Into<String>>(msg: S) -> Self {
        LexmatchError::Serialisation(msg.into())
    }

    /// True for errors raised by an unsupported feature combination.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            LexmatchError::Unimplemented(_) | LexmatchError::InvalidOperation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = LexmatchError::invalid_argument("scale factor -1");
        assert_eq!(error.to_string(), "Invalid argument: scale factor -1");

        let error = LexmatchError::wildcard("th* expands to more than 6 terms");
        assert_eq!(
            error.to_string(),
            "Wildcard expansion error: th* expands to more than 6 terms"
        );

        let error = LexmatchError::unimplemented("nested NEAR");
        assert!(error.is_capability());
        assert!(!LexmatchError::backend("closed").is_capability());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = LexmatchError::from(io_error);

        match error {
            LexmatchError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
