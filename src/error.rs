//! Error types for the doclayer library.
//!
//! All errors are represented by the [`DoclayerError`] enum. Position and term
//! errors are raised locally by the overlay; `DocumentNotFound` is only ever
//! produced by a [`DocumentSource`](crate::storage::DocumentSource) and passed
//! through unchanged.
//!
//! # Examples
//!
//! ```
//! use doclayer::error::{DoclayerError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(DoclayerError::term_not_found("cat"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

use crate::document::{DocId, TermPos};

/// The main error type for doclayer operations.
#[derive(Error, Debug)]
pub enum DoclayerError {
    /// A position was removed from a term that does not carry it.
    #[error("Invalid position: term '{term}' has no position {position}")]
    InvalidPosition { term: String, position: TermPos },

    /// A term expected to be on the document is absent.
    #[error("Term not found: {0}")]
    TermNotFound(String),

    /// The backing store does not know the bound document id.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocId),

    /// The backing store behind a bound overlay has been dropped.
    #[error("Backing store is closed")]
    StoreClosed,

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Errors from sources that report through anyhow
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with DoclayerError.
pub type Result<T> = std::result::Result<T, DoclayerError>;

impl DoclayerError {
    /// Create a new invalid position error.
    pub fn invalid_position<S: Into<String>>(term: S, position: TermPos) -> Self {
        DoclayerError::InvalidPosition {
            term: term.into(),
            position,
        }
    }

    /// Create a new term not found error.
    pub fn term_not_found<S: Into<String>>(term: S) -> Self {
        DoclayerError::TermNotFound(term.into())
    }

    /// Create a new document not found error.
    pub fn document_not_found(doc_id: DocId) -> Self {
        DoclayerError::DocumentNotFound(doc_id)
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        DoclayerError::Storage(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        DoclayerError::Serialization(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        DoclayerError::InvalidConfig(msg.into())
    }

    /// Whether the error reports a missing document or term.
    ///
    /// A stale document id can be re-resolved by the caller; the overlay
    /// itself never retries.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DoclayerError::DocumentNotFound(_) | DoclayerError::TermNotFound(_)
        )
    }
}

impl From<bincode::Error> for DoclayerError {
    fn from(err: bincode::Error) -> Self {
        DoclayerError::serialization(err.to_string())
    }
}
