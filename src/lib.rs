//! # doclayer
//!
//! Lazily materialized document overlays for full-text indexing.
//!
//! ## Features
//!
//! - Build new documents entirely in memory
//! - Amend stored documents without reading them in full
//! - Per-section pull on first access, with local edits taking precedence
//! - Strictly ordered, duplicate-free term position lists
//! - In-memory and file-backed reference stores

pub mod document;
pub mod error;
pub mod storage;

pub mod prelude {
    pub use crate::document::{DocumentOverlay, OverlayConfig, Section, TermPosting};
    pub use crate::error::{DoclayerError, Result};
    pub use crate::storage::{DocumentSource, StoredDocument, StoredTerm};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
