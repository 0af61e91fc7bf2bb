//! Document overlay model.
//!
//! This module provides the in-memory representation of a single document as
//! it is prepared for indexing. A document is either built from scratch or
//! bound to a document already held by a [`DocumentSource`], in which case its
//! sections (payload, keys, terms) are pulled lazily and merged with the
//! caller's edits.
//!
//! # Core Components
//!
//! - [`term::TermPosting`] - Per-term wdf, ordered positions and frequency hint
//! - [`overlay::DocumentOverlay`] - The document container with lazy sections
//! - [`section::Section`] - The three independently materialized sections
//!
//! # Examples
//!
//! Building a fresh document:
//!
//! ```
//! use doclayer::document::DocumentOverlay;
//!
//! # fn main() -> doclayer::error::Result<()> {
//! let mut doc = DocumentOverlay::new();
//! doc.set_payload(b"the cat sat".to_vec());
//! doc.add_posting("cat", 2, 1)?;
//! doc.set_key(0, "animals");
//!
//! assert_eq!(doc.term("cat")?.unwrap().positions(), &[2]);
//! # Ok(())
//! # }
//! ```
//!
//! [`DocumentSource`]: crate::storage::DocumentSource

pub mod overlay;
pub mod section;
pub mod term;

pub use overlay::{DocumentOverlay, OverlayConfig};
pub use section::{Section, SectionFlags};
pub use term::TermPosting;

/// Identifier of a stored document.
pub type DocId = u64;

/// A 1-based position of a term within a document.
pub type TermPos = u32;

/// Within-document frequency.
pub type TermCount = u32;

/// Number of documents in a collection.
pub type DocCount = u64;

/// Number of a key slot.
pub type KeySlot = u32;

/// Value stored in a key slot.
pub type KeyValue = String;
