//! Backing stores for document overlays.
//!
//! Overlays only ever talk to a store through the [`DocumentSource`] trait:
//! fetch a document's payload, fetch its key slots, stream its terms. Two
//! stores are provided.
//!
//! ## MemoryDocumentStore
//! - Documents held in a lock-guarded map
//! - Counts every pull, which makes it handy in tests
//!
//! ## FileDocumentStore
//! - A memory store persisted to a single checksummed file
//! - Loaded on open, written on flush
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use doclayer::document::DocumentOverlay;
//! use doclayer::storage::memory::MemoryDocumentStore;
//! use doclayer::storage::{DocumentSource, StoredDocument, StoredTerm};
//!
//! # fn main() -> doclayer::error::Result<()> {
//! let store = Arc::new(MemoryDocumentStore::new_default());
//! let doc_id = store.add_document(
//!     StoredDocument::new().with_term(StoredTerm::new("cat", 2, vec![1, 4])),
//! );
//!
//! let source: Arc<dyn DocumentSource> = store.clone();
//! let mut doc = DocumentOverlay::bound(&source, doc_id);
//! doc.get_or_create_term("cat")?.add_position(7);
//!
//! store.replace_document(doc_id, doc.into_snapshot()?)?;
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod memory;
pub mod traits;

pub use file::{FileDocumentStore, FileStoreConfig};
pub use memory::{MemoryDocumentStore, MemoryStoreConfig, PullCount};
pub use traits::{DocumentSource, StoredDocument, StoredTerm, TermStream};
