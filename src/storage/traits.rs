//! Backing store abstraction and the plain document types it exchanges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{DocCount, DocId, KeySlot, KeyValue, TermCount, TermPos};
use crate::error::Result;

/// A term as held by a backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTerm {
    /// The term name.
    pub name: String,

    /// Within-document frequency.
    pub wdf: TermCount,

    /// Positions, expected in increasing order.
    pub positions: Vec<TermPos>,

    /// Document frequency, 0 if the store does not supply one with the term.
    #[serde(default)]
    pub doc_frequency: DocCount,
}

impl StoredTerm {
    /// Create a stored term without a document frequency.
    pub fn new<S: Into<String>>(name: S, wdf: TermCount, positions: Vec<TermPos>) -> Self {
        StoredTerm {
            name: name.into(),
            wdf,
            positions,
            doc_frequency: 0,
        }
    }
}

/// A whole document in the plain form a backing store persists.
///
/// This is also the merged snapshot an overlay hands to whatever writes it
/// back into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Opaque caller-defined data.
    pub payload: Vec<u8>,

    /// Key slots.
    pub keys: BTreeMap<KeySlot, KeyValue>,

    /// Terms ordered by name.
    pub terms: Vec<StoredTerm>,
}

impl StoredDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload (builder style).
    pub fn with_payload<B: Into<Vec<u8>>>(mut self, payload: B) -> Self {
        self.payload = payload.into();
        self
    }

    /// Add a key (builder style).
    pub fn with_key<V: Into<KeyValue>>(mut self, slot: KeySlot, value: V) -> Self {
        self.keys.insert(slot, value.into());
        self
    }

    /// Add a term (builder style).
    pub fn with_term(mut self, term: StoredTerm) -> Self {
        self.terms.push(term);
        self
    }

    /// Whether the document carries the term.
    pub fn has_term(&self, name: &str) -> bool {
        self.terms.iter().any(|t| t.name == name)
    }
}

/// One-shot stream of the terms of a stored document.
pub type TermStream<'a> = Box<dyn Iterator<Item = Result<StoredTerm>> + 'a>;

/// A store that overlays pull document sections from.
///
/// Every method that takes a document id fails with
/// [`DoclayerError::DocumentNotFound`](crate::error::DoclayerError::DocumentNotFound)
/// if the id is unknown. Implementations may block on I/O.
pub trait DocumentSource: Send + Sync + std::fmt::Debug {
    /// Fetch the payload of a document.
    fn fetch_payload(&self, doc_id: DocId) -> Result<Vec<u8>>;

    /// Fetch all key slots of a document.
    fn fetch_keys(&self, doc_id: DocId) -> Result<BTreeMap<KeySlot, KeyValue>>;

    /// Stream the terms of a document.
    ///
    /// The stream is finite and cannot be restarted.
    fn stream_terms(&self, doc_id: DocId) -> Result<TermStream<'_>>;

    /// Number of documents containing the term, 0 if unknown.
    fn doc_frequency(&self, _term: &str) -> Result<DocCount> {
        Ok(0)
    }
}
