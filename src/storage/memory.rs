//! In-memory document store for testing and caching.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::document::{DocCount, DocId, KeySlot, KeyValue};
use crate::error::{DoclayerError, Result};
use crate::storage::traits::{DocumentSource, StoredDocument, TermStream};

/// Configuration specific to memory-based document storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Number of documents to reserve room for.
    pub initial_capacity: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        MemoryStoreConfig {
            initial_capacity: 1024,
        }
    }
}

/// How many times each section has been pulled from a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullCount {
    pub payload: u64,
    pub keys: u64,
    pub terms: u64,
}

impl PullCount {
    /// Pulls of all sections together.
    pub fn total(&self) -> u64 {
        self.payload + self.keys + self.terms
    }
}

#[derive(Debug, Default)]
struct PullCounters {
    payload: AtomicU64,
    keys: AtomicU64,
    terms: AtomicU64,
}

/// Documents plus the number of documents each term occurs in.
#[derive(Debug, Default)]
struct StoreState {
    documents: AHashMap<DocId, StoredDocument>,
    term_counts: AHashMap<String, DocCount>,
}

impl StoreState {
    fn with_capacity(capacity: usize) -> Self {
        StoreState {
            documents: AHashMap::with_capacity(capacity),
            term_counts: AHashMap::new(),
        }
    }

    fn insert(&mut self, doc_id: DocId, document: StoredDocument) {
        self.count_terms(&document);
        if let Some(previous) = self.documents.insert(doc_id, document) {
            self.uncount_terms(&previous);
        }
    }

    fn remove(&mut self, doc_id: DocId) -> Option<StoredDocument> {
        let document = self.documents.remove(&doc_id)?;
        self.uncount_terms(&document);
        Some(document)
    }

    fn count_terms(&mut self, document: &StoredDocument) {
        for name in distinct_terms(document) {
            *self.term_counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    fn uncount_terms(&mut self, document: &StoredDocument) {
        for name in distinct_terms(document) {
            if let Some(count) = self.term_counts.get_mut(name) {
                *count -= 1;
                if *count == 0 {
                    self.term_counts.remove(name);
                }
            }
        }
    }
}

fn distinct_terms(document: &StoredDocument) -> AHashSet<&str> {
    document.terms.iter().map(|t| t.name.as_str()).collect()
}

/// An in-memory document store.
///
/// Ids are assigned from 1 upwards and never reused. Document frequencies
/// are kept up to date on every write, so `doc_frequency` is a map lookup.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    /// The stored documents and term counts.
    state: RwLock<StoreState>,
    /// Next id to assign.
    next_id: AtomicU64,
    /// Pull statistics.
    pulls: PullCounters,
}

impl MemoryDocumentStore {
    /// Create a new memory store.
    pub fn new(config: MemoryStoreConfig) -> Self {
        MemoryDocumentStore {
            state: RwLock::new(StoreState::with_capacity(config.initial_capacity)),
            next_id: AtomicU64::new(1),
            pulls: PullCounters::default(),
        }
    }

    /// Create a new memory store with default configuration.
    pub fn new_default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }

    /// Rebuild a store from previously stored documents.
    pub(crate) fn from_documents(
        config: MemoryStoreConfig,
        documents: Vec<(DocId, StoredDocument)>,
    ) -> Self {
        let next_id = documents.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        let mut state = StoreState::with_capacity(config.initial_capacity.max(documents.len()));
        for (doc_id, document) in documents {
            state.insert(doc_id, document);
        }
        MemoryDocumentStore {
            state: RwLock::new(state),
            next_id: AtomicU64::new(next_id),
            pulls: PullCounters::default(),
        }
    }

    /// Store a new document and return its id.
    pub fn add_document(&self, document: StoredDocument) -> DocId {
        let doc_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.state.write().insert(doc_id, document);
        doc_id
    }

    /// Replace a stored document, typically with an overlay snapshot.
    pub fn replace_document(&self, doc_id: DocId, document: StoredDocument) -> Result<()> {
        let mut state = self.state.write();
        if !state.documents.contains_key(&doc_id) {
            return Err(DoclayerError::document_not_found(doc_id));
        }
        state.insert(doc_id, document);
        Ok(())
    }

    /// Delete a stored document.
    pub fn delete_document(&self, doc_id: DocId) -> Result<StoredDocument> {
        self.state
            .write()
            .remove(doc_id)
            .ok_or_else(|| DoclayerError::document_not_found(doc_id))
    }

    /// A copy of a stored document.
    pub fn get_document(&self, doc_id: DocId) -> Option<StoredDocument> {
        self.state.read().documents.get(&doc_id).cloned()
    }

    /// Whether the id is known.
    pub fn contains(&self, doc_id: DocId) -> bool {
        self.state.read().documents.contains_key(&doc_id)
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.state.read().documents.len()
    }

    /// All documents ordered by id.
    pub(crate) fn documents_by_id(&self) -> Vec<(DocId, StoredDocument)> {
        let mut documents: Vec<(DocId, StoredDocument)> = self
            .state
            .read()
            .documents
            .iter()
            .map(|(id, doc)| (*id, doc.clone()))
            .collect();
        documents.sort_by_key(|(id, _)| *id);
        documents
    }

    /// How often each section has been pulled so far.
    pub fn pull_count(&self) -> PullCount {
        PullCount {
            payload: self.pulls.payload.load(Ordering::Relaxed),
            keys: self.pulls.keys.load(Ordering::Relaxed),
            terms: self.pulls.terms.load(Ordering::Relaxed),
        }
    }

    fn with_document<T>(&self, doc_id: DocId, f: impl FnOnce(&StoredDocument) -> T) -> Result<T> {
        let state = self.state.read();
        let document = state
            .documents
            .get(&doc_id)
            .ok_or_else(|| DoclayerError::document_not_found(doc_id))?;
        Ok(f(document))
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new_default()
    }
}

impl DocumentSource for MemoryDocumentStore {
    fn fetch_payload(&self, doc_id: DocId) -> Result<Vec<u8>> {
        let payload = self.with_document(doc_id, |doc| doc.payload.clone())?;
        self.pulls.payload.fetch_add(1, Ordering::Relaxed);
        trace!(doc_id, "fetched payload");
        Ok(payload)
    }

    fn fetch_keys(&self, doc_id: DocId) -> Result<BTreeMap<KeySlot, KeyValue>> {
        let keys = self.with_document(doc_id, |doc| doc.keys.clone())?;
        self.pulls.keys.fetch_add(1, Ordering::Relaxed);
        trace!(doc_id, "fetched keys");
        Ok(keys)
    }

    fn stream_terms(&self, doc_id: DocId) -> Result<TermStream<'_>> {
        // Copy the terms out so the lock is not held while the caller iterates.
        let terms = self.with_document(doc_id, |doc| doc.terms.clone())?;
        self.pulls.terms.fetch_add(1, Ordering::Relaxed);
        trace!(doc_id, count = terms.len(), "streaming terms");
        Ok(Box::new(terms.into_iter().map(Ok)))
    }

    fn doc_frequency(&self, term: &str) -> Result<DocCount> {
        Ok(self.state.read().term_counts.get(term).copied().unwrap_or(0))
    }
}
