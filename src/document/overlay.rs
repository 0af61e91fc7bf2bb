//! The document overlay: local edits layered over a stored document.
//!
//! An overlay is either fresh (nothing stored behind it) or bound to a
//! document id in a [`DocumentSource`]. A bound overlay pulls each of its
//! three sections at most once, on first access, and merges the pulled data
//! under whatever the caller already wrote locally. From then on the local
//! copy is authoritative; later changes in the store are not observed.
//!
//! Writes that fully determine an entry (`set_payload`, `set_key`,
//! `replace_term`, `clear_*`) do not pull anything. Reads, and edits that
//! depend on the stored value (`get_or_create_term`, `remove_term`,
//! `remove_key`), pull their section first.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::section::{Section, SectionFlags};
use crate::document::term::TermPosting;
use crate::document::{DocId, KeySlot, KeyValue, TermCount, TermPos};
use crate::error::{DoclayerError, Result};
use crate::storage::{DocumentSource, StoredDocument, StoredTerm};

/// Configuration for bound overlays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Ask the source for a document frequency when a pulled term arrives
    /// without one.
    pub fetch_doc_frequency_hints: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            fetch_doc_frequency_hints: true,
        }
    }
}

/// Non-owning handle to the stored document behind an overlay.
#[derive(Debug, Clone)]
struct Binding {
    source: Weak<dyn DocumentSource>,
    doc_id: DocId,
}

impl Binding {
    fn resolve(&self) -> Result<Arc<dyn DocumentSource>> {
        self.source.upgrade().ok_or(DoclayerError::StoreClosed)
    }
}

/// A document being built or amended.
///
/// Cloning copies the local state and the materialization flags; the clone
/// shares the binding, so a section the source had not yet been asked for is
/// pulled independently by each copy.
#[derive(Debug, Clone)]
pub struct DocumentOverlay {
    binding: Option<Binding>,
    config: OverlayConfig,
    payload: Vec<u8>,
    keys: BTreeMap<KeySlot, KeyValue>,
    terms: BTreeMap<String, TermPosting>,
    sections: SectionFlags,
}

impl DocumentOverlay {
    /// Create a fresh document with nothing stored behind it.
    pub fn new() -> Self {
        DocumentOverlay {
            binding: None,
            config: OverlayConfig::default(),
            payload: Vec::new(),
            keys: BTreeMap::new(),
            terms: BTreeMap::new(),
            sections: SectionFlags::all(),
        }
    }

    /// Create an overlay amending the stored document `doc_id`.
    ///
    /// Nothing is pulled here; an unknown id surfaces on first access.
    pub fn bound(source: &Arc<dyn DocumentSource>, doc_id: DocId) -> Self {
        Self::bound_with_config(source, doc_id, OverlayConfig::default())
    }

    /// Create a bound overlay with a custom configuration.
    pub fn bound_with_config(
        source: &Arc<dyn DocumentSource>,
        doc_id: DocId,
        config: OverlayConfig,
    ) -> Self {
        DocumentOverlay {
            binding: Some(Binding {
                source: Arc::downgrade(source),
                doc_id,
            }),
            config,
            payload: Vec::new(),
            keys: BTreeMap::new(),
            terms: BTreeMap::new(),
            sections: SectionFlags::none(),
        }
    }

    /// The stored document id, or `None` for a fresh document.
    pub fn document_id(&self) -> Option<DocId> {
        self.binding.as_ref().map(|b| b.doc_id)
    }

    /// Whether the overlay amends a stored document.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Whether the section has been materialized.
    pub fn is_materialized(&self, section: Section) -> bool {
        self.sections.is_set(section)
    }

    /// The materialization flags.
    pub fn sections(&self) -> SectionFlags {
        self.sections
    }

    /// The overlay configuration.
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    // ---- payload ----

    /// The payload.
    pub fn payload(&mut self) -> Result<&[u8]> {
        self.need_payload()?;
        Ok(&self.payload)
    }

    /// Replace the payload. The stored payload is never fetched afterwards.
    pub fn set_payload<B: Into<Vec<u8>>>(&mut self, payload: B) {
        self.payload = payload.into();
        self.sections.set(Section::Payload);
    }

    // ---- keys ----

    /// The value in a key slot, if any.
    pub fn key(&mut self, slot: KeySlot) -> Result<Option<&KeyValue>> {
        self.need_keys()?;
        Ok(self.keys.get(&slot))
    }

    /// All key slots.
    pub fn keys(&mut self) -> Result<&BTreeMap<KeySlot, KeyValue>> {
        self.need_keys()?;
        Ok(&self.keys)
    }

    /// Number of key slots in use.
    pub fn key_count(&mut self) -> Result<usize> {
        self.need_keys()?;
        Ok(self.keys.len())
    }

    /// Set a key slot. A value set before the keys are pulled wins over the
    /// stored one.
    pub fn set_key<V: Into<KeyValue>>(&mut self, slot: KeySlot, value: V) {
        self.keys.insert(slot, value.into());
    }

    /// Remove a key slot, returning its value. Removing an empty slot is not
    /// an error.
    pub fn remove_key(&mut self, slot: KeySlot) -> Result<Option<KeyValue>> {
        // Pull first, or the stored value would come back on the next read.
        self.need_keys()?;
        Ok(self.keys.remove(&slot))
    }

    /// Remove every key slot.
    pub fn clear_keys(&mut self) {
        self.keys.clear();
        self.sections.set(Section::Keys);
    }

    // ---- terms ----

    /// The posting for a term, if the document has it.
    pub fn term(&mut self, name: &str) -> Result<Option<&TermPosting>> {
        self.need_terms()?;
        Ok(self.terms.get(name))
    }

    /// All terms, ordered by name.
    pub fn terms(&mut self) -> Result<&BTreeMap<String, TermPosting>> {
        self.need_terms()?;
        Ok(&self.terms)
    }

    /// Number of distinct terms.
    pub fn term_count(&mut self) -> Result<usize> {
        self.need_terms()?;
        Ok(self.terms.len())
    }

    /// The posting for a term, created empty if the document lacks it.
    pub fn get_or_create_term(&mut self, name: &str) -> Result<&mut TermPosting> {
        self.need_terms()?;
        Ok(self
            .terms
            .entry(name.to_string())
            .or_insert_with(|| TermPosting::new(name)))
    }

    /// Put a whole posting in place of whatever the document holds for that
    /// term, returning the previous local posting.
    ///
    /// Does not pull the terms; the posting wins over the stored one.
    pub fn replace_term(&mut self, posting: TermPosting) -> Option<TermPosting> {
        self.terms.insert(posting.name().to_string(), posting)
    }

    /// Remove a term from the document.
    pub fn remove_term(&mut self, name: &str) -> Result<TermPosting> {
        self.need_terms()?;
        self.terms
            .remove(name)
            .ok_or_else(|| DoclayerError::term_not_found(name))
    }

    /// Record an occurrence of a term at a position.
    pub fn add_posting(&mut self, name: &str, pos: TermPos, wdf_inc: TermCount) -> Result<()> {
        let posting = self.get_or_create_term(name)?;
        posting.add_position(pos);
        posting.increase_wdf(wdf_inc);
        Ok(())
    }

    /// Record non-positional occurrences of a term.
    pub fn add_term(&mut self, name: &str, wdf_inc: TermCount) -> Result<()> {
        self.get_or_create_term(name)?.increase_wdf(wdf_inc);
        Ok(())
    }

    /// Remove an occurrence of a term at a position.
    ///
    /// Fails if the term is absent or does not occur at `pos`; the term is
    /// kept even when its last position goes.
    pub fn remove_posting(&mut self, name: &str, pos: TermPos, wdf_dec: TermCount) -> Result<()> {
        self.need_terms()?;
        let posting = self
            .terms
            .get_mut(name)
            .ok_or_else(|| DoclayerError::term_not_found(name))?;
        posting.remove_position(pos)?;
        posting.decrease_wdf(wdf_dec);
        Ok(())
    }

    /// Remove every term.
    pub fn clear_terms(&mut self) {
        self.terms.clear();
        self.sections.set(Section::Terms);
    }

    // ---- whole document ----

    /// Materialize everything and return the merged document for writing
    /// back to a store.
    pub fn into_snapshot(mut self) -> Result<StoredDocument> {
        self.need_payload()?;
        self.need_keys()?;
        self.need_terms()?;

        Ok(StoredDocument {
            payload: self.payload,
            keys: self.keys,
            terms: self
                .terms
                .into_values()
                .map(TermPosting::into_stored)
                .collect::<Vec<StoredTerm>>(),
        })
    }

    /// Describe what is held locally. Never pulls from the store.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    // ---- materialization ----

    fn need_payload(&mut self) -> Result<()> {
        if self.sections.is_set(Section::Payload) {
            return Ok(());
        }
        if let Some(binding) = &self.binding {
            let source = binding.resolve()?;
            let payload = source.fetch_payload(binding.doc_id)?;
            debug!(
                doc_id = binding.doc_id,
                section = %Section::Payload,
                bytes = payload.len(),
                "materialized section"
            );
            self.payload = payload;
        }
        self.sections.set(Section::Payload);
        Ok(())
    }

    fn need_keys(&mut self) -> Result<()> {
        if self.sections.is_set(Section::Keys) {
            return Ok(());
        }
        if let Some(binding) = &self.binding {
            let source = binding.resolve()?;
            let stored = source.fetch_keys(binding.doc_id)?;

            let mut merged = 0usize;
            let mut shadowed = 0usize;
            for (slot, value) in stored {
                match self.keys.entry(slot) {
                    Entry::Vacant(entry) => {
                        entry.insert(value);
                        merged += 1;
                    }
                    Entry::Occupied(_) => shadowed += 1,
                }
            }
            debug!(
                doc_id = binding.doc_id,
                section = %Section::Keys,
                merged,
                shadowed,
                "materialized section"
            );
        }
        self.sections.set(Section::Keys);
        Ok(())
    }

    fn need_terms(&mut self) -> Result<()> {
        if self.sections.is_set(Section::Terms) {
            return Ok(());
        }
        if let Some(binding) = &self.binding {
            let source = binding.resolve()?;

            // Drain the whole stream before touching local state, so a failed
            // pull leaves the overlay as it was.
            let stored = source
                .stream_terms(binding.doc_id)?
                .collect::<Result<Vec<StoredTerm>>>()?;

            let mut pulled = Vec::with_capacity(stored.len());
            let mut shadowed = 0usize;
            for term in stored {
                if self.terms.contains_key(&term.name) {
                    shadowed += 1;
                    continue;
                }
                let mut posting = TermPosting::from_stored(term);
                if self.config.fetch_doc_frequency_hints && posting.doc_frequency_hint() == 0 {
                    posting.set_doc_frequency_hint(source.doc_frequency(posting.name())?);
                }
                pulled.push(posting);
            }

            let merged = pulled.len();
            for posting in pulled {
                self.terms
                    .entry(posting.name().to_string())
                    .or_insert(posting);
            }
            debug!(
                doc_id = binding.doc_id,
                section = %Section::Terms,
                merged,
                shadowed,
                "materialized section"
            );
        }
        self.sections.set(Section::Terms);
        Ok(())
    }
}

impl Default for DocumentOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocumentOverlay(doc_id=")?;
        match self.document_id() {
            Some(doc_id) => write!(f, "{doc_id}")?,
            None => f.write_str("unassigned")?,
        }
        write!(
            f,
            ", materialized=[{}], payload={} bytes, keys={:?}, terms=[",
            self.sections,
            self.payload.len(),
            self.keys
        )?;
        for (i, posting) in self.terms.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{posting}")?;
        }
        f.write_str("])")
    }
}
