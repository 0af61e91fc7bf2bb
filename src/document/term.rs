//! Per-term state inside one document.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::{DocCount, TermCount, TermPos};
use crate::error::{DoclayerError, Result};
use crate::storage::StoredTerm;

/// A term on a document: its wdf, positions and document frequency hint.
///
/// The wdf and the position list are independent signals. A term may occur
/// several times at the same position, so the wdf can exceed the number of
/// positions, and non-positional occurrences add to the wdf without adding a
/// position at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPosting {
    /// The term name.
    name: String,
    /// Within-document frequency.
    wdf: TermCount,
    /// Positions, strictly increasing.
    positions: Vec<TermPos>,
    /// Number of documents indexed by the term, 0 if unknown.
    doc_frequency_hint: DocCount,
}

impl TermPosting {
    /// Create an empty posting with wdf 0 and no positions.
    pub fn new<S: Into<String>>(name: S) -> Self {
        TermPosting {
            name: name.into(),
            wdf: 0,
            positions: Vec::new(),
            doc_frequency_hint: 0,
        }
    }

    /// Build a posting from a term pulled out of a backing store.
    ///
    /// Positions go through [`add_position`](Self::add_position), so a source
    /// that delivers duplicates or unsorted positions still yields a valid list.
    pub fn from_stored(stored: StoredTerm) -> Self {
        let mut posting = TermPosting {
            name: stored.name,
            wdf: stored.wdf,
            positions: Vec::with_capacity(stored.positions.len()),
            doc_frequency_hint: stored.doc_frequency,
        };
        for pos in stored.positions {
            posting.add_position(pos);
        }
        posting
    }

    /// Set the wdf (builder style).
    pub fn with_wdf(mut self, wdf: TermCount) -> Self {
        self.wdf = wdf;
        self
    }

    /// Add positions (builder style).
    pub fn with_positions<I: IntoIterator<Item = TermPos>>(mut self, positions: I) -> Self {
        for pos in positions {
            self.add_position(pos);
        }
        self
    }

    /// The term name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a position, unless it is already present.
    ///
    /// This does not change the wdf. Appending after the last position is
    /// constant time, which covers a document streamed left to right.
    /// Positions count from 1, but 0 is stored like any other value and
    /// sorts first.
    pub fn add_position(&mut self, pos: TermPos) {
        match self.positions.last() {
            None => self.positions.push(pos),
            Some(&last) if pos > last => self.positions.push(pos),
            Some(&last) if pos == last => {}
            Some(_) => {
                if let Err(idx) = self.positions.binary_search(&pos) {
                    self.positions.insert(idx, pos);
                }
            }
        }
    }

    /// Remove a position.
    ///
    /// This does not change the wdf. Fails with
    /// [`DoclayerError::InvalidPosition`] if the position is absent, in which
    /// case the list is left untouched.
    pub fn remove_position(&mut self, pos: TermPos) -> Result<()> {
        match self.positions.binary_search(&pos) {
            Ok(idx) => {
                self.positions.remove(idx);
                Ok(())
            }
            Err(_) => Err(DoclayerError::invalid_position(self.name.as_str(), pos)),
        }
    }

    /// Whether the term occurs at the given position.
    pub fn has_position(&self, pos: TermPos) -> bool {
        self.positions.binary_search(&pos).is_ok()
    }

    /// The positions, in strictly increasing order.
    pub fn positions(&self) -> &[TermPos] {
        &self.positions
    }

    /// Number of distinct positions.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Set the wdf.
    pub fn set_wdf(&mut self, wdf: TermCount) {
        self.wdf = wdf;
    }

    /// Get the wdf.
    pub fn wdf(&self) -> TermCount {
        self.wdf
    }

    /// Increase the wdf.
    pub fn increase_wdf(&mut self, delta: TermCount) {
        self.wdf = self.wdf.saturating_add(delta);
    }

    /// Decrease the wdf, stopping at zero.
    pub fn decrease_wdf(&mut self, delta: TermCount) {
        self.wdf = self.wdf.saturating_sub(delta);
    }

    /// Document frequency hint supplied by the backing store, 0 if unknown.
    pub fn doc_frequency_hint(&self) -> DocCount {
        self.doc_frequency_hint
    }

    /// Set the document frequency hint.
    pub fn set_doc_frequency_hint(&mut self, hint: DocCount) {
        self.doc_frequency_hint = hint;
    }

    /// Human-readable description, for diagnostics and tests.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Convert back into the plain form a backing store persists.
    pub fn into_stored(self) -> StoredTerm {
        StoredTerm {
            name: self.name,
            wdf: self.wdf,
            positions: self.positions,
            doc_frequency: self.doc_frequency_hint,
        }
    }
}

impl fmt::Display for TermPosting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TermPosting({}, wdf={}, positions={:?}, doc_frequency_hint={})",
            self.name, self.wdf, self.positions, self.doc_frequency_hint
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_posting_is_empty() {
        let posting = TermPosting::new("cat");
        assert_eq!(posting.name(), "cat");
        assert_eq!(posting.wdf(), 0);
        assert!(posting.positions().is_empty());
        assert_eq!(posting.doc_frequency_hint(), 0);
    }

    #[test]
    fn test_add_position_orders_and_dedups() {
        let mut posting = TermPosting::new("cat");
        for pos in [5, 3, 5, 1] {
            posting.add_position(pos);
        }
        assert_eq!(posting.positions(), &[1, 3, 5]);

        posting.add_position(4);
        posting.add_position(9);
        posting.add_position(1);
        assert_eq!(posting.positions(), &[1, 3, 4, 5, 9]);
    }

    #[test]
    fn test_position_zero_sorts_first() {
        let mut posting = TermPosting::new("cat").with_positions([3, 1]);
        posting.add_position(0);
        posting.add_position(0);
        assert_eq!(posting.positions(), &[0, 1, 3]);
        posting.remove_position(0).unwrap();
        assert_eq!(posting.positions(), &[1, 3]);
    }

    #[test]
    fn test_scrambled_insertion_stays_sorted() {
        let mut posting = TermPosting::new("cat");
        let mut expected = Vec::new();
        let mut seed: u32 = 12345;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let pos = 1 + (seed >> 16) % 200;
            posting.add_position(pos);
            expected.push(pos);
        }
        expected.sort_unstable();
        expected.dedup();

        assert_eq!(posting.positions(), expected.as_slice());
        assert!(posting.positions().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_positions_do_not_change_wdf() {
        let mut posting = TermPosting::new("cat");
        posting.set_wdf(3);
        posting.add_position(10);
        posting.add_position(2);
        assert_eq!(posting.wdf(), 3);

        posting.remove_position(10).unwrap();
        assert_eq!(posting.wdf(), 3);
    }

    #[test]
    fn test_remove_missing_position_fails_without_mutation() {
        let mut posting = TermPosting::new("cat").with_positions([1, 4]);

        let err = posting.remove_position(3).unwrap_err();
        match err {
            DoclayerError::InvalidPosition { term, position } => {
                assert_eq!(term, "cat");
                assert_eq!(position, 3);
            }
            other => panic!("Expected InvalidPosition, got {other:?}"),
        }
        assert_eq!(posting.positions(), &[1, 4]);

        posting.remove_position(1).unwrap();
        assert_eq!(posting.positions(), &[4]);
        assert!(posting.remove_position(1).is_err());
    }

    #[test]
    fn test_wdf_is_independent_of_positions() {
        let mut posting = TermPosting::new("cat").with_positions([1, 2, 3]);
        posting.set_wdf(1);
        assert_eq!(posting.wdf(), 1);
        assert_eq!(posting.position_count(), 3);

        posting.increase_wdf(5);
        assert_eq!(posting.wdf(), 6);
        posting.decrease_wdf(10);
        assert_eq!(posting.wdf(), 0);
    }

    #[test]
    fn test_from_stored_repairs_order() {
        let stored = StoredTerm {
            name: "dog".to_string(),
            wdf: 4,
            positions: vec![7, 2, 7, 3],
            doc_frequency: 12,
        };
        let posting = TermPosting::from_stored(stored);
        assert_eq!(posting.positions(), &[2, 3, 7]);
        assert_eq!(posting.wdf(), 4);
        assert_eq!(posting.doc_frequency_hint(), 12);
    }

    #[test]
    fn test_describe() {
        let posting = TermPosting::new("cat").with_wdf(2).with_positions([4, 1]);
        assert_eq!(
            posting.describe(),
            "TermPosting(cat, wdf=2, positions=[1, 4], doc_frequency_hint=0)"
        );
    }
}
