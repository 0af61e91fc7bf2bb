//! Materialization state of a document's sections.

use std::fmt;

/// One independently materialized part of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// The opaque payload blob.
    Payload,
    /// The key slots.
    Keys,
    /// The terms with their positions.
    Terms,
}

impl Section {
    /// All sections, in a fixed order.
    pub const ALL: [Section; 3] = [Section::Payload, Section::Keys, Section::Terms];

    /// Lowercase name used in logs and descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Payload => "payload",
            Section::Keys => "keys",
            Section::Terms => "terms",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which sections hold the authoritative copy locally.
///
/// A flag only ever goes from `false` to `true`; there is no way to unset one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionFlags {
    payload: bool,
    keys: bool,
    terms: bool,
}

impl SectionFlags {
    /// Every section materialized. Used for documents without a backing store.
    pub fn all() -> Self {
        SectionFlags {
            payload: true,
            keys: true,
            terms: true,
        }
    }

    /// No section materialized yet.
    pub fn none() -> Self {
        SectionFlags {
            payload: false,
            keys: false,
            terms: false,
        }
    }

    /// Whether the section is materialized.
    pub fn is_set(&self, section: Section) -> bool {
        match section {
            Section::Payload => self.payload,
            Section::Keys => self.keys,
            Section::Terms => self.terms,
        }
    }

    /// Mark the section materialized.
    pub fn set(&mut self, section: Section) {
        match section {
            Section::Payload => self.payload = true,
            Section::Keys => self.keys = true,
            Section::Terms => self.terms = true,
        }
    }

    /// Whether every section is materialized.
    pub fn is_complete(&self) -> bool {
        self.payload && self.keys && self.terms
    }
}

impl fmt::Display for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for section in Section::ALL {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", section, self.is_set(section))?;
        }
        Ok(())
    }
}
