//! File-backed document store.
//!
//! The store keeps every document in memory and persists them to a single
//! file on [`flush`](FileDocumentStore::flush). Layout, all integers little
//! endian:
//!
//! ```text
//! magic "DLYR" | version u32 | body length u64 | body (bincode) | crc32 of body u32
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{DocCount, DocId, KeySlot, KeyValue};
use crate::error::{DoclayerError, Result};
use crate::storage::memory::{MemoryDocumentStore, MemoryStoreConfig, PullCount};
use crate::storage::traits::{DocumentSource, StoredDocument, TermStream};

const MAGIC: &[u8; 4] = b"DLYR";
const FORMAT_VERSION: u32 = 1;

/// Configuration specific to file-based document storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Path of the store file.
    pub path: PathBuf,

    /// Whether to fsync the file on flush.
    #[serde(default = "default_sync_on_flush")]
    pub sync_on_flush: bool,

    /// Number of documents to reserve room for.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

fn default_sync_on_flush() -> bool {
    true
}

fn default_initial_capacity() -> usize {
    MemoryStoreConfig::default().initial_capacity
}

impl FileStoreConfig {
    /// Create a new file store config with the given path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileStoreConfig {
            path: path.into(),
            sync_on_flush: default_sync_on_flush(),
            initial_capacity: default_initial_capacity(),
        }
    }

    /// Parse a config from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FileStoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the config for values the store cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(DoclayerError::invalid_config("file store path is empty"));
        }
        Ok(())
    }
}

/// A document store persisted to a single file.
#[derive(Debug)]
pub struct FileDocumentStore {
    config: FileStoreConfig,
    inner: MemoryDocumentStore,
}

impl FileDocumentStore {
    /// Open the store, loading the file if it exists.
    pub fn open(config: FileStoreConfig) -> Result<Self> {
        config.validate()?;

        let memory_config = MemoryStoreConfig {
            initial_capacity: config.initial_capacity,
        };
        let inner = if config.path.exists() {
            let documents = read_store_file(&config.path)?;
            debug!(
                path = %config.path.display(),
                documents = documents.len(),
                "loaded document store"
            );
            MemoryDocumentStore::from_documents(memory_config, documents)
        } else {
            debug!(path = %config.path.display(), "created empty document store");
            MemoryDocumentStore::new(memory_config)
        };

        Ok(FileDocumentStore { config, inner })
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Store a new document and return its id.
    pub fn add_document(&self, document: StoredDocument) -> DocId {
        self.inner.add_document(document)
    }

    /// Replace a stored document.
    pub fn replace_document(&self, doc_id: DocId, document: StoredDocument) -> Result<()> {
        self.inner.replace_document(doc_id, document)
    }

    /// Delete a stored document.
    pub fn delete_document(&self, doc_id: DocId) -> Result<StoredDocument> {
        self.inner.delete_document(doc_id)
    }

    /// A copy of a stored document.
    pub fn get_document(&self, doc_id: DocId) -> Option<StoredDocument> {
        self.inner.get_document(doc_id)
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.inner.document_count()
    }

    /// How often each section has been pulled so far.
    pub fn pull_count(&self) -> PullCount {
        self.inner.pull_count()
    }

    /// Write all documents to the store file.
    ///
    /// The file is written next to the target and renamed over it.
    pub fn flush(&self) -> Result<()> {
        let documents = self.inner.documents_by_id();
        let body = bincode::serialize(&documents)?;

        let mut buffer = Vec::with_capacity(body.len() + 20);
        buffer.write_all(MAGIC)?;
        buffer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        buffer.write_u64::<LittleEndian>(body.len() as u64)?;
        buffer.write_all(&body)?;
        buffer.write_u32::<LittleEndian>(crc32fast::hash(&body))?;

        let tmp_path = self.config.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&buffer)?;
            if self.config.sync_on_flush {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp_path, &self.config.path)?;

        info!(
            path = %self.config.path.display(),
            documents = documents.len(),
            bytes = buffer.len(),
            "flushed document store"
        );
        Ok(())
    }
}

impl DocumentSource for FileDocumentStore {
    fn fetch_payload(&self, doc_id: DocId) -> Result<Vec<u8>> {
        self.inner.fetch_payload(doc_id)
    }

    fn fetch_keys(&self, doc_id: DocId) -> Result<BTreeMap<KeySlot, KeyValue>> {
        self.inner.fetch_keys(doc_id)
    }

    fn stream_terms(&self, doc_id: DocId) -> Result<TermStream<'_>> {
        self.inner.stream_terms(doc_id)
    }

    fn doc_frequency(&self, term: &str) -> Result<DocCount> {
        self.inner.doc_frequency(term)
    }
}

fn read_store_file(path: &Path) -> Result<Vec<(DocId, StoredDocument)>> {
    let data = fs::read(path)?;
    let mut cursor = Cursor::new(data.as_slice());

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic).map_err(truncated)?;
    if &magic != MAGIC {
        return Err(DoclayerError::storage(format!(
            "not a document store file: {}",
            path.display()
        )));
    }

    let version = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
    if version != FORMAT_VERSION {
        return Err(DoclayerError::storage(format!(
            "unsupported store format version {version}"
        )));
    }

    let len = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
    let start = cursor.position() as usize;
    // The body must leave room for the trailing checksum.
    let end = usize::try_from(len)
        .ok()
        .and_then(|len| start.checked_add(len))
        .filter(|end| data.len().checked_sub(4).is_some_and(|max| *end <= max))
        .ok_or_else(|| DoclayerError::storage("store file is truncated"))?;
    let body = &data[start..end];

    cursor.set_position(end as u64);
    let expected = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
    let actual = crc32fast::hash(body);
    if expected != actual {
        warn!(
            path = %path.display(),
            expected,
            actual,
            "store file checksum mismatch"
        );
        return Err(DoclayerError::storage(format!(
            "checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
        )));
    }

    Ok(bincode::deserialize(body)?)
}

fn truncated(_: io::Error) -> DoclayerError {
    DoclayerError::storage("store file is truncated")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::StoredTerm;
    use tempfile::TempDir;

    fn create_test_config() -> (TempDir, FileStoreConfig) {
        let temp_dir = TempDir::new().unwrap();
        let config = FileStoreConfig::new(temp_dir.path().join("docs.dlyr"));
        (temp_dir, config)
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let (_temp_dir, config) = create_test_config();
        let store = FileDocumentStore::open(config).unwrap();
        assert_eq!(store.document_count(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_flush_and_reopen() {
        let (_temp_dir, config) = create_test_config();
        let store = FileDocumentStore::open(config.clone()).unwrap();
        let doc = StoredDocument::new()
            .with_payload("stored")
            .with_key(4, "four")
            .with_term(StoredTerm::new("cat", 2, vec![1, 4]));
        let doc_id = store.add_document(doc.clone());
        store.flush().unwrap();

        let reopened = FileDocumentStore::open(config).unwrap();
        assert_eq!(reopened.document_count(), 1);
        assert_eq!(reopened.get_document(doc_id), Some(doc));

        // Ids continue after the highest loaded one.
        assert_eq!(reopened.add_document(StoredDocument::new()), doc_id + 1);
    }

    #[test]
    fn test_corrupted_file_is_rejected() {
        let (_temp_dir, config) = create_test_config();
        let store = FileDocumentStore::open(config.clone()).unwrap();
        store.add_document(StoredDocument::new().with_payload("some payload"));
        store.flush().unwrap();

        let mut data = fs::read(&config.path).unwrap();
        let idx = data.len() - 6;
        data[idx] ^= 0xff;
        fs::write(&config.path, &data).unwrap();

        match FileDocumentStore::open(config) {
            Err(DoclayerError::Storage(msg)) => assert!(msg.contains("checksum mismatch")),
            other => panic!("Expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let (_temp_dir, config) = create_test_config();
        fs::write(&config.path, b"NOPE\x01\x00\x00\x00").unwrap();
        assert!(matches!(
            FileDocumentStore::open(config),
            Err(DoclayerError::Storage(_))
        ));
    }

    #[test]
    fn test_huge_length_field_is_rejected() {
        let (_temp_dir, config) = create_test_config();
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.write_u32::<LittleEndian>(FORMAT_VERSION).unwrap();
        data.write_u64::<LittleEndian>(u64::MAX - 17).unwrap();
        data.extend_from_slice(&[0u8; 8]);
        fs::write(&config.path, &data).unwrap();

        match FileDocumentStore::open(config) {
            Err(DoclayerError::Storage(msg)) => assert!(msg.contains("truncated")),
            other => panic!("Expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_header_is_storage_error() {
        let (_temp_dir, config) = create_test_config();
        let store = FileDocumentStore::open(config.clone()).unwrap();
        store.add_document(StoredDocument::new().with_payload("payload"));
        store.flush().unwrap();
        let data = fs::read(&config.path).unwrap();

        // Cut inside the version, inside the length, and inside the checksum.
        for cut in [6, 12, data.len() - 2] {
            fs::write(&config.path, &data[..cut]).unwrap();
            match FileDocumentStore::open(config.clone()) {
                Err(DoclayerError::Storage(msg)) => assert!(msg.contains("truncated")),
                other => panic!("Expected storage error at cut {cut}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_config_from_json() {
        let config = FileStoreConfig::from_json_str(r#"{"path": "/tmp/docs.dlyr"}"#).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/docs.dlyr"));
        assert!(config.sync_on_flush);
        assert_eq!(config.initial_capacity, 1024);

        assert!(matches!(
            FileStoreConfig::from_json_str(r#"{"path": ""}"#),
            Err(DoclayerError::InvalidConfig(_))
        ));
        assert!(matches!(
            FileStoreConfig::from_json_str("{"),
            Err(DoclayerError::Json(_))
        ));
    }
}
