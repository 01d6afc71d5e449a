//! Read-only blob stores holding one JSON document per key.
//!
//! The core never cares where the documents live; it only needs
//! `fetch(key) -> body | NotFound`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::AppError;

/// Address of a document in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlobKey {
    /// One measure for one currency, e.g. `usd-core_cpi`.
    Measure { currency: String, measure: String },
    /// The simplified CPI-only document, e.g. `usd-inflation`.
    Legacy { currency: String },
}

impl BlobKey {
    pub fn measure(currency: &str, measure: &str) -> Self {
        BlobKey::Measure {
            currency: currency.to_string(),
            measure: measure.to_string(),
        }
    }

    pub fn legacy(currency: &str) -> Self {
        BlobKey::Legacy {
            currency: currency.to_string(),
        }
    }

    /// File stem / URL path segment for this key (lower-cased).
    pub fn stem(&self) -> String {
        match self {
            BlobKey::Measure { currency, measure } => {
                format!("{}-{}", currency.to_ascii_lowercase(), measure.to_ascii_lowercase())
            }
            BlobKey::Legacy { currency } => format!("{}-inflation", currency.to_ascii_lowercase()),
        }
    }
}

impl std::fmt::Display for BlobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stem())
    }
}

pub trait BlobStore: Send + Sync {
    /// Fetch the raw document body. Missing or unreachable documents are `NotFound`.
    fn fetch(&self, key: &BlobKey) -> Result<String, AppError>;
}

/// Documents stored as `{dir}/{stem}.json`.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &BlobKey) -> PathBuf {
        self.root.join(format!("{}.json", key.stem()))
    }
}

impl BlobStore for DirBlobStore {
    fn fetch(&self, key: &BlobKey) -> Result<String, AppError> {
        let path = self.path_for(key);
        std::fs::read_to_string(&path)
            .map_err(|e| AppError::not_found(format!("Failed to read '{}': {e}", path.display())))
    }
}

/// In-memory store; also counts fetches so callers can observe caching.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    docs: RwLock<HashMap<String, String>>,
    fetches: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &BlobKey, body: impl Into<String>) {
        let mut docs = self.docs.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        docs.insert(key.stem(), body.into());
    }

    pub fn remove(&self, key: &BlobKey) {
        let mut docs = self.docs.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        docs.remove(&key.stem());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl BlobStore for MemoryBlobStore {
    fn fetch(&self, key: &BlobKey) -> Result<String, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let docs = self.docs.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        docs.get(&key.stem())
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("No document for key '{key}'.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn keys_are_lowercased() {
        assert_eq!(BlobKey::measure("USD", "Core_CPI").stem(), "usd-core_cpi");
        assert_eq!(BlobKey::legacy("GBP").stem(), "gbp-inflation");
    }

    #[test]
    fn dir_store_reads_json_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("usd-cpi.json"), "{}").unwrap();
        let store = DirBlobStore::new(dir.path());

        assert_eq!(store.fetch(&BlobKey::measure("USD", "cpi")).unwrap(), "{}");
        let err = store.fetch(&BlobKey::measure("USD", "pce")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn memory_store_counts_fetches() {
        let store = MemoryBlobStore::new();
        let key = BlobKey::legacy("USD");
        assert!(store.fetch(&key).is_err());
        store.insert(&key, "{}");
        assert!(store.fetch(&key).is_ok());
        assert_eq!(store.fetch_count(), 2);
    }
}
