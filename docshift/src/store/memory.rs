use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::DocumentStore;
use crate::document::Document;
use crate::errors::StoreError;

/// In-memory document store.
///
/// Keys can be marked as failing for reads or writes to simulate an
/// unavailable backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Document>>,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
    reads: AtomicUsize,
    writes: Mutex<Vec<(String, Document)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without recording a write.
    pub fn insert(&self, key: impl Into<String>, doc: Document) {
        self.docs.lock().unwrap().insert(key.into(), doc);
    }

    pub fn snapshot(&self, key: &str) -> Option<Document> {
        self.docs.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All documents, sorted by key.
    pub fn entries(&self) -> Vec<(String, Document)> {
        let mut entries: Vec<_> = self
            .docs
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn fail_reads_for(&self, key: impl Into<String>) {
        self.failing_reads.lock().unwrap().insert(key.into());
    }

    pub fn fail_writes_for(&self, key: impl Into<String>) {
        self.failing_writes.lock().unwrap().insert(key.into());
    }

    /// Number of `get` calls served, including failed ones.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Successful writes in the order they happened.
    pub fn write_log(&self) -> Vec<(String, Document)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.lock().unwrap().contains(key) {
            return Err(StoreError::Other {
                message: Cow::Owned(format!("read refused for '{key}'")),
            });
        }
        Ok(self.docs.lock().unwrap().get(key).cloned())
    }

    async fn upsert(&self, key: &str, doc: &Document) -> Result<(), StoreError> {
        if self.failing_writes.lock().unwrap().contains(key) {
            return Err(StoreError::Other {
                message: Cow::Owned(format!("write refused for '{key}'")),
            });
        }
        self.docs.lock().unwrap().insert(key.to_string(), doc.clone());
        self.writes.lock().unwrap().push((key.to_string(), doc.clone()));
        Ok(())
    }
}
