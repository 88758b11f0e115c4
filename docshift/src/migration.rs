//! Migration functions and the loaders that supply them.
//!
//! A migration takes a document at version N-1 and produces the document at
//! version N. How it transforms the data is up to the embedding application;
//! the crate only sequences calls and persists their results.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::document::Document;
use crate::errors::BoxError;

/// One version step for one document type.
#[async_trait]
pub trait Migration: Send + Sync {
    async fn migrate(&self, doc: Document) -> Result<Document, BoxError>;
}

/// Adapts a synchronous closure into a `Migration`.
pub struct FnMigration<F>(F);

impl<F> FnMigration<F>
where
    F: Fn(Document) -> Result<Document, BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Migration for FnMigration<F>
where
    F: Fn(Document) -> Result<Document, BoxError> + Send + Sync,
{
    async fn migrate(&self, doc: Document) -> Result<Document, BoxError> {
        (self.0)(doc)
    }
}

/// Produces the migration for a (type, version) pair.
///
/// Loaders are consulted at most once per key by a `FunctionRegistry`; they
/// do not need to cache.
pub trait MigrationLoader: Send + Sync {
    fn load(&self, doc_type: &str, version: u64) -> Option<Arc<dyn Migration>>;
}

/// Explicit table of migrations keyed by (type, version).
#[derive(Default, Clone)]
pub struct MigrationTable {
    entries: HashMap<(String, u64), Arc<dyn Migration>>,
}

impl MigrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc_type: impl Into<String>, version: u64, migration: Arc<dyn Migration>) {
        self.entries.insert((doc_type.into(), version), migration);
    }

    pub fn with<M>(mut self, doc_type: impl Into<String>, version: u64, migration: M) -> Self
    where
        M: Migration + 'static,
    {
        self.insert(doc_type, version, Arc::new(migration));
        self
    }

    pub fn with_fn<F>(self, doc_type: impl Into<String>, version: u64, f: F) -> Self
    where
        F: Fn(Document) -> Result<Document, BoxError> + Send + Sync + 'static,
    {
        self.with(doc_type, version, FnMigration::new(f))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MigrationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("MigrationTable").field("keys", &keys).finish()
    }
}

impl MigrationLoader for MigrationTable {
    fn load(&self, doc_type: &str, version: u64) -> Option<Arc<dyn Migration>> {
        self.entries.get(&(doc_type.to_string(), version)).cloned()
    }
}
