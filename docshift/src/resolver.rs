//! Latest-version resolution per document type.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::config::MigratorConfig;
use crate::keys::KeyContext;
use crate::store::DocumentStore;

/// Where latest versions come from. Chosen once, at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionSource {
    /// Fixed table; types not listed resolve to 0.
    Static(BTreeMap<String, u64>),
    /// Counter records in the document store, read once per type.
    Store,
}

/// Resolves the latest version for a document type.
///
/// Resolution never fails. A missing counter record, a failed read or a
/// record without an integer counter field all resolve to 0, which means
/// "nothing to migrate". Store-backed values are cached for the lifetime
/// of the resolver and never refreshed, so a counter bumped mid-run is not
/// observed until a new resolver is built.
pub struct VersionResolver {
    source: VersionSource,
    store: Arc<dyn DocumentStore>,
    separator: String,
    version_field: String,
    counter_field: String,
    cache: RwLock<HashMap<String, u64>>,
}

impl VersionResolver {
    pub fn new(config: &MigratorConfig, store: Arc<dyn DocumentStore>) -> Self {
        let source = match &config.versions {
            Some(table) => VersionSource::Static(table.clone()),
            None => VersionSource::Store,
        };
        Self {
            source,
            store,
            separator: config.separator.clone(),
            version_field: config.version_field.clone(),
            counter_field: config.counter_field.clone(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &VersionSource {
        &self.source
    }

    pub fn counter_key(&self, doc_type: &str) -> String {
        KeyContext::new(&self.separator, &self.version_field).counter(doc_type)
    }

    pub async fn resolve(&self, doc_type: &str) -> u64 {
        if let VersionSource::Static(table) = &self.source {
            return table.get(doc_type).copied().unwrap_or(0);
        }

        if let Some(version) = self.cached(doc_type) {
            return version;
        }

        let version = self.read_counter(doc_type).await;
        // Concurrent first resolutions read the same record; last write wins.
        self.cache.write().unwrap().insert(doc_type.to_string(), version);
        version
    }

    /// Cached store-backed version, if this type was already resolved.
    pub fn cached(&self, doc_type: &str) -> Option<u64> {
        self.cache.read().unwrap().get(doc_type).copied()
    }

    async fn read_counter(&self, doc_type: &str) -> u64 {
        let key = self.counter_key(doc_type);
        match self.store.get(&key).await {
            Ok(Some(record)) => match record.get(&self.counter_field).and_then(Value::as_u64) {
                Some(version) => {
                    log::debug!("resolved {doc_type} latest version {version} from '{key}'");
                    version
                }
                None => {
                    log::warn!("counter record '{key}' has no integer '{}' field; treating {doc_type} as version 0", self.counter_field);
                    0
                }
            },
            Ok(None) => {
                log::debug!("no counter record '{key}'; treating {doc_type} as version 0");
                0
            }
            Err(err) => {
                log::warn!("failed to read counter record '{key}': {err}; treating {doc_type} as version 0");
                0
            }
        }
    }
}
