use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::migration::{Migration, MigrationLoader};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct StepKey {
    doc_type: String,
    version: u64,
}

/// Load-once cache of migration functions in front of a `MigrationLoader`.
///
/// Each (type, version) key resolves to exactly one instance for the
/// lifetime of the registry. Two callers racing on a cold key may both ask
/// the loader, but only the first insert is kept and both receive it.
pub struct FunctionRegistry {
    loader: Arc<dyn MigrationLoader>,
    loaded: RwLock<HashMap<StepKey, Arc<dyn Migration>>>,
}

impl FunctionRegistry {
    pub fn new(loader: Arc<dyn MigrationLoader>) -> Self {
        Self {
            loader,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Migration producing `version` for `doc_type`, loading it on first use.
    pub fn get(&self, doc_type: &str, version: u64) -> Option<Arc<dyn Migration>> {
        let key = StepKey {
            doc_type: doc_type.to_string(),
            version,
        };

        if let Some(migration) = self.loaded.read().unwrap().get(&key) {
            return Some(Arc::clone(migration));
        }

        let migration = self.loader.load(doc_type, version)?;
        log::debug!("loaded migration {doc_type} v{version}");
        let mut loaded = self.loaded.write().unwrap();
        Some(Arc::clone(loaded.entry(key).or_insert(migration)))
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.read().unwrap().len()
    }
}
