//! Link-time migration registration via the inventory crate.
//!
//! Applications declare migrations next to the code that owns the document
//! type, and an `InventoryLoader` finds them at runtime:
//!
//! ```ignore
//! fn article_v1(mut doc: Document) -> Result<Document, BoxError> {
//!     doc.insert("slug", "");
//!     Ok(doc)
//! }
//!
//! docshift::register_migration!("article", 1, article_v1);
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::Document;
use crate::errors::BoxError;
use crate::migration::{Migration, MigrationLoader};

pub const DEFAULT_NAMESPACE: &str = "default";

/// A migration submitted to the inventory by `register_migration!`.
pub struct MigrationRegistration {
    /// Groups registrations so several migrators can share a binary.
    pub namespace: &'static str,
    pub doc_type: &'static str,
    /// The version the migration produces.
    pub version: u64,
    pub migrate: fn(Document) -> Result<Document, BoxError>,
}

inventory::collect!(MigrationRegistration);

/// Register a migration function for a (type, version) pair.
///
/// `register_migration!("article", 2, article_v2)` registers under the
/// default namespace; `register_migration!(namespace = "billing", "invoice", 1, invoice_v1)`
/// under a named one.
#[macro_export]
macro_rules! register_migration {
    (namespace = $namespace:expr, $doc_type:expr, $version:expr, $migrate:path $(,)?) => {
        $crate::inventory::submit! {
            $crate::registration::MigrationRegistration {
                namespace: $namespace,
                doc_type: $doc_type,
                version: $version,
                migrate: $migrate,
            }
        }
    };
    ($doc_type:expr, $version:expr, $migrate:path $(,)?) => {
        $crate::register_migration!(
            namespace = $crate::registration::DEFAULT_NAMESPACE,
            $doc_type,
            $version,
            $migrate
        );
    };
}

/// All registered migrations across namespaces.
pub fn registered_migrations() -> impl Iterator<Item = &'static MigrationRegistration> {
    inventory::iter::<MigrationRegistration>()
}

pub fn find_registration(namespace: &str, doc_type: &str, version: u64) -> Option<&'static MigrationRegistration> {
    let mut matches = registered_migrations()
        .filter(|r| r.namespace == namespace && r.doc_type == doc_type && r.version == version);
    let first = matches.next()?;
    if matches.next().is_some() {
        log::warn!("multiple migrations registered for {namespace}/{doc_type} v{version}; using the first one found");
    }
    Some(first)
}

struct RegisteredMigration(&'static MigrationRegistration);

#[async_trait]
impl Migration for RegisteredMigration {
    async fn migrate(&self, doc: Document) -> Result<Document, BoxError> {
        (self.0.migrate)(doc)
    }
}

/// Loads migrations registered with `register_migration!` in one namespace.
#[derive(Debug, Clone)]
pub struct InventoryLoader {
    namespace: String,
}

impl InventoryLoader {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Highest registered version per type in this namespace.
    pub fn latest_versions(&self) -> std::collections::BTreeMap<&'static str, u64> {
        let mut latest = std::collections::BTreeMap::new();
        for registration in registered_migrations().filter(|r| r.namespace == self.namespace) {
            let entry = latest.entry(registration.doc_type).or_insert(0);
            *entry = (*entry).max(registration.version);
        }
        latest
    }
}

impl Default for InventoryLoader {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl MigrationLoader for InventoryLoader {
    fn load(&self, doc_type: &str, version: u64) -> Option<Arc<dyn Migration>> {
        find_registration(&self.namespace, doc_type, version)
            .map(|registration| Arc::new(RegisteredMigration(registration)) as Arc<dyn Migration>)
    }
}
