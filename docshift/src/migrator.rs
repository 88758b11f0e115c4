//! The long-lived entry point tying resolver, registry, chain and batch
//! together.

use std::sync::Arc;

use crate::batch::{BatchOrchestrator, BatchResult, FetchedDocument, Fetcher};
use crate::chain::{ChainExecutor, UpgradeOutcome};
use crate::config::MigratorConfig;
use crate::document::Document;
use crate::errors::{MigrateError, StoreError};
use crate::migration::MigrationLoader;
use crate::registration::InventoryLoader;
use crate::registry::FunctionRegistry;
use crate::resolver::VersionResolver;
use crate::step::StepRunner;
use crate::store::DocumentStore;

/// Owns the configuration and both lazily filled caches (latest versions and
/// loaded migration functions). Build one per process and share it; caches
/// live as long as the migrator.
pub struct Migrator {
    config: MigratorConfig,
    store: Arc<dyn DocumentStore>,
    resolver: Arc<VersionResolver>,
    functions: Arc<FunctionRegistry>,
    chain: Arc<ChainExecutor>,
    batch: BatchOrchestrator,
}

impl Migrator {
    pub fn builder(store: Arc<dyn DocumentStore>) -> MigratorBuilder {
        MigratorBuilder::new(store)
    }

    pub fn new(
        config: MigratorConfig,
        store: Arc<dyn DocumentStore>,
        loader: Arc<dyn MigrationLoader>,
    ) -> Result<Self, MigrateError> {
        config.validate()?;

        let resolver = Arc::new(VersionResolver::new(&config, Arc::clone(&store)));
        let functions = Arc::new(FunctionRegistry::new(loader));
        let steps = StepRunner::new(
            Arc::clone(&functions),
            Arc::clone(&store),
            &config.type_field,
            &config.version_field,
        );
        let chain = Arc::new(ChainExecutor::new(
            Arc::clone(&resolver),
            steps,
            &config.type_field,
            &config.version_field,
        ));
        let batch = BatchOrchestrator::new(Arc::clone(&chain), config.parallel_limit);

        Ok(Self {
            config,
            store,
            resolver,
            functions,
            chain,
            batch,
        })
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    pub async fn latest_version(&self, doc_type: &str) -> u64 {
        self.resolver.resolve(doc_type).await
    }

    /// Bring one document up to its type's latest version, persisting each
    /// step under `doc_id`.
    pub async fn upgrade(&self, doc: Document, doc_id: &str) -> Result<UpgradeOutcome, MigrateError> {
        self.chain.upgrade(doc, doc_id).await
    }

    pub async fn run_batch(&self, fetcher: &dyn Fetcher) -> Result<BatchResult, MigrateError> {
        self.batch.run_batch(fetcher).await
    }

    pub async fn run_documents(&self, documents: Vec<FetchedDocument>) -> Result<BatchResult, MigrateError> {
        self.batch.run_documents(documents).await
    }

    /// Write the counter record announcing `version` as latest for `doc_type`.
    ///
    /// Other migrators pick it up on their first resolution of the type. This
    /// migrator keeps any value it already cached.
    pub async fn publish_latest(&self, doc_type: &str, version: u64) -> Result<(), StoreError> {
        let key = self.resolver.counter_key(doc_type);
        let mut record = Document::new();
        record.insert(self.config.counter_field.clone(), version);
        self.store.upsert(&key, &record).await?;
        log::info!("published {doc_type} latest version {version} at '{key}'");
        Ok(())
    }

    /// Number of distinct migration functions loaded so far.
    pub fn loaded_migrations(&self) -> usize {
        self.functions.loaded_count()
    }
}

/// Builder for `Migrator`; defaults to `MigratorConfig::default()` and an
/// `InventoryLoader` over the configured namespace.
pub struct MigratorBuilder {
    store: Arc<dyn DocumentStore>,
    config: MigratorConfig,
    loader: Option<Arc<dyn MigrationLoader>>,
}

impl MigratorBuilder {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            config: MigratorConfig::default(),
            loader: None,
        }
    }

    pub fn config(mut self, config: MigratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn loader<L>(mut self, loader: L) -> Self
    where
        L: MigrationLoader + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn shared_loader(mut self, loader: Arc<dyn MigrationLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> Result<Migrator, MigrateError> {
        let loader: Arc<dyn MigrationLoader> = match self.loader {
            Some(loader) => loader,
            None => Arc::new(InventoryLoader::new(self.config.namespace.clone())),
        };
        Migrator::new(self.config, self.store, loader)
    }
}
