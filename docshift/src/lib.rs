//! docshift core library.
//!
//! Lazy schema-version upgrades for documents in a schemaless store. Each
//! document names its type and version; migrations for a type are applied
//! one version at a time, persisting after every step, either for a single
//! document (`Migrator::upgrade`) or across a batch with bounded concurrency
//! (`Migrator::run_batch`).

pub mod batch;
pub mod chain;
pub mod config;
pub mod document;
pub mod errors;
pub mod keys;
pub mod migration;
pub mod migrator;
pub mod registration;
pub mod registry;
pub mod resolver;
pub mod step;
pub mod store;

pub use batch::{BatchOrchestrator, BatchResult, FetchedDocument, Fetcher};
pub use chain::{ChainExecutor, UpgradeOutcome};
pub use config::MigratorConfig;
pub use document::Document;
pub use errors::*;
pub use migration::{FnMigration, Migration, MigrationLoader, MigrationTable};
pub use migrator::{Migrator, MigratorBuilder};
pub use registration::{InventoryLoader, MigrationRegistration};
pub use registry::FunctionRegistry;
pub use resolver::{VersionResolver, VersionSource};
pub use step::{StepOutput, StepRunner};
pub use store::{DocumentStore, MemoryStore, RedisScanFetcher, RedisStore};

// Re-export so implementors don't need their own async-trait / redis versions
pub use async_trait::async_trait;
pub use redis;
pub use redis::aio::ConnectionManager;

// Re-export inventory for `register_migration!`
pub use inventory;
