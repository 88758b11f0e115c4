//! Document store abstraction and the adapters shipped with the crate.
//!
//! - `MemoryStore` - in-process map, used by tests and embedders without a server
//! - `RedisStore` - RedisJSON-backed store over a `ConnectionManager`
//! - `RedisScanFetcher` - lists documents for batch runs via `SCAN`

mod memory;
mod redis_json;

use async_trait::async_trait;

use crate::document::Document;
use crate::errors::StoreError;

pub use self::memory::MemoryStore;
pub use self::redis_json::{RedisScanFetcher, RedisStore};

/// Key/value access to documents.
///
/// `upsert` overwrites whatever is stored under `key`; there is no merge.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError>;

    async fn upsert(&self, key: &str, doc: &Document) -> Result<(), StoreError>;
}
