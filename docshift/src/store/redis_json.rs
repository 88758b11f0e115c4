use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde_json::Value;

use super::DocumentStore;
use crate::batch::{FetchedDocument, Fetcher};
use crate::config::MigratorConfig;
use crate::document::Document;
use crate::errors::{BoxError, StoreError};
use crate::keys::{KeyContext, namespaced};

const SCAN_COUNT: usize = 500;

/// Document store backed by RedisJSON.
///
/// Documents live at `prefix:key` (or `key` without a prefix) and are read
/// and written whole with `JSON.GET key $` / `JSON.SET key $`.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: Option<String>,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn, prefix: None }
    }

    /// Open a client for `redis_url` and wrap a managed connection.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    fn full_key(&self, key: &str) -> String {
        namespaced(self.prefix.as_deref(), key)
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, StoreError> {
        let full_key = self.full_key(key);
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("JSON.GET")
            .arg(&full_key)
            .arg("$")
            .query_async(&mut conn)
            .await?;

        match raw {
            Some(json_str) => parse_json_get(&full_key, &json_str).map(Some),
            None => Ok(None),
        }
    }

    async fn upsert(&self, key: &str, doc: &Document) -> Result<(), StoreError> {
        let full_key = self.full_key(key);
        let json_str = serde_json::to_string(doc)?;
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("JSON.SET")
            .arg(&full_key)
            .arg("$")
            .arg(&json_str)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

/// `JSON.GET key $` answers with a one-element array.
fn parse_json_get(key: &str, json_str: &str) -> Result<Document, StoreError> {
    let values: Vec<Value> = serde_json::from_str(json_str)?;
    values
        .into_iter()
        .next()
        .and_then(Document::from_value)
        .ok_or_else(|| StoreError::NotADocument { key: key.to_string() })
}

/// Lists documents for a batch run by scanning keys that match a glob.
///
/// Version counter records and keys that do not hold a JSON object are
/// skipped. Document ids are reported without the store prefix so they can
/// be passed straight back to `RedisStore::upsert`.
pub struct RedisScanFetcher {
    conn: ConnectionManager,
    prefix: Option<String>,
    pattern: String,
    separator: String,
    version_field: String,
    limit: Option<usize>,
}

impl RedisScanFetcher {
    pub fn new(store: &RedisStore, pattern: impl Into<String>, config: &MigratorConfig) -> Self {
        Self {
            conn: store.conn(),
            prefix: store.prefix.clone(),
            pattern: pattern.into(),
            separator: config.separator.clone(),
            version_field: config.version_field.clone(),
            limit: None,
        }
    }

    /// Stop after collecting `limit` documents.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn strip_prefix<'k>(&self, key: &'k str) -> &'k str {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => key
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(':'))
                .unwrap_or(key),
            _ => key,
        }
    }

    async fn scan(&self) -> Result<Vec<FetchedDocument>, StoreError> {
        let keys = KeyContext::new(&self.separator, &self.version_field);
        let pattern = namespaced(self.prefix.as_deref(), &self.pattern);
        let limit = self.limit.unwrap_or(usize::MAX);
        let mut conn = self.conn.clone();
        let mut documents = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            for key in batch {
                if documents.len() >= limit {
                    break;
                }
                let id = self.strip_prefix(&key);
                if keys.is_counter(id) {
                    continue;
                }

                // Non-JSON keys answer JSON.GET with WRONGTYPE; they are not documents.
                let raw: Option<String> = match redis::cmd("JSON.GET")
                    .arg(&key)
                    .arg("$")
                    .query_async(&mut conn)
                    .await
                {
                    Ok(raw) => raw,
                    Err(err) => {
                        log::debug!("skipping '{key}': {err}");
                        None
                    }
                };

                if let Some(json_str) = raw
                    && let Ok(doc) = parse_json_get(&key, &json_str)
                {
                    documents.push(FetchedDocument {
                        id: id.to_string(),
                        doc,
                    });
                }
            }

            cursor = next_cursor;
            if cursor == 0 || documents.len() >= limit {
                break;
            }
        }

        Ok(documents)
    }
}

#[async_trait]
impl Fetcher for RedisScanFetcher {
    async fn fetch(&self) -> Result<Vec<FetchedDocument>, BoxError> {
        Ok(self.scan().await?)
    }
}
