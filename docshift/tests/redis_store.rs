//! RedisJSON store and scan fetcher against a live server.
//!
//! Requires Redis Stack on 127.0.0.1; run with `cargo test -- --ignored`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docshift::{
    BatchResult, BoxError, Document, DocumentStore, MigrationTable, Migrator, MigratorConfig, RedisScanFetcher,
    RedisStore,
};
use redis::aio::ConnectionManager;
use serde_json::{Value, json};
use serial_test::serial;

// ============================================================================
// Test Utilities
// ============================================================================

static TEST_NAMESPACE_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_prefix() -> String {
    let idx = TEST_NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("docshift_test_{}_{idx}", std::process::id())
}

async fn redis_conn() -> ConnectionManager {
    let client = redis::Client::open("redis://127.0.0.1/").expect("redis client");
    client.get_connection_manager().await.expect("connection manager")
}

async fn cleanup(conn: &mut ConnectionManager, prefix: &str) {
    let keys: Vec<String> = redis::cmd("KEYS")
        .arg(format!("{prefix}:*"))
        .query_async(conn)
        .await
        .expect("keys");
    if !keys.is_empty() {
        let _: () = redis::cmd("DEL").arg(&keys).query_async(conn).await.expect("del");
    }
}

fn doc(value: Value) -> Document {
    Document::from_value(value).expect("object")
}

fn add_slug(mut doc: Document) -> Result<Document, BoxError> {
    let title = doc.get("title").and_then(Value::as_str).unwrap_or_default().to_lowercase();
    doc.insert("slug", title.replace(' ', "-"));
    doc.set_version("version", 1);
    Ok(doc)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
#[serial]
#[ignore = "requires Redis Stack"]
async fn upsert_then_get_round_trips_under_prefix() {
    let mut conn = redis_conn().await;
    let prefix = unique_prefix();
    let store = RedisStore::new(conn.clone()).with_prefix(prefix.clone());

    let original = doc(json!({"type": "article", "version": 0, "title": "Hello"}));
    store.upsert("a1", &original).await.unwrap();

    assert_eq!(store.get("a1").await.unwrap(), Some(original));
    assert!(store.get("missing").await.unwrap().is_none());

    let raw: Option<String> = redis::cmd("JSON.GET")
        .arg(format!("{prefix}:a1"))
        .arg("$.title")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(raw.as_deref(), Some(r#"["Hello"]"#));

    cleanup(&mut conn, &prefix).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires Redis Stack"]
async fn batch_over_scanned_documents() {
    let mut conn = redis_conn().await;
    let prefix = unique_prefix();
    let store = RedisStore::new(conn.clone()).with_prefix(prefix.clone());

    for i in 0..4 {
        store
            .upsert(&format!("article-{i}"), &doc(json!({"type": "article", "title": format!("Post {i}")})))
            .await
            .unwrap();
    }

    let config = MigratorConfig::default().with_parallel_limit(2);
    let migrator = Migrator::builder(Arc::new(store.clone()))
        .config(config.clone())
        .loader(MigrationTable::new().with_fn("article", 1, add_slug))
        .build()
        .unwrap();
    migrator.publish_latest("article", 1).await.unwrap();

    let fetcher = RedisScanFetcher::new(&store, "article*", &config);
    let result = migrator.run_batch(&fetcher).await.unwrap();

    assert_eq!(
        result,
        BatchResult {
            handled: 4,
            upgraded: 4,
            total: 4
        }
    );
    let migrated = store.get("article-2").await.unwrap().unwrap();
    assert_eq!(migrated.get("slug"), Some(&json!("post-2")));
    assert_eq!(migrated.get("version"), Some(&json!(1)));

    // Counter record `article::version` matches the pattern but is not a document.
    let rerun = migrator.run_batch(&fetcher).await.unwrap();
    assert_eq!(rerun.handled, 4);
    assert_eq!(rerun.upgraded, 0);

    cleanup(&mut conn, &prefix).await;
}
