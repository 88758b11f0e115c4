//! Batch runs: aggregation, concurrency cap and fail-fast behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docshift::{
    BatchResult, BoxError, Document, FetchedDocument, Fetcher, MemoryStore, MigrateError, Migration,
    MigrationTable, Migrator, MigratorConfig, async_trait,
};
use serde_json::{Value, json};

// ============================================================================
// Test Utilities
// ============================================================================

fn doc(value: Value) -> Document {
    Document::from_value(value).expect("object")
}

/// Sleeps inside every step and records how many steps overlap.
struct GaugedMigration {
    version: u64,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Migration for GaugedMigration {
    async fn migrate(&self, mut doc: Document) -> Result<Document, BoxError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(10)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.version == 2 && doc.get("fail").and_then(Value::as_bool) == Some(true) {
            return Err("second step rejected".into());
        }
        doc.set_version("version", self.version);
        Ok(doc)
    }
}

struct Gauge {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Gauge {
    fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn table(&self, doc_type: &str, latest: u64) -> MigrationTable {
        (1..=latest).fold(MigrationTable::new(), |table, version| {
            table.with(
                doc_type.to_string(),
                version,
                GaugedMigration {
                    version,
                    active: Arc::clone(&self.active),
                    peak: Arc::clone(&self.peak),
                },
            )
        })
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn migrator(store: &Arc<MemoryStore>, latest: u64, limit: usize, table: MigrationTable) -> Migrator {
    Migrator::builder(store.clone())
        .config(
            MigratorConfig::default()
                .with_static_versions([("article", latest)])
                .with_parallel_limit(limit),
        )
        .loader(table)
        .build()
        .expect("valid config")
}

fn articles(count: usize) -> Vec<FetchedDocument> {
    (0..count)
        .map(|i| FetchedDocument::new(format!("doc-{i}"), doc(json!({"type": "article", "version": 0}))))
        .collect()
}

// ============================================================================
// Aggregation
// ============================================================================

#[tokio::test]
async fn totals_match_individual_outcomes() {
    let store = Arc::new(MemoryStore::new());
    let gauge = Gauge::new();
    let migrator = migrator(&store, 3, 4, gauge.table("article", 3));

    let docs = vec![
        FetchedDocument::new("a", doc(json!({"type": "article"}))),
        FetchedDocument::new("b", doc(json!({"type": "article", "version": 1}))),
        FetchedDocument::new("c", doc(json!({"type": "article", "version": 3}))),
        FetchedDocument::new("d", doc(json!({"type": "article", "version": 9}))),
        FetchedDocument::new("e", doc(json!({"type": "note", "version": 0}))),
        FetchedDocument::new("f", doc(json!({"title": "untyped"}))),
    ];

    let result = migrator.run_batch(&docs).await.unwrap();

    assert_eq!(
        result,
        BatchResult {
            handled: 6,
            upgraded: 2,
            total: 5,
        }
    );
    assert_eq!(store.snapshot("a").unwrap().get("version"), Some(&json!(3)));
    assert_eq!(store.snapshot("b").unwrap().get("version"), Some(&json!(3)));
    assert!(store.snapshot("c").is_none());
}

#[tokio::test]
async fn second_run_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let gauge = Gauge::new();
    let migrator = migrator(&store, 2, 3, gauge.table("article", 2));

    let first = migrator.run_documents(articles(5)).await.unwrap();
    let migrated: Vec<FetchedDocument> = store
        .entries()
        .into_iter()
        .map(|(id, doc)| FetchedDocument::new(id, doc))
        .collect();
    let second = migrator.run_documents(migrated).await.unwrap();

    assert_eq!(first.total, 10);
    assert_eq!(second, BatchResult { handled: 5, upgraded: 0, total: 0 });
}

// ============================================================================
// Concurrency Cap
// ============================================================================

#[tokio::test(start_paused = true)]
async fn never_exceeds_parallel_limit() {
    for limit in [1usize, 2, 5] {
        let store = Arc::new(MemoryStore::new());
        let gauge = Gauge::new();
        let migrator = migrator(&store, 1, limit, gauge.table("article", 1));

        let result = migrator.run_documents(articles(12)).await.unwrap();

        assert_eq!(result.handled, 12);
        assert_eq!(gauge.peak(), limit, "limit {limit}");
    }
}

#[tokio::test(start_paused = true)]
async fn default_limit_is_eight() {
    let store = Arc::new(MemoryStore::new());
    let gauge = Gauge::new();
    let migrator = Migrator::builder(store.clone())
        .config(MigratorConfig::default().with_static_versions([("article", 1)]))
        .loader(gauge.table("article", 1))
        .build()
        .unwrap();

    migrator.run_documents(articles(20)).await.unwrap();

    assert_eq!(migrator.config().parallel_limit, 8);
    assert_eq!(gauge.peak(), 8);
}

#[tokio::test(start_paused = true)]
async fn steps_of_one_document_never_overlap() {
    let store = Arc::new(MemoryStore::new());
    let gauge = Gauge::new();
    let migrator = migrator(&store, 4, 8, gauge.table("article", 4));

    let outcome = migrator.upgrade(doc(json!({"type": "article"})), "solo").await.unwrap();

    assert_eq!(outcome.steps, 4);
    assert_eq!(gauge.peak(), 1);
}

// ============================================================================
// Fail-Fast
// ============================================================================

#[tokio::test(start_paused = true)]
async fn failing_document_aborts_the_batch() {
    let store = Arc::new(MemoryStore::new());
    let gauge = Gauge::new();
    let migrator = migrator(&store, 2, 2, gauge.table("article", 2));

    let mut docs = articles(10);
    docs[3].doc.insert("fail", true);

    let err = migrator.run_documents(docs).await.unwrap_err();

    assert!(matches!(&err, MigrateError::Migration { version: 2, .. }));
    // The failing document's first step stays persisted.
    assert_eq!(store.snapshot("doc-3").unwrap().get("version"), Some(&json!(1)));
    // Documents queued well behind the failure were never started.
    assert!(store.snapshot("doc-9").is_none());
    assert!(gauge.peak() <= 2);
}

struct BrokenListing;

#[async_trait]
impl Fetcher for BrokenListing {
    async fn fetch(&self) -> Result<Vec<FetchedDocument>, BoxError> {
        Err("scan timed out".into())
    }
}

#[tokio::test]
async fn fetch_error_aborts_before_scheduling() {
    let store = Arc::new(MemoryStore::new());
    let gauge = Gauge::new();
    let migrator = migrator(&store, 1, 2, gauge.table("article", 1));

    let err = migrator.run_batch(&BrokenListing).await.unwrap_err();

    assert!(matches!(err, MigrateError::Fetch(_)));
    assert!(store.is_empty());
    assert_eq!(gauge.peak(), 0);
}
