//! Bounded-concurrency batch upgrades.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};

use crate::chain::{ChainExecutor, UpgradeOutcome};
use crate::document::Document;
use crate::errors::{BoxError, MigrateError};

/// A document to upgrade and the key it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedDocument {
    pub id: String,
    pub doc: Document,
}

impl FetchedDocument {
    pub fn new(id: impl Into<String>, doc: Document) -> Self {
        Self { id: id.into(), doc }
    }
}

/// Supplies the documents for a batch run.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FetchedDocument>, BoxError>;
}

#[async_trait]
impl Fetcher for Vec<FetchedDocument> {
    async fn fetch(&self) -> Result<Vec<FetchedDocument>, BoxError> {
        Ok(self.clone())
    }
}

/// Aggregate over a completed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Documents processed.
    pub handled: u64,
    /// Documents that needed at least one step.
    pub upgraded: u64,
    /// Steps applied across all documents.
    pub total: u64,
}

impl BatchResult {
    fn record(&mut self, outcome: &UpgradeOutcome) {
        self.handled += 1;
        if outcome.upgraded() {
            self.upgraded += 1;
        }
        self.total += outcome.steps;
    }
}

/// Runs document chains with at most `parallel_limit` in flight.
///
/// The batch is fail-fast: after the first chain error no further documents
/// are started, the chains already running are allowed to finish, and the
/// first error is returned instead of a summary.
pub struct BatchOrchestrator {
    chain: Arc<ChainExecutor>,
    parallel_limit: usize,
}

impl BatchOrchestrator {
    pub fn new(chain: Arc<ChainExecutor>, parallel_limit: usize) -> Self {
        Self {
            chain,
            parallel_limit: parallel_limit.max(1),
        }
    }

    pub fn parallel_limit(&self) -> usize {
        self.parallel_limit
    }

    pub async fn run_batch(&self, fetcher: &dyn Fetcher) -> Result<BatchResult, MigrateError> {
        let documents = fetcher.fetch().await.map_err(MigrateError::Fetch)?;
        self.run_documents(documents).await
    }

    pub async fn run_documents(&self, documents: Vec<FetchedDocument>) -> Result<BatchResult, MigrateError> {
        let queued = documents.len();
        let mut pending = documents.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut result = BatchResult::default();
        let mut first_error: Option<MigrateError> = None;

        loop {
            while first_error.is_none() && in_flight.len() < self.parallel_limit {
                let Some(item) = pending.next() else {
                    break;
                };
                in_flight.push(self.upgrade_one(item));
            }

            match in_flight.next().await {
                Some(Ok(outcome)) => result.record(&outcome),
                Some(Err(err)) => {
                    if first_error.is_none() {
                        log::warn!("batch aborting, no new upgrades will start: {err}");
                        first_error = Some(err);
                    } else {
                        log::warn!("additional upgrade failure while draining batch: {err}");
                    }
                }
                None => break,
            }
        }

        if let Some(err) = first_error {
            log::warn!(
                "batch failed; {} of {queued} document(s) completed before the abort ({} upgraded, {} step(s))",
                result.handled,
                result.upgraded,
                result.total
            );
            return Err(err);
        }

        log::info!(
            "batch complete: {} handled, {} upgraded, {} step(s)",
            result.handled,
            result.upgraded,
            result.total
        );
        Ok(result)
    }

    async fn upgrade_one(&self, item: FetchedDocument) -> Result<UpgradeOutcome, MigrateError> {
        let FetchedDocument { id, doc } = item;
        self.chain.upgrade(doc, &id).await
    }
}
