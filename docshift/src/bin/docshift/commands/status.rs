use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::Cell;
use docshift::{FetchedDocument, Fetcher, MigratorConfig, RedisScanFetcher};
use serde::Serialize;

use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Version Status",
    commands: &[
        "docshift status                          # Every document in the store",
        "docshift status --pattern 'article:*'    # Only keys matching a glob",
        "docshift status --limit 1000             # Sample the first 1000 documents",
    ],
}];

#[derive(Args)]
pub struct StatusArgs {
    /// Key glob to scan (relative to the configured prefix)
    #[arg(short, long, default_value = "*")]
    pub pattern: String,

    /// Stop after this many documents
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Per-type version distribution
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TypeStatus {
    pub doc_type: String,
    pub documents: u64,
    pub latest: u64,
    /// Documents below `latest`
    pub behind: u64,
    pub by_version: BTreeMap<u64, u64>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub scanned_at: DateTime<Utc>,
    pub pattern: String,
    pub types: Vec<TypeStatus>,
    /// Documents without a type field; they are never migrated
    pub untyped: u64,
}

impl TableDisplay for StatusReport {
    fn to_table(&self, output: &OutputManager) -> comfy_table::Table {
        let mut table = output.table(&["Type", "Documents", "Latest", "Behind", "Versions"]);
        for status in &self.types {
            let versions = status
                .by_version
                .iter()
                .map(|(version, count)| format!("v{version}: {count}"))
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec![
                Cell::new(&status.doc_type),
                Cell::new(status.documents),
                Cell::new(status.latest),
                Cell::new(status.behind),
                Cell::new(versions),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let behind: u64 = self.types.iter().map(|t| t.behind).sum();
        let documents: u64 = self.types.iter().map(|t| t.documents).sum();
        format!("types={} documents={documents} behind={behind} untyped={}", self.types.len(), self.untyped)
    }
}

/// Group documents by type and version; returns the tallies and the untyped count.
pub fn tally(documents: &[FetchedDocument], config: &MigratorConfig) -> (BTreeMap<String, TypeStatus>, u64) {
    let mut by_type: BTreeMap<String, TypeStatus> = BTreeMap::new();
    let mut untyped = 0;

    for fetched in documents {
        let Some(doc_type) = fetched.doc.doc_type(&config.type_field) else {
            untyped += 1;
            continue;
        };
        let status = by_type.entry(doc_type.to_string()).or_insert_with(|| TypeStatus {
            doc_type: doc_type.to_string(),
            ..TypeStatus::default()
        });
        status.documents += 1;
        *status
            .by_version
            .entry(fetched.doc.version(&config.version_field))
            .or_insert(0) += 1;
    }

    (by_type, untyped)
}

impl TypeStatus {
    fn with_latest(mut self, latest: u64) -> Self {
        self.latest = latest;
        self.behind = self.by_version.range(..latest).map(|(_, count)| count).sum();
        self
    }
}

pub async fn handle_status(ctx: &CliContext, args: StatusArgs, output: &OutputManager) -> Result<()> {
    output.heading("Document Version Status");

    output.progress("Connecting to Redis");
    let store = ctx.connect().await?;
    let migrator = ctx.migrator(&store)?;
    output.clear_line();
    output.success("Connected to Redis");

    output.progress(&format!("Scanning '{}'", args.pattern));
    let mut fetcher = RedisScanFetcher::new(&store, args.pattern.clone(), &ctx.config.migrator);
    if let Some(limit) = args.limit {
        fetcher = fetcher.with_limit(limit);
    }
    let documents = fetcher
        .fetch()
        .await
        .map_err(|err| anyhow::anyhow!(err))
        .context("Failed to scan documents")?;
    output.clear_line();

    let (by_type, untyped) = tally(&documents, &ctx.config.migrator);
    let mut types = Vec::with_capacity(by_type.len());
    for (doc_type, status) in by_type {
        let latest = migrator.latest_version(&doc_type).await;
        types.push(status.with_latest(latest));
    }

    output.info(&format!("Scanned {} document(s) across {} type(s)", documents.len(), types.len()));
    if untyped > 0 {
        output.warning(&format!(
            "{untyped} document(s) have no '{}' field and will never be migrated",
            ctx.config.migrator.type_field
        ));
    }

    output.display(&StatusReport {
        scanned_at: Utc::now(),
        pattern: args.pattern,
        types,
        untyped,
    })
}
