use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::Cell;
use docshift::DocumentStore;
use serde::Serialize;

use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Inspect Counters",
        commands: &["docshift counter get article           # Show the stored latest version"],
    },
    ExampleGroup {
        title: "Publish Versions",
        commands: &[
            "docshift counter set article 3         # Declare version 3 as latest",
            "docshift --config prod.toml counter set user 2",
        ],
    },
];

#[derive(Subcommand)]
pub enum CounterCommands {
    /// Show the counter record for a document type
    Get {
        /// Document type
        doc_type: String,
    },

    /// Publish the latest version for a document type
    Set {
        /// Document type
        doc_type: String,
        /// Latest version number
        version: u64,
    },
}

#[derive(Debug, Serialize)]
pub struct CounterReport {
    pub doc_type: String,
    pub key: String,
    /// `None` when no counter record exists
    pub version: Option<u64>,
}

impl TableDisplay for CounterReport {
    fn to_table(&self, output: &OutputManager) -> comfy_table::Table {
        let mut table = output.table(&["Type", "Key", "Latest"]);
        let version = self.version.map_or_else(|| "-".to_string(), |v| v.to_string());
        table.add_row(vec![Cell::new(&self.doc_type), Cell::new(&self.key), Cell::new(version)]);
        table
    }

    fn to_compact(&self) -> String {
        match self.version {
            Some(version) => format!("{}={version}", self.doc_type),
            None => format!("{}=-", self.doc_type),
        }
    }
}

pub async fn handle_counter_commands(ctx: &CliContext, cmd: CounterCommands, output: &OutputManager) -> Result<()> {
    match cmd {
        CounterCommands::Get { doc_type } => handle_get(ctx, doc_type, output).await,
        CounterCommands::Set { doc_type, version } => handle_set(ctx, doc_type, version, output).await,
    }
}

async fn handle_get(ctx: &CliContext, doc_type: String, output: &OutputManager) -> Result<()> {
    let store = ctx.connect().await?;
    let migrator = ctx.migrator(&store)?;
    let key = migrator.resolver().counter_key(&doc_type);

    let record = store
        .get(&key)
        .await
        .with_context(|| format!("Failed to read counter {key}"))?;
    let counter_field = &migrator.config().counter_field;
    let version = record.as_ref().and_then(|doc| doc.get(counter_field)).and_then(|v| v.as_u64());

    if record.is_some() && version.is_none() {
        output.warning(&format!("{key} has no numeric '{counter_field}' field; resolves to 0"));
    }
    output.verbose(&format!("Counter key: {key}"));

    output.display(&CounterReport { doc_type, key, version })
}

async fn handle_set(ctx: &CliContext, doc_type: String, version: u64, output: &OutputManager) -> Result<()> {
    let store = ctx.connect().await?;
    let migrator = ctx.migrator(&store)?;
    let key = migrator.resolver().counter_key(&doc_type);

    if migrator.config().versions.is_some() {
        output.warning("Static versions are configured; the stored counter is ignored by this config");
    }

    migrator
        .publish_latest(&doc_type, version)
        .await
        .with_context(|| format!("Failed to write counter {key}"))?;

    output.success(&format!("Published {doc_type} v{version}"));
    output.key_value("Key", &key);
    output.display(&CounterReport {
        doc_type,
        key,
        version: Some(version),
    })
}
