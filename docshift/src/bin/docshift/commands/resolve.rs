use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use docshift::VersionSource;
use serde::Serialize;

use crate::context::CliContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Latest Versions",
    commands: &[
        "docshift resolve article               # Latest version for one type",
        "docshift resolve article comment user  # Several types at once",
        "docshift --output json resolve article # Machine-readable output",
    ],
}];

#[derive(Args)]
pub struct ResolveArgs {
    /// Document types to resolve
    #[arg(required = true)]
    pub types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolvedVersion {
    pub doc_type: String,
    pub latest: u64,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub versions: Vec<ResolvedVersion>,
}

impl TableDisplay for ResolveReport {
    fn to_table(&self, output: &OutputManager) -> comfy_table::Table {
        let mut table = output.table(&["Type", "Latest", "Source"]);
        for row in &self.versions {
            table.add_row(vec![
                Cell::new(&row.doc_type),
                Cell::new(row.latest),
                Cell::new(row.source),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.versions
            .iter()
            .map(|row| format!("{}={}", row.doc_type, row.latest))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub async fn handle_resolve(ctx: &CliContext, args: ResolveArgs, output: &OutputManager) -> Result<()> {
    output.heading("Resolve Latest Versions");

    output.progress("Connecting to Redis");
    let store = ctx.connect().await?;
    let migrator = ctx.migrator(&store)?;
    output.clear_line();

    let source = match migrator.resolver().source() {
        VersionSource::Static(_) => "static",
        VersionSource::Store => "counter",
    };

    let mut versions = Vec::with_capacity(args.types.len());
    for doc_type in args.types {
        let latest = migrator.latest_version(&doc_type).await;
        if latest == 0 {
            output.verbose(&format!("{doc_type}: no version recorded, documents will not be migrated"));
        }
        versions.push(ResolvedVersion {
            doc_type,
            latest,
            source,
        });
    }

    output.display(&ResolveReport { versions })
}
