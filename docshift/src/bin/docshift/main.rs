mod commands;
mod context;
mod examples;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::styling::{AnsiColor, Styles};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use commands::{
    counter::{CounterCommands, handle_counter_commands},
    resolve::{ResolveArgs, handle_resolve},
    status::{StatusArgs, handle_status},
};
use context::CliContext;
use output::{GlobalOptions, OutputFormat, OutputManager};

#[derive(Parser)]
#[command(name = "docshift", version)]
#[command(
    about = "Inspect and publish document schema versions",
    long_about = "Operator CLI for docshift. Resolves the latest schema version per \
                  document type, reports stored documents that lag behind it, and \
                  publishes new versions through counter records.\n\n\
                  Set RUST_LOG=docshift=debug for migrator diagnostics."
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (defaults to ./docshift.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", global = true, hide_env_values = true)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the latest version for one or more document types
    Resolve(ResolveArgs),

    /// Scan stored documents and report how far each type lags
    Status(StatusArgs),

    /// Read or publish version counter records
    #[command(subcommand)]
    Counter(CounterCommands),
}

fn help_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().bold())
        .usage(AnsiColor::BrightBlue.on_default().bold())
        .literal(AnsiColor::Magenta.on_default())
        .placeholder(AnsiColor::BrightBlack.on_default())
}

fn parse_cli() -> Cli {
    let mut command = Cli::command().styles(help_styles());
    for (name, groups) in examples::command_examples() {
        command = command.mut_subcommand(name, |sub| sub.after_long_help(examples::render(groups)));
    }
    let matches = command.get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = execute(parse_cli()).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });
    if cli.no_color {
        colored::control::set_override(false);
    }

    let ctx = CliContext::load(cli.config.as_deref(), cli.redis_url)?;
    match &ctx.config_path {
        Some(path) => output.verbose(&format!("Using config {}", path.display())),
        None => output.verbose("No config file found; using defaults"),
    }

    match cli.command {
        Commands::Resolve(args) => handle_resolve(&ctx, args, &output).await,
        Commands::Status(args) => handle_status(&ctx, args, &output).await,
        Commands::Counter(cmd) => handle_counter_commands(&ctx, cmd, &output).await,
    }
}
