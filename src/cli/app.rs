//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::output::{Output, OutputFormat};
use super::query::QueryArgs;
use super::status::StatusCommands;
use super::toggle::ToggleArgs;
use super::{query, status, toggle};
use crate::storage::Config;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "TASKS_LOG";

#[derive(Parser)]
#[command(name = "tasks")]
#[command(author, version, about = "Query, group and toggle markdown tasks")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Settings file to use instead of the usual locations
    #[arg(long, global = true, env = "TASKS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query over a task list
    Query(QueryArgs),

    /// Explain a query without running it
    Explain(QueryArgs),

    /// Inspect the status settings
    #[command(subcommand)]
    Status(StatusCommands),

    /// Toggle one task to its next status
    Toggle(ToggleArgs),

    /// List the configured presets
    Presets,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tasks_query=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when running inside tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let format = cli.format.unwrap_or_else(|| config.settings.default_format.into());
    let output = Output::new(format, cli.verbose);

    match &config.source {
        Some(path) => output.verbose(&format!("Using settings from {}", path.display())),
        None => output.verbose("Using default settings"),
    }

    let settings = &config.settings;
    match cli.command {
        Commands::Query(args) => query::run(&args, settings, &output)?,
        Commands::Explain(args) => query::explain(&args, settings, &output)?,
        Commands::Status(cmd) => status::run(cmd, settings, &output)?,
        Commands::Toggle(args) => toggle::run(&args, settings, &output)?,
        Commands::Presets => query::presets(settings, &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_needs_a_source() {
        let parsed = Cli::try_parse_from(["tasks", "query", "--tasks", "t.jsonl"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["tasks", "query", "--tasks", "t.jsonl", "-i", "not done", "-i", "due today"]);
        let Ok(Cli {
            command: Commands::Query(args),
            ..
        }) = parsed
        else {
            panic!("expected a query command");
        };
        assert_eq!(args.instructions, vec!["not done", "due today"]);
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["tasks", "presets", "--format", "json", "--verbose"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(cli.verbose);
    }

    #[test]
    fn query_and_instruction_conflict() {
        let parsed = Cli::try_parse_from(["tasks", "explain", "--tasks", "t", "--query", "q.txt", "-i", "done"]);
        assert!(parsed.is_err());
    }
}
