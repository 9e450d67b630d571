//! Status configuration commands

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{check_statuses, status_settings_report};
use crate::storage::{Settings, TaskStore};

#[derive(Subcommand, Debug)]
pub enum StatusCommands {
    /// Print the status settings as a Markdown table
    Report {
        /// Also list symbols used in this task list that are not configured
        #[arg(long)]
        tasks: Option<PathBuf>,
    },

    /// Print the status transitions as a Mermaid flowchart
    Diagram {
        /// Show names, symbols and types on each node
        #[arg(long)]
        detailed: bool,
    },

    /// Report status problems; fails if there are any
    Check,
}

pub fn run(cmd: StatusCommands, settings: &Settings, output: &Output) -> Result<()> {
    match cmd {
        StatusCommands::Report { tasks } => report(settings, tasks, output),
        StatusCommands::Diagram { detailed } => {
            let diagram = settings.status_registry().mermaid_diagram(detailed);
            if output.is_json() {
                output.data(&serde_json::json!({ "diagram": diagram }));
            } else {
                output.text(&diagram);
            }
            Ok(())
        }
        StatusCommands::Check => check(settings, output),
    }
}

fn report(settings: &Settings, tasks: Option<PathBuf>, output: &Output) -> Result<()> {
    let statuses = settings.layered_statuses();
    let registry = settings.status_registry();

    let unknown = match tasks {
        Some(path) => {
            let tasks = TaskStore::new(&path).read_all(&registry)?;
            output.verbose_ctx("status", &format!("Scanned {} tasks for unknown symbols", tasks.len()));
            registry.find_unknown_statuses(tasks.iter().map(|t| &t.status))
        }
        None => Vec::new(),
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "statuses": check_statuses(&statuses),
            "unknown": unknown,
        }));
        return Ok(());
    }

    output.text(&status_settings_report(&statuses));
    if !unknown.is_empty() {
        println!();
        println!("Unknown statuses found in tasks:");
        for status in &unknown {
            println!("  `{}`: {}", status.symbol, status.name);
        }
    }
    Ok(())
}

fn check(settings: &Settings, output: &Output) -> Result<()> {
    let checked = check_statuses(&settings.layered_statuses());
    let with_problems: Vec<_> = checked.iter().filter(|entry| !entry.problems.is_empty()).collect();

    if output.is_json() {
        output.data(&with_problems);
    } else if with_problems.is_empty() {
        output.success(&format!("{} statuses, no problems found", checked.len()));
    } else {
        for entry in &with_problems {
            println!("'{}' ({}):", entry.status.symbol, entry.status.name);
            for problem in &entry.problems {
                println!("  - {}", problem);
            }
        }
    }

    if !with_problems.is_empty() {
        bail!("{} status(es) have problems", with_problems.len());
    }
    Ok(())
}
