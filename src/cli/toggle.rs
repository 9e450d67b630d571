//! Toggle command

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Args;

use super::output::Output;
use crate::storage::{Settings, TaskStore};

#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Task list, one JSON record per line
    #[arg(long)]
    pub tasks: PathBuf,

    /// 1-based record number of the task to toggle
    #[arg(long)]
    pub line: usize,

    /// Date stamped on done and cancelled tasks (defaults to the local date)
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

/// Moves one task to its next status and writes the list back
pub fn run(args: &ToggleArgs, settings: &Settings, output: &Output) -> Result<()> {
    let registry = settings.status_registry();
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let store = TaskStore::new(&args.tasks);

    output.verbose_ctx("toggle", &format!("Toggling record {} in {}", args.line, args.tasks.display()));
    let tasks = store.toggle(args.line, &registry, today, &settings.toggle_options())?;

    if output.is_json() {
        output.data(&tasks);
    } else {
        for task in &tasks {
            println!("{}", task.to_markdown_line());
        }
    }
    Ok(())
}
