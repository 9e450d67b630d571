//! Query commands (query, explain, presets)

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Args};
use tracing::debug;

use super::output::Output;
use super::render::render_result;
use crate::domain::TasksFile;
use crate::query::{Query, QueryContext, SearchInfo};
use crate::storage::{read_note, Settings, TaskStore};

/// Inputs shared by `query` and `explain`
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["query", "instructions"])))]
pub struct QueryArgs {
    /// Task list, one JSON record per line
    #[arg(long)]
    pub tasks: PathBuf,

    /// File holding the query text
    #[arg(long)]
    pub query: Option<PathBuf>,

    /// A query line; repeat for more lines
    #[arg(long = "instruction", short = 'i')]
    pub instructions: Vec<String>,

    /// Note the query lives in, for placeholders and `this_file` presets
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Date that `today` means (defaults to the local date)
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

impl QueryArgs {
    fn source(&self) -> Result<String> {
        match &self.query {
            Some(path) => {
                fs::read_to_string(path).with_context(|| format!("Failed to read query: {}", path.display()))
            }
            None => Ok(self.instructions.join("\n")),
        }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn note(&self) -> Result<Option<TasksFile>> {
        self.file.as_deref().map(read_note).transpose()
    }
}

/// Parses the query, prefixing the global query unless it opts out
fn parse_query(source: &str, settings: &Settings, context: &QueryContext<'_>) -> Query {
    let query = Query::parse(source, context);
    let global = settings.global_query.trim();
    if global.is_empty() || query.ignores_global_query() {
        return query;
    }
    debug!(global_query = global, "Adding global query");
    Query::parse(&format!("{}\n{}", global, source), context)
}

/// Runs a query and prints the grouped tasks
pub fn run(args: &QueryArgs, settings: &Settings, output: &Output) -> Result<()> {
    let source = args.source()?;
    let today = args.today();
    let note = args.note()?;
    let presets = settings.presets();
    let context = QueryContext {
        file: note.as_ref(),
        presets: &presets,
        today,
    };

    let query = parse_query(&source, settings, &context);
    if let Some(error) = query.error() {
        bail!("{}", error);
    }

    let registry = settings.status_registry();
    let tasks = TaskStore::new(&args.tasks).read_all(&registry)?;
    output.verbose_ctx("query", &format!("Loaded {} tasks from {}", tasks.len(), args.tasks.display()));

    let search_info = SearchInfo::new(&tasks, note.as_ref(), today);
    let result = query.apply(&search_info);
    let layout = query.layout();
    output.verbose_ctx(
        "query",
        &format!("{} matched, {} groups", result.total_matched, result.groups.len()),
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "explanation": layout.explain.then(|| query.explain()),
            "total_matched": result.total_matched,
            "groups": result.groups,
            "errors": result.errors,
            "layout": layout,
        }));
        return Ok(());
    }

    if layout.explain {
        output.text(&query.explain());
        output.text("");
    }
    for error in &result.errors {
        output.warn(error);
    }
    output.text(&render_result(&result, layout, today));
    Ok(())
}

/// Prints what a query would do, without reading tasks
pub fn explain(args: &QueryArgs, settings: &Settings, output: &Output) -> Result<()> {
    let source = args.source()?;
    let note = args.note()?;
    let presets = settings.presets();
    let context = QueryContext {
        file: note.as_ref(),
        presets: &presets,
        today: args.today(),
    };

    let query = parse_query(&source, settings, &context);
    let explanation = query.explain();

    if output.is_json() {
        output.data(&serde_json::json!({
            "valid": query.error().is_none(),
            "explanation": explanation,
        }));
    } else {
        output.text(&explanation);
    }

    if query.error().is_some() {
        bail!("Query has an error");
    }
    Ok(())
}

/// Lists the configured presets
pub fn presets(settings: &Settings, output: &Output) -> Result<()> {
    let presets = settings.presets();

    if output.is_json() {
        let items: serde_json::Map<String, serde_json::Value> = presets
            .iter()
            .map(|(name, text)| (name.to_string(), serde_json::Value::from(text)))
            .collect();
        output.data(&items);
    } else {
        for line in presets.summary_lines() {
            println!("{}", line);
        }
    }

    Ok(())
}
