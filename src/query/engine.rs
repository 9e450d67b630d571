//! Parsing a block of query text and running it over tasks
//!
//! Query text is split into statements, placeholders and presets are
//! expanded, and each resulting instruction is compiled in turn. The first
//! instruction that fails stops parsing and becomes the query's error.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use super::field::{field_by_name, instruction_regex, parse_filter, parse_grouper, parse_sorter};
use super::filter::Filter;
use super::grouper::{Grouper, TaskGroups};
use super::presets::{PresetError, Presets, MAX_PRESET_DEPTH};
use super::search_info::SearchInfo;
use super::sorter::{sort_tasks, Sorter};
use super::statement::Statement;
use crate::domain::{Task, TasksFile};
use crate::scripting::{expand_placeholders, has_placeholders, PlaceholderError, QueryView, Value};

static MODE_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^(short|full)( mode)?$"));
static EXPLAIN_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^explain$"));
static IGNORE_GLOBAL_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^ignore global query$"));
static LIMIT_GROUPS_RE: LazyLock<Regex> =
    LazyLock::new(|| instruction_regex(r"^limit groups (to )?(\d+)( tasks?)?$"));
static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^limit (to )?(\d+)( tasks?)?$"));
static LAYOUT_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^(hide|show) (.+)$"));
static PRESET_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^preset +(.*)"));

/// Sorters applied after the query's own, in this order
const DEFAULT_SORT_FIELDS: &[&str] = &["status", "urgency", "due", "priority", "path"];

/// Parts of the rendered result that `hide` and `show` switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutElement {
    TaskCount,
    Backlinks,
    PostponeButton,
    EditButton,
    Urgency,
    Tree,
    Id,
    DependsOn,
    Priority,
    RecurrenceRule,
    OnCompletion,
    CreatedDate,
    StartDate,
    ScheduledDate,
    DueDate,
    CancelledDate,
    DoneDate,
    Tags,
}

impl LayoutElement {
    pub const ALL: [LayoutElement; 18] = [
        LayoutElement::TaskCount,
        LayoutElement::Backlinks,
        LayoutElement::PostponeButton,
        LayoutElement::EditButton,
        LayoutElement::Urgency,
        LayoutElement::Tree,
        LayoutElement::Id,
        LayoutElement::DependsOn,
        LayoutElement::Priority,
        LayoutElement::RecurrenceRule,
        LayoutElement::OnCompletion,
        LayoutElement::CreatedDate,
        LayoutElement::StartDate,
        LayoutElement::ScheduledDate,
        LayoutElement::DueDate,
        LayoutElement::CancelledDate,
        LayoutElement::DoneDate,
        LayoutElement::Tags,
    ];

    /// Name used in `hide`/`show` instructions
    pub fn name(self) -> &'static str {
        match self {
            LayoutElement::TaskCount => "task count",
            LayoutElement::Backlinks => "backlinks",
            LayoutElement::PostponeButton => "postpone button",
            LayoutElement::EditButton => "edit button",
            LayoutElement::Urgency => "urgency",
            LayoutElement::Tree => "tree",
            LayoutElement::Id => "id",
            LayoutElement::DependsOn => "depends on",
            LayoutElement::Priority => "priority",
            LayoutElement::RecurrenceRule => "recurrence rule",
            LayoutElement::OnCompletion => "on completion",
            LayoutElement::CreatedDate => "created date",
            LayoutElement::StartDate => "start date",
            LayoutElement::ScheduledDate => "scheduled date",
            LayoutElement::DueDate => "due date",
            LayoutElement::CancelledDate => "cancelled date",
            LayoutElement::DoneDate => "done date",
            LayoutElement::Tags => "tags",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name == "backlink" {
            return Some(LayoutElement::Backlinks);
        }
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

/// Display switches collected from `hide`, `show`, `short` and `explain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutOptions {
    hidden: BTreeSet<LayoutElement>,
    pub short_mode: bool,
    pub explain: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            hidden: [LayoutElement::Tree, LayoutElement::Urgency].into_iter().collect(),
            short_mode: false,
            explain: false,
        }
    }
}

impl LayoutOptions {
    pub fn is_shown(&self, element: LayoutElement) -> bool {
        !self.hidden.contains(&element)
    }

    pub fn set_hidden(&mut self, element: LayoutElement, hide: bool) {
        if hide {
            self.hidden.insert(element);
        } else {
            self.hidden.remove(&element);
        }
    }

    pub fn hidden(&self) -> impl Iterator<Item = LayoutElement> + '_ {
        self.hidden.iter().copied()
    }
}

/// What a query needs besides its text
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    /// Note holding the query; placeholders need it
    pub file: Option<&'a TasksFile>,
    pub presets: &'a Presets,
    /// Date that relative dates like `today` resolve to
    pub today: NaiveDate,
}

/// A parsed block of query instructions
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    filters: Vec<Filter>,
    sorters: Vec<Sorter>,
    groupers: Vec<Grouper>,
    layout: LayoutOptions,
    layout_statements: Vec<Statement>,
    limit: Option<usize>,
    task_group_limit: Option<usize>,
    ignore_global_query: bool,
    error: Option<String>,
}

/// Tasks a query selected, grouped for display
#[derive(Debug, Serialize)]
pub struct QueryResult<'t> {
    /// Tasks that passed every filter, before any limit
    pub total_matched: usize,
    pub groups: TaskGroups<'t>,
    /// Distinct failures raised by filters; the failing tasks are left out
    pub errors: Vec<String>,
}

impl Query {
    /// Parses `source`. Problems are kept on the query; see [`Query::error`].
    pub fn parse(source: &str, context: &QueryContext<'_>) -> Self {
        let mut query = Self {
            source: source.to_string(),
            filters: Vec::new(),
            sorters: Vec::new(),
            groupers: Vec::new(),
            layout: LayoutOptions::default(),
            layout_statements: Vec::new(),
            limit: None,
            task_group_limit: None,
            ignore_global_query: false,
            error: None,
        };

        let mut chain = Vec::new();
        for statement in scan(source) {
            if let Err(error) = query.process(statement, context, &mut chain) {
                debug!(error = %error, "Query did not parse");
                query.error = Some(error);
                break;
            }
        }
        debug!(
            filters = query.filters.len(),
            sorters = query.sorters.len(),
            groupers = query.groupers.len(),
            "Parsed query"
        );
        query
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn sorters(&self) -> &[Sorter] {
        &self.sorters
    }

    pub fn groupers(&self) -> &[Grouper] {
        &self.groupers
    }

    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    /// The `hide`/`show` statements, in the order they were read
    pub fn layout_statements(&self) -> &[Statement] {
        &self.layout_statements
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn task_group_limit(&self) -> Option<usize> {
        self.task_group_limit
    }

    pub fn ignores_global_query(&self) -> bool {
        self.ignore_global_query
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Expands placeholders, then presets, then compiles what remains
    fn process(&mut self, statement: Statement, context: &QueryContext<'_>, chain: &mut Vec<String>) -> Result<(), String> {
        for statement in expand_statement_placeholders(statement, context)? {
            let preset = PRESET_RE
                .captures(statement.any_placeholders_expanded())
                .map(|caps| caps[1].trim().to_string());
            match preset {
                Some(name) => self.expand_preset(statement, &name, context, chain)?,
                None => self
                    .parse_instruction(&statement, context.today)
                    .map_err(|error| format_error(&error, &statement))?,
            }
        }
        Ok(())
    }

    fn expand_preset(
        &mut self,
        statement: Statement,
        name: &str,
        context: &QueryContext<'_>,
        chain: &mut Vec<String>,
    ) -> Result<(), String> {
        if chain.len() >= MAX_PRESET_DEPTH {
            let mut names = chain.clone();
            names.push(name.to_string());
            return Err(format_error(&PresetError::TooDeep { chain: names }.to_string(), &statement));
        }
        let text = context
            .presets
            .lookup(name)
            .map_err(|error| format_error(&error.to_string(), &statement))?;
        debug!(preset = name, depth = chain.len() + 1, "Expanding preset");

        chain.push(name.to_string());
        for line in scan(text) {
            let mut expanded = Statement::new(statement.raw_instruction(), statement.any_continuation_lines_removed());
            expanded.record_expanded_placeholders(line.any_continuation_lines_removed());
            self.process(expanded, context, chain)?;
        }
        chain.pop();
        Ok(())
    }

    /// Compiles one instruction; the error is unformatted
    fn parse_instruction(&mut self, statement: &Statement, today: NaiveDate) -> Result<(), String> {
        let line = statement.any_placeholders_expanded();

        if let Some(caps) = MODE_RE.captures(line) {
            self.layout.short_mode = caps[1].eq_ignore_ascii_case("short");
            return Ok(());
        }
        if EXPLAIN_RE.is_match(line) {
            self.layout.explain = true;
            return Ok(());
        }
        if IGNORE_GLOBAL_RE.is_match(line) {
            self.ignore_global_query = true;
            return Ok(());
        }
        if let Some(caps) = LIMIT_GROUPS_RE.captures(line) {
            let limit = caps[2].parse().map_err(|_| "do not understand query limit".to_string())?;
            self.task_group_limit = Some(limit);
            return Ok(());
        }
        if let Some(caps) = LIMIT_RE.captures(line) {
            let limit = caps[2].parse().map_err(|_| "do not understand query limit".to_string())?;
            self.limit = Some(limit);
            return Ok(());
        }
        if let Some(sorter) = parse_sorter(line) {
            let mut sorter = sorter?;
            sorter.set_statement(statement.clone());
            self.sorters.push(sorter);
            return Ok(());
        }
        if let Some(grouper) = parse_grouper(line) {
            let mut grouper = grouper?;
            grouper.set_statement(statement.clone());
            self.groupers.push(grouper);
            return Ok(());
        }
        if let Some(caps) = LAYOUT_RE.captures(line) {
            let element =
                LayoutElement::from_name(&caps[2]).ok_or_else(|| "do not understand hide/show option".to_string())?;
            self.layout.set_hidden(element, caps[1].eq_ignore_ascii_case("hide"));
            self.layout_statements.push(statement.clone());
            return Ok(());
        }
        if let Some(filter) = parse_filter(line, today) {
            let mut filter = filter.into_result()?;
            filter.set_statement(statement.clone());
            self.filters.push(filter);
            return Ok(());
        }
        Err("do not understand query".to_string())
    }

    /// Describes what the query does, one section per concern
    pub fn explain(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Query has an error:\n{}\n", error);
        }

        let filters = if self.filters.is_empty() {
            "No filters supplied. All tasks will match the query.\n".to_string()
        } else {
            self.filters
                .iter()
                .map(|f| f.explain_filter_indented(""))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let groups = if self.groupers.is_empty() {
            "No grouping instructions supplied.\n".to_string()
        } else {
            self.groupers
                .iter()
                .map(|g| format!("{}\n", g.instruction()))
                .collect()
        };

        let mut limits = Vec::new();
        if let Some(limit) = self.limit {
            limits.push(format!("{}.\n", at_most(limit)));
        }
        if let Some(limit) = self.task_group_limit {
            limits.push(format!(
                "{} per group (if any \"group by\" options are supplied).\n",
                at_most(limit)
            ));
        }

        [filters, groups, limits.join("\n")]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Filters, sorts, limits and groups the tasks in `search_info`
    pub fn apply<'t>(&self, search_info: &SearchInfo<'t>) -> QueryResult<'t> {
        let mut errors: Vec<String> = Vec::new();
        let mut matched: Vec<&'t Task> = Vec::new();

        'tasks: for task in search_info.all_tasks() {
            for filter in &self.filters {
                match filter.matches(task, search_info) {
                    Ok(true) => {}
                    Ok(false) => continue 'tasks,
                    Err(error) => {
                        if !errors.contains(&error) {
                            errors.push(error);
                        }
                        continue 'tasks;
                    }
                }
            }
            matched.push(task);
        }
        let total_matched = matched.len();

        let sorters: Vec<Sorter> = self
            .sorters
            .iter()
            .cloned()
            .chain(default_sorters())
            .collect();
        sort_tasks(&mut matched, &sorters, search_info);
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        let mut groups = TaskGroups::new(&self.groupers, matched, search_info);
        if let Some(limit) = self.task_group_limit {
            groups.apply_task_limit(limit);
        }
        debug!(total_matched, groups = groups.len(), errors = errors.len(), "Applied query");

        QueryResult {
            total_matched,
            groups,
            errors,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn default_sorters() -> impl Iterator<Item = Sorter> {
    DEFAULT_SORT_FIELDS
        .iter()
        .filter_map(|name| field_by_name(name))
        .filter_map(|field| field.create_normal_sorter())
}

fn at_most(limit: usize) -> String {
    format!("At most {} task{}", limit, if limit == 1 { "" } else { "s" })
}

/// Attaches the offending statement to an instruction error
fn format_error(error: &str, statement: &Statement) -> String {
    if statement.is_unchanged() {
        format!("{}\nProblem line: \"{}\"", error, statement.raw_instruction())
    } else {
        format!("{}\nProblem statement:\n{}\n", error, statement.explain("    "))
    }
}

/// Splits query text into statements.
///
/// A line ending in `\` continues onto the next one. Blank lines and lines
/// starting with `#` are dropped.
pub fn scan(source: &str) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut raw_lines: Vec<&str> = Vec::new();
    let mut joined = String::new();

    for line in source.split('\n') {
        raw_lines.push(line);
        if let Some(body) = line.trim_end().strip_suffix('\\') {
            joined.push_str(body.trim());
            joined.push(' ');
            continue;
        }
        joined.push_str(line.trim());
        statements.push(Statement::new(raw_lines.join("\n").trim(), joined.as_str()));
        raw_lines.clear();
        joined.clear();
    }
    if !raw_lines.is_empty() {
        statements.push(Statement::new(raw_lines.join("\n").trim(), joined.as_str()));
    }

    statements
        .into_iter()
        .filter(|s| {
            let text = s.any_continuation_lines_removed();
            !text.is_empty() && !text.starts_with('#')
        })
        .collect()
}

/// Expands placeholders in a statement, splitting it when the expansion
/// spans several lines
fn expand_statement_placeholders(
    mut statement: Statement,
    context: &QueryContext<'_>,
) -> Result<Vec<Statement>, String> {
    let mut text = statement.any_placeholders_expanded().to_string();
    if !has_placeholders(&text) {
        return Ok(vec![statement]);
    }
    if context.file.is_none() {
        return Err(PlaceholderError::NoFile { template: text }.to_string());
    }

    let bindings = [
        (
            "query",
            Value::Query(QueryView {
                all_tasks: &[],
                file: context.file,
            }),
        ),
        ("preset", context.presets.to_value()),
    ];
    let mut passes = 0;
    while has_placeholders(&text) {
        if passes == MAX_PRESET_DEPTH {
            return Err(format_error(
                &format!("Placeholders are nested more than {} deep", MAX_PRESET_DEPTH),
                &statement,
            ));
        }
        text = expand_placeholders(&text, &bindings, context.today).map_err(|e| e.to_string())?;
        passes += 1;
    }

    if !text.contains('\n') {
        statement.record_expanded_placeholders(text);
        return Ok(vec![statement]);
    }

    let expanded = scan(&text)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let suffix = format!(": statement {} after expansion of placeholder", i + 1);
            let mut split = Statement::new(
                format!("{}{}", statement.raw_instruction(), suffix),
                format!("{}{}", statement.any_continuation_lines_removed(), suffix),
            );
            split.record_expanded_placeholders(line.any_continuation_lines_removed());
            split
        })
        .collect();
    Ok(expanded)
}
