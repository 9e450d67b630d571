//! JSONL storage for tasks
//!
//! Each line of a `.jsonl` file is one [`TaskRecord`]. Records are turned
//! into [`Task`]s against a [`StatusRegistry`], so the same file reads
//! differently under different status settings. Uses file locking for
//! concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{Priority, Recurrence, StatusRegistry, Task, TaskDate, ToggleOptions};

/// The stored form of a task: plain strings, no resolved status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRecord {
    /// Checkbox symbol
    pub status: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    pub line_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub indentation: String,
    pub list_marker: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub block_link: String,
}

impl Default for TaskRecord {
    fn default() -> Self {
        Self::from_task(&Task::new(""))
    }
}

impl TaskRecord {
    pub fn from_task(task: &Task) -> Self {
        let date = |d: &Option<TaskDate>| d.as_ref().map(TaskDate::to_string);
        Self {
            status: task.status.symbol.clone(),
            description: task.description.clone(),
            path: task.path.clone(),
            line_number: task.line_number,
            heading: task.heading.clone(),
            indentation: task.indentation.clone(),
            list_marker: task.list_marker.clone(),
            tags: task.tags.clone(),
            priority: task.priority,
            created: date(&task.created),
            start: date(&task.start),
            scheduled: date(&task.scheduled),
            due: date(&task.due),
            done: date(&task.done),
            cancelled: date(&task.cancelled),
            recurrence: task.recurrence.as_ref().map(Recurrence::to_string),
            duration: task.duration.map(|d| d.to_string()),
            id: task.id.clone(),
            depends_on: task.depends_on.clone(),
            block_link: task.block_link.clone(),
        }
    }

    /// Resolves the record against `registry`.
    ///
    /// Unregistered symbols become `Unknown` statuses. A recurrence rule or
    /// duration that does not parse is dropped with a warning.
    pub fn to_task(&self, registry: &StatusRegistry) -> Task {
        let date = |d: &Option<String>| d.as_deref().map(TaskDate::parse);

        let recurrence = self.recurrence.as_deref().and_then(|text| match Recurrence::parse(text) {
            Ok(recurrence) => Some(recurrence),
            Err(e) => {
                warn!(description = %self.description, error = %e, "Ignoring recurrence rule");
                None
            }
        });
        let duration = self.duration.as_deref().and_then(|text| match text.parse() {
            Ok(duration) => Some(duration),
            Err(e) => {
                warn!(description = %self.description, error = %e, "Ignoring duration");
                None
            }
        });

        Task {
            status: registry.by_symbol_or_create(&self.status),
            description: self.description.clone(),
            path: self.path.clone(),
            line_number: self.line_number,
            heading: self.heading.clone(),
            indentation: self.indentation.clone(),
            list_marker: self.list_marker.clone(),
            tags: self.tags.clone(),
            priority: self.priority,
            created: date(&self.created),
            start: date(&self.start),
            scheduled: date(&self.scheduled),
            due: date(&self.due),
            done: date(&self.done),
            cancelled: date(&self.cancelled),
            recurrence,
            duration,
            id: self.id.clone(),
            depends_on: self.depends_on.clone(),
            block_link: self.block_link.clone(),
        }
    }
}

/// Store for task data in JSONL format
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Creates a new task store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record, in file order
    pub fn read_records(&self) -> Result<Vec<TaskRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on task store")?;

        Self::parse_records(&file)
    }

    /// Reads every task, resolving statuses against `registry`
    pub fn read_all(&self, registry: &StatusRegistry) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = self
            .read_records()?
            .iter()
            .map(|record| record.to_task(registry))
            .collect();
        debug!(path = %self.path.display(), count = tasks.len(), "Loaded tasks");
        Ok(tasks)
    }

    fn parse_records(file: &File) -> Result<Vec<TaskRecord>> {
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: TaskRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse task at line {}", line_num + 1))?;
            records.push(record);
        }

        Ok(records)
    }

    /// Writes all records to the store (full rewrite)
    pub fn write_records(&self, records: &[TaskRecord]) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on task store")?;

            let mut writer = BufWriter::new(&file);
            for record in records {
                let line = serde_json::to_string(record).context("Failed to serialize task")?;
                writeln!(writer, "{}", line).context("Failed to write task")?;
            }

            writer.flush().context("Failed to flush task store")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Writes tasks to the store, replacing its contents
    pub fn write_all(&self, tasks: &[Task]) -> Result<()> {
        let records: Vec<TaskRecord> = tasks.iter().map(TaskRecord::from_task).collect();
        self.write_records(&records)
    }

    /// Toggles the task held in 1-based record `record` and writes the
    /// result back in place.
    ///
    /// A completed recurring task expands into two records. Later tasks
    /// in the same note shift down by the inserted line. Returns the
    /// replacement tasks in the order they were written.
    pub fn toggle(
        &self,
        record: usize,
        registry: &StatusRegistry,
        today: NaiveDate,
        options: &ToggleOptions,
    ) -> Result<Vec<Task>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        // Held across read and rewrite so concurrent toggles serialize
        file.lock_exclusive()
            .context("Failed to acquire write lock on task store")?;

        let mut records = Self::parse_records(&file)?;
        if record == 0 || record > records.len() {
            bail!(
                "No task at record {} in {} ({} records)",
                record,
                self.path.display(),
                records.len()
            );
        }

        let index = record - 1;
        let original = records[index].to_task(registry);
        let mut replacements = original.toggle_in_users_order(registry, today, options);
        let inserted = replacements.len().saturating_sub(1);
        for (offset, task) in replacements.iter_mut().enumerate() {
            task.line_number = original.line_number + offset;
        }

        if inserted > 0 {
            for other in records.iter_mut() {
                if other.path == original.path && other.line_number > original.line_number {
                    other.line_number += inserted;
                }
            }
        }

        info!(
            description = %original.description,
            from = %original.status.symbol,
            to = %replacements.iter().map(|t| t.status.symbol.as_str()).collect::<Vec<_>>().join(","),
            "Toggled task"
        );

        records.splice(index..=index, replacements.iter().map(TaskRecord::from_task));
        self.write_records(&records)?;

        Ok(replacements)
    }
}
