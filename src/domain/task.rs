//! Task domain model
//!
//! A task is an immutable record read from one checklist line of a note.
//! Parsing the markdown line is done elsewhere; this module only holds
//! the parsed values and the properties derived from them.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::date::TaskDate;
use super::duration::Duration;
use super::file::TasksFile;
use super::priority::Priority;
use super::recurrence::{Occurrence, Recurrence};
use super::status::Status;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)#[^\s!@#$%^&*(),.?:{}|<>\x22]+").expect("valid regex"));

/// A single task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub status: Status,
    pub description: String,

    /// Path of the note holding the task
    pub path: String,
    /// Zero-based line of the task within its note
    pub line_number: usize,
    /// Nearest heading above the task, if any
    pub heading: Option<String>,

    pub indentation: String,
    pub list_marker: String,

    /// Tags including the leading `#`
    pub tags: Vec<String>,
    pub priority: Priority,

    pub created: Option<TaskDate>,
    pub start: Option<TaskDate>,
    pub scheduled: Option<TaskDate>,
    pub due: Option<TaskDate>,
    pub done: Option<TaskDate>,
    pub cancelled: Option<TaskDate>,

    pub recurrence: Option<Recurrence>,
    pub duration: Option<Duration>,

    /// Identifier other tasks may depend on; empty for none
    pub id: String,
    pub depends_on: Vec<String>,

    /// `^block` annotation, kept with its leading space
    pub block_link: String,
}

impl Task {
    /// Creates a TODO task with the given description and nothing else set
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            status: Status::todo(),
            description: description.into(),
            path: String::new(),
            line_number: 0,
            heading: None,
            indentation: String::new(),
            list_marker: "-".to_string(),
            tags: Vec::new(),
            priority: Priority::None,
            created: None,
            start: None,
            scheduled: None,
            due: None,
            done: None,
            cancelled: None,
            recurrence: None,
            duration: None,
            id: String::new(),
            depends_on: Vec::new(),
            block_link: String::new(),
        }
    }

    /// Returns true for DONE, CANCELLED and NON_TASK statuses
    pub fn is_done(&self) -> bool {
        self.status.status_type.counts_as_done()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// The file holding this task
    pub fn file(&self) -> TasksFile {
        TasksFile::new(self.path.clone())
    }

    /// The earliest of the start, scheduled and due dates.
    ///
    /// Valid dates win over invalid ones.
    pub fn happens(&self) -> Option<&TaskDate> {
        let candidates = [&self.start, &self.scheduled, &self.due];
        candidates
            .iter()
            .filter_map(|d| d.as_ref())
            .filter(|d| d.is_valid())
            .min_by_key(|d| d.valid())
            .or_else(|| candidates.iter().find_map(|d| d.as_ref()))
    }

    /// Start, scheduled and due dates used by recurrence
    pub fn occurrence(&self) -> Occurrence {
        let valid = |d: &Option<TaskDate>| d.as_ref().and_then(TaskDate::valid);
        Occurrence {
            start: valid(&self.start),
            scheduled: valid(&self.scheduled),
            due: valid(&self.due),
        }
    }

    /// Score of how pressing the task is on `today`.
    ///
    /// Due dates weigh most, rising from 0.2 two weeks ahead to 1.0 a
    /// week overdue; reached scheduled dates add, future start dates
    /// subtract, and priority adds a fixed weight.
    pub fn urgency(&self, today: NaiveDate) -> f64 {
        let mut urgency = 0.0;

        if let Some(due) = self.due.as_ref().and_then(TaskDate::valid) {
            let days_overdue = (today - due).num_days() as f64;
            let multiplier = if days_overdue >= 7.0 {
                1.0
            } else if days_overdue >= -14.0 {
                ((days_overdue + 14.0) * 0.8) / 21.0 + 0.2
            } else {
                0.2
            };
            urgency += multiplier * 12.0;
        }

        if let Some(scheduled) = self.scheduled.as_ref().and_then(TaskDate::valid) {
            if today >= scheduled {
                urgency += 5.0;
            }
        }

        if let Some(start) = self.start.as_ref().and_then(TaskDate::valid) {
            if today < start {
                urgency -= 3.0;
            }
        }

        urgency + self.priority.urgency_weight()
    }

    /// Returns true if an unfinished task with an id this task depends on exists
    pub fn is_blocked(&self, all_tasks: &[Task]) -> bool {
        self.is_blocked_by(all_tasks.iter())
    }

    /// Like [`Task::is_blocked`], over borrowed tasks
    pub fn is_blocked_by<'t>(&self, all_tasks: impl IntoIterator<Item = &'t Task>) -> bool {
        if self.depends_on.is_empty() || self.is_done() {
            return false;
        }
        all_tasks
            .into_iter()
            .any(|t| !t.is_done() && !t.id.is_empty() && self.depends_on.contains(&t.id))
    }

    /// Returns true if an unfinished task depends on this unfinished task
    pub fn is_blocking(&self, all_tasks: &[Task]) -> bool {
        self.is_blocking_in(all_tasks.iter())
    }

    /// Like [`Task::is_blocking`], over borrowed tasks
    pub fn is_blocking_in<'t>(&self, all_tasks: impl IntoIterator<Item = &'t Task>) -> bool {
        if self.id.is_empty() || self.is_done() {
            return false;
        }
        all_tasks
            .into_iter()
            .any(|t| !t.is_done() && t.depends_on.iter().any(|dep| dep == &self.id))
    }

    /// Description with every `#tag` removed
    pub fn description_without_tags(&self) -> String {
        let stripped = TAG_RE.replace_all(&self.description, "$1");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Renders the task in the emoji task-line format
    pub fn to_markdown_line(&self) -> String {
        let mut line = format!(
            "{}{} [{}] {}",
            self.indentation, self.list_marker, self.status.symbol, self.description
        );
        let mut push = |signifier: &str, value: String| {
            line.push(' ');
            line.push_str(signifier);
            if !value.is_empty() {
                line.push(' ');
                line.push_str(&value);
            }
        };

        if self.priority != Priority::None {
            push(self.priority.signifier(), String::new());
        }
        if let Some(recurrence) = &self.recurrence {
            push("🔁", recurrence.to_string());
        }
        for (signifier, date) in [
            ("➕", &self.created),
            ("🛫", &self.start),
            ("⏳", &self.scheduled),
            ("📅", &self.due),
            ("❌", &self.cancelled),
            ("✅", &self.done),
        ] {
            if let Some(date) = date {
                push(signifier, date.to_string());
            }
        }
        if !self.id.is_empty() {
            push("🆔", self.id.clone());
        }
        if !self.depends_on.is_empty() {
            push("⛔", self.depends_on.join(","));
        }
        line.push_str(&self.block_link);
        line
    }
}
