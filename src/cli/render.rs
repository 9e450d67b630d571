//! Plain-text rendering of query results
//!
//! Tasks print as emoji task lines, trimmed by the query's `hide`/`show`
//! and `short mode` settings. Group headings print as Markdown headings
//! from level 4 down.

use chrono::NaiveDate;

use crate::domain::{Priority, Task, TaskDate};
use crate::query::{LayoutElement, LayoutOptions, QueryResult};

const FIRST_HEADING_LEVEL: usize = 4;
const LAST_HEADING_LEVEL: usize = 6;

/// One task as a line of text
pub fn render_task(task: &Task, layout: &LayoutOptions, today: NaiveDate) -> String {
    let shown = |element| layout.is_shown(element);
    let description = if shown(LayoutElement::Tags) {
        task.description.clone()
    } else {
        task.description_without_tags()
    };

    let mut line = format!("{} [{}] ", task.list_marker, task.status.symbol);
    if shown(LayoutElement::Urgency) {
        line.push_str(&format!("{:.2} ", task.urgency(today)));
    }
    line.push_str(&description);

    let mut push = |signifier: &str, value: String| {
        line.push(' ');
        line.push_str(signifier);
        if !layout.short_mode && !value.is_empty() {
            line.push(' ');
            line.push_str(&value);
        }
    };

    if task.priority != Priority::None && shown(LayoutElement::Priority) {
        push(task.priority.signifier(), String::new());
    }
    if let Some(recurrence) = task.recurrence.as_ref().filter(|_| shown(LayoutElement::RecurrenceRule)) {
        push("🔁", recurrence.to_string());
    }

    let dates: [(&str, &Option<TaskDate>, LayoutElement); 6] = [
        ("➕", &task.created, LayoutElement::CreatedDate),
        ("🛫", &task.start, LayoutElement::StartDate),
        ("⏳", &task.scheduled, LayoutElement::ScheduledDate),
        ("📅", &task.due, LayoutElement::DueDate),
        ("❌", &task.cancelled, LayoutElement::CancelledDate),
        ("✅", &task.done, LayoutElement::DoneDate),
    ];
    for (signifier, date, element) in dates {
        if let Some(date) = date.as_ref().filter(|_| shown(element)) {
            push(signifier, date.to_string());
        }
    }

    if !task.id.is_empty() && shown(LayoutElement::Id) {
        push("🆔", task.id.clone());
    }
    if !task.depends_on.is_empty() && shown(LayoutElement::DependsOn) {
        push("⛔", task.depends_on.join(","));
    }

    if shown(LayoutElement::Backlinks) {
        if let Some(backlink) = backlink(task) {
            line.push_str(&format!(" ({})", backlink));
        }
    }
    line
}

/// `note > heading`, or just the note when the heading repeats its name
fn backlink(task: &Task) -> Option<String> {
    if task.path.is_empty() {
        return None;
    }
    let file = task.file();
    let name = file.filename_without_extension();
    match task.heading.as_deref() {
        Some(heading) if heading != name => Some(format!("{} > {}", name, heading)),
        _ => Some(name.to_string()),
    }
}

/// Headings, task lines and the task count of a whole result
pub fn render_result(result: &QueryResult<'_>, layout: &LayoutOptions, today: NaiveDate) -> String {
    let mut text = String::new();

    for group in &result.groups.groups {
        for heading in &group.headings {
            let level = (FIRST_HEADING_LEVEL + heading.nesting_level).min(LAST_HEADING_LEVEL);
            text.push_str(&format!("{} {}\n", "#".repeat(level), heading.display_name));
        }
        for task in &group.tasks {
            text.push_str(&render_task(task, layout, today));
            text.push('\n');
        }
    }

    if layout.is_shown(LayoutElement::TaskCount) {
        let count = result.groups.total_tasks_count;
        text.push_str(&format!("{} task{}\n", count, if count == 1 { "" } else { "s" }));
    }
    text
}
