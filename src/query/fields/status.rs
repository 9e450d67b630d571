//! Status fields: `done`/`not done`, `status.type` and `is recurring`

use chrono::NaiveDate;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::domain::{StatusType, Task};
use crate::query::explanation::Explanation;
use crate::query::field::{instruction_regex, Field};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::grouper::GroupFunction;
use crate::query::sorter::Comparator;
use crate::query::SearchInfo;

static DONE_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^(done|not done)$"));
static TYPE_CLAIM_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^status\.type "));
static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^status\.type (is|is not) ([^ ]+)$"));
static RECURRING_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^is (not )?recurring$"));

/// `done` and `not done`
pub struct StatusField;

impl Field for StatusField {
    fn field_name(&self) -> &'static str {
        "status"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        DONE_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        let Some(caps) = DONE_RE.captures(line) else {
            return FilterOrErrorMessage::from_error(line, "do not understand query filter (status)");
        };
        let wanted = caps[1].eq_ignore_ascii_case("done");
        FilterOrErrorMessage::from_filter(Filter::from_predicate(
            line,
            move |task, _| task.is_done() == wanted,
            Explanation::new(line),
        ))
    }

    fn comparator(&self) -> Option<Comparator> {
        Some(Arc::new(|a: &Task, b: &Task, _: &SearchInfo<'_>| a.is_done().cmp(&b.is_done())))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        Some(Arc::new(|task: &Task, _: &SearchInfo<'_>| {
            vec![if task.is_done() { "Done" } else { "Todo" }.to_string()]
        }))
    }
}

/// `status.type (is|is not) TYPE`
pub struct StatusTypeField;

impl Field for StatusTypeField {
    fn field_name(&self) -> &'static str {
        "status.type"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        TYPE_CLAIM_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        let Some(caps) = TYPE_RE.captures(line) else {
            return FilterOrErrorMessage::from_error(line, "do not understand query filter (status.type)");
        };
        let Ok(wanted) = caps[2].parse::<StatusType>() else {
            let allowed: Vec<&str> = StatusType::ALL
                .iter()
                .filter(|t| **t != StatusType::Empty)
                .map(StatusType::as_str)
                .collect();
            return FilterOrErrorMessage::from_error(
                line,
                format!(
                    "invalid status.type instruction: '{}'. Allowed values: {}",
                    &caps[2],
                    allowed.join(" ")
                ),
            );
        };
        let negate = caps[1].eq_ignore_ascii_case("is not");
        let explanation = format!("status.type {} {}", caps[1].to_lowercase(), wanted);
        FilterOrErrorMessage::from_filter(Filter::from_predicate(
            line,
            move |task, _| negate != (task.status.status_type == wanted),
            Explanation::new(explanation),
        ))
    }

    fn comparator(&self) -> Option<Comparator> {
        Some(Arc::new(|a: &Task, b: &Task, _: &SearchInfo<'_>| {
            a.status.status_type.sort_order().cmp(&b.status.status_type.sort_order())
        }))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        Some(Arc::new(|task: &Task, _: &SearchInfo<'_>| vec![task.status.status_type.group_text()]))
    }
}

/// `is recurring` and `is not recurring`
pub struct RecurringField;

impl Field for RecurringField {
    fn field_name(&self) -> &'static str {
        "recurring"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        RECURRING_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        let Some(caps) = RECURRING_RE.captures(line) else {
            return FilterOrErrorMessage::from_error(line, "do not understand query filter (recurring)");
        };
        let wanted = caps.get(1).is_none();
        FilterOrErrorMessage::from_filter(Filter::from_predicate(
            line,
            move |task, _| task.is_recurring() == wanted,
            Explanation::new(line),
        ))
    }

    fn comparator(&self) -> Option<Comparator> {
        // recurring tasks first
        Some(Arc::new(|a: &Task, b: &Task, _: &SearchInfo<'_>| b.is_recurring().cmp(&a.is_recurring())))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        Some(Arc::new(|task: &Task, _: &SearchInfo<'_>| {
            vec![if task.is_recurring() { "Recurring" } else { "Not Recurring" }.to_string()]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Recurrence, Status};
    use std::cmp::Ordering;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn check(field: &dyn Field, line: &str, task: &Task) -> bool {
        let tasks = vec![task.clone()];
        let info = SearchInfo::new(&tasks, None, today());
        let filter = field.create_filter_or_error_message(line, today());
        filter.filter().unwrap().matches(task, &info).unwrap()
    }

    #[test]
    fn done_and_not_done() {
        let done = Task {
            status: Status::done(),
            ..Task::new("finished")
        };
        let todo = Task::new("open");
        assert!(check(&StatusField, "done", &done));
        assert!(!check(&StatusField, "done", &todo));
        assert!(check(&StatusField, "not done", &todo));
        assert!(!StatusField.can_create_filter_for_line("done before today"));
    }

    #[test]
    fn status_type() {
        let in_progress = Task {
            status: Status::in_progress(),
            ..Task::new("doing")
        };
        assert!(check(&StatusTypeField, "status.type is IN_PROGRESS", &in_progress));
        assert!(check(&StatusTypeField, "status.type is not TODO", &in_progress));

        let filter = StatusTypeField.create_filter_or_error_message("status.type is BLAH", today());
        assert_eq!(
            filter.error(),
            Some("invalid status.type instruction: 'BLAH'. Allowed values: TODO IN_PROGRESS DONE CANCELLED NON_TASK")
        );
    }

    #[test]
    fn recurring() {
        let recurring = Task {
            recurrence: Some(Recurrence::parse("every day").unwrap()),
            ..Task::new("daily")
        };
        let once = Task::new("once");
        assert!(check(&RecurringField, "is recurring", &recurring));
        assert!(check(&RecurringField, "is not recurring", &once));

        let tasks = vec![recurring, once];
        let info = SearchInfo::new(&tasks, None, today());
        let comparator = RecurringField.comparator().unwrap();
        assert_eq!(comparator(&tasks[0], &tasks[1], &info), Ordering::Less);
    }

    #[test]
    fn status_sorting_puts_done_last() {
        let tasks = vec![
            Task {
                status: Status::done(),
                ..Task::new("a")
            },
            Task::new("b"),
        ];
        let info = SearchInfo::new(&tasks, None, today());
        let comparator = StatusField.comparator().unwrap();
        assert_eq!(comparator(&tasks[0], &tasks[1], &info), Ordering::Greater);
        let group = StatusTypeField.group_function().unwrap();
        assert_eq!(group(&tasks[0], &info), vec!["%%3%%DONE"]);
    }
}
