//! `is blocked`, `is not blocked`, `is blocking` and `is not blocking`
//!
//! Both filters need the whole task list. The id sets they look up are
//! built once per query pass and kept in the search cache.

use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::domain::Task;
use crate::query::explanation::Explanation;
use crate::query::field::{instruction_regex, Field};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::SearchInfo;

static BLOCKING_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^is (not )?(blocked|blocking)$"));

/// Ids of every unfinished task
fn unfinished_ids(info: &SearchInfo<'_>) -> HashSet<String> {
    info.all_tasks()
        .iter()
        .filter(|t| !t.is_done() && !t.id.is_empty())
        .map(|t| t.id.clone())
        .collect()
}

/// Ids that some unfinished task depends on
fn depended_on_ids(info: &SearchInfo<'_>) -> HashSet<String> {
    info.all_tasks()
        .iter()
        .filter(|t| !t.is_done())
        .flat_map(|t| t.depends_on.iter().cloned())
        .collect()
}

fn is_blocked(task: &Task, info: &SearchInfo<'_>) -> bool {
    if task.is_done() || task.depends_on.is_empty() {
        return false;
    }
    let unfinished = info.memoize("blocking:unfinished_ids", unfinished_ids);
    task.depends_on.iter().any(|id| unfinished.contains(id))
}

fn is_blocking(task: &Task, info: &SearchInfo<'_>) -> bool {
    if task.is_done() || task.id.is_empty() {
        return false;
    }
    info.memoize("blocking:depended_on_ids", depended_on_ids)
        .contains(&task.id)
}

pub struct BlockingField;

impl Field for BlockingField {
    fn field_name(&self) -> &'static str {
        "blocking"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        BLOCKING_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        let Some(caps) = BLOCKING_RE.captures(line) else {
            return FilterOrErrorMessage::from_error(line, "do not understand query filter (blocking)");
        };
        let negate = caps.get(1).is_some();
        let test: fn(&Task, &SearchInfo<'_>) -> bool = if caps[2].eq_ignore_ascii_case("blocked") {
            is_blocked
        } else {
            is_blocking
        };
        FilterOrErrorMessage::from_filter(Filter::from_predicate(
            line,
            move |task, info| negate != test(task, info),
            Explanation::new(line),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Status;

    #[test]
    fn agrees_with_task_methods() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let tasks = vec![
            Task {
                id: "a".into(),
                ..Task::new("blocker")
            },
            Task {
                depends_on: vec!["a".into()],
                ..Task::new("blocked")
            },
            Task {
                id: "b".into(),
                status: Status::done(),
                ..Task::new("finished")
            },
            Task {
                depends_on: vec!["b".into()],
                ..Task::new("free")
            },
        ];
        let info = SearchInfo::new(&tasks, None, today);
        let blocked = BlockingField.create_filter_or_error_message("is blocked", today);
        let blocking = BlockingField.create_filter_or_error_message("is blocking", today);
        let not_blocked = BlockingField.create_filter_or_error_message("is not blocked", today);

        for task in &tasks {
            assert_eq!(blocked.filter().unwrap().matches(task, &info), Ok(task.is_blocked(&tasks)));
            assert_eq!(blocking.filter().unwrap().matches(task, &info), Ok(task.is_blocking(&tasks)));
            assert_eq!(not_blocked.filter().unwrap().matches(task, &info), Ok(!task.is_blocked(&tasks)));
        }
    }
}
