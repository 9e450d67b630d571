//! The `priority` field

use chrono::NaiveDate;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::domain::{Priority, Task};
use crate::query::explanation::Explanation;
use crate::query::field::{instruction_regex, Field};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::grouper::GroupFunction;
use crate::query::sorter::Comparator;
use crate::query::SearchInfo;

static CLAIM_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^priority( |$)"));
static FILTER_RE: LazyLock<Regex> =
    LazyLock::new(|| instruction_regex(r"^priority(?: is)?(?: (above|below|not))? (\S+)$"));

/// `priority [is] [above|below|not] LEVEL`
pub struct PriorityField;

impl Field for PriorityField {
    fn field_name(&self) -> &'static str {
        "priority"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        CLAIM_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        let Some(caps) = FILTER_RE.captures(line) else {
            return FilterOrErrorMessage::from_error(line, "do not understand query filter (priority)");
        };
        let Some(level) = Priority::from_keyword(&caps[2]) else {
            return FilterOrErrorMessage::from_error(line, "do not understand priority");
        };
        let modifier = caps.get(1).map(|m| m.as_str().to_lowercase());

        let explanation = match &modifier {
            Some(modifier) => format!("priority is {} {}", modifier, level.keyword()),
            None => format!("priority is {}", level.keyword()),
        };

        // lower numbers are more important
        let filter = match modifier.as_deref() {
            Some("above") => Filter::from_predicate(line, move |task, _| task.priority < level, Explanation::new(explanation)),
            Some("below") => Filter::from_predicate(line, move |task, _| task.priority > level, Explanation::new(explanation)),
            Some(_) => Filter::from_predicate(line, move |task, _| task.priority != level, Explanation::new(explanation)),
            None => Filter::from_predicate(line, move |task, _| task.priority == level, Explanation::new(explanation)),
        };
        FilterOrErrorMessage::from_filter(filter)
    }

    fn comparator(&self) -> Option<Comparator> {
        Some(Arc::new(|a: &Task, b: &Task, _: &SearchInfo<'_>| a.priority.cmp(&b.priority)))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        Some(Arc::new(|task: &Task, _: &SearchInfo<'_>| vec![task.priority.group_text()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn with_priority(priority: Priority) -> Task {
        Task {
            priority,
            ..Task::new("task")
        }
    }

    fn matching(line: &str) -> Vec<Priority> {
        let tasks: Vec<Task> = Priority::ALL.into_iter().map(with_priority).collect();
        let info = SearchInfo::new(&tasks, None, today());
        let filter = PriorityField.create_filter_or_error_message(line, today());
        let filter = filter.filter().unwrap();
        tasks
            .iter()
            .filter(|t| filter.matches(t, &info).unwrap())
            .map(|t| t.priority)
            .collect()
    }

    #[test]
    fn is_matches_only_that_level() {
        assert_eq!(matching("priority is high"), vec![Priority::High]);
        assert_eq!(matching("priority medium"), vec![Priority::Medium]);
    }

    #[test]
    fn above_and_below() {
        assert_eq!(matching("priority is above medium"), vec![Priority::Highest, Priority::High]);
        assert_eq!(matching("priority below none"), vec![Priority::Low, Priority::Lowest]);
        assert_eq!(matching("priority is not none").len(), 5);
    }

    #[test]
    fn explanation_inserts_is() {
        let filter = PriorityField.create_filter_or_error_message("priority high", today());
        assert_eq!(filter.filter().unwrap().explanation().to_string(), "priority is high");
    }

    #[test]
    fn errors() {
        let filter = PriorityField.create_filter_or_error_message("priority is urgent", today());
        assert_eq!(filter.error(), Some("do not understand priority"));
        let filter = PriorityField.create_filter_or_error_message("priority", today());
        assert_eq!(filter.error(), Some("do not understand query filter (priority)"));
    }
}
