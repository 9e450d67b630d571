//! The estimated `duration` field

use chrono::NaiveDate;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::domain::{Duration, Task};
use crate::query::explanation::Explanation;
use crate::query::field::{instruction_regex, Field};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::grouper::GroupFunction;
use crate::query::sorter::Comparator;
use crate::query::SearchInfo;

static PRESENCE_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^(has|no) duration$"));
static CLAIM_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^duration( |$)"));
static FILTER_RE: LazyLock<Regex> =
    LazyLock::new(|| instruction_regex(r"^duration(?: (is not|is|above|over|below|under))? (\S+)$"));

/// `has duration`, `no duration` and `duration [is|is not|above|below] D`
pub struct DurationField;

impl Field for DurationField {
    fn field_name(&self) -> &'static str {
        "duration"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        PRESENCE_RE.is_match(line) || CLAIM_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        if let Some(caps) = PRESENCE_RE.captures(line) {
            let wanted = caps[1].eq_ignore_ascii_case("has");
            return FilterOrErrorMessage::from_filter(Filter::from_predicate(
                line,
                move |task, _| wanted == task.duration.is_some(),
                Explanation::new(line),
            ));
        }

        let Some(caps) = FILTER_RE.captures(line) else {
            return FilterOrErrorMessage::from_error(line, "do not understand query filter (duration)");
        };
        let Ok(wanted) = caps[2].parse::<Duration>() else {
            return FilterOrErrorMessage::from_error(line, "do not understand duration");
        };
        let operator = caps.get(1).map_or("is".to_string(), |m| m.as_str().to_lowercase());

        let (words, filter): (&str, Box<dyn Fn(&Duration) -> bool + Send + Sync>) = match operator.as_str() {
            "above" | "over" => ("is above", Box::new(move |d| *d > wanted)),
            "below" | "under" => ("is below", Box::new(move |d| *d < wanted)),
            _ => ("is", Box::new(move |d| *d == wanted)),
        };
        let negate = operator == "is not";
        let explanation = format!("duration {}{} {}", words, if negate { " not" } else { "" }, wanted);
        FilterOrErrorMessage::from_filter(Filter::from_predicate(
            line,
            move |task, _| negate != task.duration.as_ref().is_some_and(|d| filter(d)),
            Explanation::new(explanation),
        ))
    }

    /// Shortest first, tasks without a duration last
    fn comparator(&self) -> Option<Comparator> {
        Some(Arc::new(|a: &Task, b: &Task, _: &SearchInfo<'_>| match (a.duration, b.duration) {
            (Some(x), Some(y)) => x.cmp(&y),
            (x, y) => y.is_some().cmp(&x.is_some()),
        }))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        Some(Arc::new(|task: &Task, _: &SearchInfo<'_>| {
            let heading = match task.duration {
                Some(duration) => format!("%%{:06}%%{}", duration.total_minutes(), duration),
                None => "No duration".to_string(),
            };
            vec![heading]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn lasting(text: &str) -> Task {
        Task {
            duration: Some(text.parse().unwrap()),
            ..Task::new("task")
        }
    }

    fn check(line: &str, task: &Task) -> bool {
        let tasks = vec![task.clone()];
        let info = SearchInfo::new(&tasks, None, today());
        let filter = DurationField.create_filter_or_error_message(line, today());
        filter.filter().unwrap().matches(task, &info).unwrap()
    }

    #[test]
    fn comparisons() {
        assert!(check("duration is 90m", &lasting("1h30m")));
        assert!(check("duration above 1h", &lasting("1h30m")));
        assert!(!check("duration under 1h", &lasting("1h30m")));
        assert!(check("duration is not 1h", &lasting("1h30m")));
        assert!(check("duration is not 1h", &Task::new("no estimate")));
        assert!(!check("duration is 1h", &Task::new("no estimate")));
        assert!(check("no duration", &Task::new("no estimate")));
    }

    #[test]
    fn explanation_normalizes() {
        let filter = DurationField.create_filter_or_error_message("duration over 90m", today());
        assert_eq!(filter.filter().unwrap().explanation().to_string(), "duration is above 1h30m");
        let filter = DurationField.create_filter_or_error_message("duration is soon", today());
        assert_eq!(filter.error(), Some("do not understand duration"));
    }

    #[test]
    fn sorting_and_grouping() {
        let tasks = vec![lasting("2h"), lasting("45m"), Task::new("none")];
        let info = SearchInfo::new(&tasks, None, today());
        let comparator = DurationField.comparator().unwrap();
        assert_eq!(comparator(&tasks[0], &tasks[1], &info), Ordering::Greater);
        assert_eq!(comparator(&tasks[2], &tasks[1], &info), Ordering::Greater);

        let group = DurationField.group_function().unwrap();
        assert_eq!(group(&tasks[1], &info), vec!["%%000045%%45m"]);
        assert_eq!(group(&tasks[2], &info), vec!["No duration"]);
    }
}
