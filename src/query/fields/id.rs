//! The `id` field

use chrono::NaiveDate;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::text::{text_filter, text_filter_regex};
use crate::domain::Task;
use crate::query::explanation::Explanation;
use crate::query::field::{compare_text, instruction_regex, Field};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::grouper::GroupFunction;
use crate::query::sorter::Comparator;
use crate::query::SearchInfo;

static PRESENCE_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^(has|no) id$"));
static TEXT_RE: LazyLock<Regex> = LazyLock::new(|| text_filter_regex("id"));

/// `has id`, `no id` and the text grammar over the id
pub struct IdField;

impl Field for IdField {
    fn field_name(&self) -> &'static str {
        "id"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        PRESENCE_RE.is_match(line) || TEXT_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        if let Some(caps) = PRESENCE_RE.captures(line) {
            let wanted = caps[1].eq_ignore_ascii_case("has");
            return FilterOrErrorMessage::from_filter(Filter::from_predicate(
                line,
                move |task, _| wanted != task.id.is_empty(),
                Explanation::new(line),
            ));
        }
        text_filter("id", &TEXT_RE, line, |task| task.id.clone())
    }

    fn comparator(&self) -> Option<Comparator> {
        Some(Arc::new(|a: &Task, b: &Task, _: &SearchInfo<'_>| {
            // tasks without an id last
            a.id.is_empty()
                .cmp(&b.id.is_empty())
                .then_with(|| compare_text(&a.id, &b.id))
        }))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        Some(Arc::new(|task: &Task, _: &SearchInfo<'_>| {
            if task.id.is_empty() {
                vec!["No id".to_string()]
            } else {
                vec![task.id.clone()]
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_filters() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let with_id = Task {
            id: "abc123".to_string(),
            ..Task::new("a")
        };
        let without = Task::new("b");
        let tasks = vec![with_id.clone(), without.clone()];
        let info = SearchInfo::new(&tasks, None, today);

        let has = IdField.create_filter_or_error_message("has id", today);
        let has = has.filter().unwrap();
        assert_eq!(has.matches(&with_id, &info), Ok(true));
        assert_eq!(has.matches(&without, &info), Ok(false));

        let includes = IdField.create_filter_or_error_message("id includes 123", today);
        assert_eq!(includes.filter().unwrap().matches(&with_id, &info), Ok(true));
    }
}
