//! `filter by function`, `sort by function` and `group by function`
//!
//! The expression is parsed once, when the instruction is read. A parse
//! failure is the instruction's error. Runtime failures are per task.

use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};

use crate::domain::{Task, TaskDate};
use crate::query::explanation::Explanation;
use crate::query::field::{compare_text, instruction_regex, Field};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::grouper::Grouper;
use crate::query::sorter::Sorter;
use crate::query::SearchInfo;
use crate::scripting::{ExpressionError, TaskExpression, Value};

static FILTER_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^filter by function (.*)"));
static SORT_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^sort by function( reverse)? (.*)"));
static GROUP_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^group by function( reverse)? (.*)"));

pub struct FunctionField;

/// Sort key of one evaluated expression: numbers, then text, then nothing
#[derive(Debug, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
    Missing,
}

impl SortKey {
    fn of(value: Result<Value<'_>, ExpressionError>) -> Self {
        match value {
            Err(_) => SortKey::Missing,
            Ok(value) => match value {
                Value::Undefined | Value::Null => SortKey::Missing,
                Value::Bool(b) => SortKey::Number(f64::from(u8::from(b))),
                Value::Number(n) => SortKey::Number(n),
                Value::Date(view) => match view.date.and_then(TaskDate::valid) {
                    Some(date) => SortKey::Number(date_millis(date)),
                    None => SortKey::Missing,
                },
                Value::String(s) => SortKey::Text(s),
                other => SortKey::Text(other.to_string()),
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Text(_) => 1,
            SortKey::Missing => 2,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => compare_text(a, b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn date_millis(date: NaiveDate) -> f64 {
    date.and_hms_opt(0, 0, 0)
        .map_or(f64::NAN, |dt| dt.and_utc().timestamp_millis() as f64)
}

/// Converts a group expression's result into heading names
fn group_names(expression: &TaskExpression, task: &Task, info: &SearchInfo<'_>) -> Vec<String> {
    match expression.evaluate(task, info) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_nullish())
            .map(Value::to_string)
            .collect(),
        Ok(value) if value.is_nullish() => Vec::new(),
        Ok(value) => vec![value.to_string()],
        Err(ExpressionError::Evaluate { message, .. }) => vec![format!(
            "Error: Failed calculating expression \"{}\". The error message was: {}",
            expression.line(),
            message
        )],
        Err(other) => vec![other.to_string()],
    }
}

impl Field for FunctionField {
    fn field_name(&self) -> &'static str {
        "function"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        FILTER_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        let Some(caps) = FILTER_RE.captures(line) else {
            return FilterOrErrorMessage::from_error(line, "do not understand query filter (function)");
        };
        let expression = Arc::new(TaskExpression::new(&caps[1]));
        if let Some(error) = expression.parse_error() {
            return FilterOrErrorMessage::from_error(line, error);
        }

        let function = Arc::new(move |task: &Task, info: &SearchInfo<'_>| -> Result<bool, String> {
            match expression.evaluate(task, info).map_err(|e| e.to_string())? {
                Value::Bool(b) => Ok(b),
                other => Err(format!(
                    "filtering function must return true or false. This returned \"{}\".",
                    other
                )),
            }
        });
        FilterOrErrorMessage::from_filter(Filter::new(line, function, Explanation::new(line)))
    }

    fn create_sorter_from_line(&self, line: &str) -> Option<Result<Sorter, String>> {
        let caps = SORT_RE.captures(line.trim())?;
        let reverse = caps.get(1).is_some();
        let expression = Arc::new(TaskExpression::new(&caps[2]));
        if let Some(error) = expression.parse_error() {
            return Some(Err(error));
        }
        let comparator = Arc::new(move |a: &Task, b: &Task, info: &SearchInfo<'_>| {
            let key_a = SortKey::of(expression.evaluate(a, info));
            let key_b = SortKey::of(expression.evaluate(b, info));
            key_a.compare(&key_b)
        });
        Some(Ok(Sorter::new(line, "function", comparator, reverse)))
    }

    fn create_grouper_from_line(&self, line: &str) -> Option<Result<Grouper, String>> {
        let caps = GROUP_RE.captures(line.trim())?;
        let reverse = caps.get(1).is_some();
        let expression = Arc::new(TaskExpression::new(&caps[2]));
        if let Some(error) = expression.parse_error() {
            return Some(Err(error));
        }
        let function = Arc::new(move |task: &Task, info: &SearchInfo<'_>| group_names(&expression, task, info));
        Some(Ok(Grouper::new(line, "function", function, reverse)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn make_task(description: &str, tags: &[&str]) -> Task {
        Task {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Task::new(description)
        }
    }

    #[test]
    fn filter_by_tag_count() {
        let tasks = vec![make_task("two", &["#a", "#b"]), make_task("none", &[])];
        let info = SearchInfo::new(&tasks, None, today());
        let filter = FunctionField.create_filter_or_error_message("filter by function task.tags.length > 1", today());
        let filter = filter.filter().unwrap();
        assert_eq!(filter.matches(&tasks[0], &info), Ok(true));
        assert_eq!(filter.matches(&tasks[1], &info), Ok(false));
    }

    #[test]
    fn filter_must_return_boolean() {
        let tasks = vec![make_task("x", &[])];
        let info = SearchInfo::new(&tasks, None, today());
        let filter = FunctionField.create_filter_or_error_message("filter by function task.description", today());
        assert_eq!(
            filter.filter().unwrap().matches(&tasks[0], &info),
            Err("filtering function must return true or false. This returned \"x\".".to_string())
        );
    }

    #[test]
    fn parse_errors_surface_up_front() {
        let filter = FunctionField.create_filter_or_error_message("filter by function task.due.", today());
        assert!(filter.error().unwrap().starts_with("Error: Failed parsing expression"));
        assert!(FunctionField.create_sorter_from_line("sort by function )").unwrap().is_err());
        assert!(FunctionField.create_sorter_from_line("sort by due").is_none());
    }

    #[test]
    fn sort_keys_order_numbers_text_missing() {
        assert_eq!(SortKey::Number(5.0).compare(&SortKey::Text("a".into())), Ordering::Less);
        assert_eq!(SortKey::Text("z".into()).compare(&SortKey::Missing), Ordering::Less);
        assert_eq!(SortKey::Number(2.0).compare(&SortKey::Number(10.0)), Ordering::Less);
        assert_eq!(SortKey::of(Ok(Value::Bool(true))), SortKey::Number(1.0));
    }

    #[test]
    fn sort_by_description_length_reverse() {
        let tasks = vec![make_task("short", &[]), make_task("much longer", &[])];
        let info = SearchInfo::new(&tasks, None, today());
        let sorter = FunctionField
            .create_sorter_from_line("sort by function reverse task.description.length")
            .unwrap()
            .unwrap();
        assert!(sorter.is_reversed());
        assert_eq!(sorter.compare(&tasks[0], &tasks[1], &info), Ordering::Greater);
    }

    #[test]
    fn group_names_from_arrays_and_errors() {
        let tasks = vec![make_task("x", &["#a", "#b"])];
        let info = SearchInfo::new(&tasks, None, today());

        let grouper = FunctionField.create_grouper_from_line("group by function task.tags").unwrap().unwrap();
        assert_eq!(grouper.group_names(&tasks[0], &info), vec!["#a", "#b"]);

        let grouper = FunctionField.create_grouper_from_line("group by function null").unwrap().unwrap();
        assert!(grouper.group_names(&tasks[0], &info).is_empty());

        let grouper = FunctionField.create_grouper_from_line("group by function wibble").unwrap().unwrap();
        assert_eq!(
            grouper.group_names(&tasks[0], &info),
            vec!["Error: Failed calculating expression \"wibble\". The error message was: ReferenceError: wibble is not defined"]
        );
    }
}
