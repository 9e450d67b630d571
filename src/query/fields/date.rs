//! The seven date fields: happens, cancelled, created, start, scheduled,
//! due and done
//!
//! Relative dates in an instruction are resolved once, when the filter is
//! compiled. A task with an invalid date never matches a date comparison.

use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::domain::{compare_dates, format_heading, format_long, parse_date_range, DateRange, Task, TaskDate};
use crate::query::explanation::Explanation;
use crate::query::field::{instruction_regex, Field};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::grouper::GroupFunction;
use crate::query::sorter::Comparator;
use crate::query::SearchInfo;

type DateAccessor = for<'t> fn(&'t Task) -> Option<&'t TaskDate>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    On,
    Before,
    After,
    OnOrBefore,
    OnOrAfter,
}

impl Comparison {
    fn parse(keyword: Option<&str>) -> Self {
        match keyword.map(str::to_lowercase).as_deref() {
            Some("before") => Comparison::Before,
            Some("after") => Comparison::After,
            Some("on or before") | Some("in or before") => Comparison::OnOrBefore,
            Some("on or after") | Some("in or after") => Comparison::OnOrAfter,
            _ => Comparison::On,
        }
    }

    fn matches(&self, date: NaiveDate, range: &DateRange) -> bool {
        match self {
            Comparison::On => range.contains(date),
            Comparison::Before => date < range.start,
            Comparison::After => date > range.end,
            Comparison::OnOrBefore => date <= range.end,
            Comparison::OnOrAfter => date >= range.start,
        }
    }

    fn explain(&self, subject: &str, range: &DateRange) -> String {
        match self {
            Comparison::On if range.is_single_day() => format!("{} is on {}", subject, format_long(range.start)),
            Comparison::On => format!(
                "{} is between:\n  {} and\n  {} inclusive",
                subject,
                format_long(range.start),
                format_long(range.end)
            ),
            Comparison::Before => format!("{} is before {}", subject, format_long(range.start)),
            Comparison::After => format!("{} is after {}", subject, format_long(range.end)),
            Comparison::OnOrBefore => format!("{} is on or before {}", subject, format_long(range.end)),
            Comparison::OnOrAfter => format!("{} is on or after {}", subject, format_long(range.start)),
        }
    }
}

/// A date attribute of a task
pub struct DateField {
    name: &'static str,
    subject: &'static str,
    value: DateAccessor,
    /// `start` treats a missing date as "already started"
    absent_matches: bool,
    absent_sorts_first: bool,
    presence_re: Regex,
    invalid_re: Regex,
    comparison_re: Regex,
}

impl DateField {
    fn new(name: &'static str, subject: &'static str, value: DateAccessor) -> Self {
        let escaped = regex::escape(name);
        Self {
            name,
            subject,
            value,
            absent_matches: false,
            absent_sorts_first: false,
            presence_re: instruction_regex(&format!(r"^(has|no) {} date$", escaped)),
            invalid_re: instruction_regex(&format!(r"^{} date is invalid$", escaped)),
            comparison_re: instruction_regex(&format!(
                r"^{}(?: date)?(?: (on or before|on or after|in or before|in or after|before|after|on|in))?(?: (.*))?$",
                escaped
            )),
        }
    }

    pub fn happens() -> Self {
        Self::new("happens", "due, start or scheduled date", |task| task.happens())
    }

    pub fn cancelled() -> Self {
        Self::new("cancelled", "cancelled date", |task| task.cancelled.as_ref())
    }

    pub fn created() -> Self {
        Self::new("created", "created date", |task| task.created.as_ref())
    }

    pub fn start() -> Self {
        Self {
            absent_matches: true,
            absent_sorts_first: true,
            ..Self::new("start", "start date", |task| task.start.as_ref())
        }
    }

    pub fn scheduled() -> Self {
        Self::new("scheduled", "scheduled date", |task| task.scheduled.as_ref())
    }

    pub fn due() -> Self {
        Self::new("due", "due date", |task| task.due.as_ref())
    }

    pub fn done() -> Self {
        Self::new("done", "done date", |task| task.done.as_ref())
    }

    fn error(&self, line: &str, message: String) -> FilterOrErrorMessage {
        FilterOrErrorMessage::from_error(line, message)
    }

    /// Resolves the text after the keyword, retrying `in N days` as a date
    /// when `in` was taken as the operator
    fn parse_comparison(
        &self,
        keyword: Option<&str>,
        text: &str,
        today: NaiveDate,
    ) -> Option<(Comparison, DateRange)> {
        if let Some(range) = parse_date_range(text, today) {
            return Some((Comparison::parse(keyword), range));
        }
        if keyword.is_some_and(|k| k.eq_ignore_ascii_case("in")) {
            return parse_date_range(&format!("in {}", text), today).map(|range| (Comparison::On, range));
        }
        None
    }
}

impl Field for DateField {
    fn field_name(&self) -> &'static str {
        self.name
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        self.presence_re.is_match(line) || self.comparison_re.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, today: NaiveDate) -> FilterOrErrorMessage {
        let value = self.value;

        if let Some(caps) = self.presence_re.captures(line) {
            let wanted = caps[1].eq_ignore_ascii_case("has");
            return FilterOrErrorMessage::from_filter(Filter::from_predicate(
                line,
                move |task, _| wanted == value(task).is_some(),
                Explanation::new(line),
            ));
        }

        if self.invalid_re.is_match(line) {
            return FilterOrErrorMessage::from_filter(Filter::from_predicate(
                line,
                move |task, _| value(task).is_some_and(|date| !date.is_valid()),
                Explanation::new(line),
            ));
        }

        let Some(caps) = self.comparison_re.captures(line) else {
            return self.error(line, format!("do not understand query filter ({} date)", self.name));
        };
        let keyword = caps.get(1).map(|m| m.as_str());
        let text = caps.get(2).map_or("", |m| m.as_str());
        let Some((comparison, range)) = self.parse_comparison(keyword, text, today) else {
            return self.error(line, format!("do not understand {} date", self.name));
        };

        let mut explanation = comparison.explain(self.subject, &range);
        if self.absent_matches {
            explanation.push_str(&format!(" OR no {}", self.subject));
        }
        let absent_matches = self.absent_matches;
        FilterOrErrorMessage::from_filter(Filter::from_predicate(
            line,
            move |task, _| match value(task) {
                None => absent_matches,
                Some(date) => date.valid().is_some_and(|d| comparison.matches(d, &range)),
            },
            Explanation::new(explanation),
        ))
    }

    fn comparator(&self) -> Option<Comparator> {
        let value = self.value;
        let absent_first = self.absent_sorts_first;
        Some(Arc::new(move |a: &Task, b: &Task, _: &SearchInfo<'_>| {
            match (value(a), value(b), absent_first) {
                (None, Some(_), true) => Ordering::Less,
                (Some(_), None, true) => Ordering::Greater,
                (a, b, _) => compare_dates(a, b),
            }
        }))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        let value = self.value;
        let name = self.name;
        Some(Arc::new(move |task: &Task, _: &SearchInfo<'_>| {
            let heading = match value(task) {
                None => format!("No {} date", name),
                Some(TaskDate::Valid(date)) => format_heading(*date),
                Some(TaskDate::Invalid(_)) => format!("%%0%% Invalid {} date", name),
            };
            vec![heading]
        }))
    }
}
