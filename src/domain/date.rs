//! Task dates and the date vocabulary used in instructions
//!
//! Task dates are calendar days. A date string that fails to parse is
//! kept as [`TaskDate::Invalid`] so that `due date is invalid` can find it.
//! Relative words (`today`, `next week`) are always resolved against an
//! explicit `today`, never the system clock, so evaluation is repeatable.

use chrono::{Datelike, Duration as ChronoDuration, Months, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

/// Storage and display format for dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static RELATIVE_DAYS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:in (\d+) (day|days|week|weeks)|(\d+) (day|days|week|weeks) ago)$").expect("valid regex")
});

static PERIOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(last|this|next|current) (week|month|quarter|year)$").expect("valid regex"));

/// A date value read from a task, possibly unparsable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskDate {
    Valid(NaiveDate),
    Invalid(String),
}

impl TaskDate {
    pub fn parse(text: &str) -> Self {
        match NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
            Ok(date) => TaskDate::Valid(date),
            Err(_) => TaskDate::Invalid(text.to_string()),
        }
    }

    pub fn valid(&self) -> Option<NaiveDate> {
        match self {
            TaskDate::Valid(date) => Some(*date),
            TaskDate::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, TaskDate::Valid(_))
    }
}

impl From<NaiveDate> for TaskDate {
    fn from(date: NaiveDate) -> Self {
        TaskDate::Valid(date)
    }
}

impl fmt::Display for TaskDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskDate::Valid(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            TaskDate::Invalid(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for TaskDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(TaskDate::parse(&text))
    }
}

/// Orders optional task dates: invalid, then valid by date, then absent
pub fn compare_dates(a: Option<&TaskDate>, b: Option<&TaskDate>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.valid(), b.valid()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// An inclusive span of days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, swapping the ends if given backwards
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// Parses a single date: ISO, `today`, `tomorrow`, `yesterday`,
/// `in N days|weeks`, `N days|weeks ago`, or a weekday name for the
/// next such day after today
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim().to_lowercase();
    match text.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        "yesterday" => return today.pred_opt(),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(&text, DATE_FORMAT) {
        return Some(date);
    }

    if let Some(caps) = RELATIVE_DAYS_RE.captures(&text) {
        let (count, unit, sign) = match caps.get(1) {
            Some(n) => (n.as_str(), caps.get(2)?.as_str(), 1),
            None => (caps.get(3)?.as_str(), caps.get(4)?.as_str(), -1),
        };
        let count: i64 = count.parse().ok()?;
        let days = if unit.starts_with("week") { count * 7 } else { count };
        return today.checked_add_signed(ChronoDuration::days(sign * days));
    }

    let weekday = text.parse::<Weekday>().ok()?;
    let mut date = today.succ_opt()?;
    while date.weekday() != weekday {
        date = date.succ_opt()?;
    }
    Some(date)
}

/// Parses a date or a span of dates: two dates separated by a space,
/// `(last|this|next) (week|month|quarter|year)`, or anything [`parse_date`]
/// accepts as a one-day range
pub fn parse_date_range(text: &str, today: NaiveDate) -> Option<DateRange> {
    let text = text.trim().to_lowercase();

    if let Some(caps) = PERIOD_RE.captures(&text) {
        let offset = match &caps[1] {
            "last" => -1,
            "next" => 1,
            _ => 0,
        };
        return period_range(&caps[2], offset, today);
    }

    if let Some(date) = parse_date(&text, today) {
        return Some(DateRange::single(date));
    }

    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() == 2 {
        let start = NaiveDate::parse_from_str(parts[0], DATE_FORMAT).ok()?;
        let end = NaiveDate::parse_from_str(parts[1], DATE_FORMAT).ok()?;
        return Some(DateRange::new(start, end));
    }

    None
}

/// The calendar week, month, quarter or year containing `today`, shifted
/// by `offset` whole periods
pub fn period_range(period: &str, offset: i32, today: NaiveDate) -> Option<DateRange> {
    match period {
        "week" => {
            let monday = today - ChronoDuration::days(today.weekday().num_days_from_monday() as i64);
            let start = monday + ChronoDuration::weeks(offset as i64);
            Some(DateRange::new(start, start + ChronoDuration::days(6)))
        }
        "month" => month_span(today.with_day(1)?, offset, 1),
        "quarter" => {
            let first_month = (today.month0() / 3) * 3 + 1;
            month_span(NaiveDate::from_ymd_opt(today.year(), first_month, 1)?, offset * 3, 3)
        }
        "year" => {
            let year = today.year() + offset;
            Some(DateRange::new(
                NaiveDate::from_ymd_opt(year, 1, 1)?,
                NaiveDate::from_ymd_opt(year, 12, 31)?,
            ))
        }
        _ => None,
    }
}

fn month_span(first: NaiveDate, offset_months: i32, length: u32) -> Option<DateRange> {
    let start = shift_months(first, offset_months)?;
    let end = start.checked_add_months(Months::new(length))?.pred_opt()?;
    Some(DateRange::new(start, end))
}

/// Adds (or subtracts) whole months, clamping to the end of shorter months
pub fn shift_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Formats a date for explanations: `2024-01-02 (Tuesday 2nd January 2024)`
pub fn format_long(date: NaiveDate) -> String {
    format!(
        "{} ({} {}{} {})",
        date.format(DATE_FORMAT),
        date.format("%A"),
        date.day(),
        ordinal_suffix(date.day()),
        date.format("%B %Y")
    )
}

/// Formats a date as a group heading: `2024-01-02 Tuesday`
pub fn format_heading(date: NaiveDate) -> String {
    date.format("%Y-%m-%d %A").to_string()
}

/// Coarse position of a date relative to today
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCategory {
    pub name: String,
    pub sort_order: u64,
}

impl DateCategory {
    pub fn new(name: impl Into<String>, sort_order: u64) -> Self {
        Self {
            name: name.into(),
            sort_order,
        }
    }

    /// Overdue, Today, Future or Undated
    pub fn of(date: Option<NaiveDate>, today: NaiveDate) -> Self {
        match date {
            None => Self::new("Undated", 4),
            Some(d) if d < today => Self::new("Overdue", 1),
            Some(d) if d == today => Self::new("Today", 2),
            Some(_) => Self::new("Future", 3),
        }
    }

    /// Relative description such as `in 3 days` or `2 months ago`.
    ///
    /// Dates described by the same words share a sort order, so they
    /// group together. Past dates sort before future ones.
    pub fn from_now(date: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(date) = date else {
            return Self::new("", 0);
        };
        let days = (date - today).num_days();
        let earlier = days <= 0;
        let (count, unit) = relative_amount(days.unsigned_abs());

        let name = match (count, earlier) {
            (0, _) => "today".to_string(),
            (1, true) => format!("a {} ago", unit),
            (1, false) => format!("in a {}", unit),
            (n, true) => format!("{} {}s ago", n, unit),
            (n, false) => format!("in {} {}s", n, unit),
        };

        let span_days = match unit {
            "day" => count as i64,
            "month" => count as i64 * 30,
            _ => count as i64 * 365,
        };
        let anchor = if earlier {
            today - ChronoDuration::days(span_days)
        } else {
            today + ChronoDuration::days(span_days)
        };
        let prefix: u64 = if earlier { 1 } else { 3 };
        let stamp: u64 = anchor.format("%Y%m%d").to_string().parse().unwrap_or(0);
        Self::new(name, prefix * 100_000_000 + stamp)
    }

    /// Heading text with a hidden sort key, or empty for no name
    pub fn group_text(&self) -> String {
        if self.name.is_empty() {
            String::new()
        } else {
            format!("%%{}%% {}", self.sort_order, self.name)
        }
    }
}

fn relative_amount(days: u64) -> (u64, &'static str) {
    match days {
        0..=25 => (days, "day"),
        26..=45 => (1, "month"),
        46..=319 => (((days as f64) / 30.4).round() as u64, "month"),
        320..=547 => (1, "year"),
        _ => (((days as f64) / 365.0).round() as u64, "year"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn unparsable_task_date_is_invalid() {
        assert_eq!(TaskDate::parse("2024-02-30"), TaskDate::Invalid("2024-02-30".to_string()));
        assert!(TaskDate::parse("2024-02-29").is_valid());
    }

    #[test]
    fn compare_puts_invalid_first_and_absent_last() {
        let invalid = TaskDate::parse("nonsense");
        let valid = TaskDate::parse("2024-01-01");
        assert_eq!(compare_dates(Some(&invalid), Some(&valid)), Ordering::Less);
        assert_eq!(compare_dates(Some(&valid), None), Ordering::Less);
        assert_eq!(compare_dates(None, Some(&invalid)), Ordering::Greater);
    }

    #[test]
    fn parses_relative_words() {
        let today = date("2024-01-10");
        assert_eq!(parse_date("today", today), Some(today));
        assert_eq!(parse_date("Tomorrow", today), Some(date("2024-01-11")));
        assert_eq!(parse_date("in 2 weeks", today), Some(date("2024-01-24")));
        assert_eq!(parse_date("3 days ago", today), Some(date("2024-01-07")));
        assert_eq!(parse_date("friday", today), Some(date("2024-01-12")));
        assert_eq!(parse_date("someday", today), None);
    }

    #[test]
    fn parses_periods() {
        // 2024-01-10 is a Wednesday
        let today = date("2024-01-10");
        assert_eq!(
            parse_date_range("this week", today),
            Some(DateRange::new(date("2024-01-08"), date("2024-01-14")))
        );
        assert_eq!(
            parse_date_range("last month", today),
            Some(DateRange::new(date("2023-12-01"), date("2023-12-31")))
        );
        assert_eq!(
            parse_date_range("next quarter", today),
            Some(DateRange::new(date("2024-04-01"), date("2024-06-30")))
        );
        assert_eq!(
            parse_date_range("2024-03-05 2024-03-01", today),
            Some(DateRange::new(date("2024-03-01"), date("2024-03-05")))
        );
    }

    #[test]
    fn shift_months_clamps_to_month_end() {
        assert_eq!(shift_months(date("2024-01-31"), 1), Some(date("2024-02-29")));
        assert_eq!(shift_months(date("2024-03-31"), -1), Some(date("2024-02-29")));
    }

    #[test]
    fn long_format_uses_ordinals() {
        assert_eq!(format_long(date("2024-01-02")), "2024-01-02 (Tuesday 2nd January 2024)");
        assert_eq!(format_long(date("2024-01-11")), "2024-01-11 (Thursday 11th January 2024)");
        assert_eq!(format_long(date("2024-01-23")), "2024-01-23 (Tuesday 23rd January 2024)");
    }

    #[test]
    fn categories() {
        let today = date("2024-01-10");
        assert_eq!(DateCategory::of(Some(date("2024-01-09")), today).name, "Overdue");
        assert_eq!(DateCategory::of(Some(today), today).group_text(), "%%2%% Today");
        assert_eq!(DateCategory::of(None, today).sort_order, 4);
    }

    #[test]
    fn from_now_groups_by_words() {
        let today = date("2024-01-10");
        let a = DateCategory::from_now(Some(date("2024-01-13")), today);
        assert_eq!(a.name, "in 3 days");
        let b = DateCategory::from_now(Some(date("2023-11-10")), today);
        assert_eq!(b.name, "2 months ago");
        assert!(b.sort_order < a.sort_order);
        assert_eq!(DateCategory::from_now(None, today).group_text(), "");
    }
}
