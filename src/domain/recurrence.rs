//! Recurrence rules
//!
//! A rule such as `every 2 weeks` or `every month on the last when done`
//! decides the reference date of a task's next occurrence. The other
//! dates of the task keep their distance from the reference date.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use super::date::shift_months;

static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z0-9, !]+?)( when done)?$").expect("valid regex"));

static INTERVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^every(?: (\d+))? (day|days|week|weeks|month|months|year|years)(?: on (.+))?$").expect("valid regex")
});

static MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:the )?(?:(\d{1,2})(?:st|nd|rd|th)?|(last))$").expect("valid regex"));

#[derive(Debug, Error, PartialEq)]
pub enum RecurrenceError {
    #[error("Cannot parse recurrence rule: {0}")]
    Unparsable(String),

    #[error("Recurrence interval must be at least 1: {0}")]
    ZeroInterval(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Which day of the month a monthly rule lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthDay {
    Day(u32),
    Last,
}

/// Parsed form of a rule, without the `when done` suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub weekdays: Vec<Weekday>,
    pub month_day: Option<MonthDay>,
}

impl RecurrenceRule {
    fn parse(text: &str) -> Result<Self, RecurrenceError> {
        let lower = text.trim().to_lowercase();
        let unparsable = || RecurrenceError::Unparsable(text.to_string());

        if lower == "every weekday" {
            return Ok(Self::weekly_on(vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]));
        }

        if let Some(caps) = INTERVAL_RE.captures(&lower) {
            let interval = match caps.get(1) {
                Some(n) => n.as_str().parse::<u32>().map_err(|_| unparsable())?,
                None => 1,
            };
            if interval == 0 {
                return Err(RecurrenceError::ZeroInterval(text.to_string()));
            }
            let frequency = match &caps[2] {
                "day" | "days" => Frequency::Daily,
                "week" | "weeks" => Frequency::Weekly,
                "month" | "months" => Frequency::Monthly,
                _ => Frequency::Yearly,
            };
            let mut rule = Self {
                frequency,
                interval,
                weekdays: Vec::new(),
                month_day: None,
            };
            if let Some(on) = caps.get(3) {
                match frequency {
                    Frequency::Weekly => rule.weekdays = parse_weekdays(on.as_str()).ok_or_else(unparsable)?,
                    Frequency::Monthly => rule.month_day = Some(parse_month_day(on.as_str()).ok_or_else(unparsable)?),
                    _ => return Err(unparsable()),
                }
            }
            return Ok(rule);
        }

        // every monday, thursday
        let days = lower.strip_prefix("every ").ok_or_else(unparsable)?;
        let weekdays = parse_weekdays(days).ok_or_else(unparsable)?;
        Ok(Self::weekly_on(weekdays))
    }

    fn weekly_on(weekdays: Vec<Weekday>) -> Self {
        Self {
            frequency: Frequency::Weekly,
            interval: 1,
            weekdays,
            month_day: None,
        }
    }

    /// The first date strictly after `after` that satisfies the rule,
    /// counting intervals from `anchor`
    pub fn next_after(&self, anchor: NaiveDate, after: NaiveDate) -> Option<NaiveDate> {
        match self.frequency {
            Frequency::Daily => after.checked_add_signed(ChronoDuration::days(self.interval as i64)),
            Frequency::Weekly if self.weekdays.is_empty() => {
                after.checked_add_signed(ChronoDuration::weeks(self.interval as i64))
            }
            Frequency::Weekly => self.next_weekday(anchor, after),
            Frequency::Monthly => match self.month_day {
                None => shift_months(after, self.interval as i32),
                Some(day) => self.next_month_day(after, day),
            },
            Frequency::Yearly => shift_months(after, 12 * self.interval as i32),
        }
    }

    fn next_weekday(&self, anchor: NaiveDate, after: NaiveDate) -> Option<NaiveDate> {
        let anchor_week = week_start(anchor);
        let mut candidate = after.succ_opt()?;
        for _ in 0..(7 * self.interval + 7) {
            let weeks_apart = (week_start(candidate) - anchor_week).num_weeks();
            if self.weekdays.contains(&candidate.weekday()) && weeks_apart % self.interval as i64 == 0 {
                return Some(candidate);
            }
            candidate = candidate.succ_opt()?;
        }
        None
    }

    fn next_month_day(&self, after: NaiveDate, day: MonthDay) -> Option<NaiveDate> {
        let first_of_month = after.with_day(1)?;
        // The current month still counts if its target day is ahead
        for step in 0..=(24 * self.interval) {
            if step != 0 && step % self.interval != 0 {
                continue;
            }
            let month = shift_months(first_of_month, step as i32)?;
            let target = match day {
                MonthDay::Last => shift_months(month, 1)?.pred_opt(),
                MonthDay::Day(d) => month.with_day(d),
            };
            if let Some(target) = target {
                if target > after {
                    return Some(target);
                }
            }
        }
        None
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - ChronoDuration::days(date.weekday().num_days_from_monday() as i64)
}

fn parse_weekdays(text: &str) -> Option<Vec<Weekday>> {
    let mut days = Vec::new();
    for part in text.split(|c| c == ',' || c == ' ').filter(|p| !p.is_empty() && *p != "and") {
        let day = part.parse::<Weekday>().ok()?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    if days.is_empty() {
        None
    } else {
        Some(days)
    }
}

fn parse_month_day(text: &str) -> Option<MonthDay> {
    let caps = MONTH_DAY_RE.captures(text.trim())?;
    if caps.get(2).is_some() {
        return Some(MonthDay::Last);
    }
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    (1..=31).contains(&day).then_some(MonthDay::Day(day))
}

/// The start, scheduled and due dates of one occurrence of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Occurrence {
    pub start: Option<NaiveDate>,
    pub scheduled: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
}

impl Occurrence {
    /// Due date, else scheduled date, else start date
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.due.or(self.scheduled).or(self.start)
    }

    /// Moves every date so it keeps its offset from the reference date
    fn shifted_to(&self, next_reference: NaiveDate) -> Occurrence {
        let Some(reference) = self.reference_date() else {
            return Occurrence::default();
        };
        let shift = |date: Option<NaiveDate>| date.map(|d| next_reference + (d - reference));
        Occurrence {
            start: shift(self.start),
            scheduled: shift(self.scheduled),
            due: shift(self.due),
        }
    }
}

/// A recurrence rule as written on a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    text: String,
    rule: RecurrenceRule,
    base_on_today: bool,
}

impl Recurrence {
    pub fn parse(text: &str) -> Result<Self, RecurrenceError> {
        let trimmed = text.trim();
        let caps = RULE_RE
            .captures(trimmed)
            .ok_or_else(|| RecurrenceError::Unparsable(text.to_string()))?;
        let rule = RecurrenceRule::parse(&caps[1])?;
        Ok(Self {
            text: trimmed.to_string(),
            rule,
            base_on_today: caps.get(2).is_some(),
        })
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// Whether the next occurrence is calculated from the completion date
    pub fn base_on_today(&self) -> bool {
        self.base_on_today
    }

    /// The dates of the occurrence after `current`.
    ///
    /// Returns `None` when the rule yields no further date.
    pub fn next(&self, current: &Occurrence, today: NaiveDate) -> Option<Occurrence> {
        let next_reference = match (self.base_on_today, current.reference_date()) {
            (false, Some(reference)) => self.rule.next_after(reference, reference)?,
            (_, Some(_)) => self.rule.next_after(today, today)?,
            (_, None) => return Some(Occurrence::default()),
        };
        Some(current.shifted_to(next_reference))
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Recurrence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Recurrence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Recurrence::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn due(s: &str) -> Occurrence {
        Occurrence {
            due: Some(date(s)),
            ..Default::default()
        }
    }

    #[test]
    fn parses_common_rules() {
        assert!(Recurrence::parse("every day").is_ok());
        assert!(Recurrence::parse("every 3 weeks").is_ok());
        assert!(Recurrence::parse("every weekday").is_ok());
        assert!(Recurrence::parse("every monday, thursday").is_ok());
        assert!(Recurrence::parse("every month on the 15th").is_ok());
        assert!(Recurrence::parse("every month on the last when done").unwrap().base_on_today());
    }

    #[test]
    fn rejects_nonsense() {
        assert!(Recurrence::parse("sometimes").is_err());
        assert!(Recurrence::parse("every 0 days").is_err());
        assert!(Recurrence::parse("every fortnight").is_err());
    }

    #[test]
    fn daily_keeps_relative_dates() {
        let recurrence = Recurrence::parse("every day").unwrap();
        let current = Occurrence {
            start: Some(date("2024-01-08")),
            scheduled: None,
            due: Some(date("2024-01-10")),
        };
        let next = recurrence.next(&current, date("2024-01-20")).unwrap();
        assert_eq!(next.due, Some(date("2024-01-11")));
        assert_eq!(next.start, Some(date("2024-01-09")));
        assert_eq!(next.scheduled, None);
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        let recurrence = Recurrence::parse("every month").unwrap();
        let next = recurrence.next(&due("2024-01-31"), date("2024-01-31")).unwrap();
        assert_eq!(next.due, Some(date("2024-02-29")));
    }

    #[test]
    fn yearly_from_leap_day() {
        let recurrence = Recurrence::parse("every year").unwrap();
        let next = recurrence.next(&due("2024-02-29"), date("2024-02-29")).unwrap();
        assert_eq!(next.due, Some(date("2025-02-28")));
    }

    #[test]
    fn when_done_uses_completion_date() {
        let recurrence = Recurrence::parse("every 2 days when done").unwrap();
        let next = recurrence.next(&due("2024-01-01"), date("2024-01-10")).unwrap();
        assert_eq!(next.due, Some(date("2024-01-12")));
    }

    #[test]
    fn weekday_rule_skips_weekend() {
        // 2024-01-12 is a Friday
        let recurrence = Recurrence::parse("every weekday").unwrap();
        let next = recurrence.next(&due("2024-01-12"), date("2024-01-12")).unwrap();
        assert_eq!(next.due, Some(date("2024-01-15")));
    }

    #[test]
    fn month_day_rule() {
        let recurrence = Recurrence::parse("every month on the last").unwrap();
        let next = recurrence.next(&due("2024-01-31"), date("2024-01-31")).unwrap();
        assert_eq!(next.due, Some(date("2024-02-29")));

        let recurrence = Recurrence::parse("every month on the 15th").unwrap();
        let next = recurrence.next(&due("2024-01-10"), date("2024-01-10")).unwrap();
        assert_eq!(next.due, Some(date("2024-01-15")));
    }

    #[test]
    fn no_dates_gives_empty_occurrence() {
        let recurrence = Recurrence::parse("every week").unwrap();
        let next = recurrence.next(&Occurrence::default(), date("2024-01-10")).unwrap();
        assert_eq!(next, Occurrence::default());
    }
}
