//! Moment-style date format strings for scripted date output
//!
//! Supports the tokens people use in `task.due.format(...)`: years,
//! quarters, months, days, weekdays, ISO weeks, and the (always zero) time
//! of day. Text inside `[...]` is copied literally.

use chrono::{Datelike, NaiveDate};

const TOKENS: &[&str] = &[
    "YYYY", "GGGG", "MMMM", "dddd", "DDDD", "MMM", "ddd", "DDD", "YY", "MM", "Do", "DD", "dd", "WW", "ww", "HH",
    "hh", "mm", "ss", "Q", "M", "D", "d", "E", "W", "w", "H", "h", "m", "s", "A", "a",
];

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

fn render(date: NaiveDate, token: &str) -> String {
    match token {
        "YYYY" => format!("{:04}", date.year()),
        "GGGG" => format!("{:04}", date.iso_week().year()),
        "YY" => format!("{:02}", date.year().rem_euclid(100)),
        "Q" => ((date.month0() / 3) + 1).to_string(),
        "MMMM" => date.format("%B").to_string(),
        "MMM" => date.format("%b").to_string(),
        "MM" => format!("{:02}", date.month()),
        "M" => date.month().to_string(),
        "DDDD" => format!("{:03}", date.ordinal()),
        "DDD" => date.ordinal().to_string(),
        "Do" => ordinal(date.day()),
        "DD" => format!("{:02}", date.day()),
        "D" => date.day().to_string(),
        "dddd" => date.format("%A").to_string(),
        "ddd" => date.format("%a").to_string(),
        "dd" => date.format("%a").to_string().chars().take(2).collect(),
        "d" => date.weekday().num_days_from_sunday().to_string(),
        "E" => date.weekday().number_from_monday().to_string(),
        "WW" | "ww" => format!("{:02}", date.iso_week().week()),
        "W" | "w" => date.iso_week().week().to_string(),
        "HH" | "mm" | "ss" => "00".to_string(),
        "H" | "m" | "s" => "0".to_string(),
        "hh" => "12".to_string(),
        "h" => "12".to_string(),
        "A" => "AM".to_string(),
        "a" => "am".to_string(),
        other => other.to_string(),
    }
}

/// Formats `date` with a moment-style pattern
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    let mut out = String::new();
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            match after.find(']') {
                Some(end) => {
                    out.push_str(&after[..end]);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(after);
                    rest = "";
                }
            }
            continue;
        }
        if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str(&render(date, token));
            rest = &rest[token.len()..];
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}
