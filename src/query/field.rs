//! The field interface and the keyword lookup table
//!
//! Every recognised attribute implements [`Field`]. An instruction is
//! offered to each field in table order; the first field that claims it
//! compiles it. `status.name` and `status.type` come before `status`, and
//! the boolean combinator comes last because it accepts any bracketed text.

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use std::sync::LazyLock;

use super::fields::{
    BlockingField, BooleanField, DateField, DurationField, FunctionField, IdField, PriorityField, RecurringField,
    StatusField, StatusTypeField, TagsField, TextField, UrgencyField,
};
use super::filter::FilterOrErrorMessage;
use super::grouper::{GroupFunction, Grouper};
use super::sorter::{Comparator, Sorter};

/// A task attribute that instructions can filter, sort or group by
pub trait Field: Send + Sync {
    /// Keyword naming the field, e.g. `due` or `status.name`
    fn field_name(&self) -> &'static str;

    /// Cheap check of whether this field owns a filter instruction
    fn can_create_filter_for_line(&self, line: &str) -> bool;

    /// Compiles a filter instruction this field owns.
    ///
    /// Relative dates in the instruction are resolved against `today`.
    fn create_filter_or_error_message(&self, line: &str, today: NaiveDate) -> FilterOrErrorMessage;

    /// Ascending order for `sort by <field>`, if the field sorts
    fn comparator(&self) -> Option<Comparator> {
        None
    }

    /// Heading names for `group by <field>`, if the field groups
    fn group_function(&self) -> Option<GroupFunction> {
        None
    }

    /// Whether `group by <field>` lists headings in descending order
    fn groups_descending(&self) -> bool {
        false
    }

    /// `None` if the line is not a sort instruction for this field
    fn create_sorter_from_line(&self, line: &str) -> Option<Result<Sorter, String>> {
        let reverse = match_keyword_line("sort by", self.field_name(), line)?;
        let comparator = self.comparator()?;
        Some(Ok(Sorter::new(line, self.field_name(), comparator, reverse)))
    }

    fn create_normal_sorter(&self) -> Option<Sorter> {
        let instruction = format!("sort by {}", self.field_name());
        self.comparator()
            .map(|comparator| Sorter::new(&instruction, self.field_name(), comparator, false))
    }

    fn create_reverse_sorter(&self) -> Option<Sorter> {
        let instruction = format!("sort by {} reverse", self.field_name());
        self.comparator()
            .map(|comparator| Sorter::new(&instruction, self.field_name(), comparator, true))
    }

    /// `None` if the line is not a group instruction for this field
    fn create_grouper_from_line(&self, line: &str) -> Option<Result<Grouper, String>> {
        let reverse = match_keyword_line("group by", self.field_name(), line)?;
        let function = self.group_function()?;
        Some(Ok(Grouper::new(
            line,
            self.field_name(),
            function,
            reverse != self.groups_descending(),
        )))
    }

    fn create_normal_grouper(&self) -> Option<Grouper> {
        let instruction = format!("group by {}", self.field_name());
        self.group_function()
            .map(|function| Grouper::new(&instruction, self.field_name(), function, self.groups_descending()))
    }
}

/// Matches `<prefix> <name>` with an optional trailing `reverse`.
///
/// Returns whether `reverse` was present, or `None` for another line.
pub fn match_keyword_line(prefix: &str, name: &str, line: &str) -> Option<bool> {
    let lower = line.trim().to_lowercase();
    let rest = lower.strip_prefix(prefix)?.strip_prefix(' ')?.trim_start();
    let rest = rest.strip_prefix(name)?;
    match rest.trim() {
        "" => Some(false),
        "reverse" => Some(true),
        _ => None,
    }
}

/// Builds a case-insensitive regex from a compile-time pattern
pub(crate) fn instruction_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid regex")
}

/// Compares text case-insensitively, with runs of digits compared as numbers
pub fn compare_text(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().flat_map(char::to_lowercase).peekable();
    let mut b = b.chars().flat_map(char::to_lowercase).peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let take_number = |chars: &mut std::iter::Peekable<_>| -> String {
                    let mut digits = String::new();
                    while let Some(c) = chars.next_if(|c: &char| c.is_ascii_digit()) {
                        digits.push(c);
                    }
                    digits
                };
                let x = take_number(&mut a);
                let y = take_number(&mut b);
                let x = x.trim_start_matches('0');
                let y = y.trim_start_matches('0');
                let ordering = x.len().cmp(&y.len()).then_with(|| x.cmp(y));
                if ordering.is_ne() {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

/// A `/pattern/flags` literal from an instruction
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    pattern: String,
    flags: String,
}

static REGEX_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(.+)/([a-z]*)$").expect("valid regex"));

impl RegexMatcher {
    /// Parses `/pattern/flags`; slashes inside the pattern need no escaping
    pub fn parse(text: &str) -> Option<Self> {
        let caps = REGEX_LITERAL_RE.captures(text.trim())?;
        let pattern = caps[1].to_string();
        let flags = caps[2].to_string();

        let mut builder = RegexBuilder::new(&pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'g' | 'u' => &mut builder,
                _ => return None,
            };
        }
        let regex = builder.build().ok()?;
        Some(Self { regex, pattern, flags })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// e.g. `using regex: 'a|b' with flag 'i'`
    pub fn explanation(&self) -> String {
        let mut result = format!("using regex: '{}'", self.pattern);
        match self.flags.len() {
            0 => {}
            1 => result.push_str(&format!(" with flag '{}'", self.flags)),
            _ => result.push_str(&format!(" with flags '{}'", self.flags)),
        }
        result
    }
}

/// Returns true if `haystack` contains `needle`, ignoring case
pub fn includes_ignoring_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

static FIELDS: LazyLock<Vec<Box<dyn Field>>> = LazyLock::new(all_fields);

fn all_fields() -> Vec<Box<dyn Field>> {
    vec![
        Box::new(TextField::status_name()),
        Box::new(StatusTypeField),
        Box::new(StatusField),
        Box::new(RecurringField),
        Box::new(PriorityField),
        Box::new(DateField::happens()),
        Box::new(DateField::cancelled()),
        Box::new(DateField::created()),
        Box::new(DateField::start()),
        Box::new(DateField::scheduled()),
        Box::new(DateField::due()),
        Box::new(DateField::done()),
        Box::new(TextField::path()),
        Box::new(TextField::folder()),
        Box::new(TextField::root()),
        Box::new(TextField::description()),
        Box::new(TagsField),
        Box::new(TextField::heading()),
        Box::new(TextField::filename()),
        Box::new(UrgencyField),
        Box::new(TextField::recurrence()),
        Box::new(DurationField),
        Box::new(FunctionField),
        Box::new(IdField),
        Box::new(BlockingField),
        Box::new(BooleanField),
    ]
}

/// All fields, in the order instructions are offered to them
pub fn fields() -> &'static [Box<dyn Field>] {
    &FIELDS
}

/// Looks up a field by its keyword
pub fn field_by_name(name: &str) -> Option<&'static dyn Field> {
    fields().iter().find(|f| f.field_name() == name).map(|f| f.as_ref())
}

/// Compiles a filter instruction, or `None` if no field claims it
pub fn parse_filter(line: &str, today: NaiveDate) -> Option<FilterOrErrorMessage> {
    fields()
        .iter()
        .find(|field| field.can_create_filter_for_line(line))
        .map(|field| field.create_filter_or_error_message(line, today))
}

/// Compiles a `sort by` instruction, or `None` if no field claims it
pub fn parse_sorter(line: &str) -> Option<Result<Sorter, String>> {
    if !line.trim().to_lowercase().starts_with("sort by ") {
        return None;
    }
    fields().iter().find_map(|field| field.create_sorter_from_line(line))
}

/// Compiles a `group by` instruction, or `None` if no field claims it
pub fn parse_grouper(line: &str) -> Option<Result<Grouper, String>> {
    if !line.trim().to_lowercase().starts_with("group by ") {
        return None;
    }
    fields().iter().find_map(|field| field.create_grouper_from_line(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lines() {
        assert_eq!(match_keyword_line("sort by", "due", "sort by due"), Some(false));
        assert_eq!(match_keyword_line("sort by", "due", "Sort By Due Reverse"), Some(true));
        assert_eq!(match_keyword_line("sort by", "due", "sort by duration"), None);
        assert_eq!(match_keyword_line("group by", "due", "sort by due"), None);
    }

    #[test]
    fn natural_text_order() {
        assert_eq!(compare_text("file 2", "File 10"), Ordering::Less);
        assert_eq!(compare_text("abc", "ABC"), Ordering::Equal);
        assert_eq!(compare_text("a", "ab"), Ordering::Less);
        assert_eq!(compare_text("%%1%%High", "%%3%%Normal"), Ordering::Less);
    }

    #[test]
    fn regex_literals() {
        let matcher = RegexMatcher::parse("/a/b|c/i").unwrap();
        assert!(matcher.is_match("xA/Bx"));
        assert!(matcher.is_match("C"));
        assert_eq!(matcher.explanation(), "using regex: 'a/b|c' with flag 'i'");

        assert!(RegexMatcher::parse("no slashes").is_none());
        assert!(RegexMatcher::parse("/(unclosed/").is_none());
        assert!(RegexMatcher::parse("/x/q").is_none());
    }

    #[test]
    fn table_order_puts_boolean_last() {
        let names: Vec<&str> = fields().iter().map(|f| f.field_name()).collect();
        assert_eq!(names.first(), Some(&"status.name"));
        assert_eq!(names.last(), Some(&"boolean"));
        assert!(field_by_name("due").is_some());
    }

    #[test]
    fn unknown_lines_are_unclaimed() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert!(parse_filter("frobnicate the widgets", today).is_none());
        assert!(parse_sorter("sort by nonsense").is_none());
        assert!(parse_grouper("not a grouping").is_none());
    }
}
