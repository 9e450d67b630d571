//! The `tags` field
//!
//! `tag` and `tags` are interchangeable in filters. Text matches succeed if
//! any one tag matches; the negative forms succeed only if none does.

use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};

use crate::domain::Task;
use crate::query::explanation::Explanation;
use crate::query::field::{compare_text, includes_ignoring_case, instruction_regex, Field, RegexMatcher};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::grouper::GroupFunction;
use crate::query::sorter::{Comparator, Sorter};
use crate::query::SearchInfo;

static PRESENCE_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^(has|no) tags?$"));
static TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    instruction_regex(
        r"^tags? (includes|include|does not include|do not include|regex matches|regex does not match) (.*)",
    )
});
static CLAIM_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^tags? "));
static SORT_RE: LazyLock<Regex> = LazyLock::new(|| instruction_regex(r"^sort by tags?( reverse)?(?: (\d+))?$"));

/// Tags as filters, one heading per tag when grouping
pub struct TagsField;

/// Compares the `index`th tag (zero based); tasks lacking it sort last
fn tag_comparator(index: usize) -> Comparator {
    Arc::new(move |a: &Task, b: &Task, _: &SearchInfo<'_>| match (a.tags.get(index), b.tags.get(index)) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(x), Some(y)) => compare_text(x, y),
    })
}

impl Field for TagsField {
    fn field_name(&self) -> &'static str {
        "tags"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        PRESENCE_RE.is_match(line) || CLAIM_RE.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        if let Some(caps) = PRESENCE_RE.captures(line) {
            let wanted = caps[1].eq_ignore_ascii_case("has");
            return FilterOrErrorMessage::from_filter(Filter::from_predicate(
                line,
                move |task, _| wanted != task.tags.is_empty(),
                Explanation::new(line),
            ));
        }

        let Some(caps) = TEXT_RE.captures(line) else {
            return FilterOrErrorMessage::from_error(line, "do not understand query filter (tags)");
        };
        let method = caps[1].to_lowercase();
        let search = caps[2].to_string();
        let negate = method.contains("not");

        if method.starts_with("regex") {
            let Some(matcher) = RegexMatcher::parse(&search) else {
                return FilterOrErrorMessage::from_error(
                    line,
                    "cannot parse regex (tags); check your leading and trailing slashes for your query",
                );
            };
            let explanation = if negate {
                Explanation::new(line)
            } else {
                Explanation::new(matcher.explanation())
            };
            return FilterOrErrorMessage::from_filter(Filter::from_predicate(
                line,
                move |task, _| negate != task.tags.iter().any(|tag| matcher.is_match(tag)),
                explanation,
            ));
        }

        FilterOrErrorMessage::from_filter(Filter::from_predicate(
            line,
            move |task, _| negate != task.tags.iter().any(|tag| includes_ignoring_case(tag, &search)),
            Explanation::new(line),
        ))
    }

    fn comparator(&self) -> Option<Comparator> {
        Some(tag_comparator(0))
    }

    /// `sort by tag[s] [reverse] [N]`, comparing the Nth tag (1 based)
    fn create_sorter_from_line(&self, line: &str) -> Option<Result<Sorter, String>> {
        let caps = SORT_RE.captures(line.trim())?;
        let reverse = caps.get(1).is_some();
        let position: usize = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(1);
        if position == 0 {
            return Some(Err("do not understand query: tag sorting positions start at 1".to_string()));
        }
        Some(Ok(Sorter::new(line, "tags", tag_comparator(position - 1), reverse)))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        Some(Arc::new(|task: &Task, _: &SearchInfo<'_>| {
            if task.tags.is_empty() {
                vec!["(No tags)".to_string()]
            } else {
                task.tags.clone()
            }
        }))
    }
}
