//! Fields compared as text: path, folder, root, filename, heading,
//! description, status name and recurrence rule

use chrono::NaiveDate;
use regex::Regex;
use std::sync::Arc;

use crate::domain::Task;
use crate::query::explanation::Explanation;
use crate::query::field::{compare_text, includes_ignoring_case, instruction_regex, Field, RegexMatcher};
use crate::query::filter::{Filter, FilterOrErrorMessage};
use crate::query::grouper::GroupFunction;
use crate::query::sorter::Comparator;
use crate::query::SearchInfo;

type Accessor = fn(&Task) -> String;

/// A field matched with `includes`, `does not include`, `regex matches`
/// and `regex does not match`
pub struct TextField {
    name: &'static str,
    value: Accessor,
    group: fn(&Task) -> Vec<String>,
    filter_re: Regex,
}

impl TextField {
    fn new(name: &'static str, value: Accessor, group: fn(&Task) -> Vec<String>) -> Self {
        Self {
            name,
            value,
            group,
            filter_re: text_filter_regex(name),
        }
    }

    pub fn path() -> Self {
        Self::new("path", |task| task.path.clone(), |task| {
            vec![task.file().path_without_extension().to_string()]
        })
    }

    pub fn folder() -> Self {
        Self::new("folder", |task| task.file().folder(), |task| vec![task.file().folder()])
    }

    pub fn root() -> Self {
        Self::new("root", |task| task.file().root(), |task| vec![task.file().root()])
    }

    pub fn filename() -> Self {
        Self::new("filename", |task| task.file().filename().to_string(), |task| {
            vec![format!("[[{}]]", task.file().filename_without_extension())]
        })
    }

    pub fn heading() -> Self {
        Self::new(
            "heading",
            |task| task.heading.clone().unwrap_or_default(),
            |task| vec![task.heading.clone().unwrap_or_else(|| "(No heading)".to_string())],
        )
    }

    pub fn description() -> Self {
        Self::new("description", |task| task.description.clone(), |task| vec![task.description.clone()])
    }

    pub fn status_name() -> Self {
        Self::new("status.name", |task| task.status.name.clone(), |task| vec![task.status.name.clone()])
    }

    pub fn recurrence() -> Self {
        Self::new(
            "recurrence",
            |task| task.recurrence.as_ref().map(ToString::to_string).unwrap_or_default(),
            |task| {
                vec![task
                    .recurrence
                    .as_ref()
                    .map_or_else(|| "None".to_string(), ToString::to_string)]
            },
        )
    }
}

/// `^<name> (includes|does not include|regex matches|regex does not match) (.*)`
pub(crate) fn text_filter_regex(name: &str) -> Regex {
    instruction_regex(&format!(
        r"^{} (includes|does not include|regex matches|regex does not match) (.*)",
        regex::escape(name)
    ))
}

/// Compiles a text-grammar instruction over `value`.
///
/// The negative forms are the positive predicate negated.
pub(crate) fn text_filter(
    field_name: &str,
    filter_re: &Regex,
    line: &str,
    value: Accessor,
) -> FilterOrErrorMessage {
    let Some(caps) = filter_re.captures(line) else {
        return FilterOrErrorMessage::from_error(line, format!("do not understand query filter ({})", field_name));
    };
    let method = caps[1].to_lowercase();
    let search = caps[2].to_string();
    let negate = method.contains("not");

    if method.starts_with("regex") {
        let Some(matcher) = RegexMatcher::parse(&search) else {
            return FilterOrErrorMessage::from_error(
                line,
                format!(
                    "cannot parse regex ({}); check your leading and trailing slashes for your query",
                    field_name
                ),
            );
        };
        let explanation = if negate {
            Explanation::new(line)
        } else {
            Explanation::new(matcher.explanation())
        };
        return FilterOrErrorMessage::from_filter(Filter::from_predicate(
            line,
            move |task, _| negate != matcher.is_match(&value(task)),
            explanation,
        ));
    }

    FilterOrErrorMessage::from_filter(Filter::from_predicate(
        line,
        move |task, _| negate != includes_ignoring_case(&value(task), &search),
        Explanation::new(line),
    ))
}

impl Field for TextField {
    fn field_name(&self) -> &'static str {
        self.name
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        self.filter_re.is_match(line)
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        text_filter(self.name, &self.filter_re, line, self.value)
    }

    fn comparator(&self) -> Option<Comparator> {
        let value = self.value;
        Some(Arc::new(move |a: &Task, b: &Task, _: &SearchInfo<'_>| {
            compare_text(&value(a), &value(b))
        }))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        let group = self.group;
        Some(Arc::new(move |task: &Task, _: &SearchInfo<'_>| group(task)))
    }
}
