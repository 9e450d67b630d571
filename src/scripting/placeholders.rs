//! `{{...}}` placeholder expansion in query text
//!
//! Each span is evaluated as an expression against the supplied bindings,
//! so function calls such as `{{query.file.property('x')}}` work. A span
//! that yields `null` or `undefined`, or fails, is an error naming the
//! property path that could not be resolved.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use super::expression::Expression;
use super::interpreter::Interpreter;
use super::value::Value;

static DOTTED_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").expect("valid regex"));

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlaceholderError {
    #[error("There was an error expanding one or more placeholders.\n\nThe error message was:\n    Unknown property: {path}\n\nThe problem is in:\n    {template}")]
    UnknownProperty { path: String, template: String },

    #[error("The query looks like it contains a placeholder, with \"{{{{\" and \"}}}}\"\nbut no file path has been supplied, so cannot expand placeholder values.\nThe query is:\n{template}")]
    NoFile { template: String },
}

/// Returns true if `text` has a `{{...}}` span
pub fn has_placeholders(text: &str) -> bool {
    text.find("{{").is_some_and(|start| text[start..].contains("}}"))
}

/// Expands every `{{...}}` span in `template`.
///
/// Spans do not nest: the first `}}` ends a span. Text without any span is
/// returned unchanged.
pub fn expand_placeholders(
    template: &str,
    bindings: &[(&str, Value<'_>)],
    today: NaiveDate,
) -> Result<String, PlaceholderError> {
    if !template.contains("{{") {
        return Ok(template.to_string());
    }

    let mut output = String::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        output.push_str(&rest[..start]);
        let content = &rest[start + 2..start + 2 + len];
        output.push_str(&expand_span(content, bindings, today).map_err(|path| {
            PlaceholderError::UnknownProperty {
                path,
                template: template.to_string(),
            }
        })?);
        rest = &rest[start + 2 + len + 2..];
    }
    output.push_str(rest);
    Ok(output)
}

/// Value of one span, or the path to report as unknown
fn expand_span(content: &str, bindings: &[(&str, Value<'_>)], today: NaiveDate) -> Result<String, String> {
    let names: Vec<&str> = bindings.iter().map(|(name, _)| *name).collect();
    let expression = Expression::parse(&names, content.trim());
    let args = bindings.iter().map(|(_, value)| value.clone()).collect();
    match expression.evaluate(args, today) {
        Ok(value) if !value.is_nullish() => Ok(value.to_string()),
        Ok(_) => Err(unresolved_path(content.trim(), bindings, today)),
        Err(e) => {
            debug!(placeholder = content, error = %e, "Placeholder did not evaluate");
            Err(unresolved_path(content.trim(), bindings, today))
        }
    }
}

/// Walks a dotted path through the declared members and returns the
/// prefix up to the first name that does not resolve
fn unresolved_path(content: &str, bindings: &[(&str, Value<'_>)], today: NaiveDate) -> String {
    if !DOTTED_PATH_RE.is_match(content) {
        return content.to_string();
    }
    let interpreter = Interpreter::new(today);
    let mut segments = content.split('.');
    let mut path = segments.next().unwrap_or_default().to_string();
    let Some(mut current) = bindings.iter().find(|(name, _)| *name == path).map(|(_, v)| v.clone()) else {
        return path;
    };
    for segment in segments {
        path.push('.');
        path.push_str(segment);
        if !current.has_member(segment) {
            return path;
        }
        match interpreter.get_property(&current, segment) {
            Ok(next) => current = next,
            Err(_) => return path,
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TasksFile;
    use crate::scripting::value::QueryView;
    use serde_json::{Map, Value as JsonValue};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn expand(template: &str, file: &TasksFile) -> Result<String, PlaceholderError> {
        let query = Value::Query(QueryView {
            all_tasks: &[],
            file: Some(file),
        });
        expand_placeholders(template, &[("query", query)], today())
    }

    #[test]
    fn expands_file_properties() {
        let file = TasksFile::new("a/b/path with space.md");
        assert_eq!(
            expand("path includes {{query.file.path}}\nfilename includes {{query.file.filename}}", &file).unwrap(),
            "path includes a/b/path with space.md\nfilename includes path with space.md"
        );
    }

    #[test]
    fn text_without_braces_is_unchanged() {
        let file = TasksFile::new("a.md");
        assert_eq!(expand("no braces here", &file).unwrap(), "no braces here");
    }

    #[test]
    fn function_calls_in_placeholders() {
        let mut properties = Map::new();
        properties.insert("task_instruction".to_string(), JsonValue::from("group by filename"));
        let file = TasksFile::with_properties("notes/x.md", properties);
        assert_eq!(
            expand("{{query.file.property('task_instruction')}}", &file).unwrap(),
            "group by filename"
        );
    }

    #[test]
    fn unknown_nested_property() {
        let file = TasksFile::new("stuff.md");
        let err = expand("{{ query.file.nonsense }}", &file).unwrap_err();
        assert_eq!(
            err.to_string(),
            "There was an error expanding one or more placeholders.\n\nThe error message was:\n    Unknown property: query.file.nonsense\n\nThe problem is in:\n    {{ query.file.nonsense }}"
        );
    }

    #[test]
    fn reserved_names_are_unknown() {
        let file = TasksFile::new("stuff.md");
        let err = expand("{{query.__proto__}}", &file).unwrap_err();
        assert!(matches!(err, PlaceholderError::UnknownProperty { ref path, .. } if path == "query.__proto__"));
    }

    #[test]
    fn null_property_is_an_error() {
        let file = TasksFile::new("stuff.md");
        let err = expand("{{query.file.property('missing')}}", &file).unwrap_err();
        assert!(matches!(err, PlaceholderError::UnknownProperty { ref path, .. } if path == "query.file.property('missing')"));
    }

    #[test]
    fn unknown_top_level_name() {
        let bindings = [("title", Value::String("Joe".into()))];
        let err = expand_placeholders("{{ title }} spends {{ unknownField }}", &bindings, today()).unwrap_err();
        assert!(err.to_string().contains("Unknown property: unknownField"));
        assert!(err.to_string().ends_with("    {{ title }} spends {{ unknownField }}"));
    }

    #[test]
    fn detects_placeholders() {
        assert!(has_placeholders("path includes {{query.file.path}}"));
        assert!(!has_placeholders("path includes {{"));
    }
}
