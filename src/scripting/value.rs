//! Runtime values of the expression interpreter
//!
//! Task data is exposed through a fixed schema: each object kind lists
//! the properties and methods it declares, and nothing else resolves.

use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use super::parser::Expr;
use crate::domain::{Task, TaskDate, TasksFile};

/// Properties and methods reachable on `task`
pub const TASK_MEMBERS: &[&str] = &[
    "description",
    "descriptionWithoutTags",
    "status",
    "priorityName",
    "priorityNameGroupText",
    "priorityNumber",
    "urgency",
    "tags",
    "isDone",
    "isRecurring",
    "recurrenceRule",
    "id",
    "dependsOn",
    "blockLink",
    "heading",
    "hasHeading",
    "indentation",
    "listMarker",
    "lineNumber",
    "originalMarkdown",
    "estimatedTime",
    "created",
    "start",
    "scheduled",
    "due",
    "done",
    "cancelled",
    "happens",
    "file",
    "isBlocked",
    "isBlocking",
];

/// Properties and methods reachable on a file
pub const FILE_MEMBERS: &[&str] = &[
    "path",
    "pathWithoutExtension",
    "filename",
    "filenameWithoutExtension",
    "folder",
    "root",
    "frontmatter",
    "property",
    "hasProperty",
];

/// Properties and methods reachable on a date
pub const DATE_MEMBERS: &[&str] = &[
    "category",
    "fromNow",
    "formatAsDate",
    "formatAsDateAndTime",
    "format",
    "toISOString",
];

/// Properties reachable on `query`
pub const QUERY_MEMBERS: &[&str] = &["allTasks", "file"];

/// Built-in global functions and namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Math,
    MathFn(&'static str),
    StringFn,
    NumberFn,
    BooleanFn,
}

/// An arrow function together with the variables it closed over
#[derive(Debug)]
pub struct Closure<'a> {
    pub params: &'a [String],
    pub body: &'a Expr,
    pub captured: Vec<(String, Value<'a>)>,
}

/// A task date as seen by expressions
#[derive(Debug, Clone, Copy)]
pub struct DateView<'a> {
    pub date: Option<&'a TaskDate>,
    pub today: NaiveDate,
}

/// The `query` binding: the searched tasks and the note holding the query
#[derive(Debug, Clone, Copy)]
pub struct QueryView<'a> {
    pub all_tasks: &'a [Task],
    pub file: Option<&'a TasksFile>,
}

/// A value produced while evaluating an expression
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value<'a>>),
    /// Plain object with fixed keys, in declaration order
    Record(Vec<(String, Value<'a>)>),
    Task(&'a Task),
    File(Cow<'a, TasksFile>),
    Date(DateView<'a>),
    Query(QueryView<'a>),
    Function(Rc<Closure<'a>>),
    Builtin(Builtin),
}

impl<'a> Value<'a> {
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// The `typeof` name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Builtin(Builtin::MathFn(_) | Builtin::StringFn | Builtin::NumberFn | Builtin::BooleanFn) => {
                "function"
            }
            _ => "object",
        }
    }

    /// Numeric conversion used by arithmetic and comparisons
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) if s.trim().is_empty() => 0.0,
            Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
            Value::Array(items) if items.is_empty() => 0.0,
            Value::Array(items) if items.len() == 1 => items[0].to_number(),
            _ => f64::NAN,
        }
    }

    /// Names this value declares, for property lookup and placeholder checks
    pub fn members(&self) -> Vec<&str> {
        match self {
            Value::Task(_) => TASK_MEMBERS.to_vec(),
            Value::File(_) => FILE_MEMBERS.to_vec(),
            Value::Date(_) => DATE_MEMBERS.to_vec(),
            Value::Query(_) => QUERY_MEMBERS.to_vec(),
            Value::Record(fields) => fields.iter().map(|(k, _)| k.as_str()).collect(),
            Value::String(_) | Value::Array(_) => vec!["length"],
            _ => Vec::new(),
        }
    }

    /// Returns true if `name` is declared on this value
    pub fn has_member(&self, name: &str) -> bool {
        self.members().contains(&name)
    }

    /// Converts parsed frontmatter into a value
    pub fn from_json(json: &JsonValue) -> Value<'static> {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Record(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect()),
        }
    }

    /// Converts to JSON for CLI output; objects without data become strings
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Undefined | Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) if *n == n.trunc() && n.abs() < 9.0e15 => JsonValue::from(*n as i64),
            Value::Number(n) => serde_json::Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Record(fields) => JsonValue::Object(fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
            other => JsonValue::String(other.to_string()),
        }
    }
}

/// Formats a number the way JavaScript prints it
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                    .collect();
                f.write_str(&parts.join(","))
            }
            Value::File(file) => f.write_str(file.path()),
            Value::Date(view) => match view.date {
                Some(date) => write!(f, "{}", date),
                None => Ok(()),
            },
            Value::Function(_) | Value::Builtin(_) => f.write_str("function"),
            Value::Record(_) | Value::Task(_) | Value::Query(_) => f.write_str("[object Object]"),
        }
    }
}

impl PartialEq for Value<'_> {
    /// Strict equality: same kind and value, identity for tasks
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Task(a), Value::Task(b)) => std::ptr::eq(*a, *b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}
