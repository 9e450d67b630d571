//! Tree-walking evaluator for parsed expressions
//!
//! Only the members declared in [`super::value`] resolve; everything else
//! is `undefined`, the same as reading a missing property. Errors are
//! JavaScript-style messages (`TypeError: ...`, `ReferenceError: ...`).

use chrono::NaiveDate;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::rc::Rc;

use super::date_format::format_date;
use super::parser::{BinaryOp, Expr, Literal, LogicalOp, UnaryOp};
use super::value::{Builtin, Closure, DateView, QueryView, Value};
use crate::domain::{DateCategory, Task, TaskDate, TasksFile};

type Scope<'a> = [(String, Value<'a>)];

/// Evaluates expressions relative to a fixed `today`
#[derive(Debug, Clone, Copy)]
pub struct Interpreter {
    today: NaiveDate,
}

fn type_error(message: impl Into<String>) -> String {
    format!("TypeError: {}", message.into())
}

fn not_a_function(path: &str) -> String {
    type_error(format!("{} is not a function", path))
}

/// Longest string `repeat` and `padStart` may build
const MAX_STRING_LENGTH: usize = 1 << 20;

/// Rejects counts that would build an oversized string
fn check_string_length(s: &str, name: &str, args: &[Value<'_>]) -> Result<(), String> {
    let requested = match name {
        "repeat" => {
            let count = number_arg(args, 0).unwrap_or(0.0);
            if count < 0.0 || count.is_infinite() {
                return Err(format!("RangeError: Invalid count value: {}", Value::Number(count)));
            }
            count * s.chars().count() as f64
        }
        "padStart" | "padEnd" => number_arg(args, 0).unwrap_or(0.0),
        _ => return Ok(()),
    };
    if requested > MAX_STRING_LENGTH as f64 {
        return Err("RangeError: Invalid string length".to_string());
    }
    Ok(())
}

fn string_arg(args: &[Value<'_>], index: usize) -> Option<String> {
    args.get(index).filter(|v| !matches!(v, Value::Undefined)).map(|v| v.to_string())
}

fn number_arg(args: &[Value<'_>], index: usize) -> Option<f64> {
    args.get(index).filter(|v| !matches!(v, Value::Undefined)).map(|v| v.to_number())
}

/// Resolves a possibly negative slice bound against `len`
fn relative_index(index: f64, len: usize) -> usize {
    let len = len as f64;
    let index = if index.is_nan() { 0.0 } else { index.trunc() };
    let resolved = if index < 0.0 { (len + index).max(0.0) } else { index.min(len) };
    resolved as usize
}

fn ordering_from_number(n: f64) -> Ordering {
    if n < 0.0 {
        Ordering::Less
    } else if n > 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Stable merge sort that tolerates inconsistent comparators
fn merge_sort_by<T: Clone>(items: Vec<T>, compare: &mut impl FnMut(&T, &T) -> Ordering) -> Vec<T> {
    if items.len() <= 1 {
        return items;
    }
    let mut right = items;
    let left = right.drain(..right.len() / 2).collect::<Vec<_>>();
    let left = merge_sort_by(left, compare);
    let right = merge_sort_by(right, compare);
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if compare(&right[j], &left[i]) == Ordering::Less {
            merged.push(right[j].clone());
            j += 1;
        } else {
            merged.push(left[i].clone());
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}

fn status_record<'a>(task: &Task) -> Value<'a> {
    let status = &task.status;
    Value::Record(vec![
        ("name".to_string(), Value::String(status.name.clone())),
        ("symbol".to_string(), Value::String(status.symbol.clone())),
        ("nextSymbol".to_string(), Value::String(status.next_symbol.clone())),
        ("type".to_string(), Value::String(status.status_type.as_str().to_string())),
        ("typeGroupText".to_string(), Value::String(status.type_group_text())),
    ])
}

fn category_record<'a>(category: DateCategory) -> Value<'a> {
    let group_text = category.group_text();
    Value::Record(vec![
        ("name".to_string(), Value::String(category.name)),
        ("sortOrder".to_string(), Value::Number(category.sort_order as f64)),
        ("groupText".to_string(), Value::String(group_text)),
    ])
}

fn strings<'a>(items: &[String]) -> Value<'a> {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

impl Interpreter {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Evaluates `expr` with the given variables in scope
    pub fn eval<'a>(&self, expr: &'a Expr, scope: &Scope<'a>) -> Result<Value<'a>, String> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Undefined => Value::Undefined,
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::String(s.clone()),
            }),
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::Array(items) => Ok(Value::Array(
                items.iter().map(|item| self.eval(item, scope)).collect::<Result<_, _>>()?,
            )),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval(object, scope)?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                self.get_property(&object, property)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                self.get_index(&object, &index)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, scope),
            Expr::Unary { op, operand } => {
                if *op == UnaryOp::TypeOf {
                    return Ok(match self.eval(operand, scope) {
                        Ok(value) => Value::String(value.type_name().to_string()),
                        Err(e) if e.starts_with("ReferenceError") => Value::String("undefined".to_string()),
                        Err(e) => return Err(e),
                    });
                }
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Negate => Value::Number(-value.to_number()),
                    _ => Value::Number(value.to_number()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Arrow { params, body } => Ok(Value::Function(Rc::new(Closure {
                params,
                body,
                captured: scope.to_vec(),
            }))),
        }
    }

    fn lookup<'a>(&self, name: &str, scope: &Scope<'a>) -> Result<Value<'a>, String> {
        if let Some((_, value)) = scope.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        match name {
            "Math" => Ok(Value::Builtin(Builtin::Math)),
            "String" => Ok(Value::Builtin(Builtin::StringFn)),
            "Number" => Ok(Value::Builtin(Builtin::NumberFn)),
            "Boolean" => Ok(Value::Builtin(Builtin::BooleanFn)),
            "NaN" => Ok(Value::Number(f64::NAN)),
            "Infinity" => Ok(Value::Number(f64::INFINITY)),
            _ => Err(format!("ReferenceError: {} is not defined", name)),
        }
    }

    /// Reads a declared member of `object`
    pub fn get_property<'a>(&self, object: &Value<'a>, name: &str) -> Result<Value<'a>, String> {
        match object {
            Value::Undefined | Value::Null => Err(type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                object, name
            ))),
            Value::String(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
            Value::Array(items) if name == "length" => Ok(Value::Number(items.len() as f64)),
            Value::Record(fields) => Ok(fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .unwrap_or(Value::Undefined)),
            Value::Task(task) => Ok(self.task_property(*task, name)),
            Value::File(file) => Ok(file_property(file, name)),
            Value::Date(view) => Ok(match name {
                "category" => category_record(self.category(view)),
                "fromNow" => category_record(DateCategory::from_now(
                    view.date.and_then(TaskDate::valid),
                    self.today,
                )),
                _ => Value::Undefined,
            }),
            Value::Query(query) => Ok(match name {
                "allTasks" => Value::Array(query.all_tasks.iter().map(Value::Task).collect()),
                "file" => query.file.map_or(Value::Undefined, |f| Value::File(Cow::Borrowed(f))),
                _ => Value::Undefined,
            }),
            Value::Builtin(Builtin::Math) => Ok(match name {
                "PI" => Value::Number(std::f64::consts::PI),
                "E" => Value::Number(std::f64::consts::E),
                "abs" => Value::Builtin(Builtin::MathFn("abs")),
                "ceil" => Value::Builtin(Builtin::MathFn("ceil")),
                "floor" => Value::Builtin(Builtin::MathFn("floor")),
                "round" => Value::Builtin(Builtin::MathFn("round")),
                "trunc" => Value::Builtin(Builtin::MathFn("trunc")),
                "sign" => Value::Builtin(Builtin::MathFn("sign")),
                "sqrt" => Value::Builtin(Builtin::MathFn("sqrt")),
                "pow" => Value::Builtin(Builtin::MathFn("pow")),
                "min" => Value::Builtin(Builtin::MathFn("min")),
                "max" => Value::Builtin(Builtin::MathFn("max")),
                _ => Value::Undefined,
            }),
            _ => Ok(Value::Undefined),
        }
    }

    fn get_index<'a>(&self, object: &Value<'a>, index: &Value<'a>) -> Result<Value<'a>, String> {
        match (object, index) {
            (Value::Array(items), Value::Number(n)) => {
                Ok(if *n >= 0.0 && n.fract() == 0.0 {
                    items.get(*n as usize).cloned().unwrap_or(Value::Undefined)
                } else {
                    Value::Undefined
                })
            }
            (Value::String(s), Value::Number(n)) => Ok(if *n >= 0.0 && n.fract() == 0.0 {
                s.chars()
                    .nth(*n as usize)
                    .map_or(Value::Undefined, |c| Value::String(c.to_string()))
            } else {
                Value::Undefined
            }),
            (_, key) => self.get_property(object, &key.to_string()),
        }
    }

    fn category(&self, view: &DateView<'_>) -> DateCategory {
        match view.date {
            Some(TaskDate::Invalid(_)) => DateCategory::new("Invalid date", 0),
            Some(TaskDate::Valid(date)) => DateCategory::of(Some(*date), self.today),
            None => DateCategory::of(None, self.today),
        }
    }

    fn task_property<'a>(&self, task: &'a Task, name: &str) -> Value<'a> {
        let date = |d: Option<&'a TaskDate>| {
            Value::Date(DateView {
                date: d,
                today: self.today,
            })
        };
        match name {
            "description" => Value::String(task.description.clone()),
            "descriptionWithoutTags" => Value::String(task.description_without_tags()),
            "status" => status_record(task),
            "priorityName" => Value::String(task.priority.name().to_string()),
            "priorityNameGroupText" => Value::String(task.priority.group_text()),
            "priorityNumber" => Value::Number(f64::from(task.priority.number())),
            "urgency" => Value::Number(task.urgency(self.today)),
            "tags" => strings(&task.tags),
            "isDone" => Value::Bool(task.is_done()),
            "isRecurring" => Value::Bool(task.is_recurring()),
            "recurrenceRule" => Value::String(task.recurrence.as_ref().map(|r| r.to_string()).unwrap_or_default()),
            "id" => Value::String(task.id.clone()),
            "dependsOn" => strings(&task.depends_on),
            "blockLink" => Value::String(task.block_link.clone()),
            "heading" => task.heading.clone().map_or(Value::Null, Value::String),
            "hasHeading" => Value::Bool(task.heading.is_some()),
            "indentation" => Value::String(task.indentation.clone()),
            "listMarker" => Value::String(task.list_marker.clone()),
            "lineNumber" => Value::Number(task.line_number as f64),
            "originalMarkdown" => Value::String(task.to_markdown_line()),
            "estimatedTime" => task.duration.as_ref().map_or(Value::Null, |d| Value::String(d.to_string())),
            "created" => date(task.created.as_ref()),
            "start" => date(task.start.as_ref()),
            "scheduled" => date(task.scheduled.as_ref()),
            "due" => date(task.due.as_ref()),
            "done" => date(task.done.as_ref()),
            "cancelled" => date(task.cancelled.as_ref()),
            "happens" => date(task.happens()),
            "file" => Value::File(Cow::Owned(task.file())),
            _ => Value::Undefined,
        }
    }

    fn eval_call<'a>(&self, callee: &'a Expr, args: &'a [Expr], scope: &Scope<'a>) -> Result<Value<'a>, String> {
        let path = callee.describe();
        if let Expr::Member {
            object,
            property,
            optional,
        } = callee
        {
            let receiver = self.eval(object, scope)?;
            if *optional && receiver.is_nullish() {
                return Ok(Value::Undefined);
            }
            let args = args.iter().map(|a| self.eval(a, scope)).collect::<Result<Vec<_>, _>>()?;
            return self.call_method(receiver, property, args, &path);
        }
        let function = self.eval(callee, scope)?;
        let args = args.iter().map(|a| self.eval(a, scope)).collect::<Result<Vec<_>, _>>()?;
        self.call_function(&function, args, &path)
    }

    /// Invokes a function value
    pub fn call_function<'a>(&self, function: &Value<'a>, args: Vec<Value<'a>>, path: &str) -> Result<Value<'a>, String> {
        match function {
            Value::Function(closure) => {
                let mut scope = closure.captured.clone();
                for (i, param) in closure.params.iter().enumerate() {
                    scope.push((param.clone(), args.get(i).cloned().unwrap_or(Value::Undefined)));
                }
                self.eval(closure.body, &scope)
            }
            Value::Builtin(Builtin::StringFn) => Ok(Value::String(string_arg(&args, 0).unwrap_or_default())),
            Value::Builtin(Builtin::NumberFn) => Ok(Value::Number(number_arg(&args, 0).unwrap_or(0.0))),
            Value::Builtin(Builtin::BooleanFn) => Ok(Value::Bool(args.first().is_some_and(Value::is_truthy))),
            Value::Builtin(Builtin::MathFn(name)) => Ok(Value::Number(math(name, &args))),
            _ => Err(not_a_function(path)),
        }
    }

    fn call_method<'a>(
        &self,
        receiver: Value<'a>,
        name: &str,
        args: Vec<Value<'a>>,
        path: &str,
    ) -> Result<Value<'a>, String> {
        match receiver {
            Value::Undefined | Value::Null => Err(type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                receiver, name
            ))),
            Value::String(s) => {
                check_string_length(&s, name, &args)?;
                string_method(&s, name, &args).ok_or_else(|| not_a_function(path))
            }
            Value::Array(items) => self.array_method(items, name, args, path),
            Value::Number(n) => match name {
                "toFixed" => {
                    let digits = number_arg(&args, 0).unwrap_or(0.0).clamp(0.0, 100.0) as usize;
                    Ok(Value::String(format!("{:.*}", digits, n)))
                }
                "toString" => Ok(Value::String(Value::Number(n).to_string())),
                _ => Err(not_a_function(path)),
            },
            Value::Bool(b) if name == "toString" => Ok(Value::String(b.to_string())),
            Value::Date(view) => self.date_method(&view, name, &args).ok_or_else(|| not_a_function(path)),
            Value::File(file) => match name {
                "property" => Ok(string_arg(&args, 0)
                    .and_then(|key| file.property(&key).map(Value::from_json))
                    .unwrap_or(Value::Null)),
                "hasProperty" => Ok(Value::Bool(
                    string_arg(&args, 0).is_some_and(|key| file.has_property(&key)),
                )),
                _ => Err(not_a_function(path)),
            },
            Value::Task(task) => match name {
                "isBlocked" | "isBlocking" => {
                    let Some(Value::Array(others)) = args.first() else {
                        return Err(type_error(format!("{} expects query.allTasks", path)));
                    };
                    let others = others.iter().filter_map(|v| match v {
                        Value::Task(t) => Some(*t),
                        _ => None,
                    });
                    Ok(Value::Bool(if name == "isBlocked" {
                        task.is_blocked_by(others)
                    } else {
                        task.is_blocking_in(others)
                    }))
                }
                _ => Err(not_a_function(path)),
            },
            other => {
                let member = self.get_property(&other, name)?;
                self.call_function(&member, args, path)
            }
        }
    }

    fn date_method<'a>(&self, view: &DateView<'a>, name: &str, args: &[Value<'a>]) -> Option<Value<'a>> {
        let format = |pattern: &str, fallback: Option<String>| match view.date {
            Some(TaskDate::Valid(date)) => format_date(*date, pattern),
            Some(TaskDate::Invalid(_)) => "Invalid date".to_string(),
            None => fallback.unwrap_or_default(),
        };
        Some(match name {
            "formatAsDate" => Value::String(format("YYYY-MM-DD", string_arg(args, 0))),
            "formatAsDateAndTime" => Value::String(format("YYYY-MM-DD HH:mm", string_arg(args, 0))),
            "format" => Value::String(format(&string_arg(args, 0).unwrap_or_default(), string_arg(args, 1))),
            "toISOString" => match view.date {
                Some(TaskDate::Valid(date)) => Value::String(format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))),
                Some(TaskDate::Invalid(_)) => Value::Null,
                None => Value::String(String::new()),
            },
            _ => return None,
        })
    }

    fn array_method<'a>(
        &self,
        items: Vec<Value<'a>>,
        name: &str,
        args: Vec<Value<'a>>,
        path: &str,
    ) -> Result<Value<'a>, String> {
        let callback = |index: usize| -> Result<&Value<'a>, String> {
            match args.get(index) {
                Some(f @ (Value::Function(_) | Value::Builtin(_))) => Ok(f),
                Some(other) => Err(type_error(format!("{} is not a function", other))),
                None => Err(type_error("undefined is not a function")),
            }
        };
        let call = |f: &Value<'a>, item: &Value<'a>, i: usize| {
            self.call_function(f, vec![item.clone(), Value::Number(i as f64)], path)
        };

        match name {
            "join" => {
                let separator = string_arg(&args, 0).unwrap_or_else(|| ",".to_string());
                let parts: Vec<String> = items
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                    .collect();
                Ok(Value::String(parts.join(&separator)))
            }
            "toString" => Ok(Value::String(Value::Array(items).to_string())),
            "includes" => Ok(Value::Bool(args.first().is_some_and(|needle| items.contains(needle)))),
            "indexOf" => Ok(Value::Number(
                args.first()
                    .and_then(|needle| items.iter().position(|v| v == needle))
                    .map_or(-1.0, |i| i as f64),
            )),
            "at" => {
                let i = number_arg(&args, 0).unwrap_or(0.0);
                let i = if i < 0.0 { items.len() as f64 + i } else { i };
                Ok(if i >= 0.0 {
                    items.get(i as usize).cloned().unwrap_or(Value::Undefined)
                } else {
                    Value::Undefined
                })
            }
            "slice" => {
                let start = relative_index(number_arg(&args, 0).unwrap_or(0.0), items.len());
                let end = relative_index(number_arg(&args, 1).unwrap_or(items.len() as f64), items.len());
                Ok(Value::Array(if start < end { items[start..end].to_vec() } else { vec![] }))
            }
            "concat" => {
                let mut result = items;
                for arg in args {
                    match arg {
                        Value::Array(more) => result.extend(more),
                        other => result.push(other),
                    }
                }
                Ok(Value::Array(result))
            }
            "reverse" => Ok(Value::Array(items.into_iter().rev().collect())),
            "flat" => Ok(Value::Array(
                items
                    .into_iter()
                    .flat_map(|v| match v {
                        Value::Array(inner) => inner,
                        other => vec![other],
                    })
                    .collect(),
            )),
            "sort" => {
                let mut error = None;
                let sorted = match args.first() {
                    Some(f @ Value::Function(_)) => merge_sort_by(items, &mut |a, b| {
                        match self.call_function(f, vec![a.clone(), b.clone()], path) {
                            Ok(v) => ordering_from_number(v.to_number()),
                            Err(e) => {
                                error.get_or_insert(e);
                                Ordering::Equal
                            }
                        }
                    }),
                    _ => {
                        let mut items = items;
                        items.sort_by_key(|v| (matches!(v, Value::Undefined), v.to_string()));
                        items
                    }
                };
                match error {
                    Some(e) => Err(e),
                    None => Ok(Value::Array(sorted)),
                }
            }
            "filter" => {
                let f = callback(0)?;
                let mut kept = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if call(f, item, i)?.is_truthy() {
                        kept.push(item.clone());
                    }
                }
                Ok(Value::Array(kept))
            }
            "map" => {
                let f = callback(0)?;
                let mapped = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| call(f, item, i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(mapped))
            }
            "some" | "every" | "find" | "findIndex" => {
                let f = callback(0)?;
                for (i, item) in items.iter().enumerate() {
                    let hit = call(f, item, i)?.is_truthy();
                    match (name, hit) {
                        ("some", true) => return Ok(Value::Bool(true)),
                        ("every", false) => return Ok(Value::Bool(false)),
                        ("find", true) => return Ok(item.clone()),
                        ("findIndex", true) => return Ok(Value::Number(i as f64)),
                        _ => {}
                    }
                }
                Ok(match name {
                    "some" => Value::Bool(false),
                    "every" => Value::Bool(true),
                    "find" => Value::Undefined,
                    _ => Value::Number(-1.0),
                })
            }
            _ => Err(not_a_function(path)),
        }
    }
}

fn file_property<'a>(file: &TasksFile, name: &str) -> Value<'a> {
    match name {
        "path" => Value::String(file.path().to_string()),
        "pathWithoutExtension" => Value::String(file.path_without_extension().to_string()),
        "filename" => Value::String(file.filename().to_string()),
        "filenameWithoutExtension" => Value::String(file.filename_without_extension().to_string()),
        "folder" => Value::String(file.folder()),
        "root" => Value::String(file.root()),
        "frontmatter" => Value::Record(
            file.properties()
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect(),
        ),
        _ => Value::Undefined,
    }
}

fn string_method<'a>(s: &str, name: &str, args: &[Value<'a>]) -> Option<Value<'a>> {
    let arg = |i: usize| string_arg(args, i).unwrap_or_else(|| "undefined".to_string());
    let chars: Vec<char> = s.chars().collect();
    let substring = |start: usize, end: usize| -> String {
        if start < end {
            chars[start..end].iter().collect()
        } else {
            String::new()
        }
    };
    Some(match name {
        "includes" => Value::Bool(s.contains(&arg(0))),
        "startsWith" => Value::Bool(s.starts_with(&arg(0))),
        "endsWith" => Value::Bool(s.ends_with(&arg(0))),
        "toUpperCase" | "toLocaleUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" | "toLocaleLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "trimStart" => Value::String(s.trim_start().to_string()),
        "trimEnd" => Value::String(s.trim_end().to_string()),
        "toString" => Value::String(s.to_string()),
        "replace" => Value::String(s.replacen(&arg(0), &arg(1), 1)),
        "replaceAll" => Value::String(s.replace(&arg(0), &arg(1))),
        "split" => match string_arg(args, 0) {
            Some(sep) if sep.is_empty() => Value::Array(chars.iter().map(|c| Value::String(c.to_string())).collect()),
            Some(sep) => Value::Array(s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect()),
            None => Value::Array(vec![Value::String(s.to_string())]),
        },
        "slice" => {
            let start = relative_index(number_arg(args, 0).unwrap_or(0.0), chars.len());
            let end = relative_index(number_arg(args, 1).unwrap_or(chars.len() as f64), chars.len());
            Value::String(substring(start, end))
        }
        "substring" => {
            let clamp = |n: f64| (if n.is_nan() { 0.0 } else { n }).clamp(0.0, chars.len() as f64) as usize;
            let a = clamp(number_arg(args, 0).unwrap_or(0.0));
            let b = clamp(number_arg(args, 1).unwrap_or(chars.len() as f64));
            Value::String(substring(a.min(b), a.max(b)))
        }
        "charAt" | "at" => {
            let i = number_arg(args, 0).unwrap_or(0.0);
            let i = if name == "at" && i < 0.0 { chars.len() as f64 + i } else { i };
            let c = if i >= 0.0 { chars.get(i as usize) } else { None };
            match (c, name) {
                (Some(c), _) => Value::String(c.to_string()),
                (None, "at") => Value::Undefined,
                (None, _) => Value::String(String::new()),
            }
        }
        "indexOf" | "lastIndexOf" => {
            let needle = arg(0);
            let found = if name == "indexOf" { s.find(&needle) } else { s.rfind(&needle) };
            Value::Number(found.map_or(-1.0, |byte| s[..byte].chars().count() as f64))
        }
        "padStart" | "padEnd" => {
            let width = number_arg(args, 0).unwrap_or(0.0).max(0.0) as usize;
            let fill = string_arg(args, 1).unwrap_or_else(|| " ".to_string());
            if width <= chars.len() || fill.is_empty() {
                Value::String(s.to_string())
            } else {
                let padding: String = fill.chars().cycle().take(width - chars.len()).collect();
                Value::String(if name == "padStart" {
                    format!("{}{}", padding, s)
                } else {
                    format!("{}{}", s, padding)
                })
            }
        }
        "repeat" => Value::String(s.repeat(number_arg(args, 0).unwrap_or(0.0).max(0.0) as usize)),
        "concat" => Value::String(args.iter().fold(s.to_string(), |acc, v| acc + &v.to_string())),
        "localeCompare" => Value::Number(match s.cmp(arg(0).as_str()) {
            Ordering::Less => -1.0,
            Ordering::Equal => 0.0,
            Ordering::Greater => 1.0,
        }),
        _ => return None,
    })
}

fn math(name: &str, args: &[Value<'_>]) -> f64 {
    let x = number_arg(args, 0).unwrap_or(f64::NAN);
    match name {
        "abs" => x.abs(),
        "ceil" => x.ceil(),
        "floor" => x.floor(),
        "round" => (x + 0.5).floor(),
        "trunc" => x.trunc(),
        "sign" => {
            if x == 0.0 || x.is_nan() {
                x
            } else {
                x.signum()
            }
        }
        "sqrt" => x.sqrt(),
        "pow" => x.powf(number_arg(args, 1).unwrap_or(f64::NAN)),
        "min" => args.iter().map(Value::to_number).fold(f64::INFINITY, |a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }),
        "max" => args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, |a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }),
        _ => f64::NAN,
    }
}

fn is_primitive(value: &Value<'_>) -> bool {
    matches!(
        value,
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
    )
}

fn loose_equal(left: &Value<'_>, right: &Value<'_>) -> bool {
    match (left, right) {
        (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(_) | Value::Bool(_), Value::String(_) | Value::Bool(_) | Value::Number(_))
        | (Value::String(_), Value::Number(_) | Value::Bool(_)) => left.to_number() == right.to_number(),
        (Value::Array(_) | Value::Record(_) | Value::Date(_) | Value::File(_), Value::String(b)) => &left.to_string() == b,
        (Value::String(a), Value::Array(_) | Value::Record(_) | Value::Date(_) | Value::File(_)) => a == &right.to_string(),
        _ => left == right,
    }
}

fn compare(left: &Value<'_>, right: &Value<'_>) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

fn binary<'a>(op: BinaryOp, left: &Value<'a>, right: &Value<'a>) -> Value<'a> {
    match op {
        BinaryOp::Add => {
            if is_primitive(left) && is_primitive(right) {
                Value::Number(left.to_number() + right.to_number())
            } else {
                Value::String(format!("{}{}", left, right))
            }
        }
        BinaryOp::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Remainder => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::StrictEqual => Value::Bool(left == right),
        BinaryOp::StrictNotEqual => Value::Bool(left != right),
        BinaryOp::Equal => Value::Bool(loose_equal(left, right)),
        BinaryOp::NotEqual => Value::Bool(!loose_equal(left, right)),
        BinaryOp::Less => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::LessOrEqual => Value::Bool(matches!(compare(left, right), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Greater => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::GreaterOrEqual => {
            Value::Bool(matches!(compare(left, right), Some(Ordering::Greater | Ordering::Equal)))
        }
    }
}

/// Binds `query` for callers that only need `allTasks` and `file`
pub fn query_value<'a>(all_tasks: &'a [Task], file: Option<&'a TasksFile>) -> Value<'a> {
    Value::Query(QueryView { all_tasks, file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::parser::parse;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn eval_with(source: &str, task: &Task) -> Result<String, String> {
        let expr = parse(source)?;
        let scope = vec![("task".to_string(), Value::Task(task))];
        Interpreter::new(today()).eval(&expr, &scope).map(|v| v.to_string())
    }

    fn eval(source: &str) -> Result<String, String> {
        eval_with(source, &Task::new("A #tag task"))
    }

    #[test]
    fn literals_and_fallbacks() {
        assert_eq!(eval("6 * 7").unwrap(), "42");
        assert_eq!(eval("'' || 'No value'").unwrap(), "No value");
        assert_eq!(eval("0 || 'No value'").unwrap(), "No value");
        assert_eq!(eval("null ?? 'x'").unwrap(), "x");
        assert_eq!(eval("[1, 2]").unwrap(), "1,2");
        assert_eq!(eval(r#""I _am_".replaceAll("_", "\\_")"#).unwrap(), "I \\_am\\_");
    }

    #[test]
    fn oversized_strings_are_rejected() {
        assert_eq!(eval("'ab'.repeat(3)").unwrap(), "ababab");
        assert_eq!(eval("'7'.padStart(3, '0')").unwrap(), "007");
        assert_eq!(eval("'ab'.repeat(1e9)").unwrap_err(), "RangeError: Invalid string length");
        assert_eq!(eval("'ab'.padStart(1e12)").unwrap_err(), "RangeError: Invalid string length");
        assert_eq!(eval("'ab'.repeat(-1)").unwrap_err(), "RangeError: Invalid count value: -1");
        assert!(eval("'ab'.repeat(1 / 0)").unwrap_err().starts_with("RangeError: Invalid count value"));
        assert_eq!(eval("''.repeat(1e9)").unwrap(), "");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval("'a' + 1").unwrap(), "a1");
        assert_eq!(eval("1 + true").unwrap(), "2");
    }

    #[test]
    fn task_properties() {
        let task = Task {
            tags: vec!["#a".into(), "#b".into()],
            due: Some(TaskDate::parse("2024-01-09")),
            ..Task::new("Pay bills")
        };
        assert_eq!(eval_with("task.tags.length > 1", &task).unwrap(), "true");
        assert_eq!(eval_with("task.due.formatAsDate()", &task).unwrap(), "2024-01-09");
        assert_eq!(eval_with("task.due.category.groupText", &task).unwrap(), "%%1%% Overdue");
        assert_eq!(eval_with("task.status.type", &task).unwrap(), "TODO");
        assert_eq!(eval_with("task.priorityNameGroupText", &task).unwrap(), "%%3%%Normal priority");
        assert_eq!(eval_with("task.start.format('YYYY', 'no start')", &task).unwrap(), "no start");
    }

    #[test]
    fn arrow_functions_over_tags() {
        let task = Task {
            tags: vec!["#context/home".into(), "#tag".into()],
            ..Task::new("x")
        };
        assert_eq!(
            eval_with("task.tags.filter( (tag) => tag.includes('#context/') )", &task).unwrap(),
            "#context/home"
        );
        assert_eq!(eval_with("task.tags.map(t => t.toUpperCase()).join(' ')", &task).unwrap(), "#CONTEXT/HOME #TAG");
    }

    #[test]
    fn unknown_members_are_undefined() {
        assert_eq!(eval("task.iAmNotAKnownTaskProperty").unwrap(), "undefined");
        assert_eq!(eval("task.__proto__").unwrap(), "undefined");
    }

    #[test]
    fn runtime_errors() {
        assert_eq!(
            eval("nonExistentVariable").unwrap_err(),
            "ReferenceError: nonExistentVariable is not defined"
        );
        assert_eq!(
            eval("task.nothing.x").unwrap_err(),
            "TypeError: Cannot read properties of undefined (reading 'x')"
        );
        assert_eq!(
            eval("task.description.shout()").unwrap_err(),
            "TypeError: task.description.shout is not a function"
        );
    }

    #[test]
    fn sort_with_inconsistent_comparator_does_not_panic() {
        assert!(eval("[3, 1, 2].sort((a, b) => 1)").is_ok());
        assert_eq!(eval("[3, 1, 2].sort((a, b) => a - b)").unwrap(), "1,2,3");
        assert_eq!(eval("['b', 'a'].sort()").unwrap(), "a,b");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(eval("(1.23456).toFixed(2)").unwrap(), "1.23");
        assert_eq!(eval("Math.max(1, 5, 3)").unwrap(), "5");
        assert_eq!(eval("typeof undeclared").unwrap(), "undefined");
    }
}
