//! Expressions evaluated against one task at a time

use super::expression::{Expression, ExpressionError};
use super::value::Value;
use crate::domain::Task;
use crate::query::SearchInfo;

/// An expression with the implicit bindings `task` and `query`
#[derive(Debug, Clone)]
pub struct TaskExpression {
    expression: Expression,
}

impl TaskExpression {
    pub fn new(line: &str) -> Self {
        Self {
            expression: Expression::parse(&["task", "query"], line),
        }
    }

    pub fn line(&self) -> &str {
        self.expression.source()
    }

    pub fn is_valid(&self) -> bool {
        self.expression.is_valid()
    }

    /// The parse failure message, if the line did not parse
    pub fn parse_error(&self) -> Option<String> {
        self.expression.parse_error().map(|e| e.to_string())
    }

    fn args<'a>(task: &'a Task, search_info: &SearchInfo<'a>) -> Vec<Value<'a>> {
        vec![Value::Task(task), Value::Query(search_info.query_view())]
    }

    /// Evaluates for `task`, failing on parse or runtime errors
    pub fn evaluate<'a>(&'a self, task: &'a Task, search_info: &SearchInfo<'a>) -> Result<Value<'a>, ExpressionError> {
        self.expression.evaluate(Self::args(task, search_info), search_info.today())
    }

    /// Evaluates for `task`, turning any failure into its message
    pub fn evaluate_or_catch<'a>(&'a self, task: &'a Task, search_info: &SearchInfo<'a>) -> Value<'a> {
        self.expression.evaluate_or_catch(Self::args(task, search_info), search_info.today())
    }
}
