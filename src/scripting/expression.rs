//! Compile-once, evaluate-many expressions
//!
//! An [`Expression`] is parsed when it is created. A parse failure is kept
//! on the expression rather than returned, so callers can report it before
//! any task is processed.

use chrono::NaiveDate;
use thiserror::Error;

use super::interpreter::Interpreter;
use super::parser::{parse, Expr};
use super::value::Value;

/// Expression failures, worded for display to the query author
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    #[error("Error: Failed parsing expression \"{expression}\".\nThe error message was:\n    \"{message}\"")]
    Parse { expression: String, message: String },

    #[error("Error: Failed calculating expression \"{expression}\".\nThe error message was:\n    \"{message}\"")]
    Evaluate { expression: String, message: String },

    #[error("Error: Cannot evaluate an expression which is not valid: \"{expression}\" gave error: \"{parse_error}\"")]
    Invalid { expression: String, parse_error: String },
}

/// A parsed expression plus the names of the values it is evaluated with
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    params: Vec<String>,
    compiled: Result<Expr, ExpressionError>,
}

impl Expression {
    /// Parses `source`; never fails, see [`Expression::parse_error`]
    pub fn parse(params: &[&str], source: &str) -> Self {
        let compiled = parse(source).map_err(|message| ExpressionError::Parse {
            expression: source.to_string(),
            message,
        });
        Self {
            source: source.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            compiled,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    pub fn parse_error(&self) -> Option<&ExpressionError> {
        self.compiled.as_ref().err()
    }

    /// Evaluates with `args` bound positionally to the parameter names
    pub fn evaluate<'a>(&'a self, args: Vec<Value<'a>>, today: NaiveDate) -> Result<Value<'a>, ExpressionError> {
        let expr = self.compiled.as_ref().map_err(|e| ExpressionError::Invalid {
            expression: self.source.clone(),
            parse_error: e.to_string(),
        })?;
        let scope: Vec<(String, Value<'a>)> = self.params.iter().cloned().zip(args).collect();
        Interpreter::new(today)
            .eval(expr, &scope)
            .map_err(|message| ExpressionError::Evaluate {
                expression: self.source.clone(),
                message,
            })
    }

    /// Like [`Expression::evaluate`], with any error turned into its message
    pub fn evaluate_or_catch<'a>(&'a self, args: Vec<Value<'a>>, today: NaiveDate) -> Value<'a> {
        self.evaluate(args, today)
            .unwrap_or_else(|e| Value::String(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn leading_return_is_a_parse_error() {
        let expression = Expression::parse(&[], "return 42");
        assert!(!expression.is_valid());
        assert_eq!(
            expression.parse_error().unwrap().to_string(),
            "Error: Failed parsing expression \"return 42\".\nThe error message was:\n    \"SyntaxError: Unexpected token 'return'\""
        );
    }

    #[test]
    fn runtime_error_is_caught() {
        let expression = Expression::parse(&["task"], "nonExistentVariable");
        assert!(expression.is_valid());
        let result = expression.evaluate_or_catch(vec![Value::Null], today());
        assert_eq!(
            result.to_string(),
            "Error: Failed calculating expression \"nonExistentVariable\".\nThe error message was:\n    \"ReferenceError: nonExistentVariable is not defined\""
        );
    }

    #[test]
    fn evaluating_invalid_expression_reports_parse_error() {
        let expression = Expression::parse(&[], "x(");
        let err = expression.evaluate(vec![], today()).unwrap_err();
        assert!(matches!(err, ExpressionError::Invalid { .. }));
        assert!(err
            .to_string()
            .starts_with("Error: Cannot evaluate an expression which is not valid: \"x(\" gave error: \"Error: Failed parsing"));
    }

    #[test]
    fn bindings_are_positional() {
        let expression = Expression::parse(&["a", "b"], "a * 10 + b");
        let value = expression.evaluate(vec![Value::Number(4.0), Value::Number(2.0)], today()).unwrap();
        assert_eq!(value.to_string(), "42");
    }
}
