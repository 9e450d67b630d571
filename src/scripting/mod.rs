//! Scripting support for `filter|sort|group by function` and placeholders
//!
//! Expressions use a small JavaScript-like grammar evaluated by a tree
//! walking interpreter. Only the properties and methods declared on each
//! value kind are reachable.

pub mod date_format;
pub mod expression;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod placeholders;
pub mod task_expression;
pub mod value;

pub use expression::{Expression, ExpressionError};
pub use interpreter::Interpreter;
pub use placeholders::{expand_placeholders, has_placeholders, PlaceholderError};
pub use task_expression::TaskExpression;
pub use value::{QueryView, Value};
