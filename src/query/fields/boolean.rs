//! Boolean combinations of other filters
//!
//! Operands are whole filter instructions wrapped in `()`, `[]`, `{}` or
//! `""`. Operators are the upper-case words `AND`, `OR`, `XOR` and `NOT`.
//! `NOT` binds tightest, then `AND`, then `XOR`, then `OR`.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::domain::Task;
use crate::query::explanation::Explanation;
use crate::query::field::{parse_filter, Field};
use crate::query::filter::{Filter, FilterFunction, FilterOrErrorMessage};
use crate::query::SearchInfo;

const DELIMITERS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}'), ('"', '"')];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
    Xor,
    Not,
}

impl Operator {
    fn keyword(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Xor => "XOR",
            Operator::Not => "NOT",
        }
    }
}

/// A compiled sub-tree
struct Node {
    function: FilterFunction,
    explanation: Explanation,
}

fn closing_delimiter(open: char) -> Option<char> {
    DELIMITERS.iter().find(|(o, _)| *o == open).map(|(_, c)| *c)
}

fn malformed(detail: impl std::fmt::Display) -> String {
    format!(
        "malformed boolean query -- {} (check the documentation for guidelines)",
        detail
    )
}

struct Parser<'l> {
    text: &'l str,
    pos: usize,
    today: NaiveDate,
}

impl<'l> Parser<'l> {
    fn rest(&self) -> &'l str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Consumes `op` if it is the next word
    fn eat(&mut self, op: Operator) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        let Some(after) = rest.strip_prefix(op.keyword()) else {
            return false;
        };
        let boundary = after
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || closing_delimiter(c).is_some());
        if boundary {
            self.pos += op.keyword().len();
        }
        boundary
    }

    fn parse(mut self) -> Result<Node, String> {
        let node = self.parse_or()?;
        self.skip_whitespace();
        if !self.rest().is_empty() {
            return Err(malformed(format_args!("unexpected text '{}'", self.rest())));
        }
        Ok(node)
    }

    fn parse_or(&mut self) -> Result<Node, String> {
        let mut children = vec![self.parse_xor()?];
        while self.eat(Operator::Or) {
            children.push(self.parse_xor()?);
        }
        Ok(combine(Operator::Or, children))
    }

    fn parse_xor(&mut self) -> Result<Node, String> {
        let mut node = self.parse_and()?;
        while self.eat(Operator::Xor) {
            let right = self.parse_and()?;
            node = combine(Operator::Xor, vec![node, right]);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, String> {
        let mut children = vec![self.parse_not()?];
        while self.eat(Operator::And) {
            children.push(self.parse_not()?);
        }
        Ok(combine(Operator::And, children))
    }

    fn parse_not(&mut self) -> Result<Node, String> {
        if self.eat(Operator::Not) {
            let operand = self.parse_not()?;
            return Ok(combine(Operator::Not, vec![operand]));
        }
        self.parse_operand()
    }

    fn parse_operand(&mut self) -> Result<Node, String> {
        self.skip_whitespace();
        let rest = self.rest();
        let Some(open) = rest.chars().next() else {
            return Err(malformed("an operator is missing its operand"));
        };
        let Some(close) = closing_delimiter(open) else {
            return Err(malformed(format_args!("expected a delimited sub-expression at '{}'", rest)));
        };

        let mut depth = 0usize;
        let mut end = None;
        for (i, c) in rest.char_indices().skip(1) {
            if c == close && depth == 0 {
                end = Some(i);
                break;
            }
            if open != close {
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                }
            }
        }
        let Some(end) = end else {
            return Err(malformed(format_args!("unmatched '{}'", open)));
        };

        let inner = rest[open.len_utf8()..end].trim();
        self.pos += end + close.len_utf8();
        compile_operand(inner, self.today)
    }
}

fn compile_operand(instruction: &str, today: NaiveDate) -> Result<Node, String> {
    let compiled = parse_filter(instruction, today)
        .ok_or_else(|| format!("couldn't parse sub-expression '{}'", instruction))?;
    let filter = compiled
        .into_result()
        .map_err(|error| format!("couldn't parse sub-expression '{}': {}", instruction, error))?;

    let child = filter.explanation();
    let explanation = if !child.children().is_empty() {
        child.clone()
    } else if child.description() == instruction {
        Explanation::new(instruction)
    } else {
        Explanation::new(format!("{} =>\n{}", instruction, child.as_string("  ")))
    };
    Ok(Node {
        function: filter.function().clone(),
        explanation,
    })
}

fn combine(op: Operator, mut children: Vec<Node>) -> Node {
    if op != Operator::Not && children.len() == 1 {
        if let Some(only) = children.pop() {
            return only;
        }
    }

    let explanations = children.iter().map(|c| c.explanation.clone()).collect();
    let functions: Vec<FilterFunction> = children.into_iter().map(|c| c.function).collect();
    let (function, explanation): (FilterFunction, Explanation) = match op {
        Operator::And => (
            Arc::new(move |task: &Task, info: &SearchInfo<'_>| {
                for f in &functions {
                    if !f(task, info)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }),
            Explanation::boolean_and(explanations),
        ),
        Operator::Or => (
            Arc::new(move |task: &Task, info: &SearchInfo<'_>| {
                for f in &functions {
                    if f(task, info)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }),
            Explanation::boolean_or(explanations),
        ),
        Operator::Xor => (
            Arc::new(move |task: &Task, info: &SearchInfo<'_>| {
                let mut count = 0;
                for f in &functions {
                    if f(task, info)? {
                        count += 1;
                    }
                }
                Ok(count % 2 == 1)
            }),
            Explanation::boolean_xor(explanations),
        ),
        Operator::Not => (
            Arc::new(move |task: &Task, info: &SearchInfo<'_>| {
                for f in &functions {
                    if f(task, info)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }),
            Explanation::boolean_not(explanations),
        ),
    };
    Node { function, explanation }
}

pub struct BooleanField;

impl Field for BooleanField {
    fn field_name(&self) -> &'static str {
        "boolean"
    }

    fn can_create_filter_for_line(&self, line: &str) -> bool {
        let line = line.trim();
        let line = line.strip_prefix("NOT ").map_or(line, str::trim_start);
        line.chars().next().and_then(closing_delimiter).is_some()
    }

    fn create_filter_or_error_message(&self, line: &str, today: NaiveDate) -> FilterOrErrorMessage {
        let parser = Parser {
            text: line.trim(),
            pos: 0,
            today,
        };
        match parser.parse() {
            Ok(node) => FilterOrErrorMessage::from_filter(Filter::new(line, node.function, node.explanation)),
            Err(error) => FilterOrErrorMessage::from_error(line, error),
        }
    }
}
