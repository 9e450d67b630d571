//! Human-readable descriptions of compiled filters

use std::fmt;

/// A description plus nested child descriptions, rendered as an indented tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    description: String,
    children: Vec<Explanation>,
}

impl Explanation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(description: impl Into<String>, children: Vec<Explanation>) -> Self {
        Self {
            description: description.into(),
            children,
        }
    }

    pub fn boolean_and(children: Vec<Explanation>) -> Self {
        Self::with_children("AND (All of)", children)
    }

    pub fn boolean_or(children: Vec<Explanation>) -> Self {
        Self::with_children("OR (At least one of)", children)
    }

    pub fn boolean_not(children: Vec<Explanation>) -> Self {
        Self::with_children("NOT (None of)", children)
    }

    pub fn boolean_xor(children: Vec<Explanation>) -> Self {
        Self::with_children("XOR (Exactly one of)", children)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn children(&self) -> &[Explanation] {
        &self.children
    }

    /// Renders with every line prefixed by `indent`, children two spaces deeper
    pub fn as_string(&self, indent: &str) -> String {
        let mut result = indent_lines(&self.description, indent);
        if self.children.is_empty() {
            return result;
        }

        result.push(':');
        let child_indent = format!("{}  ", indent);
        for child in &self.children {
            result.push('\n');
            result.push_str(&child.as_string(&child_indent));
        }
        result
    }
}

/// Prefixes every line of `text` with `indent`
pub fn indent_lines(text: &str, indent: &str) -> String {
    text.split('\n')
        .map(|line| format!("{}{}", indent, line))
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string(""))
    }
}
