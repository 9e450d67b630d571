//! One instruction and the text it went through before parsing

use serde::Serialize;

/// An instruction as written, after joining continuation lines, and after
/// expanding placeholders and presets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    raw_instruction: String,
    any_continuation_lines_removed: String,
    any_placeholders_expanded: String,
}

impl Statement {
    pub fn new(raw_instruction: impl Into<String>, any_continuation_lines_removed: impl Into<String>) -> Self {
        let any_continuation_lines_removed = any_continuation_lines_removed.into().trim().to_string();
        Self {
            raw_instruction: raw_instruction.into(),
            any_placeholders_expanded: any_continuation_lines_removed.clone(),
            any_continuation_lines_removed,
        }
    }

    pub fn raw_instruction(&self) -> &str {
        &self.raw_instruction
    }

    pub fn any_continuation_lines_removed(&self) -> &str {
        &self.any_continuation_lines_removed
    }

    pub fn any_placeholders_expanded(&self) -> &str {
        &self.any_placeholders_expanded
    }

    pub fn record_expanded_placeholders(&mut self, instruction: impl Into<String>) {
        self.any_placeholders_expanded = instruction.into();
    }

    /// Returns true if expansion did not change the raw text
    pub fn is_unchanged(&self) -> bool {
        self.raw_instruction == self.any_continuation_lines_removed
            && self.any_continuation_lines_removed == self.any_placeholders_expanded
    }

    /// Shows each form the instruction took, joined by `=>`
    pub fn explain(&self, indent: &str) -> String {
        let raw = self.raw_instruction.trim();
        let mut result = format!("{}{}", indent, raw.replace('\n', &format!("\n{}", indent)));
        if raw.contains('\n') {
            result.push('\n');
            result.push_str(indent);
        }

        let mut previous = raw;
        for next in [self.any_continuation_lines_removed.as_str(), self.any_placeholders_expanded.as_str()] {
            if next != previous {
                result.push_str(" =>\n");
                result.push_str(indent);
                result.push_str(next);
                previous = next;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_statement_explains_as_itself() {
        let statement = Statement::new("not done", "not done");
        assert!(statement.is_unchanged());
        assert_eq!(statement.explain("  "), "  not done");
    }

    #[test]
    fn continuation_lines_are_shown() {
        let statement = Statement::new("due \\\n  before tomorrow", "due before tomorrow");
        assert_eq!(
            statement.explain(""),
            "due \\\n  before tomorrow\n =>\ndue before tomorrow"
        );
    }

    #[test]
    fn expansions_are_shown() {
        let mut statement = Statement::new("preset this_file", "preset this_file");
        statement.record_expanded_placeholders("path includes a/b.md");
        assert!(!statement.is_unchanged());
        assert_eq!(statement.explain(""), "preset this_file =>\npath includes a/b.md");
    }
}
