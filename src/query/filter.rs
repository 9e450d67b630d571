//! Compiled filter instructions

use std::fmt;
use std::sync::Arc;

use super::explanation::Explanation;
use super::search_info::SearchInfo;
use super::statement::Statement;
use crate::domain::Task;

/// Predicate run for every task; `Err` carries a per-task failure message
pub type FilterFunction = Arc<dyn Fn(&Task, &SearchInfo<'_>) -> Result<bool, String> + Send + Sync>;

/// A working filter for one instruction
#[derive(Clone)]
pub struct Filter {
    instruction: String,
    statement: Statement,
    function: FilterFunction,
    explanation: Explanation,
}

impl Filter {
    pub fn new(instruction: &str, function: FilterFunction, explanation: Explanation) -> Self {
        Self {
            instruction: instruction.to_string(),
            statement: Statement::new(instruction, instruction),
            function,
            explanation,
        }
    }

    /// A filter that never fails
    pub fn from_predicate(
        instruction: &str,
        predicate: impl Fn(&Task, &SearchInfo<'_>) -> bool + Send + Sync + 'static,
        explanation: Explanation,
    ) -> Self {
        Self::new(instruction, Arc::new(move |task, info| Ok(predicate(task, info))), explanation)
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn set_statement(&mut self, statement: Statement) {
        self.statement = statement;
    }

    pub fn explanation(&self) -> &Explanation {
        &self.explanation
    }

    pub fn function(&self) -> &FilterFunction {
        &self.function
    }

    pub fn matches(&self, task: &Task, search_info: &SearchInfo<'_>) -> Result<bool, String> {
        (self.function)(task, search_info)
    }

    /// The statement, followed by the explanation when it says more
    pub fn explain_filter_indented(&self, indent: &str) -> String {
        let mut result = self.statement.explain(indent);
        let explanation = self.explanation.as_string("");
        if explanation != self.statement.any_placeholders_expanded() {
            result.push_str(" =>\n");
            result.push_str(&self.explanation.as_string(&format!("{}  ", indent)));
        }
        result.push('\n');
        result
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("instruction", &self.instruction)
            .field("explanation", &self.explanation)
            .finish_non_exhaustive()
    }
}

/// Result of compiling one instruction: exactly one of a filter or an error
#[derive(Debug, Clone)]
pub struct FilterOrErrorMessage {
    instruction: String,
    outcome: Result<Filter, String>,
}

impl FilterOrErrorMessage {
    pub fn from_filter(filter: Filter) -> Self {
        Self {
            instruction: filter.instruction.clone(),
            outcome: Ok(filter),
        }
    }

    pub fn from_error(instruction: &str, error: impl Into<String>) -> Self {
        Self {
            instruction: instruction.to_string(),
            outcome: Err(error.into()),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.outcome.as_ref().ok()
    }

    pub fn filter_function(&self) -> Option<&FilterFunction> {
        self.filter().map(Filter::function)
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    pub fn into_result(self) -> Result<Filter, String> {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn exactly_one_of_filter_or_error() {
        let ok = FilterOrErrorMessage::from_filter(Filter::from_predicate(
            "done",
            |task, _| task.is_done(),
            Explanation::new("done"),
        ));
        assert!(ok.filter_function().is_some());
        assert!(ok.error().is_none());

        let bad = FilterOrErrorMessage::from_error("due soon", "do not understand due date");
        assert!(bad.filter().is_none());
        assert_eq!(bad.error(), Some("do not understand due date"));
    }

    #[test]
    fn explanation_is_appended_when_different() {
        let filter = Filter::from_predicate(
            "due before tomorrow",
            |_, _| true,
            Explanation::new("due date is before 2024-01-11 (Thursday 11th January 2024)"),
        );
        assert_eq!(
            filter.explain_filter_indented(""),
            "due before tomorrow =>\n  due date is before 2024-01-11 (Thursday 11th January 2024)\n"
        );

        let filter = Filter::from_predicate("not done", |task, _| !task.is_done(), Explanation::new("not done"));
        assert_eq!(filter.explain_filter_indented(""), "not done\n");
    }

    #[test]
    fn matches_runs_the_predicate() {
        let tasks = vec![Task::new("a")];
        let info = SearchInfo::new(&tasks, None, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let filter = Filter::from_predicate("not done", |task, _| !task.is_done(), Explanation::new("not done"));
        assert_eq!(filter.matches(&tasks[0], &info), Ok(true));
    }
}
