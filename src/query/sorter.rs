//! Compiled `sort by` instructions

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use super::search_info::SearchInfo;
use super::statement::Statement;
use crate::domain::Task;

/// A total order over tasks, ascending
pub type Comparator = Arc<dyn Fn(&Task, &Task, &SearchInfo<'_>) -> Ordering + Send + Sync>;

/// One link of the sort chain
#[derive(Clone)]
pub struct Sorter {
    property: String,
    comparator: Comparator,
    reverse: bool,
    statement: Statement,
}

impl Sorter {
    pub fn new(instruction: &str, property: &str, comparator: Comparator, reverse: bool) -> Self {
        Self {
            property: property.to_string(),
            comparator,
            reverse,
            statement: Statement::new(instruction, instruction),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    pub fn instruction(&self) -> &str {
        self.statement.any_placeholders_expanded()
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn set_statement(&mut self, statement: Statement) {
        self.statement = statement;
    }

    /// Compares two tasks; a reversed sorter is the exact negation
    pub fn compare(&self, a: &Task, b: &Task, search_info: &SearchInfo<'_>) -> Ordering {
        let ordering = (self.comparator)(a, b, search_info);
        if self.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl fmt::Debug for Sorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorter")
            .field("property", &self.property)
            .field("reverse", &self.reverse)
            .finish_non_exhaustive()
    }
}

/// Sorts `tasks` in place by each sorter in turn, stable for full ties
pub fn sort_tasks(tasks: &mut [&Task], sorters: &[Sorter], search_info: &SearchInfo<'_>) {
    tasks.sort_by(|a, b| {
        sorters
            .iter()
            .map(|sorter| sorter.compare(a, b, search_info))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn by_description() -> Comparator {
        Arc::new(|a: &Task, b: &Task, _: &SearchInfo<'_>| a.description.cmp(&b.description))
    }

    #[test]
    fn reverse_negates() {
        let tasks = vec![Task::new("a"), Task::new("b")];
        let info = SearchInfo::new(&tasks, None, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let normal = Sorter::new("sort by description", "description", by_description(), false);
        let reverse = Sorter::new("sort by description reverse", "description", by_description(), true);
        assert_eq!(normal.compare(&tasks[0], &tasks[1], &info), Ordering::Less);
        assert_eq!(reverse.compare(&tasks[0], &tasks[1], &info), Ordering::Greater);
        assert_eq!(reverse.compare(&tasks[0], &tasks[0], &info), Ordering::Equal);
    }

    #[test]
    fn later_sorters_break_ties() {
        let tasks = vec![
            Task { path: "b.md".into(), ..Task::new("x") },
            Task { path: "a.md".into(), ..Task::new("y") },
            Task { path: "a.md".into(), ..Task::new("x") },
        ];
        let info = SearchInfo::new(&tasks, None, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let by_path: Comparator = Arc::new(|a: &Task, b: &Task, _: &SearchInfo<'_>| a.path.cmp(&b.path));
        let sorters = [
            Sorter::new("sort by path", "path", by_path, false),
            Sorter::new("sort by description", "description", by_description(), false),
        ];
        let mut refs: Vec<&Task> = tasks.iter().collect();
        sort_tasks(&mut refs, &sorters, &info);
        let order: Vec<(&str, &str)> = refs.iter().map(|t| (t.path.as_str(), t.description.as_str())).collect();
        assert_eq!(order, vec![("a.md", "x"), ("a.md", "y"), ("b.md", "x")]);
    }

    mod properties {
        use super::*;
        use crate::domain::{Priority, TaskDate};
        use crate::query::fields;
        use proptest::prelude::*;

        fn arb_task() -> impl Strategy<Value = Task> {
            let priorities = prop::sample::select(Priority::ALL.to_vec());
            let dates = prop::option::of(prop::sample::select(vec!["2024-01-01", "2024-01-10", "2024-02-30", "2023-12-31"]));
            let tags = prop::collection::vec(prop::sample::select(vec!["#a", "#b", "#c/d"]), 0..3);
            ("[a-c]{0,3}", priorities, dates.clone(), dates, tags).prop_map(|(description, priority, due, start, tags)| Task {
                priority,
                due: due.map(TaskDate::parse),
                start: start.map(TaskDate::parse),
                tags: tags.into_iter().map(str::to_string).collect(),
                ..Task::new(description)
            })
        }

        proptest! {
            #[test]
            fn reverse_sorter_is_exact_negation(a in arb_task(), b in arb_task()) {
                let tasks = vec![a, b];
                let info = SearchInfo::new(&tasks, None, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
                for field in fields() {
                    let (Some(normal), Some(reverse)) = (field.create_normal_sorter(), field.create_reverse_sorter()) else {
                        continue;
                    };
                    prop_assert_eq!(
                        reverse.compare(&tasks[0], &tasks[1], &info),
                        normal.compare(&tasks[0], &tasks[1], &info).reverse(),
                        "field {}",
                        field.field_name()
                    );
                }
            }
        }
    }
}
