//! Context shared by every filter, sorter and grouper in one query pass

use chrono::NaiveDate;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

use crate::domain::{Task, TasksFile};
use crate::scripting::QueryView;

/// The searched tasks, the note holding the query, and a per-pass cache.
///
/// Create one per evaluation and drop it afterwards; cached values are
/// only valid for the task list it was built with.
pub struct SearchInfo<'a> {
    all_tasks: &'a [Task],
    file: Option<&'a TasksFile>,
    today: NaiveDate,
    cache: RefCell<HashMap<String, Rc<dyn Any>>>,
}

impl<'a> SearchInfo<'a> {
    pub fn new(all_tasks: &'a [Task], file: Option<&'a TasksFile>, today: NaiveDate) -> Self {
        Self {
            all_tasks,
            file,
            today,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn all_tasks(&self) -> &'a [Task] {
        self.all_tasks
    }

    pub fn file(&self) -> Option<&'a TasksFile> {
        self.file
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// The `query` binding seen by expressions
    pub fn query_view(&self) -> QueryView<'a> {
        QueryView {
            all_tasks: self.all_tasks,
            file: self.file,
        }
    }

    /// Returns the value cached under `key`, computing it on first use.
    ///
    /// A key already holding a value of another type is recomputed and
    /// replaced.
    pub fn memoize<T: 'static>(&self, key: &str, compute: impl FnOnce(&Self) -> T) -> Rc<T> {
        if let Some(cached) = self.cache.borrow().get(key).cloned() {
            if let Ok(value) = cached.downcast::<T>() {
                return value;
            }
        }
        trace!(key, "Computing cached value");
        let value = Rc::new(compute(self));
        self.cache
            .borrow_mut()
            .insert(key.to_string(), value.clone() as Rc<dyn Any>);
        value
    }
}

impl std::fmt::Debug for SearchInfo<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchInfo")
            .field("tasks", &self.all_tasks.len())
            .field("file", &self.file.map(TasksFile::path))
            .field("today", &self.today)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn memoize_computes_once() {
        let tasks = vec![Task::new("a"), Task::new("b")];
        let info = SearchInfo::new(&tasks, None, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let calls = Cell::new(0);

        let first = info.memoize("count", |info| {
            calls.set(calls.get() + 1);
            info.all_tasks().len()
        });
        let second = info.memoize("count", |_| {
            calls.set(calls.get() + 1);
            0usize
        });

        assert_eq!(*first, 2);
        assert_eq!(*second, 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn query_view_exposes_file() {
        let tasks = Vec::new();
        let file = TasksFile::new("a/b.md");
        let info = SearchInfo::new(&tasks, Some(&file), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(info.query_view().file.map(TasksFile::path), Some("a/b.md"));
    }
}
