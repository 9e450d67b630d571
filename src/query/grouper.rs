//! Compiled `group by` instructions and the grouped result tree
//!
//! Each grouper maps a task to zero or more heading names. Names may carry
//! a hidden `%%key%%` prefix that controls their order and is removed
//! before display.

use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, LazyLock};

use super::field::compare_text;
use super::search_info::SearchInfo;
use super::statement::Statement;
use crate::domain::Task;

static SORT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^%%[^%]*%%\s*").expect("valid regex"));

/// Heading names for one task
pub type GroupFunction = Arc<dyn Fn(&Task, &SearchInfo<'_>) -> Vec<String> + Send + Sync>;

/// One grouping dimension
#[derive(Clone)]
pub struct Grouper {
    property: String,
    function: GroupFunction,
    reverse: bool,
    statement: Statement,
}

impl Grouper {
    pub fn new(instruction: &str, property: &str, function: GroupFunction, reverse: bool) -> Self {
        Self {
            property: property.to_string(),
            function,
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

    /// Heading names for `task`, without duplicates
    pub fn group_names(&self, task: &Task, search_info: &SearchInfo<'_>) -> Vec<String> {
        let mut names = (self.function)(task, search_info);
        let mut seen = Vec::with_capacity(names.len());
        names.retain(|name| {
            if seen.contains(name) {
                false
            } else {
                seen.push(name.clone());
                true
            }
        });
        names
    }

    fn compare_names(&self, a: &str, b: &str) -> Ordering {
        let ordering = compare_text(a, b).then_with(|| a.cmp(b));
        if self.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl fmt::Debug for Grouper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grouper")
            .field("property", &self.property)
            .field("reverse", &self.reverse)
            .finish_non_exhaustive()
    }
}

/// Removes a leading `%%key%%` from a heading name
pub fn display_name(group_name: &str) -> String {
    SORT_KEY_RE.replace(group_name, "").into_owned()
}

/// A heading to print before a group's tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupHeading {
    pub nesting_level: usize,
    pub property: String,
    pub display_name: String,
}

/// Tasks sharing one heading name per grouper
#[derive(Debug, Clone, Serialize)]
pub struct TaskGroup<'t> {
    /// Raw names, one per grouper, including any sort key
    pub groups: Vec<String>,
    /// Headings that change at this group, outermost first
    pub headings: Vec<GroupHeading>,
    pub tasks: Vec<&'t Task>,
}

/// All groups of a query result, in display order
#[derive(Debug, Clone, Serialize)]
pub struct TaskGroups<'t> {
    pub groups: Vec<TaskGroup<'t>>,
    /// Number of distinct tasks before any group limit
    pub total_tasks_count: usize,
}

impl<'t> TaskGroups<'t> {
    /// Groups already-sorted tasks; with no groupers everything lands in a
    /// single unnamed group
    pub fn new(groupers: &[Grouper], tasks: Vec<&'t Task>, search_info: &SearchInfo<'_>) -> Self {
        let total_tasks_count = tasks.len();
        let mut leaves = Vec::new();
        build_level(groupers, tasks, Vec::new(), search_info, &mut leaves);

        let mut groups: Vec<TaskGroup<'t>> = Vec::with_capacity(leaves.len());
        for (names, tasks) in leaves {
            let first_changed = groups
                .last()
                .map(|previous: &TaskGroup<'t>| {
                    names
                        .iter()
                        .zip(&previous.groups)
                        .position(|(a, b)| a != b)
                        .unwrap_or(names.len())
                })
                .unwrap_or(0);
            let headings = names
                .iter()
                .enumerate()
                .skip(first_changed)
                .map(|(level, name)| GroupHeading {
                    nesting_level: level,
                    property: groupers[level].property().to_string(),
                    display_name: display_name(name),
                })
                .filter(|heading| !heading.display_name.is_empty())
                .collect();
            groups.push(TaskGroup {
                groups: names,
                headings,
                tasks,
            });
        }

        Self {
            groups,
            total_tasks_count,
        }
    }

    /// Keeps at most `limit` tasks in each group
    pub fn apply_task_limit(&mut self, limit: usize) {
        for group in &mut self.groups {
            group.tasks.truncate(limit);
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of task rows shown, counting a task once per group it is in
    pub fn shown_tasks_count(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }
}

fn build_level<'t>(
    groupers: &[Grouper],
    tasks: Vec<&'t Task>,
    path: Vec<String>,
    search_info: &SearchInfo<'_>,
    leaves: &mut Vec<(Vec<String>, Vec<&'t Task>)>,
) {
    let Some((grouper, rest)) = groupers.split_first() else {
        leaves.push((path, tasks));
        return;
    };

    let mut children: Vec<(String, Vec<&'t Task>)> = Vec::new();
    for task in tasks {
        let mut names = grouper.group_names(task, search_info);
        if names.is_empty() {
            names.push(String::new());
        }
        for name in names {
            match children.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, members)) => members.push(task),
                None => children.push((name, vec![task])),
            }
        }
    }
    children.sort_by(|(a, _), (b, _)| grouper.compare_names(a, b));

    for (name, members) in children {
        let mut child_path = path.clone();
        child_path.push(name);
        build_level(rest, members, child_path, search_info, leaves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn by_tags() -> Grouper {
        Grouper::new(
            "group by tags",
            "tags",
            Arc::new(|task: &Task, _: &SearchInfo<'_>| task.tags.clone()),
            false,
        )
    }

    fn by_path() -> Grouper {
        Grouper::new(
            "group by path",
            "path",
            Arc::new(|task: &Task, _: &SearchInfo<'_>| vec![task.path.clone()]),
            false,
        )
    }

    #[test]
    fn strips_sort_keys() {
        assert_eq!(display_name("%%1%%High priority"), "High priority");
        assert_eq!(display_name("%%2%% Today"), "Today");
        assert_eq!(display_name("plain"), "plain");
    }

    #[test]
    fn no_groupers_gives_one_group() {
        let tasks = vec![Task::new("a"), Task::new("b")];
        let info = SearchInfo::new(&tasks, None, today());
        let groups = TaskGroups::new(&[], tasks.iter().collect(), &info);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.groups[0].tasks.len(), 2);
        assert!(groups.groups[0].headings.is_empty());
    }

    #[test]
    fn task_appears_under_each_tag() {
        let tasks = vec![
            Task { tags: vec!["#b".into(), "#a".into()], ..Task::new("both") },
            Task { tags: vec!["#a".into()], ..Task::new("one") },
            Task::new("none"),
        ];
        let info = SearchInfo::new(&tasks, None, today());
        let groups = TaskGroups::new(&[by_tags()], tasks.iter().collect(), &info);
        let names: Vec<&str> = groups.groups.iter().map(|g| g.groups[0].as_str()).collect();
        assert_eq!(names, vec!["", "#a", "#b"]);
        assert_eq!(groups.groups[1].tasks.len(), 2);
        assert_eq!(groups.total_tasks_count, 3);
        assert_eq!(groups.shown_tasks_count(), 4);
    }

    #[test]
    fn nested_headings_only_when_changed() {
        let tasks = vec![
            Task { path: "a.md".into(), tags: vec!["#x".into(), "#y".into()], ..Task::new("1") },
            Task { path: "b.md".into(), tags: vec!["#x".into()], ..Task::new("2") },
        ];
        let info = SearchInfo::new(&tasks, None, today());
        let groups = TaskGroups::new(&[by_path(), by_tags()], tasks.iter().collect(), &info);
        let headings: Vec<Vec<(usize, &str)>> = groups
            .groups
            .iter()
            .map(|g| g.headings.iter().map(|h| (h.nesting_level, h.display_name.as_str())).collect())
            .collect();
        assert_eq!(
            headings,
            vec![vec![(0, "a.md"), (1, "#x")], vec![(1, "#y")], vec![(0, "b.md"), (1, "#x")]]
        );
    }

    #[test]
    fn group_limit_truncates_each_group() {
        let tasks = vec![
            Task { path: "a.md".into(), ..Task::new("1") },
            Task { path: "a.md".into(), ..Task::new("2") },
            Task { path: "b.md".into(), ..Task::new("3") },
        ];
        let info = SearchInfo::new(&tasks, None, today());
        let mut groups = TaskGroups::new(&[by_path()], tasks.iter().collect(), &info);
        groups.apply_task_limit(1);
        assert_eq!(groups.shown_tasks_count(), 2);
        assert_eq!(groups.total_tasks_count, 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
            let tags = prop::collection::vec(prop::sample::select(vec!["#a", "#b", "#c"]), 0..3);
            let paths = prop::sample::select(vec!["a.md", "b.md", "c/d.md"]);
            prop::collection::vec((paths, tags), 0..8).prop_map(|entries| {
                entries
                    .into_iter()
                    .enumerate()
                    .map(|(i, (path, tags))| Task {
                        path: path.to_string(),
                        tags: tags.into_iter().map(str::to_string).collect(),
                        ..Task::new(i.to_string())
                    })
                    .collect()
            })
        }

        /// Group names with the sorted descriptions of their members
        fn summary(groups: &TaskGroups<'_>) -> Vec<(Vec<String>, Vec<String>)> {
            groups
                .groups
                .iter()
                .map(|g| {
                    let mut members: Vec<String> = g.tasks.iter().map(|t| t.description.clone()).collect();
                    members.sort();
                    (g.groups.clone(), members)
                })
                .collect()
        }

        proptest! {
            #[test]
            fn grouping_ignores_input_order(
                (tasks, shuffled) in arb_tasks().prop_flat_map(|tasks| (Just(tasks.clone()), Just(tasks).prop_shuffle()))
            ) {
                let groupers = [by_path(), by_tags()];
                let info = SearchInfo::new(&tasks, None, today());
                let original = TaskGroups::new(&groupers, tasks.iter().collect(), &info);
                let reordered = TaskGroups::new(&groupers, shuffled.iter().collect(), &info);
                prop_assert_eq!(summary(&original), summary(&reordered));
            }
        }
    }
}
