//! Golden tests for query explanations and grouped output
//!
//! These pin the exact text users see from `explain` and from a grouped
//! query result, so wording changes are deliberate.

use chrono::NaiveDate;
use tasks_query::cli::render_result;
use tasks_query::domain::{Priority, Status, Task, TaskDate, TasksFile};
use tasks_query::query::{Presets, Query, QueryContext, SearchInfo};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

fn parse(source: &str, file: Option<&TasksFile>) -> Query {
    let presets = Presets::defaults();
    let context = QueryContext {
        file,
        presets: &presets,
        today: today(),
    };
    Query::parse(source, &context)
}

fn make_task(description: &str, priority: Priority, tags: &[&str]) -> Task {
    Task {
        priority,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        path: "notes/a.md".to_string(),
        ..Task::new(description)
    }
}

// =============================================================================
// Explanations
// =============================================================================

#[test]
fn explain_filters_grouping_and_limits() {
    let query = parse(
        "not done\n\
         due this week\n\
         (tags include #work) OR NOT (priority is high)\n\
         group by status.type\n\
         limit groups 2",
        None,
    );

    assert_eq!(
        query.explain(),
        "not done\n\
         \n\
         due this week =>\n  \
         due date is between:\n    \
         2024-01-08 (Monday 8th January 2024) and\n    \
         2024-01-14 (Sunday 14th January 2024) inclusive\n\
         \n\
         (tags include #work) OR NOT (priority is high) =>\n  \
         OR (At least one of):\n    \
         tags include #work\n    \
         NOT (None of):\n      \
         priority is high\n\
         \n\
         group by status.type\n\
         \n\
         At most 2 tasks per group (if any \"group by\" options are supplied).\n"
    );
}

#[test]
fn explain_shows_preset_and_placeholder_expansion() {
    let file = TasksFile::new("notes/a.md");
    let query = parse("preset this_file", Some(&file));

    assert_eq!(
        query.explain(),
        "preset this_file =>\npath includes notes/a.md\n\nNo grouping instructions supplied.\n"
    );
}

#[test]
fn explain_without_filters() {
    let query = parse("sort by due\nlimit 1", None);

    assert_eq!(
        query.explain(),
        "No filters supplied. All tasks will match the query.\n\nNo grouping instructions supplied.\n\nAt most 1 task.\n"
    );
}

#[test]
fn explain_reports_the_error() {
    let query = parse("not done\ndue soonish", None);

    assert_eq!(
        query.explain(),
        "Query has an error:\ndo not understand due date\nProblem line: \"due soonish\"\n"
    );
}

// =============================================================================
// Grouped Output
// =============================================================================

#[test]
fn nested_groups_render_as_headings() {
    let tasks = vec![
        make_task("a #x #y", Priority::High, &["#x", "#y"]),
        make_task("b #x", Priority::None, &["#x"]),
        make_task("c", Priority::High, &[]),
    ];
    let query = parse("group by priority\ngroup by tags\nsort by description\nhide backlinks", None);
    let info = SearchInfo::new(&tasks, None, today());
    let result = query.apply(&info);

    assert_eq!(
        render_result(&result, query.layout(), today()),
        "#### High priority\n\
         ##### #x\n\
         - [ ] a #x #y ⏫\n\
         ##### #y\n\
         - [ ] a #x #y ⏫\n\
         ##### (No tags)\n\
         - [ ] c ⏫\n\
         #### Normal priority\n\
         ##### #x\n\
         - [ ] b #x\n\
         3 tasks\n"
    );
}

#[test]
fn group_limit_applies_per_group() {
    let tasks = vec![
        Task {
            status: Status::done(),
            ..make_task("done one", Priority::None, &[])
        },
        Task {
            status: Status::done(),
            ..make_task("done two", Priority::None, &[])
        },
        make_task("open one", Priority::None, &[]),
        make_task("open two", Priority::None, &[]),
    ];
    let query = parse("group by status\nsort by description\nlimit groups 1\nhide backlinks", None);
    let info = SearchInfo::new(&tasks, None, today());
    let result = query.apply(&info);

    assert_eq!(result.total_matched, 4);
    assert_eq!(
        render_result(&result, query.layout(), today()),
        "#### Done\n- [x] done one\n#### Todo\n- [ ] open one\n4 tasks\n"
    );
}

#[test]
fn date_groups_put_undated_last() {
    let tasks = vec![
        make_task("undated", Priority::None, &[]),
        Task {
            due: Some(TaskDate::parse("2024-01-12")),
            ..make_task("dated", Priority::None, &[])
        },
    ];
    let query = parse("group by due\nhide backlinks\nhide task count", None);
    let info = SearchInfo::new(&tasks, None, today());
    let result = query.apply(&info);

    assert_eq!(
        render_result(&result, query.layout(), today()),
        "#### 2024-01-12 Friday\n- [ ] dated 📅 2024-01-12\n#### No due date\n- [ ] undated\n"
    );
}
