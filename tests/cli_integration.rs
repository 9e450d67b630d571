//! CLI integration tests for the tasks binary
//!
//! These tests run the compiled binary against task lists, notes and
//! settings files in temporary directories.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TASKS: &str = r##"{"status":" ","description":"Buy milk #shopping","path":"home/Errands.md","line_number":1,"heading":"Shop","tags":["#shopping"],"priority":"high","due":"2024-01-09"}
{"status":"x","description":"File taxes","path":"home/Admin.md","line_number":3,"due":"2024-01-04","done":"2024-01-05"}
{"status":" ","description":"Write report #work","path":"work/Report.md","line_number":0,"tags":["#work"],"due":"2024-01-15","id":"rpt"}
{"status":"/","description":"Review draft #work","path":"work/Report.md","line_number":1,"tags":["#work"],"scheduled":"2024-01-10","depends_on":["rpt"]}
{"status":" ","description":"Water plants","path":"home/Errands.md","line_number":2,"recurrence":"every week","due":"2024-01-08"}
"##;

/// Get a command instance for the tasks binary, isolated from the user's settings
fn tasks_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("tasks"));
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("TASKS_CONFIG")
        .env_remove("TASKS_LOG");
    cmd
}

/// Create a temporary directory holding `tasks.jsonl`
fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tasks.jsonl"), TASKS).unwrap();
    dir
}

fn write_settings(dir: &Path, content: &str) {
    fs::create_dir_all(dir.join(".tasks")).unwrap();
    fs::write(dir.join(".tasks/config.toml"), content).unwrap();
}

fn query_stdout(dir: &Path, instructions: &[&str]) -> String {
    let mut cmd = tasks_cmd(dir);
    cmd.args(["query", "--tasks", "tasks.jsonl", "--today", "2024-01-10"]);
    for instruction in instructions {
        cmd.args(["-i", instruction]);
    }
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_query_filters_and_sorts() {
    let dir = setup();

    let stdout = query_stdout(dir.path(), &["not done", "sort by description"]);
    assert_eq!(
        stdout,
        "- [ ] Buy milk #shopping ⏫ 📅 2024-01-09 (Errands > Shop)\n\
         - [/] Review draft #work ⏳ 2024-01-10 ⛔ rpt (Report)\n\
         - [ ] Water plants 🔁 every week 📅 2024-01-08 (Errands)\n\
         - [ ] Write report #work 📅 2024-01-15 🆔 rpt (Report)\n\
         4 tasks\n"
    );
}

#[test]
fn test_query_default_sort_is_by_urgency() {
    let dir = setup();

    let stdout = query_stdout(dir.path(), &["not done", "hide backlinks", "short mode"]);
    let descriptions: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        descriptions,
        vec![
            "- [ ] Buy milk #shopping ⏫ 📅",
            "- [ ] Water plants 🔁 📅",
            "- [ ] Write report #work 📅 🆔",
            "- [/] Review draft #work ⏳ ⛔",
            "4 tasks",
        ]
    );
}

#[test]
fn test_query_groups_by_folder() {
    let dir = setup();

    let stdout = query_stdout(dir.path(), &["group by folder", "sort by description", "hide task count"]);
    let headings: Vec<&str> = stdout.lines().filter(|l| l.starts_with('#')).collect();
    assert_eq!(headings, vec!["#### home/", "#### work/"]);
    assert!(stdout.contains("- [x] File taxes"));
    assert!(!stdout.contains("tasks\n"));
}

#[test]
fn test_query_boolean_and_limit() {
    let dir = setup();

    let stdout = query_stdout(
        dir.path(),
        &["(tags include #work) OR (priority is high)", "sort by description", "limit 2"],
    );
    assert!(stdout.contains("Buy milk"));
    assert!(stdout.contains("Review draft"));
    assert!(!stdout.contains("Write report"));
    assert!(stdout.ends_with("2 tasks\n"));
}

#[test]
fn test_query_blocking() {
    let dir = setup();

    let stdout = query_stdout(dir.path(), &["is blocked", "hide task count"]);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("Review draft"));
}

#[test]
fn test_query_from_file_with_continuations() {
    let dir = setup();
    fs::write(
        dir.path().join("query.txt"),
        "# open work\nnot done\ndescription includes \\\n  report\n",
    )
    .unwrap();

    tasks_cmd(dir.path())
        .args(["query", "--tasks", "tasks.jsonl", "--query", "query.txt", "--today", "2024-01-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write report"))
        .stdout(predicate::str::contains("Buy milk").not());
}

#[test]
fn test_query_with_explain_prints_both() {
    let dir = setup();

    let stdout = query_stdout(dir.path(), &["explain", "due before 2024-01-10"]);
    assert!(stdout.starts_with("due before 2024-01-10 =>\n  due date is before 2024-01-10 (Wednesday 10th January 2024)\n"));
    assert!(stdout.contains("- [ ] Buy milk"));
}

#[test]
fn test_query_error_fails() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["query", "--tasks", "tasks.jsonl", "-i", "not done", "-i", "wibble"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("do not understand query"))
        .stderr(predicate::str::contains("Problem line: \"wibble\""));
}

#[test]
fn test_query_requires_a_source() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["query", "--tasks", "tasks.jsonl"])
        .assert()
        .failure();
}

#[test]
fn test_query_missing_task_file() {
    let dir = TempDir::new().unwrap();

    tasks_cmd(dir.path())
        .args(["query", "--tasks", "nothing.jsonl", "-i", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open task store"));
}

#[test]
fn test_query_json_output() {
    let dir = setup();

    let output = tasks_cmd(dir.path())
        .args(["--format", "json", "query", "--tasks", "tasks.jsonl", "--today", "2024-01-10", "-i", "done"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["total_matched"], 1);
    assert_eq!(json["groups"]["groups"][0]["tasks"][0]["description"], "File taxes");
    assert!(json["explanation"].is_null());
}

#[test]
fn test_verbose_logs_to_stderr() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["query", "--tasks", "tasks.jsonl", "-i", "done", "--verbose"])
        .assert()
        .success()
        .stderr(predicate::str::contains("[verbose:query] Loaded 5 tasks"));
}

// =============================================================================
// Placeholder and Preset Tests
// =============================================================================

#[test]
fn test_placeholders_use_the_note() {
    let dir = setup();
    fs::create_dir_all(dir.path().join("home")).unwrap();
    fs::write(dir.path().join("home/Errands.md"), "---\ntopic: milk\n---\n# Errands\n").unwrap();

    tasks_cmd(dir.path())
        .args(["query", "--tasks", "tasks.jsonl", "--file", "home/Errands.md"])
        .args(["-i", "folder includes {{query.file.folder}}"])
        .args(["-i", "description includes {{query.file.property('topic')}}"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Buy milk"))
        .stdout(predicate::str::contains("Water plants").not());
}

#[test]
fn test_placeholder_without_note_fails() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["query", "--tasks", "tasks.jsonl", "-i", "path includes {{query.file.path}}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no file path has been supplied"));
}

#[test]
fn test_default_preset_this_file() {
    let dir = setup();
    fs::create_dir_all(dir.path().join("work")).unwrap();
    fs::write(dir.path().join("work/Report.md"), "# Report\n").unwrap();

    let stdout = String::from_utf8(
        tasks_cmd(dir.path())
            .args(["query", "--tasks", "tasks.jsonl", "--file", "work/Report.md", "-i", "preset this_file"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone(),
    )
    .unwrap();
    assert!(stdout.contains("Write report"));
    assert!(stdout.contains("Review draft"));
    assert!(stdout.ends_with("2 tasks\n"));
}

#[test]
fn test_configured_presets() {
    let dir = setup();
    write_settings(
        dir.path(),
        "[presets]\nwork_only = \"tags include #work\"\nopen_work = \"preset work_only\\nnot done\"\n",
    );

    let stdout = query_stdout(dir.path(), &["preset open_work", "hide task count"]);
    assert_eq!(stdout.lines().count(), 2);

    tasks_cmd(dir.path())
        .args(["query", "--tasks", "tasks.jsonl", "-i", "preset nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot find preset \"nope\""))
        .stderr(predicate::str::contains("open_work"));
}

#[test]
fn test_presets_command() {
    let dir = setup();

    tasks_cmd(dir.path())
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("  this_file           : path includes {{query.file.path}}"))
        .stdout(predicate::str::contains("hide_everything"));
}

// =============================================================================
// Settings Tests
// =============================================================================

#[test]
fn test_global_query() {
    let dir = setup();
    write_settings(dir.path(), "global_query = \"not done\"\n");

    let stdout = query_stdout(dir.path(), &["path includes home"]);
    assert!(!stdout.contains("File taxes"));

    let stdout = query_stdout(dir.path(), &["path includes home", "ignore global query"]);
    assert!(stdout.contains("File taxes"));
}

#[test]
fn test_explicit_config_and_default_format() {
    let dir = setup();
    let settings = dir.path().join("custom.toml");
    fs::write(&settings, "default_format = \"json\"\n").unwrap();

    let output = tasks_cmd(dir.path())
        .args(["--config", settings.to_str().unwrap(), "presets"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["this_root"], "root includes {{query.file.root}}");
}

#[test]
fn test_bad_settings_fail() {
    let dir = setup();
    write_settings(dir.path(), "statuses = 3\n");

    tasks_cmd(dir.path())
        .arg("presets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse settings"));
}

#[test]
fn test_explain_command() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["explain", "--tasks", "tasks.jsonl", "-i", "not done", "-i", "group by due", "-i", "limit 5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not done\n"))
        .stdout(predicate::str::contains("group by due\n"))
        .stdout(predicate::str::contains("At most 5 tasks."));
}

// =============================================================================
// Status Tests
// =============================================================================

#[test]
fn test_status_report() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["status", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| Status Symbol | Next Status Symbol |"))
        .stdout(predicate::str::contains("| `space` | `x` | Todo | `TODO` |  |"));
}

#[test]
fn test_status_report_lists_unknown_symbols() {
    let dir = setup();
    let tasks = format!(
        "{}{}\n",
        TASKS,
        r#"{"status":"?","description":"Ask around","path":"home/Errands.md","line_number":4}"#
    );
    fs::write(dir.path().join("tasks.jsonl"), tasks).unwrap();

    tasks_cmd(dir.path())
        .args(["status", "report", "--tasks", "tasks.jsonl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("`?`: Unknown (?)"))
        .stdout(predicate::str::contains("`/`: Unknown").not());
}

#[test]
fn test_status_diagram() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["status", "diagram", "--detailed"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("```mermaid\nflowchart LR\n"));
}

#[test]
fn test_status_check() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["status", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no problems found"));

    write_settings(
        dir.path(),
        "[[statuses]]\nsymbol = \" \"\nname = \"Todo\"\nnext = \"?\"\ntype = \"TODO\"\n",
    );
    tasks_cmd(dir.path())
        .args(["status", "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Next symbol `?` is unknown"));
}

// =============================================================================
// Toggle Tests
// =============================================================================

#[test]
fn test_toggle_completes_task() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["toggle", "--tasks", "tasks.jsonl", "--line", "1", "--today", "2024-01-10"])
        .assert()
        .success()
        .stdout("- [x] Buy milk #shopping ⏫ 📅 2024-01-09 ✅ 2024-01-10\n");

    let stdout = query_stdout(dir.path(), &["done", "hide task count", "hide backlinks"]);
    assert!(stdout.contains("- [x] Buy milk #shopping ⏫ 📅 2024-01-09 ✅ 2024-01-10"));
}

#[test]
fn test_toggle_recurring_task() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["toggle", "--tasks", "tasks.jsonl", "--line", "5", "--today", "2024-01-10"])
        .assert()
        .success()
        .stdout(
            "- [ ] Water plants 🔁 every week 📅 2024-01-15\n\
             - [x] Water plants 🔁 every week 📅 2024-01-08 ✅ 2024-01-10\n",
        );

    let content = fs::read_to_string(dir.path().join("tasks.jsonl")).unwrap();
    assert_eq!(content.lines().count(), 6);
}

#[test]
fn test_toggle_without_done_dates() {
    let dir = setup();
    write_settings(dir.path(), "set_done_date = false\n");

    tasks_cmd(dir.path())
        .args(["toggle", "--tasks", "tasks.jsonl", "--line", "1", "--today", "2024-01-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✅").not());
}

#[test]
fn test_toggle_bad_line() {
    let dir = setup();

    tasks_cmd(dir.path())
        .args(["toggle", "--tasks", "tasks.jsonl", "--line", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No task at record 9"));
}
