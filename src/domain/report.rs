//! Advisory report on a status configuration
//!
//! Problems never stop a configuration from loading; they are listed so
//! the user can decide whether to fix them.

use serde::Serialize;
use std::collections::HashSet;

use super::status::{Status, StatusType};
use super::validator::StatusValidator;

/// A configured status with the advisories raised against it
#[derive(Debug, Clone, Serialize)]
pub struct StatusProblems {
    pub status: Status,
    pub problems: Vec<String>,
}

fn printable_symbol(symbol: &str) -> String {
    match symbol {
        "" => String::new(),
        " " => "`space`".to_string(),
        s => format!("`{}`", s),
    }
}

/// Checks every status in configuration order
pub fn check_statuses(statuses: &[Status]) -> Vec<StatusProblems> {
    let mut seen: HashSet<&str> = HashSet::new();
    statuses
        .iter()
        .map(|status| {
            let problems = problems_for(statuses, status, &seen);
            seen.insert(status.symbol.as_str());
            StatusProblems {
                status: status.clone(),
                problems,
            }
        })
        .collect()
}

fn problems_for(statuses: &[Status], status: &Status, seen: &HashSet<&str>) -> Vec<String> {
    let mut problems = Vec::new();

    if status.symbol.is_empty() {
        problems.push("Empty symbol: this status will be ignored.".to_string());
        return problems;
    }

    if seen.contains(status.symbol.as_str()) {
        problems.push(format!(
            "Duplicate symbol '{}': this status will be ignored.",
            printable_symbol(&status.symbol)
        ));
        return problems;
    }

    // Empty symbols were handled above
    problems.extend(
        StatusValidator::validate(status)
            .into_iter()
            .filter(|p| !p.starts_with("Task Status Symbol cannot")),
    );

    let conventional = StatusType::conventional_for_symbol(&status.symbol);
    let worth_mentioning = conventional != StatusType::Todo || status.symbol == " ";
    if worth_mentioning && conventional != status.status_type {
        problems.push(format!(
            "For information, the conventional type for status symbol {} is {}: you may wish to review this type.",
            printable_symbol(&status.symbol),
            printable_symbol(conventional.as_str())
        ));
    }

    if status.toggles_to_itself() && status.status_type != StatusType::NonTask {
        problems.push(format!(
            "This status toggles to itself: only {} statuses should do that, or tasks can never change.",
            printable_symbol(StatusType::NonTask.as_str())
        ));
    }

    let next = statuses.iter().find(|s| s.symbol == status.next_symbol);
    match next {
        None if !status.next_symbol.is_empty() => {
            problems.push(format!(
                "Next symbol {} is unknown: create a status with symbol {}.",
                printable_symbol(&status.next_symbol),
                printable_symbol(&status.next_symbol)
            ));
        }
        Some(next) if status.status_type == StatusType::Done => {
            if !matches!(next.status_type, StatusType::Todo | StatusType::InProgress) {
                problems.push(format!(
                    "This `DONE` status is followed by {}, not `TODO` or `IN_PROGRESS`.",
                    printable_symbol(next.status_type.as_str())
                ));
                problems.push(
                    "If used to complete a recurring task, it will instead be followed by `TODO` or `IN_PROGRESS`, to ensure the next task matches the `not done` filter."
                        .to_string(),
                );
            }
        }
        _ => {}
    }

    problems
}

/// Markdown table of statuses with their problems
pub fn status_settings_report(statuses: &[Status]) -> String {
    let mut table = String::from(
        "| Status Symbol | Next Status Symbol | Status Name | Status Type | Problems (if any) |\n\
         | ----- | ----- | ----- | ----- | ----- |\n",
    );
    for entry in check_statuses(statuses) {
        let status = &entry.status;
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            printable_symbol(&status.symbol),
            printable_symbol(&status.next_symbol),
            status.name,
            printable_symbol(status.status_type.as_str()),
            entry.problems.join("<br>")
        ));
    }
    table
}
