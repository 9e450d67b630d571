//! Task statuses
//!
//! A status pairs the one-character checkbox symbol (`- [x]`) with a name,
//! the symbol a task moves to when toggled, and a coarse [`StatusType`]
//! that drives "done" filtering and recurrence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StatusError {
    #[error("Unknown status type: {0}")]
    UnknownType(String),
}

/// Coarse classification of a status symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    Todo,
    InProgress,
    Done,
    Cancelled,
    NonTask,
    Empty,
}

impl StatusType {
    /// Every type, in declaration order
    pub const ALL: [StatusType; 6] = [
        StatusType::Todo,
        StatusType::InProgress,
        StatusType::Done,
        StatusType::Cancelled,
        StatusType::NonTask,
        StatusType::Empty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusType::Todo => "TODO",
            StatusType::InProgress => "IN_PROGRESS",
            StatusType::Done => "DONE",
            StatusType::Cancelled => "CANCELLED",
            StatusType::NonTask => "NON_TASK",
            StatusType::Empty => "EMPTY",
        }
    }

    /// Position used when sorting and grouping by type.
    ///
    /// Work in progress comes first, then open work, then closed work.
    pub fn sort_order(&self) -> u8 {
        match self {
            StatusType::InProgress => 1,
            StatusType::Todo => 2,
            StatusType::Done => 3,
            StatusType::Cancelled => 4,
            StatusType::NonTask => 5,
            StatusType::Empty => 6,
        }
    }

    /// Group heading with a hidden sort key, e.g. `%%1%%IN_PROGRESS`
    pub fn group_text(&self) -> String {
        format!("%%{}%%{}", self.sort_order(), self.as_str())
    }

    /// Returns true for types that count as finished work
    pub fn counts_as_done(&self) -> bool {
        matches!(self, StatusType::Done | StatusType::Cancelled | StatusType::NonTask)
    }

    /// The type conventionally associated with a checkbox symbol
    pub fn conventional_for_symbol(symbol: &str) -> StatusType {
        match symbol {
            "x" | "X" => StatusType::Done,
            "/" => StatusType::InProgress,
            "-" => StatusType::Cancelled,
            "" => StatusType::Empty,
            _ => StatusType::Todo,
        }
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusType {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(' ', "_");
        StatusType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| StatusError::UnknownType(s.to_string()))
    }
}

fn default_available() -> bool {
    true
}

/// An immutable task status
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    /// Checkbox symbol; empty only for the EMPTY sentinel
    pub symbol: String,

    pub name: String,

    /// Symbol of the status a task moves to when toggled
    #[serde(rename = "next")]
    pub next_symbol: String,

    #[serde(rename = "type")]
    pub status_type: StatusType,

    /// Whether the host should offer this status as a command
    #[serde(default = "default_available")]
    pub available_as_command: bool,
}

impl Status {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        next_symbol: impl Into<String>,
        status_type: StatusType,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            next_symbol: next_symbol.into(),
            status_type,
            available_as_command: true,
        }
    }

    pub fn todo() -> Self {
        Self::new(" ", "Todo", "x", StatusType::Todo)
    }

    pub fn in_progress() -> Self {
        Self::new("/", "In Progress", "x", StatusType::InProgress)
    }

    pub fn done() -> Self {
        Self::new("x", "Done", " ", StatusType::Done)
    }

    pub fn cancelled() -> Self {
        Self::new("-", "Cancelled", " ", StatusType::Cancelled)
    }

    /// The sentinel used where no real status applies
    pub fn empty() -> Self {
        Self {
            available_as_command: false,
            ..Self::new("", "EMPTY", "", StatusType::Empty)
        }
    }

    /// Placeholder for a symbol found in a task but absent from the registry
    pub fn unknown(symbol: impl Into<String>) -> Self {
        Self {
            available_as_command: false,
            ..Self::new(symbol, "Unknown", "x", StatusType::Todo)
        }
    }

    /// The four statuses every registry starts with
    pub fn defaults() -> Vec<Status> {
        vec![Self::todo(), Self::in_progress(), Self::done(), Self::cancelled()]
    }

    /// Returns true if this status marks the task as DONE
    pub fn is_completed(&self) -> bool {
        self.status_type == StatusType::Done
    }

    pub fn is_cancelled(&self) -> bool {
        self.status_type == StatusType::Cancelled
    }

    /// Returns true if toggling leaves a task on this same status
    pub fn toggles_to_itself(&self) -> bool {
        self.symbol == self.next_symbol
    }

    /// Group heading for this status's type
    pub fn type_group_text(&self) -> String {
        self.status_type.group_text()
    }

    /// One-line summary, e.g. `- [x] => [ ], name: 'Done', type: 'DONE'.`
    pub fn preview_text(&self) -> String {
        format!(
            "- [{}] => [{}], name: '{}', type: '{}'.",
            self.symbol, self.next_symbol, self.name, self.status_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_types() {
        assert_eq!(StatusType::conventional_for_symbol("x"), StatusType::Done);
        assert_eq!(StatusType::conventional_for_symbol("X"), StatusType::Done);
        assert_eq!(StatusType::conventional_for_symbol("/"), StatusType::InProgress);
        assert_eq!(StatusType::conventional_for_symbol("-"), StatusType::Cancelled);
        assert_eq!(StatusType::conventional_for_symbol(""), StatusType::Empty);
        assert_eq!(StatusType::conventional_for_symbol("?"), StatusType::Todo);
    }

    #[test]
    fn type_group_text_orders_in_progress_first() {
        assert_eq!(StatusType::InProgress.group_text(), "%%1%%IN_PROGRESS");
        assert_eq!(StatusType::Todo.group_text(), "%%2%%TODO");
        assert_eq!(StatusType::Empty.group_text(), "%%6%%EMPTY");
    }

    #[test]
    fn parse_status_type() {
        assert_eq!("done".parse::<StatusType>(), Ok(StatusType::Done));
        assert_eq!("In Progress".parse::<StatusType>(), Ok(StatusType::InProgress));
        assert_eq!("NON_TASK".parse::<StatusType>(), Ok(StatusType::NonTask));
        assert!("finished".parse::<StatusType>().is_err());
    }

    #[test]
    fn preview_text() {
        assert_eq!(
            Status::done().preview_text(),
            "- [x] => [ ], name: 'Done', type: 'DONE'."
        );
    }

    #[test]
    fn unknown_status_is_todo_moving_to_done() {
        let status = Status::unknown("?");
        assert_eq!(status.name, "Unknown");
        assert_eq!(status.next_symbol, "x");
        assert_eq!(status.status_type, StatusType::Todo);
        assert!(!status.available_as_command);
    }

    #[test]
    fn deserialize_from_toml() {
        let status: Status = toml::from_str(
            r#"
symbol = "!"
name = "Important"
next = "x"
type = "TODO"
"#,
        )
        .unwrap();

        assert_eq!(status.symbol, "!");
        assert_eq!(status.status_type, StatusType::Todo);
        assert!(status.available_as_command);
    }
}
