//! Domain models for tasks and statuses
//!
//! Contains the core task logic without any I/O concerns.

mod date;
mod duration;
mod file;
mod priority;
mod recurrence;
mod registry;
mod report;
mod status;
mod task;
mod toggle;
mod validator;

pub use date::{
    compare_dates, format_heading, format_long, parse_date, parse_date_range, period_range, shift_months,
    DateCategory, DateRange, TaskDate, DATE_FORMAT,
};
pub use duration::{Duration, DurationError};
pub use file::TasksFile;
pub use priority::Priority;
pub use recurrence::{Frequency, MonthDay, Occurrence, Recurrence, RecurrenceError, RecurrenceRule};
pub use registry::{StatusRegistry, TransitionGraph, TransitionKind};
pub use report::{check_statuses, status_settings_report, StatusProblems};
pub use status::{Status, StatusError, StatusType};
pub use task::Task;
pub use toggle::ToggleOptions;
pub use validator::StatusValidator;
