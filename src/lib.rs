//! Tasks Query - declarative search, grouping and toggling for markdown tasks
//!
//! Tasks are immutable records extracted from notes. A query block of
//! one-instruction-per-line text is compiled into filters, sorters and
//! groupers, optionally extended with scripted expressions, and applied
//! to the task list. Status changes follow a user-configurable transition
//! graph that also drives recurrence.

pub mod domain;
pub mod scripting;
pub mod query;
pub mod storage;
pub mod cli;

pub use domain::{Priority, Status, StatusRegistry, StatusType, Task};
pub use query::{Query, SearchInfo};
