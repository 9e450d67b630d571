//! Status changes and recurrence
//!
//! Toggling moves a task along its status's `next` link. Completing a
//! recurring task also produces the task's next occurrence.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::date::TaskDate;
use super::registry::StatusRegistry;
use super::status::{Status, StatusType};
use super::task::Task;

/// Settings that affect how status changes rewrite a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOptions {
    /// Stamp a done date when a task becomes DONE
    pub set_done_date: bool,
    /// Stamp a cancelled date when a task becomes CANCELLED
    pub set_cancelled_date: bool,
    /// Stamp a created date on new recurrences
    pub set_created_date: bool,
    /// Write the new recurrence after the completed task instead of before
    pub recurrence_on_next_line: bool,
}

impl Default for ToggleOptions {
    fn default() -> Self {
        Self {
            set_done_date: true,
            set_cancelled_date: true,
            set_created_date: false,
            recurrence_on_next_line: false,
        }
    }
}

impl Task {
    /// Moves the task to its next status.
    ///
    /// Returns `[toggled]`, or `[next, toggled]` when completing a
    /// recurring task.
    pub fn toggle(&self, registry: &StatusRegistry, today: NaiveDate, options: &ToggleOptions) -> Vec<Task> {
        let new_status = registry.next_status_or_create(&self.status);
        self.handle_new_status(new_status, registry, today, options)
    }

    /// Like [`Task::toggle`], but honours `recurrence_on_next_line`
    pub fn toggle_in_users_order(
        &self,
        registry: &StatusRegistry,
        today: NaiveDate,
        options: &ToggleOptions,
    ) -> Vec<Task> {
        let mut tasks = self.toggle(registry, today, options);
        if options.recurrence_on_next_line {
            tasks.reverse();
        }
        tasks
    }

    /// Moves the task to `new_status`.
    ///
    /// Returns `[self]` if the status is unchanged, `[edited]` normally,
    /// and `[next, edited]` when a recurring task becomes DONE from a
    /// status that was not DONE.
    pub fn handle_new_status(
        &self,
        new_status: Status,
        registry: &StatusRegistry,
        today: NaiveDate,
        options: &ToggleOptions,
    ) -> Vec<Task> {
        if new_status == self.status {
            return vec![self.clone()];
        }

        let done = self.progress_date(&new_status, StatusType::Done, &self.done, options.set_done_date, today);
        let cancelled = self.progress_date(
            &new_status,
            StatusType::Cancelled,
            &self.cancelled,
            options.set_cancelled_date,
            today,
        );

        let next = match &self.recurrence {
            Some(recurrence) if new_status.is_completed() && !self.status.is_completed() => {
                recurrence.next(&self.occurrence(), today).map(|occurrence| {
                    debug!(description = %self.description, rule = %recurrence, "Creating next occurrence");
                    Task {
                        status: registry.next_recurrence_status_or_create(&new_status),
                        start: occurrence.start.map(TaskDate::Valid),
                        scheduled: occurrence.scheduled.map(TaskDate::Valid),
                        due: occurrence.due.map(TaskDate::Valid),
                        created: options.set_created_date.then_some(TaskDate::Valid(today)),
                        done: None,
                        cancelled: None,
                        id: String::new(),
                        depends_on: Vec::new(),
                        block_link: String::new(),
                        ..self.clone()
                    }
                })
            }
            _ => None,
        };

        let toggled = Task {
            status: new_status,
            done,
            cancelled,
            ..self.clone()
        };

        next.into_iter().chain(std::iter::once(toggled)).collect()
    }

    /// The done or cancelled date after moving to `new_status`: stamped on
    /// entering `tracked`, kept while staying in it, cleared on leaving it
    fn progress_date(
        &self,
        new_status: &Status,
        tracked: StatusType,
        current: &Option<TaskDate>,
        enabled: bool,
        today: NaiveDate,
    ) -> Option<TaskDate> {
        if new_status.status_type != tracked {
            return None;
        }
        if self.status.status_type == tracked {
            return current.clone();
        }
        enabled.then_some(TaskDate::Valid(today))
    }
}
