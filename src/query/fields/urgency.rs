//! The `urgency` field, for sorting and grouping only

use chrono::NaiveDate;
use std::sync::Arc;

use crate::domain::Task;
use crate::query::field::Field;
use crate::query::filter::FilterOrErrorMessage;
use crate::query::grouper::GroupFunction;
use crate::query::sorter::Comparator;
use crate::query::SearchInfo;

pub struct UrgencyField;

impl Field for UrgencyField {
    fn field_name(&self) -> &'static str {
        "urgency"
    }

    fn can_create_filter_for_line(&self, _line: &str) -> bool {
        false
    }

    fn create_filter_or_error_message(&self, line: &str, _today: NaiveDate) -> FilterOrErrorMessage {
        FilterOrErrorMessage::from_error(line, "do not understand query filter (urgency)")
    }

    /// Most urgent first
    fn comparator(&self) -> Option<Comparator> {
        Some(Arc::new(|a: &Task, b: &Task, info: &SearchInfo<'_>| {
            let today = info.today();
            b.urgency(today).total_cmp(&a.urgency(today))
        }))
    }

    fn group_function(&self) -> Option<GroupFunction> {
        Some(Arc::new(|task: &Task, info: &SearchInfo<'_>| {
            vec![format!("{:.2}", task.urgency(info.today()))]
        }))
    }

    fn groups_descending(&self) -> bool {
        true
    }
}
