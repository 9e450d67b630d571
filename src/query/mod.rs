//! The query language
//!
//! Instruction lines are compiled by [`Field`] implementations into
//! [`Filter`]s, [`Sorter`]s and [`Grouper`]s. [`Query`] strings them
//! together and runs them over a task list.

mod engine;
mod explanation;
mod field;
mod fields;
mod filter;
mod grouper;
mod presets;
mod search_info;
mod sorter;
mod statement;

pub use engine::{scan, LayoutElement, LayoutOptions, Query, QueryContext, QueryResult};
pub use explanation::Explanation;
pub use field::{compare_text, field_by_name, fields, parse_filter, parse_grouper, parse_sorter, Field, RegexMatcher};
pub use filter::{Filter, FilterFunction, FilterOrErrorMessage};
pub use grouper::{display_name, GroupFunction, GroupHeading, Grouper, TaskGroup, TaskGroups};
pub use presets::{PresetError, Presets, MAX_PRESET_DEPTH};
pub use search_info::SearchInfo;
pub use sorter::{sort_tasks, Comparator, Sorter};
pub use statement::Statement;
