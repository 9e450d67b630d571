//! One [`Field`](super::Field) implementation per task attribute

mod blocking;
mod boolean;
mod date;
mod duration;
mod function;
mod id;
mod priority;
mod status;
mod tags;
mod text;
mod urgency;

pub use blocking::BlockingField;
pub use boolean::BooleanField;
pub use date::DateField;
pub use duration::DurationField;
pub use function::FunctionField;
pub use id::IdField;
pub use priority::PriorityField;
pub use status::{RecurringField, StatusField, StatusTypeField};
pub use tags::TagsField;
pub use text::TextField;
pub use urgency::UrgencyField;
