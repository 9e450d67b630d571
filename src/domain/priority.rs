//! Task priority levels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority of a task, ordered from most to least important
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Highest,
    High,
    Medium,
    #[default]
    None,
    Low,
    Lowest,
}

impl Priority {
    pub const ALL: [Priority; 6] = [
        Priority::Highest,
        Priority::High,
        Priority::Medium,
        Priority::None,
        Priority::Low,
        Priority::Lowest,
    ];

    /// Numeric rank, 0 for highest through 5 for lowest
    pub fn number(&self) -> u8 {
        match self {
            Priority::Highest => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::None => 3,
            Priority::Low => 4,
            Priority::Lowest => 5,
        }
    }

    /// Display name; tasks without a priority are "Normal"
    pub fn name(&self) -> &'static str {
        match self {
            Priority::Highest => "Highest",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::None => "Normal",
            Priority::Low => "Low",
            Priority::Lowest => "Lowest",
        }
    }

    /// Keyword used in instructions such as `priority is high`
    pub fn keyword(&self) -> &'static str {
        match self {
            Priority::Highest => "highest",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Lowest => "lowest",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Priority> {
        let keyword = keyword.trim().to_lowercase();
        Priority::ALL.into_iter().find(|p| p.keyword() == keyword)
    }

    /// Group heading with a hidden sort key, e.g. `%%1%%High priority`
    pub fn group_text(&self) -> String {
        format!("%%{}%%{} priority", self.number(), self.name())
    }

    /// Weight this priority adds to a task's urgency
    pub fn urgency_weight(&self) -> f64 {
        match self {
            Priority::Highest => 9.0,
            Priority::High => 6.0,
            Priority::Medium => 3.9,
            Priority::None => 1.8,
            Priority::Low => 0.0,
            Priority::Lowest => -1.8,
        }
    }

    /// Emoji used in the task line format
    pub fn signifier(&self) -> &'static str {
        match self {
            Priority::Highest => "🔺",
            Priority::High => "⏫",
            Priority::Medium => "🔼",
            Priority::None => "",
            Priority::Low => "🔽",
            Priority::Lowest => "⏬",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_most_important_first() {
        assert!(Priority::Highest < Priority::High);
        assert!(Priority::Medium < Priority::None);
        assert!(Priority::None < Priority::Low);
    }

    #[test]
    fn keywords_parse_case_insensitively() {
        assert_eq!(Priority::from_keyword("HIGH"), Some(Priority::High));
        assert_eq!(Priority::from_keyword("none"), Some(Priority::None));
        assert_eq!(Priority::from_keyword("urgent"), None);
    }

    #[test]
    fn group_text_embeds_rank() {
        assert_eq!(Priority::None.group_text(), "%%3%%Normal priority");
        assert_eq!(Priority::Highest.group_text(), "%%0%%Highest priority");
    }
}
