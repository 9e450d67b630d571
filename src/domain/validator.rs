//! Checks on a single status configuration

use super::status::Status;

/// Validates the fields of one status in isolation
pub struct StatusValidator;

impl StatusValidator {
    /// Every problem with `status`; empty when it is usable
    pub fn validate(status: &Status) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(Self::validate_symbol(status));
        errors.extend(Self::validate_name(status));
        errors.extend(Self::validate_next_symbol(status));
        errors
    }

    pub fn validate_symbol(status: &Status) -> Vec<String> {
        Self::validate_one_character(&status.symbol, "Task Status Symbol")
    }

    pub fn validate_next_symbol(status: &Status) -> Vec<String> {
        Self::validate_one_character(&status.next_symbol, "Task Next Status Symbol")
    }

    pub fn validate_name(status: &Status) -> Vec<String> {
        if status.name.trim().is_empty() {
            vec!["Task Status Name cannot be empty.".to_string()]
        } else {
            vec![]
        }
    }

    fn validate_one_character(symbol: &str, label: &str) -> Vec<String> {
        match symbol.chars().count() {
            0 => vec![format!("{} cannot be empty.", label)],
            1 => vec![],
            _ => vec![format!("{} (\"{}\") must be a single character.", label, symbol)],
        }
    }
}
