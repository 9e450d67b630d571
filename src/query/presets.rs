//! Named, reusable blocks of query instructions
//!
//! A query refers to a preset with `preset NAME` on its own line, or with
//! a `{{preset.NAME}}` placeholder anywhere in a line.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::scripting::Value;

/// Deepest chain of presets that may refer to each other
pub const MAX_PRESET_DEPTH: usize = 10;

const SUMMARY_WIDTH: usize = 50;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PresetError {
    #[error("Cannot find preset \"{name}\" in the Tasks settings\n{}", known_presets_hint(.name, .known))]
    NotFound { name: String, known: Vec<String> },

    #[error("Presets are nested more than {} deep: {}", MAX_PRESET_DEPTH, .chain.join(" -> "))]
    TooDeep { chain: Vec<String> },
}

fn known_presets_hint(name: &str, known: &[String]) -> String {
    if known.is_empty() {
        format!("You can define the instruction(s) for \"{}\" in the Tasks settings.", name)
    } else {
        let mut lines = vec!["The following presets are defined in the Tasks settings:".to_string()];
        lines.extend(known.iter().cloned());
        lines.join("\n")
    }
}

/// Preset names mapped to their instruction text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presets {
    presets: BTreeMap<String, String>,
}

impl Presets {
    pub fn new(presets: BTreeMap<String, String>) -> Self {
        Self { presets }
    }

    /// The presets every installation starts with
    pub fn defaults() -> Self {
        let entries = [
            ("this_file", "path includes {{query.file.path}}"),
            ("this_folder", "folder includes {{query.file.folder}}"),
            ("this_folder_only", "filter by function task.file.folder === query.file.folder"),
            ("this_root", "root includes {{query.file.root}}"),
            (
                "hide_date_fields",
                "# Hide any values for all date fields\nhide due date\nhide scheduled date\nhide start date\nhide created date\nhide done date\nhide cancelled date",
            ),
            (
                "hide_non_date_fields",
                "# Hide all the non-date fields, but not tags\nhide id\nhide depends on\nhide recurrence rule\nhide on completion\nhide priority",
            ),
            (
                "hide_query_elements",
                "# Hide postpone, edit and backinks\nhide postpone button\nhide edit button\nhide backlinks",
            ),
            (
                "hide_everything",
                "# Hide everything except description and any tags\npreset hide_date_fields\npreset hide_non_date_fields\npreset hide_query_elements",
            ),
        ];
        Self::new(
            entries
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        )
    }

    /// The defaults with `overrides` added; same-named entries replace defaults
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut presets = Self::defaults();
        for (name, text) in overrides {
            presets.presets.insert(name.trim().to_string(), text.clone());
        }
        presets
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.presets.get(name).map(String::as_str)
    }

    /// Looks up `name`, failing with a message that lists what exists
    pub fn lookup(&self, name: &str) -> Result<&str, PresetError> {
        self.get(name).ok_or_else(|| PresetError::NotFound {
            name: name.to_string(),
            known: self.summary_lines(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.presets.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// One `  name: first line` entry per preset, names padded to align
    pub fn summary_lines(&self) -> Vec<String> {
        let width = self.presets.keys().map(|k| k.chars().count()).max().unwrap_or(0);
        self.presets
            .iter()
            .map(|(name, text)| format!("  {:<width$}: {}", name, summarize(text), width = width))
            .collect()
    }

    /// The `preset` binding used by placeholders
    pub fn to_value(&self) -> Value<'static> {
        Value::Record(
            self.presets
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// First line of a preset, cut at the summary width; `...` marks any cut
fn summarize(text: &str) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or_default();
    let more_lines = lines.next().is_some();
    if first.chars().count() > SUMMARY_WIDTH {
        let cut: String = first.chars().take(SUMMARY_WIDTH).collect();
        format!("{}...", cut)
    } else if more_lines {
        format!("{}...", first)
    } else {
        first.to_string()
    }
}
