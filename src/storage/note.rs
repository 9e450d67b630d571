//! Notes holding a query
//!
//! Only the YAML frontmatter matters here: its properties are what
//! `query.file.property(...)` reads in placeholders and functions.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::domain::TasksFile;

const DELIMITER: &str = "---";

/// Reads the note at `path` as the file a query lives in
pub fn read_note(path: &Path) -> Result<TasksFile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read note: {}", path.display()))?;

    let properties = parse_frontmatter(&content)
        .with_context(|| format!("Failed to parse frontmatter: {}", path.display()))?;

    let display_path = path.to_string_lossy().replace('\\', "/");
    debug!(path = %display_path, properties = properties.len(), "Loaded note");
    Ok(TasksFile::with_properties(display_path, properties))
}

/// Frontmatter properties of a note; empty when it has none
pub fn parse_frontmatter(content: &str) -> Result<Map<String, JsonValue>> {
    let mut lines = content.lines();
    if lines.next().map(str::trim_end) != Some(DELIMITER) {
        return Ok(Map::new());
    }

    let mut yaml = Vec::new();
    let mut closed = false;
    for line in lines {
        if line.trim_end() == DELIMITER {
            closed = true;
            break;
        }
        yaml.push(line);
    }
    if !closed {
        bail!("Missing frontmatter end delimiter (---)");
    }

    let value: JsonValue = serde_yaml::from_str(&yaml.join("\n")).context("Invalid YAML")?;
    match value {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(Map::new()),
        other => bail!("Frontmatter must be a mapping, found {}", other),
    }
}
