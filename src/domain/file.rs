//! File facets shared by tasks and the note containing a query

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// A note path plus any frontmatter properties read from it
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TasksFile {
    path: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    properties: Map<String, JsonValue>,
}

impl TasksFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: Map::new(),
        }
    }

    pub fn with_properties(path: impl Into<String>, properties: Map<String, JsonValue>) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    /// Full path, e.g. `a/b/c.md`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_without_extension(&self) -> &str {
        self.path.strip_suffix(".md").unwrap_or(&self.path)
    }

    /// Last path component, e.g. `c.md`
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn filename_without_extension(&self) -> &str {
        let filename = self.filename();
        filename.strip_suffix(".md").unwrap_or(filename)
    }

    /// Containing folder with a trailing slash, `/` at the top level
    pub fn folder(&self) -> String {
        match self.path.rfind('/') {
            Some(i) => self.path[..=i].to_string(),
            None => "/".to_string(),
        }
    }

    /// Top-level folder with a trailing slash, `/` at the top level
    pub fn root(&self) -> String {
        let path = self.path.trim_start_matches('/');
        match path.find('/') {
            Some(i) => path[..=i].to_string(),
            None => "/".to_string(),
        }
    }

    /// A frontmatter property, looked up case-insensitively
    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name).or_else(|| {
            self.properties
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn properties(&self) -> &Map<String, JsonValue> {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_path_facets() {
        let file = TasksFile::new("a/b/c.md");
        assert_eq!(file.filename(), "c.md");
        assert_eq!(file.filename_without_extension(), "c");
        assert_eq!(file.folder(), "a/b/");
        assert_eq!(file.root(), "a/");
        assert_eq!(file.path_without_extension(), "a/b/c");
    }

    #[test]
    fn top_level_facets() {
        let file = TasksFile::new("inbox.md");
        assert_eq!(file.folder(), "/");
        assert_eq!(file.root(), "/");
    }

    #[test]
    fn property_lookup_ignores_case() {
        let mut properties = Map::new();
        properties.insert("Project".to_string(), JsonValue::from("Apollo"));
        let file = TasksFile::with_properties("notes/x.md", properties);
        assert_eq!(file.property("project"), Some(&JsonValue::from("Apollo")));
        assert!(file.property("missing").is_none());
    }
}
