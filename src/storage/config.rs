//! Settings handling for the tasks CLI
//!
//! Settings are stored in `.tasks/config.toml` (project) or
//! `~/.config/tasks-query/config.toml` (global). An explicit `--config`
//! path wins over both.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Status, StatusRegistry, StatusValidator, ToggleOptions};
use crate::query::Presets;

/// Name of the per-project settings directory
pub const PROJECT_DIR: &str = ".tasks";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything read from a settings file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Stamp a done date when toggling to DONE
    pub set_done_date: bool,

    /// Stamp a cancelled date when toggling to CANCELLED
    pub set_cancelled_date: bool,

    /// Stamp a created date on new recurrences
    pub set_created_date: bool,

    /// Write a new recurrence below the completed task
    pub recurrence_on_next_line: bool,

    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Instructions prepended to every query that does not opt out
    pub global_query: String,

    /// Custom statuses, layered over the built-in four
    pub statuses: Vec<Status>,

    /// User presets, merged over the defaults
    pub presets: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        let toggle = ToggleOptions::default();
        Self {
            set_done_date: toggle.set_done_date,
            set_cancelled_date: toggle.set_cancelled_date,
            set_created_date: toggle.set_created_date,
            recurrence_on_next_line: toggle.recurrence_on_next_line,
            default_format: OutputFormat::Text,
            global_query: String::new(),
            statuses: Vec::new(),
            presets: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The built-in statuses with the configured ones layered on top.
    ///
    /// The first configured status for a built-in symbol replaces that
    /// built-in; everything else follows in order. Duplicates and invalid
    /// entries are kept so they can be reported.
    pub fn layered_statuses(&self) -> Vec<Status> {
        let mut statuses = Status::defaults();
        let builtins = statuses.len();
        let mut replaced: HashSet<&str> = HashSet::new();
        for status in &self.statuses {
            let builtin = statuses[..builtins].iter().position(|s| s.symbol == status.symbol);
            match builtin {
                Some(i) if replaced.insert(status.symbol.as_str()) => statuses[i] = status.clone(),
                _ => statuses.push(status.clone()),
            }
        }
        statuses
    }

    /// Builds a fresh registry from [`Settings::layered_statuses`].
    ///
    /// Statuses that fail validation are skipped with a warning; a built-in
    /// whose replacement was skipped is registered as usual.
    pub fn status_registry(&self) -> StatusRegistry {
        let mut registry = StatusRegistry::without_statuses();
        for status in self.layered_statuses() {
            let problems = StatusValidator::validate(&status);
            if !problems.is_empty() {
                warn!(symbol = %status.symbol, problems = %problems.join("; "), "Skipping invalid status");
                continue;
            }
            if !registry.add(status) {
                debug!("Ignoring duplicate status symbol");
            }
        }
        for builtin in Status::defaults() {
            registry.add(builtin);
        }
        registry
    }

    /// The default presets with the configured ones layered on top
    pub fn presets(&self) -> Presets {
        Presets::with_overrides(&self.presets)
    }

    pub fn toggle_options(&self) -> ToggleOptions {
        ToggleOptions {
            set_done_date: self.set_done_date,
            set_cancelled_date: self.set_cancelled_date,
            set_created_date: self.set_created_date,
            recurrence_on_next_line: self.recurrence_on_next_line,
        }
    }
}

/// Loaded settings plus where they came from
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub source: Option<PathBuf>,
}

impl Config {
    /// Loads settings from the first location that exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        if let Some(root) = Self::find_project_root() {
            let path = root.join(PROJECT_DIR).join(CONFIG_FILE);
            if path.exists() {
                return Self::load_file(&path);
            }
        }

        if let Some(dir) = Self::global_config_dir() {
            let path = dir.join(CONFIG_FILE);
            if path.exists() {
                return Self::load_file(&path);
            }
        }

        debug!("No settings file found, using defaults");
        Ok(Self {
            settings: Settings::default(),
            source: None,
        })
    }

    /// Loads settings from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;

        let settings = Settings::from_toml(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;

        debug!(path = %path.display(), statuses = settings.statuses.len(), presets = settings.presets.len(), "Loaded settings");
        Ok(Self {
            settings,
            source: Some(path.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "tasks", "tasks-query").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Finds the project root by looking for a `.tasks/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Writes the settings to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(&self.settings).context("Failed to serialize settings")?;

        fs::write(path, content).with_context(|| format!("Failed to write settings: {}", path.display()))
    }
}
