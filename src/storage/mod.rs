//! # Storage Layer
//!
//! Reading settings, task lists and notes from disk.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | any `*.jsonl` passed with `--tasks` |
//! | Settings | TOML | `.tasks/config.toml` or the user config dir |
//! | Notes | Markdown + YAML frontmatter | any `*.md` passed with `--file` |
//!
//! ## Concurrency Safety
//!
//! - [`TaskStore`] uses file locking (`fs2`) for concurrent access
//! - All writes are atomic (temp file + rename)

mod config;
mod jsonl;
mod note;

pub use config::{Config, ConfigError, OutputFormat, Settings, PROJECT_DIR};
pub use jsonl::{TaskRecord, TaskStore};
pub use note::{parse_frontmatter, read_note};
