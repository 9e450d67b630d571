//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `query` | Filter, sort and group a task list |
//! | `explain` | Describe a query without running it |
//! | `status report/diagram/check` | Inspect the status settings |
//! | `toggle` | Move one task to its next status |
//! | `presets` | List the configured presets |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output; `TASKS_LOG` takes a full
//! tracing filter:
//! ```bash
//! TASKS_LOG=tasks_query=trace tasks query --tasks t.jsonl -i "not done"
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod query;
mod render;
mod status;
mod toggle;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use render::{render_result, render_task};
