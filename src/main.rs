//! Tasks Query - declarative search over markdown tasks

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = tasks_query::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
