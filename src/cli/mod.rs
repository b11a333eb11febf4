//! CLI layer - Command-line interface
//!
//! Contains argument parsing, the interactive command grammar,
//! output formatting, and the session runner.

pub mod app;
pub mod args;
pub mod commands;
pub mod config_cmd;
pub mod presenter;

// Re-export commonly used types
pub use app::{run_session, Repl, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction};
pub use commands::{parse_line, SessionCommand};
pub use presenter::Presenter;
