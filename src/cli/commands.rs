//! Interactive session commands
//!
//! Each input line is parsed as a clap multicall command line, so the
//! first word picks the command.

use clap::{Parser, Subcommand};

use super::args::ConfigAction;

#[derive(Parser, Debug)]
#[command(multicall = true)]
#[command(help_template = "{all-args}")]
#[command(subcommand_value_name = "COMMAND", subcommand_help_heading = "Commands")]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

/// One command typed into the session
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Choose the output directory and write the integration notes into it
    Setup,
    /// Grant the remembered output directory again
    Restore,
    /// Start recording a take
    #[command(visible_alias = "rec")]
    Start,
    /// Stop recording and save the take
    Stop,
    /// Show the session state
    Status,
    /// List takes saved in this session
    #[command(visible_alias = "ls")]
    List,
    /// Remove a take from the list (the file stays on disk)
    #[command(visible_alias = "rm")]
    Remove {
        /// Position in `list`, starting at 1
        index: usize,
    },
    /// Restart file numbering at 1
    Reset,
    /// Forget the remembered directory
    Forget,
    /// Clear the current error
    Dismiss,
    /// Ask for microphone access again
    Permission,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Leave the session
    #[command(visible_alias = "exit")]
    Quit,
}

/// Parse one input line.
///
/// Blank lines give `Ok(None)`. `help` and bad input come back as a clap
/// error whose text is ready to print.
pub fn parse_line(line: &str) -> Result<Option<SessionCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    SessionLine::try_parse_from(words).map(|parsed| Some(parsed.command))
}
