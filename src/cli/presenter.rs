//! CLI presenter for output formatting

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::SessionSnapshot;
use crate::domain::directory::DirectoryConfig;
use crate::domain::format::OUTPUT_EXTENSION;
use crate::domain::recording::PersistedRecording;
use crate::domain::session::SessionState;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
    is_spinner_active: Arc<AtomicBool>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self {
            spinner: None,
            is_spinner_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.red} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
        self.is_spinner_active.store(true, Ordering::SeqCst);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    pub fn is_spinner_active(&self) -> bool {
        self.is_spinner_active.load(Ordering::SeqCst)
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.emit(format!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.emit(format!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.emit(format!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.emit(format!("{} {}", "✗".red(), message));
    }

    /// Stderr line that doesn't tear through a running spinner
    fn emit(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Command prompt
    pub fn prompt(&self) {
        eprint!("{} ", ">".bold());
        let _ = io::stderr().flush();
    }

    /// Print a key-value pair
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Spinner text while a take is running
    pub fn recording_message(&self, snapshot: &SessionSnapshot) -> String {
        format!(
            "Recording {} • saving to {}.{}",
            format_elapsed(snapshot.elapsed_seconds),
            snapshot.next_file_number,
            OUTPUT_EXTENSION
        )
    }

    /// Print the full session state
    pub fn status(&self, snapshot: &SessionSnapshot) {
        for (key, value) in status_lines(snapshot) {
            self.key_value(key, &value);
        }
    }

    /// Print the takes saved in this session
    pub fn recordings(&self, recordings: &[PersistedRecording]) {
        if recordings.is_empty() {
            self.info("No recordings yet");
            return;
        }
        for (position, recording) in recordings.iter().enumerate() {
            self.output(&recording_line(position + 1, recording));
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Elapsed seconds as `MM:SS`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn format_verified(config: &DirectoryConfig) -> String {
    config
        .last_verified
        .and_then(DateTime::from_timestamp_millis)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// Key/value pairs shown by `status`
pub fn status_lines(snapshot: &SessionSnapshot) -> Vec<(&'static str, String)> {
    let mut lines = vec![("state", snapshot.state.to_string())];

    if matches!(snapshot.state, SessionState::Recording | SessionState::Stopping) {
        lines.push(("elapsed", format_elapsed(snapshot.elapsed_seconds)));
    }

    lines.push(("microphone", snapshot.permission.to_string()));
    lines.push((
        "format",
        snapshot
            .selected_format
            .as_ref()
            .map(|f| format!("{} ({})", f.display_name, f.mime_type))
            .unwrap_or_else(|| "none".to_string()),
    ));
    lines.push((
        "supported",
        if snapshot.supported_formats.is_empty() {
            "none".to_string()
        } else {
            snapshot
                .supported_formats
                .iter()
                .map(|f| f.display_name)
                .collect::<Vec<_>>()
                .join(", ")
        },
    ));
    lines.push(("platform", snapshot.platform.label().to_string()));
    lines.push((
        "directory",
        snapshot
            .directory_name
            .clone()
            .unwrap_or_else(|| "not granted".to_string()),
    ));

    let setup = &snapshot.setup_status;
    let remembered = match (setup.is_configured, setup.directory_name.as_deref()) {
        (true, Some(name)) => format!(
            "{} ({}, verified {})",
            name,
            setup.platform_os.label(),
            format_verified(setup)
        ),
        _ => "none".to_string(),
    };
    lines.push(("remembered", remembered));

    lines.push((
        "next file",
        format!("{}.{}", snapshot.next_file_number, OUTPUT_EXTENSION),
    ));
    lines.push(("recordings", snapshot.recordings.len().to_string()));

    if let Some(ref error) = snapshot.error {
        lines.push(("error", error.clone()));
    }
    lines
}

/// One line of `list`
pub fn recording_line(position: usize, recording: &PersistedRecording) -> String {
    format!(
        "{:>3}. {:<10} {:>5}  {:>9}  {:<8} {}  {} in {}",
        position,
        recording.filename,
        format!("{}s", recording.duration_seconds),
        recording.human_readable_size(),
        recording.format_name,
        recording.captured_at_display,
        recording.status,
        recording.directory_name
    )
}
