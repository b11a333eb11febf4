//! Audio Studio - numbered microphone takes for a watched directory
//!
//! Records from the microphone and writes every take as `<N>.webm` into a
//! user-granted directory, where an external watchdog picks it up. The
//! granted directory and the file counter survive restarts.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Session state machine, formats, directory config, errors
//! - **Application**: Session controller, its services, and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, filesystem, JSON storage, logging)
//! - **CLI**: Argument parsing, interactive commands, and output formatting

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
