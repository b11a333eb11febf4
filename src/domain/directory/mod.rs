//! Directory configuration domain module

mod config;

pub use config::{DirectoryConfig, MAX_CONFIG_AGE_MS, SCHEMA_VERSION};
