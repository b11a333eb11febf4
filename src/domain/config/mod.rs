//! Configuration domain module

mod app_config;

pub use app_config::{
    AppConfig, DEFAULT_BITRATE, DEFAULT_LOG_LEVEL, DEFAULT_STOP_GRACE_MS, DEFAULT_TIMESLICE_MS,
};
