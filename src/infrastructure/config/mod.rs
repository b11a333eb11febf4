//! Settings file adapters

mod xdg;

pub use xdg::{XdgSettingsStore, APP_DIR};
