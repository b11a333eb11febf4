//! Config command handler

use crate::application::ports::SettingsStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS, VALID_LOG_LEVELS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: SettingsStore + ?Sized>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: SettingsStore + ?Sized>(
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

async fn handle_set<S: SettingsStore + ?Sized>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;
    store.save(&config).await?;

    presenter.success(&format!("{} = {}", key, value));
    Ok(())
}

async fn handle_get<S: SettingsStore + ?Sized>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    presenter.output(&config_value(&config, key).unwrap_or_else(|| NOT_SET.to_string()));
    Ok(())
}

async fn handle_list<S: SettingsStore + ?Sized>(
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            &config_value(&config, key).unwrap_or_else(|| NOT_SET.to_string()),
        );
    }
    Ok(())
}

fn handle_path<S: SettingsStore + ?Sized>(
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

/// Current value of `key` as text
fn config_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "bitrate" => config.bitrate.map(|v| v.to_string()),
        "timeslice_ms" => config.timeslice_ms.map(|v| v.to_string()),
        "stop_grace_ms" => config.stop_grace_ms.map(|v| v.to_string()),
        "log_level" => config.log_level.clone(),
        "storage_path" => config.storage_path.clone(),
        _ => None,
    }
}

/// Validate `value` and store it under `key`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    };

    match key {
        "bitrate" => {
            let bitrate = value
                .parse::<u32>()
                .ok()
                .filter(|b| *b > 0)
                .ok_or_else(|| invalid("Value must be a positive number of bits per second"))?;
            config.bitrate = Some(bitrate);
        }
        "timeslice_ms" => {
            let ms = value
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| invalid("Value must be a positive number of milliseconds"))?;
            config.timeslice_ms = Some(ms);
        }
        "stop_grace_ms" => {
            let ms = value
                .parse::<u64>()
                .map_err(|_| invalid("Value must be a number of milliseconds"))?;
            config.stop_grace_ms = Some(ms);
        }
        "log_level" => {
            let lower = value.to_lowercase();
            if !VALID_LOG_LEVELS.contains(&lower.as_str()) {
                return Err(invalid(&format!(
                    "Invalid value '{}'. Valid options: {}",
                    value,
                    VALID_LOG_LEVELS.join(", ")
                )));
            }
            config.log_level = Some(lower);
        }
        "storage_path" => {
            if value.trim().is_empty() {
                return Err(invalid("Path must not be empty"));
            }
            config.storage_path = Some(value.to_string());
        }
        _ => return check_key(key),
    }
    Ok(())
}
