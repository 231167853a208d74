//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
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

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let written = store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    for key in VALID_CONFIG_KEYS {
        if let Some(value) = read_value(&written, key) {
            presenter.key_value(key, &value);
        }
    }
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    store
        .update(&|config: &mut AppConfig| apply_value(config, key, value))
        .await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match read_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output("(not set)"),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            read_value(&config, key).as_deref().unwrap_or("(not set)"),
        );
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "output_dir" => config.output_dir = Some(value.to_string()),
        "enroll_min_duration" => config.enroll_min_duration = Some(parse_duration(key, value)?),
        "verify_max_duration" => config.verify_max_duration = Some(parse_duration(key, value)?),
        "chat_max_duration" => config.chat_max_duration = Some(parse_duration(key, value)?),
        "acquire_timeout" => config.acquire_timeout = Some(parse_duration(key, value)?),
        "decode_contexts" => {
            let contexts = value
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| invalid(key, "Value must be a positive integer"))?;
            config.decode_contexts = Some(contexts);
        }
        "max_upload_bytes" => {
            let bytes = value
                .parse::<u64>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| invalid(key, "Value must be a positive number of bytes"))?;
            config.max_upload_bytes = Some(bytes);
        }
        "preview" => {
            config.preview =
                Some(parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'"))?)
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "output_dir" => config.output_dir.clone(),
        "enroll_min_duration" => config.enroll_min_duration.clone(),
        "verify_max_duration" => config.verify_max_duration.clone(),
        "chat_max_duration" => config.chat_max_duration.clone(),
        "acquire_timeout" => config.acquire_timeout.clone(),
        "decode_contexts" => config.decode_contexts.map(|n| n.to_string()),
        "max_upload_bytes" => config.max_upload_bytes.map(|n| n.to_string()),
        "preview" => config.preview.map(|b| b.to_string()),
        _ => None,
    }
}

fn parse_duration(key: &str, value: &str) -> Result<String, ConfigError> {
    value
        .parse::<Duration>()
        .map_err(|e| invalid(key, &e.to_string()))?;
    Ok(value.to_string())
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}
