//! Persisted recorder settings

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Change applied by [`ConfigStore::update`]
pub type ConfigChange<'a> = &'a (dyn Fn(&mut AppConfig) -> Result<(), ConfigError> + Sync);

/// Where call-site durations, the decode pool size and output settings live
/// between runs. Values read here sit between the built-in defaults and
/// environment or command-line overrides.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// A store with no file yet loads as [`AppConfig::empty`], so every
    /// setting falls back to its default.
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    /// Write [`AppConfig::defaults`] to a new file and return what was
    /// written. Never overwrites an existing file.
    async fn init(&self) -> Result<AppConfig, ConfigError>;

    /// Load, apply `change`, save. A rejected change leaves the stored
    /// settings untouched.
    async fn update(&self, change: ConfigChange<'_>) -> Result<AppConfig, ConfigError> {
        let mut config = self.load().await?;
        change(&mut config)?;
        self.save(&config).await?;
        Ok(config)
    }
}
