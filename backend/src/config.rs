//! Layered configuration: built-in defaults, then an optional TOML file, then
//! `POCKET_PILOT__SECTION__KEY` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "POCKET_PILOT_CONFIG";
const LOCAL_CONFIG_FILE: &str = "pocket_pilot.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Defaults to `pocket_pilot.db` inside `data_directory`
    #[serde(default)]
    pub database_url: Option<String>,
    /// Directory holding device-local state such as scheduled reminders
    pub data_directory: PathBuf,
}

impl StorageConfig {
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!("sqlite:{}", self.data_directory.join("pocket_pilot.db").display()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotificationConfig {
    /// Local hour at which reminders fire
    pub reminder_hour: u32,
    /// 0 = Sunday .. 6 = Saturday
    pub weekly_report_weekday: u8,
    pub due_check_interval_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
}

pub fn default_data_directory() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("pocket-pilot"),
        None => PathBuf::from("data"),
    }
}

/// Config file to read: `$POCKET_PILOT_CONFIG`, else `./pocket_pilot.toml`,
/// else the user's config directory.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return local;
    }
    match dirs::config_dir() {
        Some(config_dir) => config_dir.join("pocket-pilot").join("config.toml"),
        None => local,
    }
}

impl Settings {
    fn builder() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let data_directory = default_data_directory();

        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.allowed_origin", "http://localhost:8080")?
            .set_default("storage.data_directory", data_directory.display().to_string())?
            .set_default("notifications.reminder_hour", 9)?
            .set_default("notifications.weekly_report_weekday", 0)?
            .set_default("notifications.due_check_interval_secs", 3600)?
            .set_default("logging.level", "info")
    }

    /// Load settings from defaults, the config file (if present) and the
    /// environment. Returns the file path that was consulted.
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();

        let settings: Settings = Self::builder()?
            .add_source(File::from(config_path.clone()).required(false))
            .add_source(
                Environment::with_prefix("POCKET_PILOT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok((settings, config_path))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.notifications.reminder_hour > 23 {
            return Err(ConfigError::Message(format!(
                "notifications.reminder_hour must be 0-23, got {}",
                self.notifications.reminder_hour
            )));
        }
        if self.notifications.weekly_report_weekday > 6 {
            return Err(ConfigError::Message(format!(
                "notifications.weekly_report_weekday must be 0-6, got {}",
                self.notifications.weekly_report_weekday
            )));
        }
        if self.notifications.due_check_interval_secs == 0 {
            return Err(ConfigError::Message(
                "notifications.due_check_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
