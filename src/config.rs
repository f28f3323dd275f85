use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::clock::{Clock, ClockError, DEFAULT_TIMEZONE};
use crate::models::{Language, SubscriptionPlan};
use crate::trash::{DEFAULT_RETENTION_DAYS, RetentionPolicy};
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// IANA name of the civil timezone that defines "today"
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub trash: TrashConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Base URL of the access/billing backend; empty means not configured
    #[serde(default)]
    pub backend_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Check access before every data command
    #[serde(default)]
    pub enforce: bool,
    /// Where the checkout page sends the user back to
    #[serde(default)]
    pub return_url: String,
    #[serde(default)]
    pub price_ids: PriceIds,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceIds {
    #[serde(default)]
    pub monthly: String,
    #[serde(default)]
    pub semestral: String,
    #[serde(default)]
    pub annual: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Purge expired items whenever a session is opened
    #[serde(default)]
    pub auto_purge: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Emails that register with the master role
    #[serde(default)]
    pub masters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_passage_url")]
    pub passage_url: String,
    /// Seconds to wait for a chapter
    #[serde(default = "default_passage_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            timezone: default_timezone(),
            language: Language::default(),
            access: AccessConfig::default(),
            trash: TrashConfig::default(),
            roles: RolesConfig::default(),
            content: ContentConfig::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            timeout_secs: default_timeout_secs(),
            enforce: false,
            return_url: String::new(),
            price_ids: PriceIds::default(),
        }
    }
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            auto_purge: false,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            passage_url: default_passage_url(),
            timeout_secs: default_passage_timeout_secs(),
        }
    }
}

impl PriceIds {
    /// Configured price id for `plan`, if any
    pub fn for_plan(&self, plan: SubscriptionPlan) -> Option<&str> {
        let id = match plan {
            SubscriptionPlan::Monthly => &self.monthly,
            SubscriptionPlan::Semestral => &self.semestral,
            SubscriptionPlan::Annual => &self.annual,
        };
        (!id.trim().is_empty()).then_some(id.as_str())
    }
}

// Default value functions
fn default_database_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    if let Some(data_dir) = utils::get_data_dir(utils::Profile::Prod) {
        data_dir.join("organizer.db").to_string_lossy().to_string()
    } else {
        "~/.local/share/myorg/organizer.db".to_string()
    }
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

fn default_passage_url() -> String {
    "https://bible-api.com".to_string()
}

fn default_passage_timeout_secs() -> u64 {
    15
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error(transparent)]
    Timezone(#[from] ClockError),
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and database paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;

            // Ensure database path matches profile (in case config was manually edited)
            config.database_path = Self::default_database_path_for_profile(profile);

            Ok(config)
        } else {
            let mut config = Config::default();
            config.database_path = Self::default_database_path_for_profile(profile);
            if let Err(e) = config.save_with_profile(profile) {
                log::error!("failed to save config file {:?}: {}", config_path, e);
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save_with_profile(&mut self, profile: utils::Profile) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        let config_path = Self::get_config_path(profile)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("organizer.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/myorg-dev/organizer.db".to_string(),
                utils::Profile::Prod => "~/.local/share/myorg/organizer.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Live clock in the configured timezone
    pub fn clock(&self) -> Result<Clock, ConfigError> {
        Ok(Clock::from_timezone_name(&self.timezone)?)
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.trash.retention_days)
    }

    /// Whether `email` is listed as a master account
    pub fn is_master(&self, email: &str) -> bool {
        self.roles
            .masters
            .iter()
            .any(|m| m.trim().eq_ignore_ascii_case(email.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_takes_every_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.timezone, "America/Sao_Paulo");
        assert_eq!(config.language, Language::Pt);
        assert_eq!(config.access.timeout_secs, 8);
        assert!(!config.access.enforce);
        assert_eq!(config.trash.retention_days, 10);
        assert!(!config.trash.auto_purge);
        assert!(config.roles.masters.is_empty());
        assert_eq!(config.content.timeout_secs, 15);
    }

    #[test]
    fn passage_timeout_is_independent_of_access() {
        let config: Config = toml::from_str(
            r#"
            [access]
            timeout_secs = 3

            [content]
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.access.timeout_secs, 3);
        assert_eq!(config.content.timeout_secs, 30);
        assert_eq!(config.content.passage_url, "https://bible-api.com");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            timezone = "Europe/Lisbon"
            language = "en"

            [access]
            backend_url = "https://billing.example.com"
            enforce = true

            [access.price_ids]
            annual = "price_123"

            [roles]
            masters = ["Admin@Example.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.language, Language::En);
        assert_eq!(config.access.timeout_secs, 8);
        assert_eq!(config.access.price_ids.for_plan(SubscriptionPlan::Annual), Some("price_123"));
        assert_eq!(config.access.price_ids.for_plan(SubscriptionPlan::Monthly), None);
        assert!(config.is_master("admin@example.com"));
        assert!(!config.is_master("user@example.com"));
        assert_eq!(config.clock().unwrap().timezone(), chrono_tz::Europe::Lisbon);
    }

    #[test]
    fn unknown_timezone_is_reported() {
        let config = Config {
            timezone: "Mars/Olympus".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.clock(), Err(ConfigError::Timezone(_))));
    }

    #[test]
    fn defaults_survive_a_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.timezone, config.timezone);
        assert_eq!(back.trash.retention_days, config.trash.retention_days);
    }
}
