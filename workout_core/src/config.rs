//! Configuration file support for workout-mode.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/workout-mode/config.toml`.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "workout-mode";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub workout: WorkoutConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Identity used when the caller does not pass one explicitly
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub id: Option<String>,
}

/// Workout run defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutConfig {
    /// Rest interval in seconds used when `start` is given none
    #[serde(default = "default_rest_interval")]
    pub default_rest_interval: i64,
}

impl Default for WorkoutConfig {
    fn default() -> Self {
        Self {
            default_rest_interval: default_rest_interval(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(APP_DIR)
}

fn default_rest_interval() -> i64 {
    60
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join(APP_DIR).join("config.toml")
    }

    /// Resolve the acting user: explicit value, then config, then `$USER`
    pub fn resolve_user(&self, explicit: Option<String>) -> String {
        explicit
            .or_else(|| self.user.id.clone())
            .or_else(|| std::env::var("USER").ok())
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| "local".to_string())
    }
}
