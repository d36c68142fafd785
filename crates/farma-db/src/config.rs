//! # Application Configuration
//!
//! Where the database lives and who is selling.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FARMA_DB_PATH=/srv/farma/farmatrack.db                             │
//! │     FARMA_CASHIER=caja2                                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/farmatrack/farmatrack.toml (Linux)                       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/farma/farmatrack.db"
//! max_connections = 5
//!
//! [store]
//! name = "Drogueria La Esquina"
//! cashier = "caja1"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

const CONFIG_FILE_NAME: &str = "farmatrack.toml";
const DB_FILE_NAME: &str = "farmatrack.db";

/// Errors loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    /// Cashier recorded on sales when the terminal does not say otherwise.
    #[serde(default = "default_cashier")]
    pub cashier: String,
}

fn default_store_name() -> String {
    "Farmacia".to_string()
}

fn default_cashier() -> String {
    "caja1".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            cashier: default_cashier(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`farmatrack.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file, creating its directory.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if let Some(path) = &self.database.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("database.path is empty".into()));
            }
        }
        if self.store.cashier.trim().is_empty() {
            return Err(ConfigError::Invalid("store.cashier is empty".into()));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FARMA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(cashier) = std::env::var("FARMA_CASHIER") {
            self.store.cashier = cashier;
        }

        if let Ok(name) = std::env::var("FARMA_STORE_NAME") {
            self.store.name = name;
        }

        if let Ok(max) = std::env::var("FARMA_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid FARMA_MAX_CONNECTIONS"),
            }
        }
    }

    /// `farmatrack.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "farmatrack", "farmatrack")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// The configured database file, or `farmatrack.db` in the platform data
    /// directory (current directory if there is none).
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "farmatrack", "farmatrack")
                .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
        })
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path()).max_connections(self.database.max_connections)
    }

    pub fn cashier(&self) -> &str {
        &self.store.cashier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.cashier(), "caja1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            name = "Drogueria Central"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.name, "Drogueria Central");
        assert_eq!(config.store.cashier, "caja1");
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.database.max_connections = 2;
        config.store.cashier = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.database.path = Some(dir.path().join("shop.db"));
        config.store.name = "Drogueria Norte".to_string();
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[database]"));
        assert!(text.contains("[store]"));

        let loaded: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.db_config().database_path, dir.path().join("shop.db"));
    }

    #[test]
    fn test_bad_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[database]\nmax_connections = \"many\"\n").unwrap();

        assert!(matches!(
            AppConfig::load(Some(path.clone())),
            Err(ConfigError::Parse(_))
        ));
        assert_eq!(
            AppConfig::load_or_default(Some(path)).database.max_connections,
            default_max_connections()
        );
    }
}
