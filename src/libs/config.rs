//! Startup configuration for the back-office core.
//!
//! Values are resolved in this order, later sources winning:
//!
//! 1. Built-in defaults ([`AppConfig::default`])
//! 2. `config.json` in the platform data directory
//! 3. A `.env` file in the working directory
//! 4. `BACKOFFICE_*` environment variables
//!
//! The resolved configuration is installed once into process-wide state with
//! [`install`]. The database path and the logo directory are the only mutable
//! globals of the core; [`crate::db::db::Db::new`] and the schema manager read
//! them through [`current`].
//!
//! ```rust,no_run
//! use backoffice::libs::config::{self, AppConfig};
//!
//! let config = AppConfig::load()?;
//! config::install(config.clone());
//! # Ok::<(), anyhow::Error>(())
//! ```

use super::data_storage::DataStorage;
use crate::libs::messages::Message;
use crate::{msg_debug, msg_error_anyhow};
use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Path value that selects the shared in-memory database.
pub const MEMORY_DB_PATH: &str = ":memory:";

pub const ENV_DB_PATH: &str = "BACKOFFICE_DB_PATH";
pub const ENV_APP_ROOT: &str = "BACKOFFICE_APP_ROOT";
pub const ENV_LOGO_DIR: &str = "BACKOFFICE_LOGO_DIR";
pub const ENV_ADMIN_USERNAME: &str = "BACKOFFICE_ADMIN_USERNAME";
pub const ENV_ADMIN_PASSWORD: &str = "BACKOFFICE_ADMIN_PASSWORD";
pub const ENV_ADMIN_EMAIL: &str = "BACKOFFICE_ADMIN_EMAIL";
pub const ENV_DEFAULT_LANGUAGE: &str = "BACKOFFICE_DEFAULT_LANGUAGE";

static ACTIVE: RwLock<Option<AppConfig>> = RwLock::new(None);

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Database file. Relative paths resolve against `app_root_dir`.
    pub database_path: String,

    /// Root for relative media, logo and database paths.
    pub app_root_dir: PathBuf,

    /// Directory holding company logos. Relative paths resolve against `app_root_dir`.
    pub logo_dir: String,

    /// Administrator seeded when the users table is empty.
    pub default_admin_username: String,
    pub default_admin_password: String,
    pub default_admin_email: String,

    /// Language stored under `default_app_language` on first initialisation.
    pub default_language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "backoffice.db".to_string(),
            app_root_dir: DataStorage::new().base_path().to_path_buf(),
            logo_dir: "company_logos".to_string(),
            default_admin_username: "admin".to_string(),
            default_admin_password: "admin".to_string(),
            default_admin_email: "admin@example.com".to_string(),
            default_language: "fr".to_string(),
        }
    }
}

impl AppConfig {
    /// Configuration pointing at an explicit database, defaults elsewhere.
    pub fn with_database(path: impl Into<String>) -> Self {
        AppConfig {
            database_path: path.into(),
            ..AppConfig::default()
        }
    }

    /// Reads `config.json` from the data directory, or returns defaults when absent.
    pub fn read() -> Result<AppConfig> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        Self::read_from(&config_file_path)
    }

    pub fn read_from(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            msg_debug!(Message::ConfigFileNotFound);
            return Ok(AppConfig::default());
        }

        let config_str = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&config_str).map_err(|e| msg_error_anyhow!(Message::ConfigParseError(e.to_string())))?;
        msg_debug!(Message::ConfigLoaded(path.display().to_string()));
        Ok(config)
    }

    /// Full resolution: file, then `.env`, then process environment.
    pub fn load() -> Result<AppConfig> {
        let _ = dotenv::dotenv();
        let config = Self::read()?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies overrides from any key lookup (the environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DB_PATH) {
            self.database_path = value;
        }
        if let Some(value) = lookup(ENV_APP_ROOT) {
            self.app_root_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_LOGO_DIR) {
            self.logo_dir = value;
        }
        if let Some(value) = lookup(ENV_ADMIN_USERNAME) {
            self.default_admin_username = value;
        }
        if let Some(value) = lookup(ENV_ADMIN_PASSWORD) {
            self.default_admin_password = value;
        }
        if let Some(value) = lookup(ENV_ADMIN_EMAIL) {
            self.default_admin_email = value;
        }
        if let Some(value) = lookup(ENV_DEFAULT_LANGUAGE) {
            self.default_language = value;
        }
        self
    }

    pub fn save(&self) -> Result<()> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        let config_file = File::create(config_file_path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    pub fn is_memory_database(&self) -> bool {
        self.database_path == MEMORY_DB_PATH
    }

    /// Database location with relative paths anchored at `app_root_dir`.
    pub fn resolved_database_path(&self) -> PathBuf {
        if self.is_memory_database() {
            return PathBuf::from(MEMORY_DB_PATH);
        }
        self.resolve(&self.database_path)
    }

    pub fn resolved_logo_dir(&self) -> PathBuf {
        self.resolve(&self.logo_dir)
    }

    fn resolve(&self, value: &str) -> PathBuf {
        let path = Path::new(value);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.app_root_dir.join(path)
        }
    }
}

/// Installs the process-wide configuration. Later calls replace the earlier one.
pub fn install(config: AppConfig) {
    *ACTIVE.write() = Some(config);
}

/// Returns the installed configuration, or defaults when none was installed.
pub fn current() -> AppConfig {
    match ACTIVE.read().as_ref() {
        Some(config) => config.clone(),
        None => {
            msg_debug!(Message::ConfigNotInstalled);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn overrides_replace_only_present_keys() {
        let env: HashMap<&str, &str> = [(ENV_DB_PATH, "/tmp/other.db"), (ENV_DEFAULT_LANGUAGE, "en")].into_iter().collect();
        let config = AppConfig::default().with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path, "/tmp/other.db");
        assert_eq!(config.default_language, "en");
        assert_eq!(config.default_admin_username, "admin");
    }

    #[test]
    fn relative_paths_resolve_against_app_root() {
        let config = AppConfig {
            app_root_dir: PathBuf::from("/srv/office"),
            ..AppConfig::with_database("data/main.db")
        };

        assert_eq!(config.resolved_database_path(), PathBuf::from("/srv/office/data/main.db"));
        assert_eq!(config.resolved_logo_dir(), PathBuf::from("/srv/office/company_logos"));
    }

    #[test]
    fn memory_path_is_kept_verbatim() {
        let config = AppConfig::with_database(MEMORY_DB_PATH);
        assert!(config.is_memory_database());
        assert_eq!(config.resolved_database_path(), PathBuf::from(":memory:"));
    }
}
