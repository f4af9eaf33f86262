//! Layered core configuration.
//!
//! # Responsibility
//! - Load settings from built-in defaults, an optional config file and
//!   `LIBRARYMAN__*` environment variables, in that order of precedence.
//! - Build the configured collaborators (password verifier, page cap).
//!
//! # Invariants
//! - `CoreConfig::default()` matches the built-in defaults used by `load`.
//! - Loaded configs are validated before they are returned.

use crate::logging::default_log_level;
use crate::security::password::{
    BcryptPasswordVerifier, PasswordHashError, MAX_BCRYPT_COST, MIN_BCRYPT_COST,
};
use crate::service::member_service::DEFAULT_MAX_PAGE_SIZE;
use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;
use std::path::Path;

/// Default config file looked up relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config/libraryman";
/// Environment variable prefix; nested keys use `__`, e.g.
/// `LIBRARYMAN__SECURITY__BCRYPT_COST=10`.
pub const ENV_PREFIX: &str = "LIBRARYMAN";

const DEFAULT_DB_PATH: &str = "libraryman.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "libraryman-logs";
const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoreConfig {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub security: SecuritySettings,
    pub members: MemberSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    /// Absolute directory for rolling log files.
    pub dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecuritySettings {
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemberSettings {
    pub max_page_size: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseSettings {
                path: DEFAULT_DB_PATH.to_string(),
            },
            logging: LoggingSettings {
                level: default_log_level().to_string(),
                dir: default_log_dir(),
            },
            security: SecuritySettings {
                bcrypt_cost: DEFAULT_BCRYPT_COST,
            },
            members: MemberSettings {
                max_page_size: DEFAULT_MAX_PAGE_SIZE,
            },
        }
    }
}

impl CoreConfig {
    /// Loads defaults, `config/libraryman.*` when present, then environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(File::with_name(DEFAULT_CONFIG_FILE).required(false))
    }

    /// Loads defaults, the given file (must exist), then environment.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with(File::from(path.as_ref()).required(true))
    }

    fn load_with(file: impl Source + Send + Sync + 'static) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config: Self = Config::builder()
            .set_default("database.path", defaults.database.path)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.dir", defaults.logging.dir)?
            .set_default(
                "security.bcrypt_cost",
                i64::from(defaults.security.bcrypt_cost),
            )?
            .set_default(
                "members.max_page_size",
                i64::from(defaults.members.max_page_size),
            )?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "database.path must not be empty".to_string(),
            ));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Message(format!(
                "security.bcrypt_cost must be within {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}, got {}",
                self.security.bcrypt_cost
            )));
        }
        if self.members.max_page_size == 0 {
            return Err(ConfigError::Message(
                "members.max_page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the bcrypt verifier for the configured cost.
    pub fn password_verifier(&self) -> Result<BcryptPasswordVerifier, PasswordHashError> {
        BcryptPasswordVerifier::new(self.security.bcrypt_cost)
    }
}

fn default_log_dir() -> String {
    std::env::temp_dir()
        .join(DEFAULT_LOG_DIR_NAME)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::CoreConfig;
    use std::path::Path;

    #[test]
    fn default_config_is_valid() {
        let config = CoreConfig::default();
        config.validate().expect("defaults should validate");
        assert!(Path::new(&config.logging.dir).is_absolute());
        assert_eq!(config.members.max_page_size, 100);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("libraryman.toml");
        std::fs::write(
            &path,
            "[database]\npath = \"/srv/library/members.db\"\n\n[security]\nbcrypt_cost = 4\n",
        )
        .expect("write config file");

        let config = CoreConfig::load_from_file(&path).expect("config should load");
        assert_eq!(config.database.path, "/srv/library/members.db");
        assert_eq!(config.security.bcrypt_cost, 4);
        assert_eq!(
            config.members.max_page_size,
            CoreConfig::default().members.max_page_size
        );
        assert_eq!(config.password_verifier().expect("cost 4 is valid").cost(), 4);
    }

    #[test]
    fn out_of_range_cost_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[security]\nbcrypt_cost = 2\n").expect("write config file");

        let err = CoreConfig::load_from_file(&path).expect_err("cost 2 must fail");
        assert!(err.to_string().contains("bcrypt_cost"));
    }

    #[test]
    fn missing_required_file_fails() {
        assert!(CoreConfig::load_from_file("/definitely/not/here/libraryman.toml").is_err());
    }
}
