use crate::constants::{
    DEFAULT_CUSTOMERS_PATH, DEFAULT_DB_CONFIG_PATH, DEFAULT_FALLBACK_DB_PATH, DEFAULT_LOG_DIR,
    DEFAULT_ORDERS_PATH,
};
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Connection settings for the primary store, read from `db_config.json`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DbConfig {
    pub user: String,
    pub host: String,
    pub database: String,
    #[serde(default)]
    pub password: String,
}

impl DbConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read database config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
            .map_err(|e| EtlError::Config(format!("Invalid database config '{}': {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: DbConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// URL of the primary store.
    ///
    /// A `host` carrying a scheme is used verbatim. A bare host is expanded the way hosted libSQL
    /// databases are addressed: `libsql://<database>-<user>.<host>`.
    pub fn primary_url(&self) -> String {
        if self.host.contains("://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("libsql://{}-{}.{}", self.database, self.user, self.host)
        }
    }

    /// Auth token presented to the primary store
    pub fn auth_token(&self) -> &str {
        &self.password
    }
}

/// File-level pipeline settings (`etl.toml`); every key is optional
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub customers_path: PathBuf,
    pub orders_path: PathBuf,
    pub db_config_path: PathBuf,
    pub fallback_db_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            customers_path: PathBuf::from(DEFAULT_CUSTOMERS_PATH),
            orders_path: PathBuf::from(DEFAULT_ORDERS_PATH),
            db_config_path: PathBuf::from(DEFAULT_DB_CONFIG_PATH),
            fallback_db_path: PathBuf::from(DEFAULT_FALLBACK_DB_PATH),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl PipelineSettings {
    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read settings file '{}': {}", path.display(), e))
        })?;
        let settings: PipelineSettings = toml::from_str(&content)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_db_config_password_defaults_to_empty() {
        let config =
            DbConfig::from_json(r#"{"user": "etl", "host": "localhost", "database": "shop"}"#).unwrap();
        assert_eq!(config.password, "");
        assert_eq!(config.database, "shop");
    }

    #[test]
    fn test_db_config_missing_required_key() {
        let result = DbConfig::from_json(r#"{"user": "etl", "password": "x", "database": "shop"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_db_config_load_missing_file_is_config_error() {
        let err = DbConfig::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_db_config_load_invalid_json_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = DbConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_primary_url() {
        let mut config = DbConfig {
            user: "acme".to_string(),
            host: "turso.io".to_string(),
            database: "shop".to_string(),
            password: "token".to_string(),
        };
        assert_eq!(config.primary_url(), "libsql://shop-acme.turso.io");

        config.host = "http://127.0.0.1:8080/".to_string();
        assert_eq!(config.primary_url(), "http://127.0.0.1:8080");
        assert_eq!(config.auth_token(), "token");
    }

    #[test]
    fn test_settings_missing_file_uses_defaults() {
        let settings = PipelineSettings::load(Path::new("no-such-etl.toml")).unwrap();
        assert_eq!(settings, PipelineSettings::default());
    }

    #[test]
    fn test_settings_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "orders_path = \"exports/orders.csv\"").unwrap();
        let settings = PipelineSettings::load(file.path()).unwrap();
        assert_eq!(settings.orders_path, PathBuf::from("exports/orders.csv"));
        assert_eq!(settings.customers_path, PathBuf::from(DEFAULT_CUSTOMERS_PATH));
    }
}
