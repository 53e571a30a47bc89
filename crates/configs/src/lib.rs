use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const DEFAULT_DB_PATH: &str = "data/userDatabase.json";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Write through a sibling temp file and rename over the target.
    #[serde(default = "default_atomic_writes")]
    pub atomic_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_db_path(), atomic_writes: default_atomic_writes() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_db_path() -> PathBuf { PathBuf::from(DEFAULT_DB_PATH) }
fn default_atomic_writes() -> bool { true }
fn default_log_format() -> String { "compact".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

/// Where the base configuration came from, reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// No readable config file; defaults plus environment.
    Environment { reason: String },
}

fn resolve(loaded: Result<AppConfig>) -> (AppConfig, ConfigSource) {
    match loaded {
        Ok(cfg) => (cfg, ConfigSource::File),
        Err(e) => (AppConfig::default(), ConfigSource::Environment { reason: e.to_string() }),
    }
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), apply environment overrides,
    /// then normalize and validate. A missing file means environment only.
    pub fn load_and_validate() -> Result<(Self, ConfigSource)> {
        dotenvy::dotenv().ok();
        let (mut cfg, source) = resolve(load_default());
        cfg.apply_env();
        cfg.normalize_and_validate()?;
        Ok((cfg, source))
    }

    /// Environment overrides: `USER_DB_PATH`, `USER_DB_ATOMIC_WRITES`, `LOG_FORMAT`.
    pub fn apply_env(&mut self) {
        if let Ok(p) = std::env::var("USER_DB_PATH") {
            self.storage.path = PathBuf::from(p);
        }
        if let Some(b) = std::env::var("USER_DB_ATOMIC_WRITES").ok().and_then(|v| parse_bool(&v)) {
            self.storage.atomic_writes = b;
        }
        if let Ok(f) = std::env::var("LOG_FORMAT") {
            self.logging.format = f;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.storage.normalize_and_validate()?;
        self.logging.normalize_and_validate()?;
        Ok(())
    }
}

impl StorageConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        if self.path.as_os_str().to_string_lossy().trim().is_empty() {
            self.path = default_db_path();
        }
        if self.path.is_dir() {
            return Err(anyhow!("storage.path {} is a directory, expected a file", self.path.display()));
        }
        if self.path.file_name().is_none() {
            return Err(anyhow!("storage.path {} has no file name", self.path.display()));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        let f = self.format.trim().to_ascii_lowercase();
        self.format = match f.as_str() {
            "" => default_log_format(),
            "compact" | "json" => f,
            other => return Err(anyhow!("logging.format must be `compact` or `json`, got `{other}`")),
        };
        Ok(())
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gets_defaults() -> Result<()> {
        let mut cfg = load_from_str("")?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.storage.path, PathBuf::from(DEFAULT_DB_PATH));
        assert!(cfg.storage.atomic_writes);
        assert_eq!(cfg.logging.format, "compact");
        Ok(())
    }

    #[test]
    fn toml_values_are_read() -> Result<()> {
        let mut cfg = load_from_str(
            r#"
            [storage]
            path = "var/users.json"
            atomic_writes = false

            [logging]
            format = "JSON"
            "#,
        )?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.storage.path, PathBuf::from("var/users.json"));
        assert!(!cfg.storage.atomic_writes);
        assert_eq!(cfg.logging.format, "json");
        Ok(())
    }

    #[test]
    fn unreadable_file_falls_back_to_environment() -> Result<()> {
        let (cfg, source) = resolve(load_from_file("/nonexistent/userdb/config.toml"));
        assert!(matches!(source, ConfigSource::Environment { ref reason } if !reason.is_empty()));
        assert_eq!(cfg.storage.path, PathBuf::from(DEFAULT_DB_PATH));

        let (_, source) = resolve(load_from_str("[storage]\npath = \"x.json\""));
        assert_eq!(source, ConfigSource::File);
        Ok(())
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut cfg = AppConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn rejects_directory_path() {
        let mut cfg = AppConfig::default();
        cfg.storage.path = std::env::temp_dir();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn blank_path_falls_back_to_default() -> Result<()> {
        let mut cfg = AppConfig::default();
        cfg.storage.path = PathBuf::from("  ");
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.storage.path, PathBuf::from(DEFAULT_DB_PATH));
        Ok(())
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
