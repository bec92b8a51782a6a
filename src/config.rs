//! Server configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables (`LEARNIFY_BIND_ADDR`, `LEARNIFY_DATABASE_PATH`,
//! `LEARNIFY_TOKEN_SECRET`) and finally by CLI flags in the binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Secret for signing access tokens. When empty a random secret is
    /// generated at startup, which invalidates tokens on restart.
    pub token_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
    /// Cards per training batch.
    pub training_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            database_path: PathBuf::from("learnify.db"),
            token_secret: String::new(),
            access_token_ttl_minutes: 30,
            refresh_token_ttl_days: 30,
            cors_origins: vec!["http://localhost:3000".to_string()],
            training_batch_size: crate::training::DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML file if given, then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&raw)?
            }
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var("LEARNIFY_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(db) = std::env::var("LEARNIFY_DATABASE_PATH") {
            config.database_path = PathBuf::from(db);
        }
        if let Ok(secret) = std::env::var("LEARNIFY_TOKEN_SECRET") {
            config.token_secret = secret;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.training_batch_size, 10);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"0.0.0.0:9000\"").unwrap();
        writeln!(file, "training_batch_size = 6").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.training_batch_size, 6);
        assert_eq!(config.access_token_ttl_minutes, 30);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bindaddr = \"oops\"").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            Config::load(Some(Path::new("/definitely/not/here.toml"))),
            Err(ConfigError::Io { .. })
        ));
    }
}
