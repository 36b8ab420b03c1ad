use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::catalog::{Catalog, Category};
use crate::session::{validate_days, DEFAULT_DAYS};

/// The AWS blog catalog shipped with the crate.
const BUILTIN_CONFIG: &str = include_str!("../feeds.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Window used by a fetch that does not name one, in days
    #[serde(default = "default_days")]
    pub default_days: u32,
    /// Per-request timeout for feed downloads, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub categories: Vec<Category>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_days() -> u32 {
    DEFAULT_DAYS
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_str(BUILTIN_CONFIG)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in catalog.
    pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::builtin()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if validate_days(self.default_days).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default_days must be between 1 and 30, got {}",
                self.default_days
            )));
        }

        if let Some(category) = self.categories.iter().find(|c| c.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "category with {} feed(s) has an empty name",
                category.feeds.len()
            )));
        }

        Ok(())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.categories.clone())
    }
}
