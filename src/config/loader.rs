//! Configuration loader with environment variable expansion

use super::{ConfigError, SmokeConfig};
use std::path::Path;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SmokeConfig, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load configuration from the file named by `CONFIG_PATH`
    pub fn load_from_env() -> Result<SmokeConfig, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::load(path),
            _ => Err(ConfigError::MissingPath),
        }
    }

    /// Parse and validate configuration text.
    ///
    /// `${VAR}` placeholders in string fields are expanded as they are
    /// deserialized.
    pub fn parse(content: &str) -> Result<SmokeConfig, ConfigError> {
        let config: SmokeConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}
