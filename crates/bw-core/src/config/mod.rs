//! Configuration management for burrow

mod backoff;
pub mod serde_utils;
mod tunnel;

pub use backoff::BackoffConfig;
pub use tunnel::{TunnelConfig, DEFAULT_REGION, DEFAULT_RELAY_DOMAIN, DEFAULT_RELAY_PORT};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// `[tunnel]` section
    pub tunnel: TunnelConfig,
    /// `[retry]` section, used when dialing the relay
    pub retry: BackoffConfig,
}

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("burrow")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config::<ConfigFile>(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ConfigFile::default();
        config.tunnel.subdomain = Some("demo".to_string());
        config.tunnel.ready_timeout = Duration::from_secs(5);
        save_config(&path, &config).unwrap();

        let loaded: ConfigFile = load_config(&path).unwrap();
        assert_eq!(loaded.tunnel.subdomain.as_deref(), Some("demo"));
        assert_eq!(loaded.tunnel.ready_timeout, Duration::from_secs(5));
        assert_eq!(loaded.retry.multiplier, config.retry.multiplier);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tunnel]\nregion = \"eu\"\n").unwrap();

        let loaded: ConfigFile = load_config(&path).unwrap();
        assert_eq!(loaded.tunnel.region(), "eu");
        assert_eq!(loaded.tunnel.relay_port, DEFAULT_RELAY_PORT);
        assert_eq!(loaded.retry.initial, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tunnel\nregion = ").unwrap();

        assert!(matches!(
            load_config::<ConfigFile>(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
