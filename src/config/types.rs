//! Configuration types, defaults, loading, and validation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote session behaviour
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Install run behaviour
    #[serde(default)]
    pub install: InstallConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log to file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Remote session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Connectivity test bound in seconds (default: 15)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// How long inline notices stay visible, in seconds (default: 8)
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,

    /// Agent gateway port forwarded by the tunnel (default: 18789)
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_notice_ttl_secs() -> u64 {
    30
}

fn default_gateway_port() -> u16 {
    18789
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            notice_ttl_secs: default_notice_ttl_secs(),
            gateway_port: default_gateway_port(),
        }
    }
}

impl RemoteConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}

/// Install run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Rotated copies kept when saving this file
    #[serde(default = "default_max_backups")]
    pub max_config_backups: usize,

    /// Skills preselected for a fresh wizard session
    #[serde(default = "default_skills")]
    pub default_skills: Vec<String>,
}

fn default_max_backups() -> usize {
    5
}

pub(crate) fn default_skills() -> Vec<String> {
    vec!["filesystem".to_string(), "terminal".to_string()]
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            max_config_backups: default_max_backups(),
            default_skills: default_skills(),
        }
    }
}

/// Base directory for deckhand state: `~/.deckhand`
pub fn deckhand_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".deckhand")
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/deckhand/config.toml
    /// 3. Local config: ./deckhand.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::read_file(&system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::read_file(&local_config_path)?;
        }

        config = Self::apply_env_overrides(config);

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let config = Self::apply_env_overrides(Self::read_file(path)?);

        tracing::debug!("Configuration loaded successfully from custom path");
        Ok(config)
    }

    /// Get the system config path: ~/.config/deckhand/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("deckhand").join("config.toml"))
    }

    /// Get the local config path: ./deckhand.toml
    fn local_config_path() -> PathBuf {
        PathBuf::from("./deckhand.toml")
    }

    /// Whole-file overlay: a later file replaces everything an earlier one set
    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn apply_env_overrides(mut config: Self) -> Self {
        if let Ok(log_level) = std::env::var("DECKHAND_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Ok(log_file) = std::env::var("DECKHAND_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(log_file));
        }

        if let Ok(timeout) = std::env::var("DECKHAND_CONNECT_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => config.remote.connect_timeout_secs = secs,
                Err(_) => tracing::warn!(
                    "Ignoring DECKHAND_CONNECT_TIMEOUT_SECS={timeout:?}: not a whole number of seconds"
                ),
            }
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        if self.remote.connect_timeout_secs == 0 {
            anyhow::bail!("remote.connect_timeout_secs must be greater than zero");
        }

        if self.remote.gateway_port == 0 {
            anyhow::bail!("remote.gateway_port must be a valid port");
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Rotate config backups before writing.
    ///
    /// Keeps up to `max_backups` copies named `config.toml.backup1` (newest)
    /// through `config.toml.backupN` (oldest). Errors are logged and ignored.
    fn backup_config(path: &Path, max_backups: usize) {
        if !path.exists() || max_backups == 0 {
            return;
        }

        let Some(parent) = path.parent() else {
            return;
        };
        let stem = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        for i in (1..=max_backups).rev() {
            let src = parent.join(format!("{stem}.backup{i}"));
            if i == max_backups {
                let _ = fs::remove_file(&src);
            } else if src.exists() {
                let _ = fs::rename(&src, parent.join(format!("{stem}.backup{}", i + 1)));
            }
        }

        let backup1 = parent.join(format!("{stem}.backup1"));
        if let Err(e) = fs::copy(path, &backup1) {
            tracing::warn!("Failed to back up config before write: {e}");
        } else {
            tracing::debug!("Config backed up to {}", backup1.display());
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        Self::backup_config(path, self.install.max_config_backups);

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.remote.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.remote.gateway_port, 18789);
        assert_eq!(config.install.default_skills, vec!["filesystem", "terminal"]);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.remote.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
[logging]
level = "debug"

[remote]
connect_timeout_secs = 30
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.remote.connect_timeout_secs, 30);
        // Unspecified fields keep their defaults
        assert_eq!(config.remote.notice_ttl_secs, 30);
        assert_eq!(config.install.max_config_backups, 5);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.remote.gateway_port = 20000;

        config.save(temp_file.path()).unwrap();
        let loaded = Config::read_file(temp_file.path()).unwrap();

        assert_eq!(loaded.logging.level, config.logging.level);
        assert_eq!(loaded.remote.gateway_port, 20000);
    }

    #[test]
    fn test_save_rotates_backups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.install.max_config_backups = 2;

        config.save(&path).unwrap();
        config.save(&path).unwrap();
        config.save(&path).unwrap();

        assert!(dir.path().join("config.toml.backup1").exists());
        assert!(dir.path().join("config.toml.backup2").exists());
        assert!(!dir.path().join("config.toml.backup3").exists());
    }

    #[test]
    fn test_load_from_missing_path() {
        let dir = tempdir().unwrap();
        assert!(Config::load_from_path(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_system_config_path() {
        let path = Config::system_config_path().unwrap();
        assert!(path.to_string_lossy().contains("deckhand"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_local_config_path() {
        assert_eq!(Config::local_config_path(), PathBuf::from("./deckhand.toml"));
    }
}
