//! Configuration module for xcmon-server.
//!
//! Handles loading configuration from the TOML file and CLI overrides, and
//! turns it into the runtime types used by `xcmon-core`.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{
    JanitorConfig, MatchingConfig, SchedulerConfig, SharedConfig, StoreConfig,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub janitor: JanitorConfig,
    pub matching: MatchingConfig,
}

impl LoadedConfig {
    /// Convert into a SharedConfig with a reloadable store per section.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig::new(self.store, self.scheduler, self.janitor, self.matching)
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    store_path_override: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, store_path_override: Option<PathBuf>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            store_path_override,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, or fall back to defaults if it does not exist
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str::<FileConfig>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(path) = &self.store_path_override {
            file_config.store.path = path.clone();
        }

        self.validate(&file_config)?;

        Ok(build_loaded_config(file_config))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.store.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.path must not be empty".to_string(),
            ));
        }
        if config.scheduler.frequency_ms == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.frequency_ms must be greater than zero".to_string(),
            ));
        }
        if config.janitor.sweep_expiry_ms == 0 {
            return Err(ConfigError::ValidationError(
                "janitor.sweep_expiry_ms must be greater than zero".to_string(),
            ));
        }
        if config.matching.notification_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "matching.notification_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        store: StoreConfig::new(file_config.store.path),
        scheduler: SchedulerConfig {
            frequency: Duration::from_millis(file_config.scheduler.frequency_ms),
        },
        janitor: JanitorConfig {
            sweep_expiry: Duration::from_millis(file_config.janitor.sweep_expiry_ms),
        },
        matching: MatchingConfig {
            notification_buffer: file_config.matching.notification_buffer,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("xcmon-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_applies_override() {
        let path = write_config(
            "override.toml",
            "[store]\npath = \"/from/file\"\n[scheduler]\nfrequency_ms = 250\n",
        );
        let loaded = ConfigLoader::new(&path, Some(PathBuf::from("/from/cli")))
            .load()
            .unwrap();
        assert_eq!(loaded.store.path, PathBuf::from("/from/cli"));
        assert!(!loaded.store.temporary);
        assert_eq!(loaded.scheduler.frequency, Duration::from_millis(250));
        assert_eq!(loaded.janitor.sweep_expiry, Duration::from_secs(1800));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loaded = ConfigLoader::new("/definitely/not/here/xcmon-config.toml", None)
            .load()
            .unwrap();
        assert_eq!(loaded.store.path, PathBuf::from("./data/xcmon"));
        assert_eq!(loaded.matching.notification_buffer, 256);
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let path = write_config("zero.toml", "[janitor]\nsweep_expiry_ms = 0\n");
        let result = ConfigLoader::new(&path, None).load();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let path = write_config("broken.toml", "[scheduler\n");
        let result = ConfigLoader::new(&path, None).load();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
