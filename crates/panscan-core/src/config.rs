//! Scanner configuration
//!
//! Persisted as pretty-printed JSON, by default under the user's config
//! directory at `panscan/config.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::{ConnectionConfig, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};
use crate::scanner::{ControllerConfig, DEFAULT_MAX_ANGLE};

/// Errors loading or saving a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Neither a config nor a home directory is known for this user
    #[error("Could not find a configuration directory")]
    NoConfigDir,
}

/// Everything needed to connect to and drive the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Serial device path; `None` auto-detects
    pub port: Option<String>,
    /// Baud rate
    pub baud_rate: u32,
    /// Bounded wait for a single line read in milliseconds
    pub read_timeout_ms: u64,
    /// Highest accepted pan/tilt angle in degrees
    pub max_angle: u32,
    /// Longest wait for the ready sentinel in milliseconds; `None` waits forever
    pub max_wait_ms: Option<u64>,
    /// Device-side pause before each reading during a sweep
    pub settle_delay_ms: u64,
    /// Emit every line sent and received at trace level
    pub log_traffic: bool,
    /// Only auto-detect endpoints with known controller board USB IDs
    pub board_filter: bool,
    /// Pause after opening the port before the link is used, in milliseconds
    pub open_delay_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_angle: DEFAULT_MAX_ANGLE,
            max_wait_ms: None,
            settle_delay_ms: 100,
            log_traffic: false,
            board_filter: true,
            open_delay_ms: 0,
        }
    }
}

impl ScannerConfig {
    /// Get the default configuration file location
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join("panscan").join("config.json"))
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a configuration file, or the defaults if it does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save to a configuration file, creating parent directories as needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)
    }

    /// Settings for the serial link
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            baud_rate: self.baud_rate,
            read_timeout_ms: self.read_timeout_ms,
            known_boards_only: self.board_filter,
            log_traffic: self.log_traffic,
            open_delay_ms: self.open_delay_ms,
        }
    }

    /// Settings for the device controller
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            max_angle: self.max_angle,
            max_wait: self.max_wait_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::default();
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.read_timeout_ms, 1000);
        assert_eq!(config.max_angle, 170);
        assert!(config.max_wait_ms.is_none());
        assert!(config.board_filter);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = ScannerConfig {
            port: Some("/dev/ttyACM1".to_string()),
            max_wait_ms: Some(5000),
            log_traffic: true,
            ..ScannerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ScannerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "max_angle": 180 }"#).unwrap();
        let config = ScannerConfig::load(&path).unwrap();
        assert_eq!(config.max_angle, 180);
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            ScannerConfig::load(&path),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(
            ScannerConfig::load_or_default(&path).unwrap(),
            ScannerConfig::default()
        );
    }

    #[test]
    fn test_error_messages_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{").unwrap();
        let err = ScannerConfig::load(&path).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Invalid configuration in "));
        assert!(message.contains("config.json"));
        assert_eq!(
            ConfigError::NoConfigDir.to_string(),
            "Could not find a configuration directory"
        );
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            ScannerConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_derived_configs() {
        let config = ScannerConfig {
            max_wait_ms: Some(250),
            board_filter: false,
            ..ScannerConfig::default()
        };
        assert_eq!(
            config.controller_config().max_wait,
            Some(Duration::from_millis(250))
        );
        assert!(!config.connection_config().known_boards_only);
    }
}
