//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use thermo_core::MockSourceOptions;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Where the telemetry byte stream comes from.
    pub source: SourceConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every error found.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Process mode has a command
    /// - Mock sensor count, interval and noise ratio are in range
    ///
    /// # Example
    ///
    /// ```
    /// use thermo_service::Config;
    ///
    /// let config = Config::default();
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.source.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
            return errors;
        }

        let Some((_, port_str)) = self.bind.rsplit_once(':') else {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            });
            return errors;
        };

        match port_str.parse::<u16>() {
            Ok(0) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "port cannot be 0".to_string(),
            }),
            Err(_) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!("invalid port '{}': must be a number 1-65535", port_str),
            }),
            Ok(_) => {}
        }

        errors
    }
}

/// How telemetry bytes are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Synthetic frames from the built-in generator.
    #[default]
    Mock,
    /// The stdout of a measuring process.
    Process,
}

/// Byte source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source mode.
    pub mode: SourceMode,
    /// Program whose stdout is the frame stream (process mode).
    pub command: String,
    /// Arguments passed to `command`.
    pub args: Vec<String>,
    /// Generator settings (mock mode).
    pub mock: MockConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            command: "measure_temp".to_string(),
            args: Vec::new(),
            mock: MockConfig::default(),
        }
    }
}

impl SourceConfig {
    /// Validate source configuration.
    ///
    /// Only the settings of the selected mode are checked.
    pub fn validate(&self) -> Vec<ValidationError> {
        match self.mode {
            SourceMode::Process if self.command.trim().is_empty() => vec![ValidationError {
                field: "source.command".to_string(),
                message: "command cannot be empty in process mode".to_string(),
            }],
            SourceMode::Process => Vec::new(),
            SourceMode::Mock => self.mock.validate("source.mock"),
        }
    }
}

/// Largest number of distinct sensor ids on the wire.
pub const MAX_SENSOR_COUNT: u8 = 64;
/// Minimum generator interval in milliseconds.
pub const MIN_MOCK_INTERVAL_MS: u64 = 10;

/// Synthetic generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Sensors are drawn from `0..sensor_count`.
    pub sensor_count: u8,
    /// Milliseconds between generated chunks.
    pub interval_ms: u64,
    /// Share of chunks that also carry a type-1 frame.
    pub noise_ratio: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        let options = MockSourceOptions::default();
        Self {
            sensor_count: options.sensor_count,
            interval_ms: options.interval.as_millis() as u64,
            noise_ratio: options.noise_ratio,
        }
    }
}

impl MockConfig {
    /// Validate generator configuration.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sensor_count == 0 || self.sensor_count > MAX_SENSOR_COUNT {
            errors.push(ValidationError {
                field: format!("{}.sensor_count", prefix),
                message: format!(
                    "sensor count {} is out of range (1-{})",
                    self.sensor_count, MAX_SENSOR_COUNT
                ),
            });
        }

        if self.interval_ms < MIN_MOCK_INTERVAL_MS {
            errors.push(ValidationError {
                field: format!("{}.interval_ms", prefix),
                message: format!(
                    "interval {} is too short (minimum {} ms)",
                    self.interval_ms, MIN_MOCK_INTERVAL_MS
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.noise_ratio) {
            errors.push(ValidationError {
                field: format!("{}.noise_ratio", prefix),
                message: format!("noise ratio {} must be between 0 and 1", self.noise_ratio),
            });
        }

        errors
    }

    /// Generator options for these settings.
    pub fn to_options(&self) -> MockSourceOptions {
        MockSourceOptions {
            sensor_count: self.sensor_count,
            interval: Duration::from_millis(self.interval_ms),
            noise_ratio: self.noise_ratio,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `source.mock.interval_ms`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("thermo")
        .join("server.toml")
}
