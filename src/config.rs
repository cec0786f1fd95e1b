//! YAML Configuration File Support for soundmatch
//!
//! Loads the query-time fingerprint geometry, snapshot settings and logging
//! preferences from a single YAML file.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "catalogue"
//!
//! fingerprint:
//!   threshold_votes: 5
//!   hash_tables: 25
//!   samples_per_fingerprint: 8192
//!   sample_rate: 5512
//!   permitted_gap: 2.0
//!   max_results: 10
//!   similarity: "matching_bins"
//!   use_parallel: true
//!
//! index:
//!   compression: "zstd"
//!   compression_level: 3
//!
//! logging:
//!   level: "info"
//!   json: false
//! ```

use std::fs;
use std::path::Path;

use index::{CompressionCodec, CompressionConfig};
use matcher::FingerprintConfiguration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SoundMatchConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Query-time fingerprint geometry and thresholds. Absent keys take the
    /// matcher's own defaults.
    #[serde(default)]
    pub fingerprint: FingerprintConfiguration,

    /// Snapshot encoding
    #[serde(default)]
    pub index: IndexYamlConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl SoundMatchConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: SoundMatchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.fingerprint
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("fingerprint: {e}")))?;
        self.index.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Matcher configuration described by the `fingerprint` section.
    pub fn to_fingerprint_configuration(&self) -> FingerprintConfiguration {
        self.fingerprint.clone()
    }

    /// Snapshot compression described by the `index` section.
    pub fn to_compression_config(&self) -> CompressionConfig {
        self.index.to_compression_config()
    }
}

impl Default for SoundMatchConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            fingerprint: FingerprintConfiguration::default(),
            index: IndexYamlConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

/// Index YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexYamlConfig {
    /// "zstd" or "none"
    #[serde(default = "default_compression")]
    pub compression: String,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl IndexYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_codecs = ["zstd", "none"];
        if !valid_codecs.contains(&self.compression.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "index.compression must be one of: {valid_codecs:?}"
            )));
        }
        if self.compression == "zstd" && !(1..=22).contains(&self.compression_level) {
            return Err(ConfigLoadError::Validation(
                "index.compression_level must be between 1 and 22".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_compression_config(&self) -> CompressionConfig {
        let codec = match self.compression.as_str() {
            "none" => CompressionCodec::None,
            _ => CompressionCodec::Zstd,
        };
        CompressionConfig::default()
            .with_codec(codec)
            .with_level(self.compression_level)
    }
}

impl Default for IndexYamlConfig {
    fn default() -> Self {
        Self {
            compression: default_compression(),
            compression_level: default_compression_level(),
        }
    }
}

/// Logging YAML configuration, consumed by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingYamlConfig {
    /// `tracing` filter directive, e.g. "info" or "matcher=debug".
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl LoggingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_compression() -> String {
    "zstd".to_string()
}
fn default_compression_level() -> i32 {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}
