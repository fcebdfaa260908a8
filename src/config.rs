//! Configuration management for the prediction service

use crate::schema::{student_domain_config, FeatureDomainConfig};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "SPP";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub dataset: DatasetConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
    /// Per-feature kind and range declarations
    pub features: HashMap<String, FeatureDomainConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            artifacts: ArtifactsConfig::default(),
            dataset: DatasetConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
            features: student_domain_config(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Pre-built model artifacts, produced by the offline training job
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory containing the artifact files
    pub dir: PathBuf,
    /// Trained classifier (`.json` forest, or `.onnx` with the `onnx` feature)
    pub model: String,
    /// Fitted standard scaler
    pub scaler: String,
    /// Fitted label encoder
    pub encoder: String,
    /// Ordered feature-name list
    pub feature_names: String,
    /// GPA metadata per class
    pub class_metadata: String,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl ArtifactsConfig {
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(&self.scaler)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.dir.join(&self.encoder)
    }

    pub fn feature_names_path(&self) -> PathBuf {
        self.dir.join(&self.feature_names)
    }

    pub fn class_metadata_path(&self) -> PathBuf {
        self.dir.join(&self.class_metadata)
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            model: "model.json".to_string(),
            scaler: "scaler.json".to_string(),
            encoder: "encoder.json".to_string(),
            feature_names: "feature_names.json".to_string(),
            class_metadata: "class_metadata.json".to_string(),
            onnx_threads: 1,
        }
    }
}

/// Training dataset used for descriptive statistics
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("student_performance_dataset_final.csv"),
        }
    }
}

/// Service metrics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between logged summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, overridden by `SPP__*`
    /// environment variables (e.g. `SPP__SERVER__BIND_ADDR`).
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    fn load_with_env_prefix<P: AsRef<Path>>(path: P, prefix: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Apply command-line overrides on top of file and environment settings
    pub fn with_overrides(mut self, bind: Option<String>, artifacts_dir: Option<PathBuf>) -> Self {
        if let Some(bind) = bind {
            self.server.bind_addr = bind;
        }
        if let Some(dir) = artifacts_dir {
            self.artifacts.dir = dir;
        }
        self
    }
}
