//! Configuration management for the health profile predictor

use anyhow::{Context, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the web form is served on
    pub bind_address: String,
}

/// Remote model artifacts and their local cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory the artifacts are cached in, relative to the working directory
    pub models_dir: String,
    /// Download URL; `{id}` is replaced by the artifact's remote id
    pub url_template: String,
    /// Number of threads for ONNX inference per model
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Optional TCP connect timeout for downloads
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Feature scaling transform
    pub scaler: ArtifactSpec,
    /// Alcohol-use classifier
    pub alcohol: ArtifactSpec,
    /// Smoking-status classifier
    pub smoke: ArtifactSpec,
}

/// One remote artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactSpec {
    /// Opaque identifier substituted into the download URL
    pub remote_id: String,
    /// File name inside `models_dir`
    pub file_name: String,
}

fn default_onnx_threads() -> usize {
    1
}

impl ArtifactsConfig {
    /// Local path of an artifact
    pub fn local_path(&self, artifact: &ArtifactSpec) -> PathBuf {
        Path::new(&self.models_dir).join(&artifact.file_name)
    }
}

/// Prediction statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries (0 disables them)
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// The file is optional; every key it omits keeps its built-in default.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults =
            Config::try_from(&AppConfig::default()).context("Failed to encode default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path.as_ref()).required(false))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    /// Built-in defaults. The remote ids name the original joblib artifacts;
    /// deployments must override them with ids of ONNX exports.
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "0.0.0.0:8501".to_string(),
            },
            artifacts: ArtifactsConfig {
                models_dir: "model_data".to_string(),
                url_template: "https://drive.google.com/uc?export=download&id={id}".to_string(),
                onnx_threads: 1,
                connect_timeout_secs: None,
                scaler: ArtifactSpec {
                    remote_id: "1Jyuc_k1VG_i3_U-vGDZc-mJ8EX_nsJj3".to_string(),
                    file_name: "scaler.bin".to_string(),
                },
                alcohol: ArtifactSpec {
                    remote_id: "1uqRaMs5Yk3BINYntLzGX85vAPZ95Lyyb".to_string(),
                    file_name: "model_alcohol.bin".to_string(),
                },
                smoke: ArtifactSpec {
                    remote_id: "1UX8xszo5CQdv-75Kgl3aGkZTDoCHPfni".to_string(),
                    file_name: "model_smoke.bin".to_string(),
                },
            },
            metrics: MetricsConfig {
                report_interval_secs: 300,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
