//! Configuration module for Tubely Ingest
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    pub s3: S3Config,
    pub auth: AuthConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        if self.s3.bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "s3.bucket cannot be empty".into(),
            ));
        }
        if self.s3.region.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "s3.region cannot be empty".into(),
            ));
        }
        if let Some(ref endpoint) = self.s3.endpoint {
            if !is_valid_http_url(endpoint) {
                return Err(ConfigError::ValidationError(
                    "Invalid s3.endpoint: must start with http:// or https://".into(),
                ));
            }
        }

        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret cannot be empty".into(),
            ));
        }

        if self.assets.root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "assets.root cannot be empty".into(),
            ));
        }
        if self
            .assets
            .root
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ConfigError::ValidationError(
                "assets.root must not contain '..'".into(),
            ));
        }

        if self.upload.max_video_bytes == 0 || self.upload.max_thumbnail_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "Upload size limits must be greater than zero".into(),
            ));
        }

        if self.probe.ffprobe_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "probe.ffprobe_path cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    /// Host name used when building URLs for locally stored assets
    #[serde(default = "default_public_host")]
    pub public_host: String,
    /// Port used in asset URLs. Falls back to the port of `address`.
    #[serde(default)]
    pub public_port: Option<u16>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid server.address '{}': {}",
                self.address, e
            ))
        })
    }

    /// Port advertised in asset URLs
    pub fn advertised_port(&self) -> u16 {
        self.public_port
            .or_else(|| self.socket_addr().ok().map(|addr| addr.port()))
            .unwrap_or(80)
    }
}

fn default_public_host() -> String {
    "localhost".to_string()
}

/// Which thumbnail storage strategy the process runs with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailStrategyKind {
    #[default]
    Disk,
    Inline,
}

/// Served-assets configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_assets_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub thumbnail_strategy: ThumbnailStrategyKind,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: default_assets_root(),
            thumbnail_strategy: ThumbnailStrategyKind::default(),
        }
    }
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("assets")
}

/// S3 backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Required `iss` claim, when set
    #[serde(default)]
    pub issuer: Option<String>,
}

/// Media probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
        }
    }
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

/// Upload limits and scratch space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
    #[serde(default = "default_max_thumbnail_bytes")]
    pub max_thumbnail_bytes: u64,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl UploadConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_video_bytes: default_max_video_bytes(),
            max_thumbnail_bytes: default_max_thumbnail_bytes(),
            temp_dir: None,
        }
    }
}

fn default_max_video_bytes() -> u64 {
    1 << 30 // 1 GiB
}

fn default_max_thumbnail_bytes() -> u64 {
    10 << 20 // 10 MiB
}

/// Video record store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// JSON array of video records loaded at startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}
