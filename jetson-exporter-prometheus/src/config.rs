//! Configuration for the Jetson exporter.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jetson_stats::TegraConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable pointing at an optional JSON5 configuration file.
pub const CONFIG_ENV: &str = "JETSON_EXPORTER_CONFIG";

/// Port used when `--port` is not given.
pub const DEFAULT_PORT: u16 = 9000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Prometheus HTTP endpoint settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Hardware source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Scrape settings.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Address to listen on (default: "0.0.0.0"). The port comes from `--port`.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            path: default_path(),
        }
    }
}

/// Hardware source and process identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root of the sysfs/procfs tree (default: "/").
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Any path on the data partition (default: "/data").
    #[serde(default = "default_data_disk_path")]
    pub data_disk_path: PathBuf,

    /// Any path on the root partition (default: "/").
    #[serde(default = "default_root_disk_path")]
    pub root_disk_path: PathBuf,

    /// File holding the local hostname (default: "/etc/hostname").
    #[serde(default = "default_hostname_file")]
    pub hostname_file: PathBuf,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/")
}

fn default_data_disk_path() -> PathBuf {
    PathBuf::from("/data")
}

fn default_root_disk_path() -> PathBuf {
    PathBuf::from("/")
}

fn default_hostname_file() -> PathBuf {
    PathBuf::from("/etc/hostname")
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            data_disk_path: default_data_disk_path(),
            root_disk_path: default_root_disk_path(),
            hostname_file: default_hostname_file(),
        }
    }
}

impl SourceConfig {
    /// Paths for the Tegra hardware source.
    pub fn tegra(&self) -> TegraConfig {
        TegraConfig {
            sysfs_root: self.sysfs_root.clone(),
            data_disk_path: self.data_disk_path.clone(),
            root_disk_path: self.root_disk_path.clone(),
        }
    }
}

/// Scrape behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// How long a scrape waits for the hardware source before serving an
    /// empty response (default: 5000).
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_ms: u64,
}

fn default_scrape_timeout() -> u64 {
    5000
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            scrape_timeout_ms: default_scrape_timeout(),
        }
    }
}

impl CollectorConfig {
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_millis(self.scrape_timeout_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the file named by [`CONFIG_ENV`], or the defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load_from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prometheus.listen_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen_address
            )));
        }

        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if self.collector.scrape_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "scrape_timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address to listen on for the given port.
    pub fn listen_addr(&self, port: u16) -> Result<std::net::SocketAddr, ConfigError> {
        let ip: IpAddr = self.prometheus.listen_address.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.prometheus.listen_address
            ))
        })?;
        Ok((ip, port).into())
    }
}
