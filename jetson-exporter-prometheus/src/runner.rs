//! Exporter lifecycle: startup ordering, serving and shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use jetson_stats::HardwareSource;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use crate::collector::{Collector, CollectorError, CollectorStats, SharedCollector};
use crate::config::{ConfigError, ExporterConfig, LogFormat, LoggingConfig};
use crate::http::{HttpError, HttpServer};
use crate::identity::{HostIdentity, IdentityError};

/// Fatal errors before the exporter serves traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Hardware source error: {0}")]
    Source(#[from] CollectorError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),
}

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), StartupError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    }
    .map_err(|e| StartupError::Tracing(e.to_string()))
}

/// A started exporter: identity resolved, source open, port bound.
///
/// # Example
///
/// ```ignore
/// let config = ExporterConfig::from_env()?;
/// let source = TegraSource::new(config.source.tegra());
/// let exporter = ExporterRunner::start(&config, 9000, source).await?;
///
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// exporter.run(shutdown_rx).await?;
/// ```
pub struct ExporterRunner {
    collector: SharedCollector,
    server: HttpServer,
}

impl ExporterRunner {
    /// Start the exporter.
    ///
    /// This will:
    /// 1. Resolve the listen address
    /// 2. Read the user name and hostname
    /// 3. Open the hardware source
    /// 4. Bind the HTTP listener
    ///
    /// Any failure aborts startup before the port is served. A source that
    /// was opened is closed again when startup fails afterwards.
    pub async fn start<S>(
        config: &ExporterConfig,
        port: u16,
        source: S,
    ) -> Result<Self, StartupError>
    where
        S: HardwareSource + 'static,
    {
        let listen_addr = config.listen_addr(port)?;
        let identity = HostIdentity::detect(&config.source.hostname_file)?;

        info!(
            username = %identity.username,
            hostname = %identity.hostname,
            source = %source.name(),
            "Starting Jetson exporter"
        );

        let collector = Arc::new(Collector::new(
            source,
            identity,
            config.collector.scrape_timeout(),
        ));
        collector.connect()?;

        let server = HttpServer::bind(
            collector.clone(),
            listen_addr,
            config.prometheus.path.clone(),
        )
        .await?;

        Ok(Self { collector, server })
    }

    /// The bound listen address.
    pub fn local_addr(&self) -> Result<SocketAddr, StartupError> {
        Ok(self.server.local_addr()?)
    }

    /// The shared collector.
    pub fn collector(&self) -> &SharedCollector {
        &self.collector
    }

    /// Serve until the shutdown signal, then close the hardware source.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<CollectorStats, HttpError> {
        let result = self.server.run(shutdown).await;

        self.collector.close();

        let stats = self.collector.stats();
        info!(
            scrapes_served = stats.scrapes_served,
            scrapes_empty = stats.scrapes_empty,
            scrapes_failed = stats.scrapes_failed,
            "Final statistics"
        );

        result.map(|()| stats)
    }
}
