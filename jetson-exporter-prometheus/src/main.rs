//! Prometheus exporter for NVIDIA Jetson hardware state.

use std::time::Duration;

use clap::Parser;
use jetson_stats::TegraSource;
use tokio::sync::watch;
use tracing::{error, info, warn};

use jetson_exporter_prometheus::config::DEFAULT_PORT;
use jetson_exporter_prometheus::{ExporterConfig, ExporterRunner, init_tracing};

/// Prometheus exporter for NVIDIA Jetson hardware state.
#[derive(Parser, Debug)]
#[command(name = "jetson-exporter-prometheus")]
#[command(about = "Export Jetson hardware state as Prometheus metrics")]
struct Args {
    /// Metrics collector port number.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ExporterConfig::from_env()?;
    init_tracing(&config.logging)?;

    let source = TegraSource::new(config.source.tegra());
    let exporter = ExporterRunner::start(&config, args.port, source).await?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut server_task = tokio::spawn(exporter.run(shutdown_rx));

    // Wait for shutdown signal, or for the server to stop on its own
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
        result = &mut server_task => {
            return match result {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(anyhow::anyhow!("Server task failed: {}", e)),
            };
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    match tokio::time::timeout(Duration::from_secs(5), server_task).await {
        Ok(Ok(Ok(_))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server error"),
        Ok(Err(e)) => error!(error = %e, "Server task failed"),
        Err(_) => warn!("Timed out waiting for the HTTP server to stop"),
    }

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
