//! Prometheus metrics exporter for NVIDIA Jetson hardware state.
//!
//! This crate reads a [`jetson_stats::HardwareSnapshot`] on every scrape and
//! exposes it via an HTTP `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ HardwareSource  │────>│    Collector    │────>│   HTTP Server   │
//! │ (sysfs/procfs)  │     │   (mapping)     │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! jetson-exporter-prometheus --port 9000
//! ```
//!
//! # Configuration
//!
//! An optional JSON5 file named by `JETSON_EXPORTER_CONFIG`.
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod exposition;
pub mod http;
pub mod identity;
pub mod mapping;
pub mod runner;

pub use collector::{Collector, CollectorState, CollectorStats, SharedCollector};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use identity::HostIdentity;
pub use mapping::{MetricKind, MetricRecord};
pub use runner::{ExporterRunner, StartupError, init_tracing};
