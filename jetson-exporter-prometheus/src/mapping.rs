//! Mapping from a Jetson hardware snapshot to Prometheus metric records.
//!
//! [`map`] is a pure function: the same snapshot and identity always yield
//! the same records, in the same order.

use jetson_stats::HardwareSnapshot;
use thiserror::Error;

use crate::identity::HostIdentity;

/// Decimal gigabyte, used for data disk figures.
const BYTES_PER_GB: f64 = 1e9;

/// Sensor reported as the `gpu` temperature row.
const GPU_SENSOR: &str = "GPU";

/// Sensor reported as the `cpu` temperature row.
const CPU_SENSOR: &str = "BCPU";

/// Snapshot fields that cannot be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Snapshot has no fan speed reading")]
    EmptyFanSpeed,
}

/// The Prometheus metric type of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Descriptive string labels with a constant value of 1.
    Info,
    /// Point-in-time numeric measurement.
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Info => "info",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Value carried by one sample row.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Gauge(f64),
    /// Ordered label pairs of an info sample.
    Info(Vec<(String, String)>),
}

/// One labeled row of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Values for the record's label names, in the same order.
    pub label_values: Vec<String>,
    pub value: SampleValue,
}

/// A named, typed metric with its sample rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: &'static str,
    pub kind: MetricKind,
    pub help: &'static str,
    pub label_names: Vec<&'static str>,
    pub samples: Vec<Sample>,
}

impl MetricRecord {
    /// Create an empty gauge record with a single label.
    pub fn gauge(name: &'static str, help: &'static str, label: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            help,
            label_names: vec![label],
            samples: Vec::new(),
        }
    }

    /// Create an empty info record with a single label.
    pub fn info(name: &'static str, help: &'static str, label: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Info,
            help,
            label_names: vec![label],
            samples: Vec::new(),
        }
    }

    /// Add a gauge row.
    pub fn with_value(mut self, row: &str, value: f64) -> Self {
        self.samples.push(Sample {
            label_values: vec![row.to_string()],
            value: SampleValue::Gauge(value),
        });
        self
    }

    /// Add an info row.
    pub fn with_info(mut self, row: &str, pairs: &[(&str, &str)]) -> Self {
        self.samples.push(Sample {
            label_values: vec![row.to_string()],
            value: SampleValue::Info(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        });
        self
    }

    fn sample(&self, row: &str) -> Option<&Sample> {
        self.samples
            .iter()
            .find(|s| s.label_values.first().map(String::as_str) == Some(row))
    }

    /// Value of the gauge row labeled `row`.
    pub fn gauge_value(&self, row: &str) -> Option<f64> {
        match self.sample(row)?.value {
            SampleValue::Gauge(v) => Some(v),
            SampleValue::Info(_) => None,
        }
    }

    /// Label pairs of the info row labeled `row`.
    pub fn info_value(&self, row: &str) -> Option<&[(String, String)]> {
        match &self.sample(row)?.value {
            SampleValue::Info(pairs) => Some(pairs),
            SampleValue::Gauge(_) => None,
        }
    }
}

/// Map a snapshot to the exporter's records.
///
/// The result is all nine records or an error; a malformed snapshot never
/// produces a partial set.
pub fn map(
    snapshot: &HardwareSnapshot,
    identity: &HostIdentity,
) -> Result<Vec<MetricRecord>, MappingError> {
    let fan_speed = snapshot
        .fan_speed
        .first()
        .copied()
        .ok_or(MappingError::EmptyFanSpeed)?;

    let board = &snapshot.board;
    let uptime = &snapshot.uptime;
    let data = &snapshot.data_disk;
    let root = &snapshot.root_disk;
    let temps = &snapshot.temperatures;

    Ok(vec![
        MetricRecord::info("jetson_info_board", "Board sys info", "board_info").with_info(
            "info",
            &[
                ("jetpack", board.jetpack_version.as_str()),
                ("l4t", board.l4t_version.as_str()),
                ("username", identity.username.as_str()),
                ("hostname", identity.hostname.as_str()),
            ],
        ),
        MetricRecord::info("jetson_info_hardware", "Board hardware info", "board_hw").with_info(
            "hardware",
            &[
                ("module", board.model.as_str()),
                ("serial_number", board.serial_number.as_str()),
            ],
        ),
        MetricRecord::info("jetson_nvpmode", "NV power mode", "nvpmode")
            .with_info("mode", &[("mode", snapshot.power_mode.as_str())]),
        MetricRecord::gauge("jetson_uptime", "System uptime", "uptime")
            .with_value("days", uptime.days as f64)
            .with_value("hours", (uptime.seconds / 3600) as f64)
            .with_value("minutes", ((uptime.seconds / 60) % 60) as f64),
        MetricRecord::gauge("jetson_usage_disk", "Disk space usage", "disk")
            .with_value("free", data.free as f64 / BYTES_PER_GB)
            .with_value("total", data.total as f64 / BYTES_PER_GB)
            .with_value("used", data.used as f64 / BYTES_PER_GB)
            .with_value("percent", data.percent),
        MetricRecord::gauge("jetson_usage_rootdisk", "Disk space usage-root", "root")
            .with_value("total", root.total)
            .with_value("used", root.used)
            .with_value("available", root.available),
        MetricRecord::gauge("jetson_usage_fan", "Fan usage", "fan").with_value("speed", fan_speed),
        MetricRecord::gauge("jetson_temperatures", "Sensor temperatures", "temperature")
            .with_value("gpu", temps.get(GPU_SENSOR).unwrap_or(0.0))
            .with_value("cpu", temps.get(CPU_SENSOR).unwrap_or(0.0)),
        MetricRecord::gauge("jetson_usage_power", "Power usage", "power").with_value(
            "soc",
            snapshot.power.total.map(|total| total.avg_mw).unwrap_or(0.0),
        ),
    ])
}
