//! Power rails from the INA3221 power monitors.
//!
//! Two driver layouts are supported:
//! - hwmon (`ina3221`): `in{N}_label`, `curr{N}_input` (mA), `in{N}_input` (mV)
//! - iio (`ina3221x`, older releases): `rail_name_{N}`, `in_power{N}_input` (mW)

use std::collections::BTreeMap;
use std::path::Path;

use crate::snapshot::{PowerRail, PowerReadings};

const HWMON_LABEL_PATTERN: &str = "sys/bus/i2c/drivers/ina3221/*/hwmon/hwmon*/in[0-9]_label";
const IIO_RAIL_PATTERN: &str = "sys/bus/i2c/drivers/ina3221x/*/iio:device*/rail_name_[0-9]";

/// Rail that measures the whole module input, used as the total when present.
const INPUT_RAIL: &str = "VDD_IN";

/// Key under which the running average of the total is tracked.
const TOTAL_KEY: &str = "tot";

/// Samples power rails and keeps a running average per rail.
#[derive(Debug, Default)]
pub struct PowerMonitor {
    averages: BTreeMap<String, RunningAverage>,
}

#[derive(Debug, Default, Clone, Copy)]
struct RunningAverage {
    mean: f64,
    count: u64,
}

impl RunningAverage {
    fn push(&mut self, value: f64) -> f64 {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
        self.mean
    }
}

impl PowerMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every rail under `root` and update the averages.
    pub fn sample(&mut self, root: &Path) -> PowerReadings {
        self.update(read_rails(root))
    }

    /// Update the averages from instantaneous rail powers in milliwatts.
    pub fn update(&mut self, instant: BTreeMap<String, f64>) -> PowerReadings {
        let total_mw = match instant.get(INPUT_RAIL) {
            Some(input) => Some(*input),
            None if !instant.is_empty() => Some(instant.values().sum()),
            None => None,
        };

        let rails = instant
            .into_iter()
            .map(|(name, current_mw)| {
                let avg_mw = self.averages.entry(name.clone()).or_default().push(current_mw);
                (name, PowerRail { current_mw, avg_mw })
            })
            .collect();

        let total = total_mw.map(|current_mw| PowerRail {
            current_mw,
            avg_mw: self
                .averages
                .entry(TOTAL_KEY.to_string())
                .or_default()
                .push(current_mw),
        });

        PowerReadings { total, rails }
    }

    /// Forget all averages.
    pub fn reset(&mut self) {
        self.averages.clear();
    }
}

/// Read instantaneous power of every rail, in milliwatts.
pub fn read_rails(root: &Path) -> BTreeMap<String, f64> {
    let mut rails = BTreeMap::new();

    for label_path in super::glob_under(root, &[HWMON_LABEL_PATTERN]) {
        let Some(dir) = label_path.parent() else {
            continue;
        };
        let Some(index) = channel_index(&label_path, "in", "_label") else {
            continue;
        };
        let Some(label) = read_trimmed(&label_path) else {
            continue;
        };
        // The summing channel duplicates the other rails
        if label.to_ascii_lowercase().starts_with("sum") {
            continue;
        }

        let current_ma = read_number(&dir.join(format!("curr{}_input", index)));
        let voltage_mv = read_number(&dir.join(format!("in{}_input", index)));
        if let (Some(ma), Some(mv)) = (current_ma, voltage_mv) {
            rails.insert(label, ma * mv / 1000.0);
        }
    }

    for name_path in super::glob_under(root, &[IIO_RAIL_PATTERN]) {
        let Some(dir) = name_path.parent() else {
            continue;
        };
        let Some(index) = channel_index(&name_path, "rail_name_", "") else {
            continue;
        };
        let Some(label) = read_trimmed(&name_path) else {
            continue;
        };
        if let Some(mw) = read_number(&dir.join(format!("in_power{}_input", index))) {
            rails.insert(label, mw);
        }
    }

    rails
}

fn channel_index(path: &Path, prefix: &str, suffix: &str) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix(prefix)?
        .strip_suffix(suffix)?
        .parse()
        .ok()
}

fn read_trimmed(path: &Path) -> Option<String> {
    let value = std::fs::read_to_string(path).ok()?.trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

fn read_number(path: &Path) -> Option<f64> {
    read_trimmed(path)?.parse().ok()
}
