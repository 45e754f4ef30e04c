//! Hardware snapshot data model.
//!
//! A [`HardwareSnapshot`] is read once per scrape and never mutated
//! afterwards. Optional readings are typed: a temperature sensor or power
//! total that the board does not expose is `None`, not a missing map key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder for identity strings the board does not expose.
pub const NOT_AVAILABLE: &str = "N/A";

const SECONDS_PER_DAY: u64 = 86_400;

/// All hardware state read at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    /// Board identity and software release.
    pub board: BoardInfo,

    /// Name of the active nvpmodel power profile.
    pub power_mode: String,

    /// Time since boot.
    pub uptime: Uptime,

    /// Usage of the data partition.
    pub data_disk: DataDiskUsage,

    /// Usage of the root partition.
    pub root_disk: RootDiskUsage,

    /// Fan speeds in percent, one entry per fan. Empty when no fan was found.
    #[serde(default)]
    pub fan_speed: Vec<f64>,

    /// Temperature sensors in degrees Celsius.
    #[serde(default)]
    pub temperatures: Temperatures,

    /// Power rail readings.
    #[serde(default)]
    pub power: PowerReadings,
}

/// Board identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardInfo {
    /// JetPack release, derived from the L4T version.
    pub jetpack_version: String,
    /// Linux for Tegra release, e.g. `35.1.0`.
    pub l4t_version: String,
    /// Module model string from the device tree.
    pub model: String,
    /// Module serial number.
    pub serial_number: String,
}

impl Default for BoardInfo {
    fn default() -> Self {
        Self {
            jetpack_version: NOT_AVAILABLE.to_string(),
            l4t_version: NOT_AVAILABLE.to_string(),
            model: NOT_AVAILABLE.to_string(),
            serial_number: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Time since boot, split into whole days and the seconds of the current day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uptime {
    pub days: u64,
    /// Seconds into the current day, in `0..86400`.
    pub seconds: u32,
}

impl Uptime {
    /// Split a total number of seconds since boot.
    pub fn from_secs(total: u64) -> Self {
        Self {
            days: total / SECONDS_PER_DAY,
            seconds: (total % SECONDS_PER_DAY) as u32,
        }
    }
}

/// Data partition usage in bytes, as reported by `statvfs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDiskUsage {
    pub free: u64,
    pub total: u64,
    pub used: u64,
    /// Used space in percent of the space usable by unprivileged users.
    pub percent: f64,
}

/// Root partition usage in the monitor's native unit (GiB for [`crate::TegraSource`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RootDiskUsage {
    pub total: f64,
    pub used: f64,
    pub available: f64,
}

/// Temperature readings keyed by sensor name (`GPU`, `BCPU`, `CPU`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperatures(BTreeMap<String, f64>);

impl Temperatures {
    /// Create an empty set of readings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sensor reading. The first reading for a name wins.
    pub fn insert(&mut self, sensor: impl Into<String>, celsius: f64) {
        self.0.entry(sensor.into()).or_insert(celsius);
    }

    /// Reading for a sensor, if the board exposes it.
    pub fn get(&self, sensor: &str) -> Option<f64> {
        self.0.get(sensor).copied()
    }

    /// Iterate readings in sensor name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Temperatures {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut temps = Temperatures::new();
        for (sensor, celsius) in iter {
            temps.insert(sensor, celsius);
        }
        temps
    }
}

/// One power rail reading in milliwatts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerRail {
    /// Instantaneous power.
    pub current_mw: f64,
    /// Running average since the source was opened.
    pub avg_mw: f64,
}

/// Power readings for the board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerReadings {
    /// Total board power, when the board has power monitors.
    #[serde(default)]
    pub total: Option<PowerRail>,

    /// Individual rails keyed by rail label.
    #[serde(default)]
    pub rails: BTreeMap<String, PowerRail>,
}
