//! Temperatures from the thermal zone framework.

use std::path::Path;

use tracing::trace;

use crate::snapshot::Temperatures;

const THERMAL_ZONE_PATTERN: &str = "sys/devices/virtual/thermal/thermal_zone*";

/// Zones whose reading is not a temperature worth reporting.
const IGNORED_ZONES: &[&str] = &["PMIC"];

/// Reading reported by a zone whose sensor is offline, in millidegrees.
const OFFLINE_MILLIDEGREES: i64 = -256_000;

/// Read all online thermal zones.
///
/// Zone `GPU-therm` is reported as `GPU`, `BCPU-therm` as `BCPU`.
pub fn read_temperatures(root: &Path) -> Temperatures {
    let mut temps = Temperatures::new();

    for zone in super::glob_under(root, &[THERMAL_ZONE_PATTERN]) {
        let Ok(kind) = std::fs::read_to_string(zone.join("type")) else {
            continue;
        };
        let Some(name) = sensor_name(&kind) else {
            continue;
        };
        if IGNORED_ZONES.contains(&name) {
            continue;
        }

        let Ok(raw) = std::fs::read_to_string(zone.join("temp")) else {
            continue;
        };
        match parse_millidegrees(&raw) {
            Some(celsius) => temps.insert(name, celsius),
            None => trace!(zone = %zone.display(), "Thermal zone offline or unreadable"),
        }
    }

    temps
}

/// Sensor name from a zone type: the part before the first `-`.
pub fn sensor_name(zone_type: &str) -> Option<&str> {
    let name = zone_type.trim().split('-').next()?.trim();
    if name.is_empty() { None } else { Some(name) }
}

/// Convert a millidegree reading into degrees, rejecting offline sensors.
pub fn parse_millidegrees(raw: &str) -> Option<f64> {
    let milli: i64 = raw.trim().parse().ok()?;
    if milli <= OFFLINE_MILLIDEGREES {
        return None;
    }
    Some(milli as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_zone(root: &Path, index: usize, kind: &str, temp: &str) {
        let zone = root.join(format!(
            "sys/devices/virtual/thermal/thermal_zone{}",
            index
        ));
        std::fs::create_dir_all(&zone).unwrap();
        std::fs::write(zone.join("type"), format!("{}\n", kind)).unwrap();
        std::fs::write(zone.join("temp"), format!("{}\n", temp)).unwrap();
    }

    #[test]
    fn test_sensor_name() {
        assert_eq!(sensor_name("GPU-therm\n"), Some("GPU"));
        assert_eq!(sensor_name("BCPU-therm"), Some("BCPU"));
        assert_eq!(sensor_name("Tboard_tegra"), Some("Tboard_tegra"));
        assert_eq!(sensor_name("\n"), None);
    }

    #[test]
    fn test_parse_millidegrees() {
        assert_eq!(parse_millidegrees("45200\n"), Some(45.2));
        assert_eq!(parse_millidegrees("-256000"), None);
        assert_eq!(parse_millidegrees("-5000"), Some(-5.0));
        assert_eq!(parse_millidegrees("hot"), None);
    }

    #[test]
    fn test_read_temperatures() {
        let dir = tempfile::tempdir().unwrap();
        write_zone(dir.path(), 0, "BCPU-therm", "41500");
        write_zone(dir.path(), 1, "GPU-therm", "45200");
        write_zone(dir.path(), 2, "PMIC-Die", "100000");
        write_zone(dir.path(), 3, "CV0-therm", "-256000");

        let temps = read_temperatures(dir.path());

        assert_eq!(temps.get("GPU"), Some(45.2));
        assert_eq!(temps.get("BCPU"), Some(41.5));
        assert_eq!(temps.get("PMIC"), None);
        assert_eq!(temps.get("CV0"), None);
        assert_eq!(temps.len(), 2);
    }
}
