//! Fan speed from the pwm-fan driver.

use std::path::{Path, PathBuf};

use tracing::trace;

const PWM_MAX: f64 = 255.0;

/// PWM outputs of the pwm-fan hwmon device, and the pre-hwmon sysfs node of older releases.
const FAN_PATTERNS: &[&str] = &[
    "sys/devices/platform/*pwm-fan*/hwmon/hwmon*/pwm[0-9]",
    "sys/devices/pwm-fan/target_pwm",
];

/// Read fan speeds in percent, one entry per fan, in path order.
pub fn read_fan_speeds(root: &Path) -> Vec<f64> {
    fan_paths(root)
        .iter()
        .filter_map(|path| {
            let raw = std::fs::read_to_string(path).ok()?;
            let speed = parse_pwm(&raw);
            if speed.is_none() {
                trace!(path = %path.display(), "Unparseable fan PWM value");
            }
            speed
        })
        .collect()
}

/// Convert a raw PWM value (0-255) into percent.
pub fn parse_pwm(raw: &str) -> Option<f64> {
    let pwm: f64 = raw.trim().parse().ok()?;
    Some(pwm.clamp(0.0, PWM_MAX) * 100.0 / PWM_MAX)
}

fn fan_paths(root: &Path) -> Vec<PathBuf> {
    super::glob_under(root, FAN_PATTERNS)
}
