//! Hardware source for Tegra boards backed by sysfs and procfs.
//!
//! Every path is resolved under a configurable root (`/` on a real board),
//! which lets tests point the source at a fake tree.

pub mod board;
pub mod disk;
pub mod fan;
pub mod power;
pub mod thermal;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::snapshot::{HardwareSnapshot, NOT_AVAILABLE, Uptime};
use crate::source::HardwareSource;

use self::power::PowerMonitor;

const UPTIME_PATH: &str = "proc/uptime";

/// Where the Tegra source reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TegraConfig {
    /// Root of the sysfs/procfs tree.
    pub sysfs_root: PathBuf,
    /// Any path on the data partition.
    pub data_disk_path: PathBuf,
    /// Any path on the root partition.
    pub root_disk_path: PathBuf,
}

impl Default for TegraConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/"),
            data_disk_path: PathBuf::from("/data"),
            root_disk_path: PathBuf::from("/"),
        }
    }
}

/// Reads Jetson hardware state straight from the kernel interfaces.
pub struct TegraSource {
    config: TegraConfig,
    open: bool,
    power: PowerMonitor,
}

impl TegraSource {
    /// Create a closed source.
    pub fn new(config: TegraConfig) -> Self {
        Self {
            config,
            open: false,
            power: PowerMonitor::new(),
        }
    }

    fn root(&self) -> &Path {
        &self.config.sysfs_root
    }

    fn read_uptime(&self) -> Result<Uptime> {
        let path = self.root().join(UPTIME_PATH);
        let content = std::fs::read_to_string(&path).map_err(|e| Error::read(&path, e))?;
        let secs = parse_uptime(&content)
            .ok_or_else(|| Error::parse(&path, format!("unexpected content {:?}", content)))?;
        Ok(Uptime::from_secs(secs))
    }
}

impl HardwareSource for TegraSource {
    fn name(&self) -> &str {
        "tegra"
    }

    fn open(&mut self) -> Result<()> {
        let sys = self.root().join("sys");
        if !sys.is_dir() {
            return Err(Error::RootNotFound(format!(
                "{} is not a directory",
                sys.display()
            )));
        }

        self.power.reset();
        self.open = true;

        if let Err(e) = disk::data_disk_usage(&self.config.data_disk_path) {
            warn!(
                path = %self.config.data_disk_path.display(),
                error = %e,
                "Data disk usage unavailable, reporting zeros"
            );
        }

        info!(
            root = %self.root().display(),
            data_disk = %self.config.data_disk_path.display(),
            "Tegra hardware source opened"
        );
        Ok(())
    }

    fn ready(&self) -> bool {
        self.open && board::read_device_tree_string(&self.root().join(board::MODEL_PATH)).is_some()
    }

    fn snapshot(&mut self) -> Result<HardwareSnapshot> {
        if !self.open {
            return Err(Error::NotOpen);
        }

        let root = self.config.sysfs_root.clone();
        let uptime = self.read_uptime()?;

        let power_mode = board::read_power_mode(&root).unwrap_or_else(|| {
            debug!("Power mode unavailable");
            NOT_AVAILABLE.to_string()
        });

        let data_disk = disk::data_disk_usage(&self.config.data_disk_path).unwrap_or_else(|e| {
            debug!(error = %e, "Data disk usage unavailable");
            Default::default()
        });

        let root_disk = disk::root_disk_usage(&self.config.root_disk_path).unwrap_or_else(|e| {
            warn!(error = %e, "Root disk usage unavailable");
            Default::default()
        });

        Ok(HardwareSnapshot {
            board: board::read_board(&root),
            power_mode,
            uptime,
            data_disk,
            root_disk,
            fan_speed: fan::read_fan_speeds(&root),
            temperatures: thermal::read_temperatures(&root),
            power: self.power.sample(&root),
        })
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            info!(root = %self.root().display(), "Tegra hardware source closed");
        }
    }
}

/// Whole seconds since boot from `/proc/uptime` (`"12345.67 54321.00"`).
pub fn parse_uptime(content: &str) -> Option<u64> {
    let secs: f64 = content.split_whitespace().next()?.parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(secs as u64)
    } else {
        None
    }
}

/// Expand glob patterns relative to `root`, in sorted path order.
pub(crate) fn glob_under(root: &Path, patterns: &[&str]) -> Vec<PathBuf> {
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let mut paths = Vec::new();

    for pattern in patterns {
        let full = Path::new(&escaped_root).join(pattern);
        match glob::glob(&full.to_string_lossy()) {
            Ok(entries) => paths.extend(entries.flatten()),
            Err(e) => debug!(pattern = %pattern, error = %e, "Invalid glob pattern"),
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_board(root: &Path) {
        let write = |rel: &str, content: &str| {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        };

        write("proc/device-tree/model", "NVIDIA Jetson AGX Orin\0");
        write("proc/device-tree/serial-number", "ABC123\0");
        write(
            "etc/nv_tegra_release",
            "# R35 (release), REVISION: 2.1, GCID: 32413640, BOARD: t186ref\n",
        );
        write("proc/uptime", "180125.42 700000.00\n");
        write("var/lib/nvpmodel/status", "pmode:0000 fmode:quiet\n");
        write("etc/nvpmodel.conf", "< POWER_MODEL ID=0 NAME=MAXN >\n");
        write(
            "sys/devices/platform/pwm-fan/hwmon/hwmon2/pwm1",
            "102\n",
        );
        write("sys/devices/virtual/thermal/thermal_zone1/type", "GPU-therm\n");
        write("sys/devices/virtual/thermal/thermal_zone1/temp", "45200\n");
        write(
            "sys/bus/i2c/drivers/ina3221/1-0040/hwmon/hwmon1/in1_label",
            "VDD_IN\n",
        );
        write(
            "sys/bus/i2c/drivers/ina3221/1-0040/hwmon/hwmon1/curr1_input",
            "1000\n",
        );
        write(
            "sys/bus/i2c/drivers/ina3221/1-0040/hwmon/hwmon1/in1_input",
            "5000\n",
        );
    }

    fn source_for(root: &Path) -> TegraSource {
        TegraSource::new(TegraConfig {
            sysfs_root: root.to_path_buf(),
            data_disk_path: root.to_path_buf(),
            root_disk_path: root.to_path_buf(),
        })
    }

    #[test]
    fn test_default_config() {
        let config = TegraConfig::default();
        assert_eq!(config.sysfs_root, PathBuf::from("/"));
        assert_eq!(config.data_disk_path, PathBuf::from("/data"));
        assert_eq!(config.root_disk_path, PathBuf::from("/"));
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("180125.42 700000.00\n"), Some(180_125));
        assert_eq!(parse_uptime("0.99 1.00"), Some(0));
        assert_eq!(parse_uptime(""), None);
        assert_eq!(parse_uptime("-1 0"), None);
    }

    #[test]
    fn test_open_requires_sys_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = source_for(dir.path());

        assert!(matches!(source.open(), Err(Error::RootNotFound(_))));
        assert!(!source.ready());
    }

    #[test]
    fn test_snapshot_before_open() {
        let dir = tempfile::tempdir().unwrap();
        fake_board(dir.path());
        let mut source = source_for(dir.path());

        assert!(matches!(source.snapshot(), Err(Error::NotOpen)));
    }

    #[test]
    fn test_ready_requires_device_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sys")).unwrap();
        let mut source = source_for(dir.path());

        source.open().unwrap();
        assert!(!source.ready());

        fake_board(dir.path());
        assert!(source.ready());
    }

    #[test]
    fn test_snapshot_from_fake_tree() {
        let dir = tempfile::tempdir().unwrap();
        fake_board(dir.path());
        let mut source = source_for(dir.path());

        source.open().unwrap();
        assert!(source.ready());

        let snapshot = source.snapshot().unwrap();
        assert_eq!(snapshot.board.model, "NVIDIA Jetson AGX Orin");
        assert_eq!(snapshot.board.serial_number, "ABC123");
        assert_eq!(snapshot.board.l4t_version, "35.2.1");
        assert_eq!(snapshot.board.jetpack_version, "5.1");
        assert_eq!(snapshot.power_mode, "MAXN");
        assert_eq!(snapshot.uptime, Uptime::from_secs(180_125));
        assert_eq!(snapshot.fan_speed, vec![40.0]);
        assert_eq!(snapshot.temperatures.get("GPU"), Some(45.2));
        assert_eq!(snapshot.temperatures.get("BCPU"), None);
        assert_eq!(snapshot.power.total.unwrap().current_mw, 5000.0);
        assert!(snapshot.data_disk.total > 0);
    }

    #[test]
    fn test_missing_data_disk_reports_zeros() {
        let dir = tempfile::tempdir().unwrap();
        fake_board(dir.path());
        let mut source = TegraSource::new(TegraConfig {
            sysfs_root: dir.path().to_path_buf(),
            data_disk_path: dir.path().join("data"),
            root_disk_path: dir.path().to_path_buf(),
        });

        source.open().unwrap();
        let snapshot = source.snapshot().unwrap();

        assert_eq!(snapshot.data_disk.total, 0);
        assert_eq!(snapshot.data_disk.free, 0);
        assert!(snapshot.root_disk.total > 0.0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fake_board(dir.path());
        let mut source = source_for(dir.path());

        source.open().unwrap();
        source.close();
        source.close();

        assert!(!source.ready());
        assert!(matches!(source.snapshot(), Err(Error::NotOpen)));
    }

    #[test]
    fn test_glob_under_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for zone in ["thermal_zone1", "thermal_zone0"] {
            std::fs::create_dir_all(
                dir.path()
                    .join("sys/devices/virtual/thermal")
                    .join(zone),
            )
            .unwrap();
        }

        let paths = glob_under(dir.path(), &["sys/devices/virtual/thermal/thermal_zone*"]);
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["thermal_zone0", "thermal_zone1"]);
    }
}
