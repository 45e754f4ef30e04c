//! Jetson hardware state library.
//!
//! This crate provides the hardware side of the Jetson exporter:
//!
//! - [`snapshot`] - Typed hardware snapshot (`HardwareSnapshot` and its parts)
//! - [`source`] - The `HardwareSource` trait consumed by collectors
//! - [`tegra`] - A sysfs/procfs-backed source for Tegra boards
//! - [`mock`] - A scripted source for tests
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```ignore
//! use jetson_stats::{HardwareSource, TegraConfig, TegraSource};
//!
//! let mut source = TegraSource::new(TegraConfig::default());
//! source.open()?;
//! if source.ready() {
//!     let snapshot = source.snapshot()?;
//!     println!("{} running {}", snapshot.board.model, snapshot.power_mode);
//! }
//! source.close();
//! ```

pub mod error;
pub mod mock;
pub mod snapshot;
pub mod source;
pub mod tegra;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};
pub use mock::MockSource;
pub use snapshot::{
    BoardInfo, DataDiskUsage, HardwareSnapshot, NOT_AVAILABLE, PowerRail, PowerReadings,
    RootDiskUsage, Temperatures, Uptime,
};
pub use source::HardwareSource;
pub use tegra::{TegraConfig, TegraSource};
