//! Scripted hardware source for testing.
//!
//! [`MockSource`] returns a fixed snapshot and lets tests toggle readiness,
//! inject failures and observe how often the source was opened, polled
//! and closed. Clones share state, so a test can keep one handle while a
//! collector owns another.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::snapshot::{
    BoardInfo, DataDiskUsage, HardwareSnapshot, PowerReadings, RootDiskUsage, Temperatures,
    Uptime,
};
use crate::source::HardwareSource;

#[derive(Debug)]
struct MockState {
    snapshot: Mutex<HardwareSnapshot>,
    ready: AtomicBool,
    open: AtomicBool,
    fail_open: AtomicBool,
    fail_snapshot: AtomicBool,
    opens: AtomicUsize,
    closes: AtomicUsize,
    snapshots: AtomicUsize,
}

/// A hardware source driven by the test.
#[derive(Debug, Clone)]
pub struct MockSource {
    state: Arc<MockState>,
}

impl MockSource {
    /// Create a ready source returning `snapshot`.
    pub fn new(snapshot: HardwareSnapshot) -> Self {
        Self {
            state: Arc::new(MockState {
                snapshot: Mutex::new(snapshot),
                ready: AtomicBool::new(true),
                open: AtomicBool::new(false),
                fail_open: AtomicBool::new(false),
                fail_snapshot: AtomicBool::new(false),
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                snapshots: AtomicUsize::new(0),
            }),
        }
    }

    /// Replace the snapshot returned by subsequent polls.
    pub fn set_snapshot(&self, snapshot: HardwareSnapshot) {
        if let Ok(mut guard) = self.state.snapshot.lock() {
            *guard = snapshot;
        }
    }

    /// Toggle readiness.
    pub fn set_ready(&self, ready: bool) {
        self.state.ready.store(ready, Ordering::SeqCst);
    }

    /// Make `open` fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.state.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make `snapshot` fail while the source still reports ready.
    pub fn set_fail_snapshot(&self, fail: bool) {
        self.state.fail_snapshot.store(fail, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn snapshot_count(&self) -> usize {
        self.state.snapshots.load(Ordering::SeqCst)
    }
}

impl HardwareSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn open(&mut self) -> Result<()> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(Error::RootNotFound("mock source refused to open".to_string()));
        }
        self.state.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn ready(&self) -> bool {
        self.is_open() && self.state.ready.load(Ordering::SeqCst)
    }

    fn snapshot(&mut self) -> Result<HardwareSnapshot> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }
        self.state.snapshots.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_snapshot.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("mock snapshot failure".to_string()));
        }
        self.state
            .snapshot
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| Error::Unavailable("mock snapshot lock poisoned".to_string()))
    }

    fn close(&mut self) {
        if self.state.open.swap(false, Ordering::SeqCst) {
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// A snapshot of a Jetson Orin with one fan, a GPU sensor and no power monitor.
pub fn orin_snapshot() -> HardwareSnapshot {
    HardwareSnapshot {
        board: BoardInfo {
            jetpack_version: "5.1".to_string(),
            l4t_version: "35.1".to_string(),
            model: "Orin".to_string(),
            serial_number: "ABC123".to_string(),
        },
        power_mode: "MAXN".to_string(),
        uptime: Uptime {
            days: 2,
            seconds: 7_325,
        },
        data_disk: DataDiskUsage {
            free: 5_000_000_000,
            total: 20_000_000_000,
            used: 15_000_000_000,
            percent: 75.0,
        },
        root_disk: RootDiskUsage {
            total: 30e9,
            used: 10e9,
            available: 20e9,
        },
        fan_speed: vec![40.0],
        temperatures: [("GPU", 45.2)].into_iter().collect::<Temperatures>(),
        power: PowerReadings {
            total: None,
            rails: BTreeMap::new(),
        },
    }
}
