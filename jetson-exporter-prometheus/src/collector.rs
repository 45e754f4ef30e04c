//! Scrape-time collector owning the hardware source.
//!
//! The collector opens the source once, polls it on every scrape and closes
//! it exactly once, on [`Collector::close`] or when dropped.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jetson_stats::HardwareSource;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::exposition;
use crate::identity::HostIdentity;
use crate::mapping::{self, MappingError, MetricRecord};

/// Errors while managing the source connection.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Failed to open hardware source '{name}': {source}")]
    Open {
        name: String,
        #[source]
        source: jetson_stats::Error,
    },

    #[error("Collector is closed")]
    Closed,
}

/// A scrape that could not produce metrics.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] MappingError),
}

/// Connection state of the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Source not opened yet.
    Disconnected,
    /// Source being opened.
    Connecting,
    /// Last scrape read the source.
    Ready,
    /// Last scrape found the source unready.
    Degraded,
    /// Source released; no further scrapes are served.
    Closed,
}

impl CollectorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectorState::Disconnected => "disconnected",
            CollectorState::Connecting => "connecting",
            CollectorState::Ready => "ready",
            CollectorState::Degraded => "degraded",
            CollectorState::Closed => "closed",
        }
    }
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collector statistics.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Scrapes that returned a full set of records.
    pub scrapes_served: u64,
    /// Scrapes that returned nothing because the source was unavailable.
    pub scrapes_empty: u64,
    /// Scrapes that failed on a malformed snapshot.
    pub scrapes_failed: u64,
}

/// Thread-safe collector around a single hardware source.
pub struct Collector {
    /// The source; `ready()` and `snapshot()` run under this lock.
    source: Mutex<Box<dyn HardwareSource>>,
    /// User and host reported in the board record.
    identity: HostIdentity,
    /// Longest wait for the source lock during a scrape.
    scrape_timeout: Duration,
    state: RwLock<CollectorState>,
    stats: RwLock<CollectorStats>,
}

impl Collector {
    /// Create a collector. The source is not opened until [`Collector::connect`].
    pub fn new<S>(source: S, identity: HostIdentity, scrape_timeout: Duration) -> Self
    where
        S: HardwareSource + 'static,
    {
        Self {
            source: Mutex::new(Box::new(source)),
            identity,
            scrape_timeout,
            state: RwLock::new(CollectorState::Disconnected),
            stats: RwLock::new(CollectorStats::default()),
        }
    }

    /// Open the hardware source.
    pub fn connect(&self) -> Result<(), CollectorError> {
        let mut source = self.source.lock();

        if self.state() == CollectorState::Closed {
            return Err(CollectorError::Closed);
        }
        self.transition(CollectorState::Connecting);

        match source.open() {
            Ok(()) => {
                self.transition(CollectorState::Ready);
                info!(source = %source.name(), "Hardware source connected");
                Ok(())
            }
            Err(e) => {
                self.transition(CollectorState::Disconnected);
                Err(CollectorError::Open {
                    name: source.name().to_string(),
                    source: e,
                })
            }
        }
    }

    /// Read the source once and map it to records.
    ///
    /// An unready or unavailable source yields an empty set; only a snapshot
    /// that cannot be mapped is an error.
    pub fn scrape(&self) -> Result<Vec<MetricRecord>, ScrapeError> {
        let snapshot = {
            let Some(mut source) = self.source.try_lock_for(self.scrape_timeout) else {
                warn!(
                    timeout_ms = self.scrape_timeout.as_millis() as u64,
                    "Hardware source busy, serving empty scrape"
                );
                return Ok(self.empty_scrape());
            };

            match self.state() {
                CollectorState::Closed => {
                    debug!("Scrape after close");
                    return Ok(self.empty_scrape());
                }
                CollectorState::Disconnected | CollectorState::Connecting => {
                    debug!("Scrape before the source was connected");
                    return Ok(self.empty_scrape());
                }
                CollectorState::Ready | CollectorState::Degraded => {}
            }

            if !source.ready() {
                debug!(source = %source.name(), "Hardware source not ready");
                self.transition(CollectorState::Degraded);
                return Ok(self.empty_scrape());
            }

            // State follows the readiness check made under this lock
            match source.snapshot() {
                Ok(snapshot) => {
                    self.transition(CollectorState::Ready);
                    snapshot
                }
                Err(e) => {
                    warn!(source = %source.name(), error = %e, "Failed to read snapshot");
                    self.transition(CollectorState::Degraded);
                    return Ok(self.empty_scrape());
                }
            }
        };

        match mapping::map(&snapshot, &self.identity) {
            Ok(records) => {
                self.stats.write().scrapes_served += 1;
                Ok(records)
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed snapshot");
                self.stats.write().scrapes_failed += 1;
                Err(e.into())
            }
        }
    }

    /// Scrape and render in Prometheus text format.
    pub fn render(&self) -> Result<String, ScrapeError> {
        self.scrape().map(|records| exposition::render(&records))
    }

    /// Current connection state.
    pub fn state(&self) -> CollectorState {
        *self.state.read()
    }

    /// Get collector statistics.
    pub fn stats(&self) -> CollectorStats {
        self.stats.read().clone()
    }

    /// The identity reported in the board record.
    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    /// Release the hardware source. Only the first call has an effect.
    pub fn close(&self) {
        let mut source = self.source.lock();
        {
            let mut state = self.state.write();
            if *state == CollectorState::Closed {
                return;
            }
            *state = CollectorState::Closed;
        }

        source.close();
        info!(source = %source.name(), "Hardware source closed");
    }

    fn empty_scrape(&self) -> Vec<MetricRecord> {
        self.stats.write().scrapes_empty += 1;
        Vec::new()
    }

    /// Move to `next` unless the collector is already closed.
    fn transition(&self, next: CollectorState) {
        let mut state = self.state.write();
        if *state != CollectorState::Closed && *state != next {
            debug!(from = %*state, to = %next, "Collector state change");
            *state = next;
        }
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.close();
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<Collector>;
