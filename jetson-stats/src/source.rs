//! The hardware source contract.

use crate::error::Result;
use crate::snapshot::HardwareSnapshot;

/// A long-lived connection to a hardware monitor.
///
/// A source is opened once, polled many times and closed once. Callers
/// must check [`ready`](HardwareSource::ready) before every
/// [`snapshot`](HardwareSource::snapshot); a source may be transiently
/// unready (monitor not initialized yet, or disconnected).
///
/// Implementations are not required to be safe for concurrent use.
/// Collectors serialize access behind a lock.
pub trait HardwareSource: Send {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Establish the connection.
    fn open(&mut self) -> Result<()>;

    /// Whether a snapshot can be taken right now.
    fn ready(&self) -> bool;

    /// Read the full hardware state.
    ///
    /// An error means no value could be produced for this cycle.
    fn snapshot(&mut self) -> Result<HardwareSnapshot>;

    /// Release the connection. Calling this on a closed source is a no-op.
    fn close(&mut self);
}
