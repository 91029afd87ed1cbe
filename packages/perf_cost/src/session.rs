//! Scoped ownership of running counters.

use tracing::{debug, warn};

use crate::pal::{Counters, CountersFacade, Platform, PlatformFacade};
use crate::{Event, Result};

/// Counters that have been opened and started, stopped exactly once when the session ends.
///
/// The normal way to end a session is [`stop()`](Self::stop), which also takes the final
/// reading. On every other exit path, early returns and unwinding from a panic in the
/// measured work included, dropping the session stops the counters. Either way the counters
/// are released before the measurement call returns.
#[derive(Debug)]
#[must_use = "counters keep running until the session is stopped or dropped"]
pub(crate) struct CounterSession {
    counters: CountersFacade,
    active: bool,
}

impl CounterSession {
    /// Opens one counter per event and starts counting.
    pub(crate) fn start(platform: &PlatformFacade, events: &[Event]) -> Result<Self> {
        let mut counters = platform.open_counters(events)?;

        // If this fails the counters were never started; dropping them releases them.
        counters.enable()?;

        debug!(?events, "counters started");

        Ok(Self {
            counters,
            active: true,
        })
    }

    /// Takes a snapshot of the running counters without disturbing them.
    pub(crate) fn read(&mut self, values: &mut [u64]) -> Result<()> {
        self.counters.read(values)
    }

    /// Stops the counters and writes their final values into `values`.
    pub(crate) fn stop(mut self, values: &mut [u64]) -> Result<()> {
        // Whatever happens below, the drop logic must not try to stop a second time.
        self.active = false;

        self.counters.disable()?;
        self.counters.read(values)?;

        debug!("counters stopped");
        Ok(())
    }
}

impl Drop for CounterSession {
    fn drop(&mut self) {
        if !self.active {
            return;
        }

        self.active = false;

        // There is nobody to return this error to, the session is being abandoned.
        if let Err(error) = self.counters.disable() {
            warn!(%error, "failed to stop abandoned counters");
        } else {
            debug!("abandoned counters stopped");
        }
    }
}
