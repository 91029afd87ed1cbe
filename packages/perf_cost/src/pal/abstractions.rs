use std::fmt::Debug;
use std::time::Instant;

use crate::{Event, Result};

/// Provides performance counters, memory reclamation and a monotonic clock.
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    type Counters: Counters;

    /// Programs one counter per event. The counters are created stopped.
    fn open_counters(&self, events: &[Event]) -> Result<Self::Counters>;

    /// Forces memory reclamation work to happen now instead of during a measurement.
    ///
    /// Blocks until the reclamation is complete.
    fn reclaim(&self);

    fn now(&self) -> Instant;
}

/// A set of counters opened together, one per event, read and controlled as a unit.
///
/// Dropping the value releases the counters.
pub(crate) trait Counters: Debug {
    /// Zeroes every counter and starts counting.
    fn enable(&mut self) -> Result<()>;

    /// Writes the current value of every counter into `values`, in the order of the events
    /// the counters were opened with. Does not affect the counters.
    fn read(&mut self, values: &mut [u64]) -> Result<()>;

    /// Stops counting. The values remain readable.
    fn disable(&mut self) -> Result<()>;
}
