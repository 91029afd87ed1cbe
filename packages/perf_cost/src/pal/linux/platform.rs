use std::time::Instant;

use tracing::trace;

use crate::pal::Platform;
use crate::pal::linux::{Bindings, BindingsFacade, CountersImpl};
use crate::{Event, Result};

/// Counters through `perf_event_open`, reclamation through the C runtime allocator.
#[derive(Clone, Debug)]
pub(crate) struct BuildTargetPlatform {
    bindings: BindingsFacade,
}

impl BuildTargetPlatform {
    pub(crate) const fn new() -> Self {
        Self::with_bindings(BindingsFacade::real())
    }

    pub(crate) const fn with_bindings(bindings: BindingsFacade) -> Self {
        Self { bindings }
    }
}

impl Platform for BuildTargetPlatform {
    type Counters = CountersImpl;

    fn open_counters(&self, events: &[Event]) -> Result<CountersImpl> {
        CountersImpl::open(self.bindings.clone(), events)
    }

    fn reclaim(&self) {
        trace!("trimming heap");
        self.bindings.malloc_trim();
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}
