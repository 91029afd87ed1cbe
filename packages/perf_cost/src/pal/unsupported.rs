//! Platform for build targets without a performance counter backend.

use std::time::Instant;

use crate::pal::{Counters, Platform};
use crate::{Error, Event, Result};

#[derive(Clone, Debug)]
pub(crate) struct BuildTargetPlatform;

impl BuildTargetPlatform {
    pub(crate) const fn new() -> Self {
        Self
    }
}

impl Platform for BuildTargetPlatform {
    type Counters = CountersImpl;

    fn open_counters(&self, _events: &[Event]) -> Result<CountersImpl> {
        Err(Error::Unsupported)
    }

    #[cfg_attr(test, mutants::skip)] // Nothing to reclaim, so nothing to observe.
    fn reclaim(&self) {}

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Counters on this platform cannot be opened, so no value of this type ever exists.
#[derive(Debug)]
pub(crate) enum CountersImpl {}

impl Counters for CountersImpl {
    fn enable(&mut self) -> Result<()> {
        match *self {}
    }

    fn read(&mut self, _values: &mut [u64]) -> Result<()> {
        match *self {}
    }

    fn disable(&mut self) -> Result<()> {
        match *self {}
    }
}
