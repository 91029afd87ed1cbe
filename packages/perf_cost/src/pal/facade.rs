use std::time::Instant;

#[cfg(test)]
use crate::pal::{FakeCounters, FakePlatform};
use crate::pal::{BuildTargetPlatform, Counters, CountersImpl, Platform};
use crate::{Event, Result};

/// Switches between the platform of the build target and the fake platform used in tests.
#[derive(Clone, Debug)]
pub(crate) enum PlatformFacade {
    Real(BuildTargetPlatform),

    #[cfg(test)]
    Fake(FakePlatform),
}

impl PlatformFacade {
    pub(crate) fn real() -> Self {
        Self::Real(BuildTargetPlatform::new())
    }

    #[cfg(test)]
    pub(crate) fn fake(platform: FakePlatform) -> Self {
        Self::Fake(platform)
    }
}

impl Platform for PlatformFacade {
    type Counters = CountersFacade;

    fn open_counters(&self, events: &[Event]) -> Result<CountersFacade> {
        match self {
            Self::Real(platform) => platform.open_counters(events).map(CountersFacade::Real),
            #[cfg(test)]
            Self::Fake(platform) => platform.open_counters(events).map(CountersFacade::Fake),
        }
    }

    fn reclaim(&self) {
        match self {
            Self::Real(platform) => platform.reclaim(),
            #[cfg(test)]
            Self::Fake(platform) => platform.reclaim(),
        }
    }

    fn now(&self) -> Instant {
        match self {
            Self::Real(platform) => platform.now(),
            #[cfg(test)]
            Self::Fake(platform) => platform.now(),
        }
    }
}

#[derive(Debug)]
pub(crate) enum CountersFacade {
    Real(CountersImpl),

    #[cfg(test)]
    Fake(FakeCounters),
}

impl Counters for CountersFacade {
    fn enable(&mut self) -> Result<()> {
        match self {
            Self::Real(counters) => counters.enable(),
            #[cfg(test)]
            Self::Fake(counters) => counters.enable(),
        }
    }

    fn read(&mut self, values: &mut [u64]) -> Result<()> {
        match self {
            Self::Real(counters) => counters.read(values),
            #[cfg(test)]
            Self::Fake(counters) => counters.read(values),
        }
    }

    fn disable(&mut self) -> Result<()> {
        match self {
            Self::Real(counters) => counters.disable(),
            #[cfg(test)]
            Self::Fake(counters) => counters.disable(),
        }
    }
}
