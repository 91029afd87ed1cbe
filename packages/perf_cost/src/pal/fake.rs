//! Fake platform implementation for testing.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::pal::{Counters, Platform};
use crate::{Error, Event, Result};

/// Internal state for the fake platform that can be shared between clones.
#[derive(Debug, Default)]
struct FakePlatformState {
    /// Cumulative value of each counter since the last enable. Sized when counters are opened.
    counts: Vec<u64>,
    counting: bool,

    /// How far the fake clock has moved away from the epoch.
    elapsed: Duration,

    /// Added to the fake clock every time it is read.
    clock_step: Duration,

    open_calls: usize,
    enable_calls: usize,
    read_calls: usize,
    disable_calls: usize,
    close_calls: usize,
    reclaim_calls: usize,

    fail_open: bool,
    fail_enable: bool,
    fail_disable: bool,

    /// The 1-based index of the read call that fails, if any.
    fail_read_at: Option<usize>,
}

/// Fake implementation of the platform abstraction for testing.
///
/// Tests drive the counters by calling [`count()`](Self::count) from inside the measured work,
/// which only has an effect while the counters are enabled, just like real hardware. Multiple
/// clones of the same `FakePlatform` share state, so a test can keep one clone for itself
/// after handing another to the code under test.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    epoch: Instant,
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self {
            epoch: Instant::now(),
            state: Arc::new(Mutex::new(FakePlatformState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakePlatformState> {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
    }

    /// Adds to each counter, if the counters are currently counting.
    pub(crate) fn count(&self, increments: &[u64]) {
        let mut state = self.state();

        if !state.counting {
            return;
        }

        for (count, increment) in state.counts.iter_mut().zip(increments) {
            *count = count.saturating_add(*increment);
        }
    }

    /// Moves the fake clock forward.
    pub(crate) fn advance(&self, duration: Duration) {
        let mut state = self.state();
        state.elapsed = state.elapsed.saturating_add(duration);
    }

    /// Makes every read of the fake clock move it forward by `step`.
    pub(crate) fn set_clock_step(&self, step: Duration) {
        self.state().clock_step = step;
    }

    pub(crate) fn fail_open(&self) {
        self.state().fail_open = true;
    }

    pub(crate) fn fail_enable(&self) {
        self.state().fail_enable = true;
    }

    pub(crate) fn fail_disable(&self) {
        self.state().fail_disable = true;
    }

    /// Makes the `nth` read (counting from 1) fail.
    pub(crate) fn fail_read_at(&self, nth: usize) {
        self.state().fail_read_at = Some(nth);
    }

    pub(crate) fn open_calls(&self) -> usize {
        self.state().open_calls
    }

    pub(crate) fn enable_calls(&self) -> usize {
        self.state().enable_calls
    }

    pub(crate) fn read_calls(&self) -> usize {
        self.state().read_calls
    }

    pub(crate) fn disable_calls(&self) -> usize {
        self.state().disable_calls
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    pub(crate) fn reclaim_calls(&self) -> usize {
        self.state().reclaim_calls
    }

    pub(crate) fn is_counting(&self) -> bool {
        self.state().counting
    }
}

impl Platform for FakePlatform {
    type Counters = FakeCounters;

    fn open_counters(&self, events: &[Event]) -> Result<FakeCounters> {
        let mut state = self.state();
        state.open_calls = state.open_calls.saturating_add(1);

        if state.fail_open {
            return Err(Error::Open {
                event: events.first().copied().unwrap_or(Event::CpuCycles),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }

        state.counts = vec![0; events.len()];
        state.counting = false;

        Ok(FakeCounters {
            state: Arc::clone(&self.state),
        })
    }

    fn reclaim(&self) {
        let mut state = self.state();
        state.reclaim_calls = state.reclaim_calls.saturating_add(1);
    }

    fn now(&self) -> Instant {
        let mut state = self.state();
        let now = self
            .epoch
            .checked_add(state.elapsed)
            .expect("fake clock never moves far enough to overflow Instant");
        state.elapsed = state.elapsed.saturating_add(state.clock_step);
        now
    }
}

/// Counters handed out by [`FakePlatform`].
#[derive(Debug)]
pub(crate) struct FakeCounters {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakeCounters {
    fn state(&self) -> MutexGuard<'_, FakePlatformState> {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
    }
}

impl Counters for FakeCounters {
    fn enable(&mut self) -> Result<()> {
        let mut state = self.state();
        state.enable_calls = state.enable_calls.saturating_add(1);

        if state.fail_enable {
            return Err(Error::Start(io::Error::from(io::ErrorKind::Other)));
        }

        state.counts.fill(0);
        state.counting = true;
        Ok(())
    }

    fn read(&mut self, values: &mut [u64]) -> Result<()> {
        let mut state = self.state();
        state.read_calls = state.read_calls.saturating_add(1);

        if state.fail_read_at == Some(state.read_calls) {
            return Err(Error::Read(io::Error::from(io::ErrorKind::UnexpectedEof)));
        }

        assert_eq!(
            values.len(),
            state.counts.len(),
            "read buffer must match the number of opened counters"
        );
        values.copy_from_slice(&state.counts);
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        let mut state = self.state();
        state.disable_calls = state.disable_calls.saturating_add(1);
        state.counting = false;

        if state.fail_disable {
            return Err(Error::Stop(io::Error::from(io::ErrorKind::Other)));
        }

        Ok(())
    }
}

impl Drop for FakeCounters {
    fn drop(&mut self) {
        // A poisoned lock means the test already failed, nothing to record.
        if let Ok(mut state) = self.state.lock() {
            state.counting = false;
            state.close_calls = state.close_calls.saturating_add(1);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn counts_only_while_enabled() {
        let platform = FakePlatform::new();
        let mut counters = platform.open_counters(&[Event::Instructions, Event::CpuCycles]).unwrap();

        platform.count(&[5, 5]);
        counters.enable().unwrap();
        platform.count(&[1, 2]);
        platform.count(&[10, 20]);
        counters.disable().unwrap();
        platform.count(&[100, 100]);

        let mut values = [0; 2];
        counters.read(&mut values).unwrap();
        assert_eq!(values, [11, 22]);
    }

    #[test]
    fn enable_resets_counts() {
        let platform = FakePlatform::new();
        let mut counters = platform.open_counters(&[Event::Instructions]).unwrap();

        counters.enable().unwrap();
        platform.count(&[9]);
        counters.enable().unwrap();

        let mut values = [0];
        counters.read(&mut values).unwrap();
        assert_eq!(values, [0]);
    }

    #[test]
    fn clock_steps_on_every_read() {
        let platform = FakePlatform::new();
        platform.set_clock_step(Duration::from_millis(2));

        let a = platform.now();
        let b = platform.now();
        platform.advance(Duration::from_millis(10));
        let c = platform.now();

        assert_eq!(b.duration_since(a), Duration::from_millis(2));
        assert_eq!(c.duration_since(b), Duration::from_millis(12));
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();

        platform1.reclaim();
        assert_eq!(platform2.reclaim_calls(), 1);
    }

    #[test]
    fn drop_records_close() {
        let platform = FakePlatform::new();
        let mut counters = platform.open_counters(&[Event::Instructions]).unwrap();
        counters.enable().unwrap();

        drop(counters);

        assert_eq!(platform.close_calls(), 1);
        assert!(!platform.is_counting());
    }

    #[test]
    fn injected_read_failure_hits_requested_read() {
        let platform = FakePlatform::new();
        platform.fail_read_at(2);
        let mut counters = platform.open_counters(&[Event::Instructions]).unwrap();

        let mut values = [0];
        counters.read(&mut values).unwrap();
        assert!(matches!(counters.read(&mut values), Err(Error::Read(_))));
        counters.read(&mut values).unwrap();
        assert_eq!(platform.read_calls(), 3);
    }
}
