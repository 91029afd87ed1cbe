use std::convert::Infallible;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::event_stats::SampleAccumulator;
use crate::pal::{Platform, PlatformFacade};
use crate::session::CounterSession;
use crate::{
    Error, Event, EventStats, EventValues, MeasureError, ProfileOptions, Result, SampleOptions,
};

/// Measures the hardware cost of executing a unit of work.
///
/// A profiler is configured once with the set of events to count and can then measure any
/// number of closures, either once ([`profile()`](Self::profile)) or repeatedly within a time
/// and iteration budget ([`sample()`](Self::sample)). Every measurement opens its own counters
/// and releases them before it returns, whether the work succeeded, failed or panicked.
///
/// Only the calling thread is counted, and only while it executes in user mode.
///
/// # Examples
///
/// ```no_run
/// use perf_cost::{Event, ProfileOptions, Profiler};
///
/// let profiler = Profiler::new([Event::Instructions, Event::CpuCycles])?;
///
/// let result = profiler.profile(&ProfileOptions::default(), || {
///     let data: Vec<u64> = (0..10_000).collect();
///     std::hint::black_box(data.iter().sum::<u64>());
/// })?;
///
/// println!("{result}");
/// # Ok::<(), perf_cost::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Profiler {
    events: Vec<Event>,
    platform: PlatformFacade,
}

impl Profiler {
    /// Creates a profiler that counts the given events.
    ///
    /// The events are measured in the given order and results are reported in the same order.
    /// Whether the events can actually be counted is only known once a measurement opens the
    /// counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoEvents`] if no events are given.
    pub fn new(events: impl IntoIterator<Item = Event>) -> Result<Self> {
        Self::with_platform(events, PlatformFacade::real())
    }

    /// Creates a profiler that counts [`Event::DEFAULT_SET`].
    #[must_use]
    pub fn with_default_events() -> Self {
        Self {
            events: Event::DEFAULT_SET.to_vec(),
            platform: PlatformFacade::real(),
        }
    }

    pub(crate) fn with_platform(
        events: impl IntoIterator<Item = Event>,
        platform: PlatformFacade,
    ) -> Result<Self> {
        let events: Vec<Event> = events.into_iter().collect();

        if events.is_empty() {
            return Err(Error::NoEvents);
        }

        Ok(Self { events, platform })
    }

    /// The events this profiler counts, in measurement order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Runs `work` once under active counters and returns what it cost.
    ///
    /// Before the counters are opened, memory is optionally reclaimed and the work is executed
    /// the configured number of warmup times. Neither is measured.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters cannot be opened, started, read or stopped.
    ///
    /// # Panics
    ///
    /// A panic in `work` is not caught. The counters are stopped and released while unwinding.
    pub fn profile(&self, options: &ProfileOptions, mut work: impl FnMut()) -> Result<EventValues> {
        self.try_profile(options, || {
            work();
            Ok::<(), Infallible>(())
        })
        .map_err(into_counter_error)
    }

    /// Runs fallible `work` once under active counters and returns what it cost.
    ///
    /// Behaves like [`profile()`](Self::profile), except that an error returned by `work`
    /// (during warmup or during the measured execution) ends the measurement. The counters are
    /// stopped before the error is returned and no measurement is reported.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::Work`] if `work` fails and [`MeasureError::Counters`] if the
    /// counters fail. If both fail, the error of `work` is returned.
    pub fn try_profile<E>(
        &self,
        options: &ProfileOptions,
        mut work: impl FnMut() -> std::result::Result<(), E>,
    ) -> std::result::Result<EventValues, MeasureError<E>> {
        if options.reclaims_first() {
            self.platform.reclaim();
        }

        for _ in 0..options.warmup_iterations() {
            work().map_err(MeasureError::Work)?;
        }

        let mut values = vec![0; self.events.len()];

        let session = CounterSession::start(&self.platform, &self.events)?;

        let start = self.platform.now();
        let outcome = work();
        let elapsed = self.platform.now().saturating_duration_since(start);

        let stopped = session.stop(&mut values);
        settle(outcome.map_err(MeasureError::Work), stopped)?;

        let elapsed_nanos = duration_to_nanos(elapsed);
        debug!(events = ?self.events, elapsed_ns = elapsed_nanos, "profiled single execution");

        Ok(EventValues::new(self.events.clone(), values, elapsed_nanos))
    }

    /// Runs `work` repeatedly under active counters and returns the cost of every iteration.
    ///
    /// The counters are opened once and stay active for the whole run. Memory is reclaimed and
    /// the work is executed the configured number of warmup times before sampling starts.
    /// Iterations are then sampled until either budget in `options` is used up. The budgets
    /// are checked before each iteration, so the run may overshoot the time budget by at most
    /// one iteration. Using up a budget is not an error, even if no iteration was sampled.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters cannot be opened, started, read or stopped.
    ///
    /// # Panics
    ///
    /// A panic in `work` is not caught. The counters are stopped and released while unwinding.
    pub fn sample(&self, options: &SampleOptions, mut work: impl FnMut()) -> Result<EventStats> {
        self.try_sample(options, || {
            work();
            Ok::<(), Infallible>(())
        })
        .map_err(into_counter_error)
    }

    /// Runs fallible `work` repeatedly under active counters and returns the cost of every
    /// iteration.
    ///
    /// Behaves like [`sample()`](Self::sample), except that an error returned by `work` ends
    /// the run. The counters are stopped before the error is returned and the iterations
    /// sampled so far are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError::Work`] if `work` fails and [`MeasureError::Counters`] if the
    /// counters fail. If both fail, the error that ended the run is returned.
    pub fn try_sample<E>(
        &self,
        options: &SampleOptions,
        mut work: impl FnMut() -> std::result::Result<(), E>,
    ) -> std::result::Result<EventStats, MeasureError<E>> {
        let columns = self.events.len();
        let mut baseline = vec![0; columns];
        let mut current = vec![0; columns];
        let mut accumulator = SampleAccumulator::new(columns);

        let mut session = CounterSession::start(&self.platform, &self.events)?;

        let outcome = self.sample_loop(
            &mut session,
            options,
            &mut work,
            &mut baseline,
            &mut current,
            &mut accumulator,
        );

        let stopped = session.stop(&mut current);
        settle(outcome, stopped)?;

        let stats = accumulator.into_stats(self.events.clone());

        debug!(
            events = ?self.events,
            rows = stats.len(),
            elapsed_ns = stats.elapsed_nanos().iter().copied().fold(0_u64, u64::saturating_add),
            "sampling finished"
        );

        Ok(stats)
    }

    fn sample_loop<E>(
        &self,
        session: &mut CounterSession,
        options: &SampleOptions,
        work: &mut impl FnMut() -> std::result::Result<(), E>,
        baseline: &mut [u64],
        current: &mut [u64],
        accumulator: &mut SampleAccumulator,
    ) -> std::result::Result<(), MeasureError<E>> {
        self.platform.reclaim();

        for _ in 0..options.warmup_iterations() {
            work().map_err(MeasureError::Work)?;
        }

        let loop_start = self.platform.now();
        let mut completed: u64 = 0;

        while self.platform.now().saturating_duration_since(loop_start) < options.duration_budget()
            && completed < options.epoch_budget()
        {
            if options.reclaims_each_sample() {
                self.platform.reclaim();
            }

            session.read(baseline)?;

            let start = self.platform.now();
            let outcome = work();
            let elapsed = self.platform.now().saturating_duration_since(start);

            outcome.map_err(MeasureError::Work)?;

            session.read(current)?;

            let elapsed_nanos = duration_to_nanos(elapsed);
            accumulator.push(baseline, current, elapsed_nanos);
            completed = completed.saturating_add(1);

            trace!(row = completed, elapsed_ns = elapsed_nanos, "sampled iteration");
        }

        debug_assert_eq!(
            u64::try_from(accumulator.len()).ok(),
            Some(completed),
            "every completed iteration must have produced exactly one row"
        );

        Ok(())
    }
}

/// Combines the outcome of a measurement with the outcome of stopping its counters.
///
/// The outcome of the measurement takes precedence, as the stop failure is most likely a
/// consequence of whatever went wrong there.
fn settle<E>(
    outcome: std::result::Result<(), MeasureError<E>>,
    stopped: Result<()>,
) -> std::result::Result<(), MeasureError<E>> {
    match (outcome, stopped) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(stop_error)) => Err(MeasureError::Counters(stop_error)),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(stop_error)) => {
            warn!(error = %stop_error, "failed to stop counters after the measurement failed");
            Err(error)
        }
    }
}

fn into_counter_error(error: MeasureError<Infallible>) -> Error {
    match error {
        MeasureError::Counters(error) => error,
        MeasureError::Work(never) => match never {},
    }
}

fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::pal::FakePlatform;

    assert_impl_all!(Profiler: Send, Sync);

    const TWO_EVENTS: [Event; 2] = [Event::Instructions, Event::BranchMisses];

    fn profiler(events: &[Event]) -> (FakePlatform, Profiler) {
        let fake = FakePlatform::new();
        let profiler =
            Profiler::with_platform(events.iter().copied(), PlatformFacade::fake(fake.clone()))
                .unwrap();
        (fake, profiler)
    }

    #[test]
    fn empty_event_list_is_rejected() {
        let result = Profiler::with_platform([], PlatformFacade::fake(FakePlatform::new()));

        assert!(matches!(result, Err(Error::NoEvents)));
    }

    #[test]
    fn default_events_are_used() {
        let profiler = Profiler::with_default_events();

        assert_eq!(profiler.events(), Event::DEFAULT_SET);
    }

    #[test]
    fn profile_returns_one_value_per_event() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        let result = profiler
            .profile(&ProfileOptions::default(), || fake.count(&[1200, 3]))
            .unwrap();

        assert_eq!(result.events(), TWO_EVENTS);
        assert_eq!(result.values(), [1200, 3]);
        assert_eq!(fake.disable_calls(), 1);
        assert_eq!(fake.close_calls(), 1);
    }

    #[test]
    fn profile_times_the_measured_execution() {
        let (fake, profiler) = profiler(&TWO_EVENTS);
        fake.set_clock_step(Duration::from_micros(3));

        let result = profiler
            .profile(&ProfileOptions::default(), || {})
            .unwrap();

        assert_eq!(result.elapsed(), Duration::from_micros(3));
    }

    #[test]
    fn profile_warmup_is_not_counted() {
        let (fake, profiler) = profiler(&[Event::Instructions]);
        let mut executions = 0;

        let result = profiler
            .profile(&ProfileOptions::default().warmup(4), || {
                executions += 1;
                fake.count(&[10]);
            })
            .unwrap();

        assert_eq!(executions, 5);
        assert_eq!(result.values(), [10]);
    }

    #[test]
    fn profile_reclaims_first_by_default() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        profiler.profile(&ProfileOptions::default(), || {}).unwrap();
        assert_eq!(fake.reclaim_calls(), 1);

        profiler
            .profile(&ProfileOptions::default().reclaim_first(false), || {})
            .unwrap();
        assert_eq!(fake.reclaim_calls(), 1);
    }

    #[test]
    fn profile_work_error_stops_counters_once() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        let result = profiler.try_profile(&ProfileOptions::default(), || Err("boom"));

        assert_eq!(result.unwrap_err().into_work_error(), Some("boom"));
        assert_eq!(fake.enable_calls(), 1);
        assert_eq!(fake.disable_calls(), 1);
        assert_eq!(fake.close_calls(), 1);
    }

    #[test]
    fn profile_warmup_error_opens_no_counters() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        let result = profiler.try_profile(&ProfileOptions::default().warmup(2), || Err("cold"));

        assert_eq!(result.unwrap_err().into_work_error(), Some("cold"));
        assert_eq!(fake.open_calls(), 0);
    }

    #[test]
    fn profile_work_error_wins_over_stop_error() {
        let (fake, profiler) = profiler(&TWO_EVENTS);
        fake.fail_disable();

        let result = profiler.try_profile(&ProfileOptions::default(), || Err("boom"));

        assert_eq!(result.unwrap_err().into_work_error(), Some("boom"));
        assert_eq!(fake.disable_calls(), 1);
    }

    #[test]
    fn profile_stop_error_is_reported() {
        let (fake, profiler) = profiler(&TWO_EVENTS);
        fake.fail_disable();

        let result = profiler.profile(&ProfileOptions::default(), || {});

        assert!(matches!(result, Err(Error::Stop(_))));
        assert_eq!(fake.close_calls(), 1);
    }

    #[test]
    fn profile_open_error_is_reported_without_running_work() {
        let (fake, profiler) = profiler(&TWO_EVENTS);
        fake.fail_open();
        let mut executions = 0;

        let result = profiler.profile(&ProfileOptions::default(), || executions += 1);

        assert!(matches!(result, Err(Error::Open { .. })));
        assert_eq!(executions, 0);
    }

    #[test]
    fn profile_panic_stops_counters() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            profiler.profile(&ProfileOptions::default(), || panic!("work exploded"))
        }));

        assert!(result.is_err());
        assert_eq!(fake.disable_calls(), 1);
        assert_eq!(fake.close_calls(), 1);
        assert!(!fake.is_counting());
    }

    #[test]
    fn sample_rows_have_one_column_per_event() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        let stats = profiler
            .sample(&SampleOptions::default().max_epochs(7), || {
                fake.count(&[100, 2]);
            })
            .unwrap();

        assert_eq!(stats.len(), 7);
        assert_eq!(stats.elapsed_nanos().len(), 7);
        assert!(stats.rows().all(|row| row == [100, 2]));
    }

    #[test]
    fn sample_rows_hold_per_iteration_deltas() {
        let (fake, profiler) = profiler(&[Event::Instructions]);
        let mut iteration = 0;

        let stats = profiler
            .sample(&SampleOptions::default().max_epochs(3).warmup(0), || {
                iteration += 1;
                fake.count(&[iteration * 10]);
            })
            .unwrap();

        let rows: Vec<&[u64]> = stats.rows().collect();
        assert_eq!(rows, [&[10][..], &[20][..], &[30][..]]);
    }

    #[test]
    fn sample_warmup_is_not_counted() {
        let (fake, profiler) = profiler(&[Event::Instructions]);

        let stats = profiler
            .sample(&SampleOptions::default().max_epochs(2).warmup(5), || {
                fake.count(&[10]);
            })
            .unwrap();

        assert!(stats.rows().all(|row| row == [10]));
    }

    #[test]
    fn sample_zero_epochs_yields_empty_set() {
        let (fake, profiler) = profiler(&TWO_EVENTS);
        let mut executions = 0;

        let stats = profiler
            .sample(&SampleOptions::default().max_epochs(0).warmup(0), || {
                executions += 1;
            })
            .unwrap();

        assert!(stats.is_empty());
        assert_eq!(stats.events(), TWO_EVENTS);
        assert_eq!(executions, 0);
        assert_eq!(fake.disable_calls(), 1);
    }

    #[test]
    fn sample_zero_duration_yields_empty_set() {
        let (_fake, profiler) = profiler(&TWO_EVENTS);

        let stats = profiler
            .sample(&SampleOptions::default().max_duration(Duration::ZERO), || {})
            .unwrap();

        assert!(stats.is_empty());
    }

    #[test]
    fn sample_stops_when_time_budget_is_used_up() {
        let (fake, profiler) = profiler(&[Event::Instructions]);
        fake.set_clock_step(Duration::from_millis(1));

        let stats = profiler
            .sample(
                &SampleOptions::default()
                    .max_duration(Duration::from_millis(10))
                    .max_epochs(u64::MAX),
                || {},
            )
            .unwrap();

        // The budget check and both timestamps of an iteration each advance the clock by 1 ms,
        // so the checks see 1, 4, 7 and 10 ms into the loop.
        assert_eq!(stats.len(), 3);
        assert!(stats.elapsed_nanos().iter().all(|ns| *ns == 1_000_000));
    }

    #[test]
    fn sample_in_flight_iteration_completes_past_time_budget() {
        let (fake, profiler) = profiler(&[Event::Instructions]);

        let stats = profiler
            .sample(
                &SampleOptions::default().max_duration(Duration::from_millis(5)),
                || fake.advance(Duration::from_millis(50)),
            )
            .unwrap();

        assert_eq!(stats.len(), 1);
        assert_eq!(stats.elapsed_nanos(), [50_000_000]);
    }

    #[test]
    fn sample_reclaims_once_before_sampling() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        profiler
            .sample(&SampleOptions::default().max_epochs(4), || {})
            .unwrap();

        assert_eq!(fake.reclaim_calls(), 1);
    }

    #[test]
    fn sample_reclaims_before_each_iteration_on_request() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        profiler
            .sample(
                &SampleOptions::default()
                    .max_epochs(4)
                    .reclaim_each_sample(true),
                || {},
            )
            .unwrap();

        assert_eq!(fake.reclaim_calls(), 5);
    }

    #[test]
    fn sample_work_error_discards_rows_and_stops_once() {
        const FAILING_ITERATION: usize = 4;

        let (fake, profiler) = profiler(&TWO_EVENTS);
        let mut executions = 0;

        let result = profiler.try_sample(
            &SampleOptions::default().warmup(0).max_epochs(100),
            || {
                executions += 1;
                if executions == FAILING_ITERATION {
                    Err("boom")
                } else {
                    Ok(())
                }
            },
        );

        assert_eq!(result.unwrap_err().into_work_error(), Some("boom"));

        // Two snapshots per completed iteration, the baseline of the failed one and the final
        // read when stopping.
        assert_eq!(fake.read_calls(), 2 * (FAILING_ITERATION - 1) + 2);
        assert_eq!(fake.disable_calls(), 1);
        assert_eq!(fake.close_calls(), 1);
    }

    #[test]
    fn sample_warmup_error_stops_counters() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        let result = profiler.try_sample(&SampleOptions::default(), || Err("cold"));

        assert_eq!(result.unwrap_err().into_work_error(), Some("cold"));
        assert_eq!(fake.read_calls(), 1);
        assert_eq!(fake.disable_calls(), 1);
    }

    #[test]
    fn sample_read_error_is_reported() {
        let (fake, profiler) = profiler(&TWO_EVENTS);
        fake.fail_read_at(3);

        let result = profiler.sample(&SampleOptions::default().max_epochs(10), || {});

        assert!(matches!(result, Err(Error::Read(_))));
        assert_eq!(fake.disable_calls(), 1);
        assert_eq!(fake.close_calls(), 1);
    }

    #[test]
    fn sample_panic_stops_counters() {
        let (fake, profiler) = profiler(&TWO_EVENTS);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            profiler.sample(&SampleOptions::default().warmup(0), || panic!("work exploded"))
        }));

        assert!(result.is_err());
        assert_eq!(fake.disable_calls(), 1);
        assert_eq!(fake.close_calls(), 1);
    }

    #[test]
    fn profiler_is_reusable() {
        let (fake, profiler) = profiler(&[Event::Instructions]);

        let first = profiler
            .profile(&ProfileOptions::default(), || fake.count(&[5]))
            .unwrap();
        let second = profiler
            .profile(&ProfileOptions::default(), || fake.count(&[5]))
            .unwrap();

        assert_eq!(first.values(), second.values());
        assert_eq!(fake.open_calls(), 2);
        assert_eq!(fake.close_calls(), 2);
    }

    #[test]
    fn durations_saturate_to_u64_nanos() {
        assert_eq!(duration_to_nanos(Duration::from_nanos(17)), 17);
        assert_eq!(duration_to_nanos(Duration::MAX), u64::MAX);
    }
}
