#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Measure the hardware cost of a unit of work with processor performance counters.
//!
//! Wall-clock benchmarks of small code regions are noisy. This package instead counts what the
//! processor actually did while the work ran: instructions retired, cycles, branch
//! mispredictions, cache misses and similar events, alongside the elapsed time.
//!
//! The core functionality includes:
//! - [`Profiler`] - Counts a fixed set of [`Event`]s while running work once or repeatedly
//! - [`EventValues`] - The counts and elapsed time of a single execution
//! - [`EventStats`] - The per-iteration counts and elapsed times of a repeated measurement
//! - [`Summary`] - Median, mean, minimum and maximum of one column of a repeated measurement
//!
//! Counters are always stopped and released before a measurement returns, including when the
//! measured work returns an error or panics.
//!
//! This package is not meant for use in production, serving only as a development tool.
//!
//! # Single-shot measurement
//!
//! ```no_run
//! use perf_cost::{Event, ProfileOptions, Profiler};
//!
//! let profiler = Profiler::new([Event::Instructions, Event::BranchMisses])?;
//!
//! let result = profiler.profile(&ProfileOptions::default(), || {
//!     let mut data: Vec<u32> = (0..10_000).rev().collect();
//!     data.sort_unstable();
//!     std::hint::black_box(data);
//! })?;
//!
//! println!("{result}");
//! # Ok::<(), perf_cost::Error>(())
//! ```
//!
//! # Repeated measurement
//!
//! For small pieces of work, a single measurement says little. Sampling runs the work many
//! times under the same counters, within a time and iteration budget, and keeps the cost of
//! every iteration.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use perf_cost::{Event, SampleOptions};
//!
//! let options = SampleOptions::default()
//!     .max_duration(Duration::from_millis(500))
//!     .max_epochs(10_000);
//!
//! let stats = perf_cost::sample(&[Event::Instructions, Event::CpuCycles], &options, || {
//!     std::hint::black_box(u64::MAX.count_ones());
//! })?;
//!
//! println!("{stats}");
//! # Ok::<(), perf_cost::Error>(())
//! ```
//!
//! # Fallible work
//!
//! [`Profiler::try_profile()`] and [`Profiler::try_sample()`] accept work that returns a
//! `Result`. An error ends the measurement, the counters are stopped and the error is returned
//! as [`MeasureError::Work`].
//!
//! # Platform support
//!
//! Counters are implemented on Linux with `perf_event_open(2)`. Only the calling thread is
//! counted, and only while it executes in user mode. The kernel may refuse to open counters
//! in containers, virtual machines or when `/proc/sys/kernel/perf_event_paranoid` is
//! restrictive, in which case measurements fail with [`Error::Open`]. On other platforms every
//! measurement fails with [`Error::Unsupported`].
//!
//! # Logging
//!
//! Counter lifecycle and sampling progress are reported through [`tracing`]. The package never
//! installs a subscriber of its own.

mod error;
mod event;
mod event_stats;
mod event_values;
mod options;
mod pal;
mod profiler;
mod session;
mod summary;

pub use error::{Error, MeasureError, Result};
pub use event::Event;
pub use event_stats::EventStats;
pub use event_values::EventValues;
pub use options::{ProfileOptions, SampleOptions};
pub use profiler::Profiler;
pub use summary::Summary;

/// Runs `work` once while counting `events`.
///
/// Shorthand for creating a [`Profiler`] and calling [`Profiler::profile()`].
///
/// # Errors
///
/// Returns an error if `events` is empty or if the counters cannot be opened, started, read
/// or stopped.
///
/// # Examples
///
/// ```no_run
/// use perf_cost::{Event, ProfileOptions};
///
/// let result = perf_cost::profile(&[Event::Instructions], &ProfileOptions::default(), || {
///     std::hint::black_box(format!("{}", 42));
/// })?;
///
/// assert_eq!(result.values().len(), 1);
/// # Ok::<(), perf_cost::Error>(())
/// ```
pub fn profile(
    events: &[Event],
    options: &ProfileOptions,
    work: impl FnMut(),
) -> Result<EventValues> {
    Profiler::new(events.iter().copied())?.profile(options, work)
}

/// Runs `work` repeatedly while counting `events`, until either budget in `options` is used up.
///
/// Shorthand for creating a [`Profiler`] and calling [`Profiler::sample()`].
///
/// # Errors
///
/// Returns an error if `events` is empty or if the counters cannot be opened, started, read
/// or stopped.
pub fn sample(events: &[Event], options: &SampleOptions, work: impl FnMut()) -> Result<EventStats> {
    Profiler::new(events.iter().copied())?.sample(options, work)
}
