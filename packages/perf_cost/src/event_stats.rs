use std::fmt;

use crate::{Event, Summary};

/// The per-iteration counter deltas and elapsed times of a repeated measurement.
///
/// Returned by [`Profiler::sample()`](crate::Profiler::sample). Conceptually this is a matrix
/// with one row per completed iteration and one column per event, plus one elapsed time per
/// row. Column `j` of every row belongs to `events()[j]`.
///
/// A sample set may have zero rows if the budgets did not allow a single iteration.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use perf_cost::{Event, Profiler, SampleOptions};
///
/// let profiler = Profiler::new([Event::Instructions])?;
/// let options = SampleOptions::default().max_duration(Duration::from_millis(100));
///
/// let stats = profiler.sample(&options, || {
///     std::hint::black_box((0..1000_u64).sum::<u64>());
/// })?;
///
/// if let Some(summary) = stats.summary(Event::Instructions) {
///     println!("median of {} samples: {}", summary.count(), summary.median());
/// }
/// # Ok::<(), perf_cost::Error>(())
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EventStats {
    events: Vec<Event>,

    /// Row-major, `events.len()` values per row.
    samples: Vec<u64>,

    /// One entry per row.
    elapsed_nanos: Vec<u64>,
}

impl EventStats {
    /// The measured events, in the order they were requested.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The number of rows, i.e. the number of sampled iterations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elapsed_nanos.len()
    }

    /// Whether not a single iteration was sampled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elapsed_nanos.is_empty()
    }

    /// The counter deltas of one iteration, aligned by index with [`events()`](Self::events).
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[u64]> {
        let columns = self.events.len();
        let start = index.checked_mul(columns)?;
        let end = start.checked_add(columns)?;

        if index >= self.len() {
            return None;
        }

        self.samples.get(start..end)
    }

    /// All rows, in the order the iterations were sampled.
    pub fn rows(&self) -> impl Iterator<Item = &[u64]> + '_ {
        // There is always at least one event, so the chunk size is never zero.
        self.samples.chunks_exact(self.events.len())
    }

    /// The elapsed time of each iteration in nanoseconds, aligned by index with the rows.
    #[must_use]
    pub fn elapsed_nanos(&self) -> &[u64] {
        &self.elapsed_nanos
    }

    /// Every sampled value of one event, or `None` if the event was not measured.
    ///
    /// If the same event was requested more than once, the first column is returned.
    pub fn column(&self, event: Event) -> Option<impl Iterator<Item = u64> + '_> {
        let index = self.events.iter().position(|e| *e == event)?;

        Some(
            self.samples
                .iter()
                .skip(index)
                .step_by(self.events.len())
                .copied(),
        )
    }

    /// Descriptive statistics of one event, or `None` if the event was not measured or the
    /// sample set is empty.
    #[must_use]
    pub fn summary(&self, event: Event) -> Option<Summary> {
        Summary::from_values(self.column(event)?)
    }

    /// Descriptive statistics of the elapsed times, or `None` if the sample set is empty.
    #[must_use]
    pub fn elapsed_summary(&self) -> Option<Summary> {
        Summary::from_values(self.elapsed_nanos.iter().copied())
    }
}

const ELAPSED_LABEL: &str = "elapsed (ns)";

impl fmt::Display for EventStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.events.iter().map(ToString::to_string).collect();
        let width = names
            .iter()
            .map(String::len)
            .chain([ELAPSED_LABEL.len()])
            .max()
            .unwrap_or_default();

        writeln!(f, "{} samples", self.len())?;
        write!(
            f,
            "{:<width$}  {:>14} {:>16} {:>14} {:>14}",
            "event", "median", "mean", "min", "max"
        )?;

        let summaries = self
            .events
            .iter()
            .map(|event| self.summary(*event))
            .chain([self.elapsed_summary()]);
        let labels = names.iter().map(String::as_str).chain([ELAPSED_LABEL]);

        for (label, summary) in labels.zip(summaries) {
            let Some(summary) = summary else {
                continue;
            };

            write!(
                f,
                "\n{label:<width$}  {:>14} {:>16.1} {:>14} {:>14}",
                summary.median(),
                summary.mean(),
                summary.min(),
                summary.max()
            )?;
        }

        Ok(())
    }
}

/// Collects sample rows while the sampling loop runs.
///
/// Rows only ever enter the accumulator complete, so an iteration that fails halfway leaves
/// no trace in it.
#[derive(Debug)]
pub(crate) struct SampleAccumulator {
    columns: usize,
    samples: Vec<u64>,
    elapsed_nanos: Vec<u64>,
}

impl SampleAccumulator {
    pub(crate) fn new(columns: usize) -> Self {
        Self {
            columns,
            samples: Vec::new(),
            elapsed_nanos: Vec::new(),
        }
    }

    /// Appends the difference between two counter snapshots as a new row.
    ///
    /// # Panics
    ///
    /// Panics if either snapshot does not have one value per column.
    pub(crate) fn push(&mut self, baseline: &[u64], current: &[u64], elapsed_nanos: u64) {
        assert_eq!(baseline.len(), self.columns, "baseline snapshot has wrong width");
        assert_eq!(current.len(), self.columns, "current snapshot has wrong width");

        self.samples.extend(
            current
                .iter()
                .zip(baseline)
                .map(|(after, before)| after.saturating_sub(*before)),
        );
        self.elapsed_nanos.push(elapsed_nanos);
    }

    pub(crate) fn len(&self) -> usize {
        self.elapsed_nanos.len()
    }

    /// # Panics
    ///
    /// Panics if the number of events does not match the number of columns.
    pub(crate) fn into_stats(self, events: Vec<Event>) -> EventStats {
        assert_eq!(
            events.len(),
            self.columns,
            "every column must belong to exactly one event"
        );

        EventStats {
            events,
            samples: self.samples,
            elapsed_nanos: self.elapsed_nanos,
        }
    }
}
