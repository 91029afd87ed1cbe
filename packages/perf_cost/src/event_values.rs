use std::fmt;
use std::time::Duration;

use crate::Event;

/// The counter values and elapsed time of a single measured execution.
///
/// Returned by [`Profiler::profile()`](crate::Profiler::profile). The values are aligned by
/// index with the events: `values()[i]` is the count of `events()[i]`.
///
/// # Examples
///
/// ```no_run
/// use perf_cost::{Event, ProfileOptions, Profiler};
///
/// let profiler = Profiler::new([Event::Instructions, Event::BranchMisses])?;
/// let result = profiler.profile(&ProfileOptions::default(), || {
///     std::hint::black_box((0..1000_u64).sum::<u64>());
/// })?;
///
/// if let Some(instructions) = result.get(Event::Instructions) {
///     println!("{instructions} instructions in {:?}", result.elapsed());
/// }
/// # Ok::<(), perf_cost::Error>(())
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EventValues {
    events: Vec<Event>,
    values: Vec<u64>,
    elapsed_nanos: u64,
}

impl EventValues {
    /// # Panics
    ///
    /// Panics if the number of values does not match the number of events.
    pub(crate) fn new(events: Vec<Event>, values: Vec<u64>, elapsed_nanos: u64) -> Self {
        assert_eq!(
            events.len(),
            values.len(),
            "every event must have exactly one value"
        );

        Self {
            events,
            values,
            elapsed_nanos,
        }
    }

    /// The measured events, in the order they were requested.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The counter values, aligned by index with [`events()`](Self::events).
    #[must_use]
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// The value counted for `event`, if it was measured.
    ///
    /// If the same event was requested more than once, the first value is returned.
    #[must_use]
    pub fn get(&self, event: Event) -> Option<u64> {
        self.iter().find(|(e, _)| *e == event).map(|(_, value)| value)
    }

    /// Pairs of event and value, in the order the events were requested.
    pub fn iter(&self) -> impl Iterator<Item = (Event, u64)> + '_ {
        self.events
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// The wall time of the measured execution.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos)
    }

    /// The wall time of the measured execution, in nanoseconds.
    #[must_use]
    pub fn elapsed_nanos(&self) -> u64 {
        self.elapsed_nanos
    }
}

const ELAPSED_LABEL: &str = "elapsed (ns)";

impl fmt::Display for EventValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.events.iter().map(ToString::to_string).collect();
        let width = names
            .iter()
            .map(String::len)
            .chain([ELAPSED_LABEL.len()])
            .max()
            .unwrap_or_default();

        for (name, value) in names.iter().zip(&self.values) {
            writeln!(f, "{name:<width$}  {value:>16}")?;
        }

        write!(f, "{ELAPSED_LABEL:<width$}  {:>16}", self.elapsed_nanos)
    }
}
