use std::io;

use thiserror::Error;

use crate::Event;

/// Errors that can occur when opening, starting, reading or stopping performance counters.
///
/// Counter failures are not retried. The hardware or the operating system refusing to program
/// a counter does not heal itself within the lifetime of a process, so every one of these is
/// fatal to the measurement that encountered it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller asked to measure an empty set of events.
    #[error("no events were requested, at least one event is required")]
    NoEvents,

    /// The operating system refused to program a counter for an event.
    ///
    /// Typical causes are insufficient privileges (see `perf_event_paranoid`), a processor
    /// without the requested event or a virtualized environment without a performance
    /// monitoring unit.
    #[error("failed to open counter for event '{event}': {source}")]
    Open {
        /// The event whose counter could not be opened.
        event: Event,

        /// The underlying operating system error.
        source: io::Error,
    },

    /// The counters were opened but could not be enabled.
    #[error("failed to start counters: {0}")]
    Start(#[source] io::Error),

    /// A snapshot of the counter values could not be taken.
    #[error("failed to read counters: {0}")]
    Read(#[source] io::Error),

    /// The counters could not be disabled.
    #[error("failed to stop counters: {0}")]
    Stop(#[source] io::Error),

    /// Performance counters are not available on the platform the code was built for.
    #[error("hardware performance counters are not supported on this platform")]
    Unsupported,

    /// A string did not name any known event.
    #[error("unknown event name: '{0}'")]
    UnknownEvent(String),
}

/// A specialized `Result` type for counter operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

/// The error returned by measurements of fallible work.
///
/// Either the counters failed, or the measured work itself returned an error. In both cases
/// the counters have been stopped before this error reaches the caller and any partially
/// collected measurements have been discarded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MeasureError<E> {
    /// The performance counters failed.
    #[error(transparent)]
    Counters(#[from] Error),

    /// The measured work returned an error.
    #[error("measured work failed: {0}")]
    Work(E),
}

impl<E> MeasureError<E> {
    /// Returns the error of the measured work, if that is what failed.
    #[must_use]
    pub fn into_work_error(self) -> Option<E> {
        match self {
            Self::Work(e) => Some(e),
            Self::Counters(_) => None,
        }
    }
}
