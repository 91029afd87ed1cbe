use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Identifies one phenomenon that a performance counter can count.
///
/// The measurement logic never interprets events, it only uses them to label the values that
/// the counter backend reports. The names used by [`Display`](fmt::Display) and
/// [`FromStr`] are the ones the Linux `perf` tool uses, so event lists can be written the same
/// way on the command line and in code.
///
/// # Examples
///
/// ```
/// use perf_cost::Event;
///
/// let event: Event = "branch-misses".parse().unwrap();
/// assert_eq!(event, Event::BranchMisses);
/// assert_eq!(event.to_string(), "branch-misses");
///
/// let raw: Event = "r01c2".parse().unwrap();
/// assert_eq!(raw, Event::Raw(0x01c2));
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum Event {
    /// Total processor cycles. Affected by frequency scaling.
    CpuCycles,

    /// Retired instructions.
    Instructions,

    /// Cache accesses, usually last level cache.
    CacheReferences,

    /// Cache misses, usually last level cache.
    CacheMisses,

    /// Retired branch instructions.
    BranchInstructions,

    /// Mispredicted branch instructions.
    BranchMisses,

    /// Bus cycles, which can differ from total cycles.
    BusCycles,

    /// Stalled cycles during issue.
    StalledCyclesFrontend,

    /// Stalled cycles during retirement.
    StalledCyclesBackend,

    /// Total cycles, not affected by frequency scaling.
    RefCpuCycles,

    /// The processor clock, a high-resolution per-processor timer.
    CpuClock,

    /// A clock count specific to the task that is running.
    TaskClock,

    /// Page faults.
    PageFaults,

    /// Context switches.
    ContextSwitches,

    /// Migrations of the task to another processor.
    CpuMigrations,

    /// Page faults that did not require disk I/O.
    MinorFaults,

    /// Page faults that required disk I/O.
    MajorFaults,

    /// A processor-specific event, encoded the way the processor vendor documents it.
    Raw(u64),
}

/// Every named event, in declaration order. Raw events are not included.
const NAMED: [Event; 17] = [
    Event::CpuCycles,
    Event::Instructions,
    Event::CacheReferences,
    Event::CacheMisses,
    Event::BranchInstructions,
    Event::BranchMisses,
    Event::BusCycles,
    Event::StalledCyclesFrontend,
    Event::StalledCyclesBackend,
    Event::RefCpuCycles,
    Event::CpuClock,
    Event::TaskClock,
    Event::PageFaults,
    Event::ContextSwitches,
    Event::CpuMigrations,
    Event::MinorFaults,
    Event::MajorFaults,
];

impl Event {
    /// A general-purpose set of events, used when the caller does not choose their own.
    ///
    /// The hardware events come first so that one of them leads the counter group.
    pub const DEFAULT_SET: &'static [Self] = &[
        Self::CpuCycles,
        Self::Instructions,
        Self::BranchInstructions,
        Self::BranchMisses,
        Self::TaskClock,
        Self::ContextSwitches,
        Self::PageFaults,
    ];

    /// Returns every event that has a name, i.e. every event except raw events.
    pub fn all_named() -> impl Iterator<Item = Self> {
        NAMED.into_iter()
    }

    /// Whether the event is counted by the performance monitoring unit of the processor,
    /// as opposed to being counted by the operating system kernel.
    #[must_use]
    pub const fn is_hardware(self) -> bool {
        !matches!(
            self,
            Self::CpuClock
                | Self::TaskClock
                | Self::PageFaults
                | Self::ContextSwitches
                | Self::CpuMigrations
                | Self::MinorFaults
                | Self::MajorFaults
        )
    }

    /// The canonical `perf` name of a named event. Raw events have no static name.
    const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::CpuCycles => "cpu-cycles",
            Self::Instructions => "instructions",
            Self::CacheReferences => "cache-references",
            Self::CacheMisses => "cache-misses",
            Self::BranchInstructions => "branch-instructions",
            Self::BranchMisses => "branch-misses",
            Self::BusCycles => "bus-cycles",
            Self::StalledCyclesFrontend => "stalled-cycles-frontend",
            Self::StalledCyclesBackend => "stalled-cycles-backend",
            Self::RefCpuCycles => "ref-cycles",
            Self::CpuClock => "cpu-clock",
            Self::TaskClock => "task-clock",
            Self::PageFaults => "page-faults",
            Self::ContextSwitches => "context-switches",
            Self::CpuMigrations => "cpu-migrations",
            Self::MinorFaults => "minor-faults",
            Self::MajorFaults => "major-faults",
            Self::Raw(_) => return None,
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.name()) {
            (Self::Raw(config), _) => write!(f, "r{config:x}"),
            (_, Some(name)) => f.pad(name),
            (_, None) => unreachable!("only raw events lack a name"),
        }
    }
}

impl FromStr for Event {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        // Aliases accepted by `perf list`.
        let canonical = match trimmed {
            "cycles" => "cpu-cycles",
            "branches" => "branch-instructions",
            "idle-cycles-frontend" => "stalled-cycles-frontend",
            "idle-cycles-backend" => "stalled-cycles-backend",
            "faults" => "page-faults",
            "cs" => "context-switches",
            "migrations" => "cpu-migrations",
            other => other,
        };

        if let Some(event) = NAMED.into_iter().find(|e| e.name() == Some(canonical)) {
            return Ok(event);
        }

        canonical
            .strip_prefix('r')
            .filter(|hex| !hex.is_empty())
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .map(Self::Raw)
            .ok_or_else(|| Error::UnknownEvent(s.to_owned()))
    }
}
