use std::io;
use std::mem;
use std::os::fd::RawFd;

use perf_event_open_sys::bindings::{
    PERF_COUNT_HW_BRANCH_INSTRUCTIONS, PERF_COUNT_HW_BRANCH_MISSES, PERF_COUNT_HW_BUS_CYCLES,
    PERF_COUNT_HW_CACHE_MISSES, PERF_COUNT_HW_CACHE_REFERENCES, PERF_COUNT_HW_CPU_CYCLES,
    PERF_COUNT_HW_INSTRUCTIONS, PERF_COUNT_HW_REF_CPU_CYCLES,
    PERF_COUNT_HW_STALLED_CYCLES_BACKEND, PERF_COUNT_HW_STALLED_CYCLES_FRONTEND,
    PERF_COUNT_SW_CONTEXT_SWITCHES, PERF_COUNT_SW_CPU_CLOCK, PERF_COUNT_SW_CPU_MIGRATIONS,
    PERF_COUNT_SW_PAGE_FAULTS, PERF_COUNT_SW_PAGE_FAULTS_MAJ, PERF_COUNT_SW_PAGE_FAULTS_MIN,
    PERF_COUNT_SW_TASK_CLOCK, PERF_FLAG_FD_CLOEXEC, PERF_FORMAT_GROUP,
    PERF_FORMAT_TOTAL_TIME_ENABLED, PERF_FORMAT_TOTAL_TIME_RUNNING, PERF_IOC_FLAG_GROUP,
    PERF_TYPE_HARDWARE, PERF_TYPE_RAW, PERF_TYPE_SOFTWARE, perf_event_attr,
};
use tracing::trace;

use crate::pal::Counters;
use crate::pal::linux::{Bindings, BindingsFacade};
use crate::{Error, Event, Result};

/// A group read starts with the number of counters, the time the group was enabled and the
/// time it was actually scheduled on the processor. The counter values follow.
const READ_HEADER_WORDS: usize = 3;

/// Counts the calling thread only.
const CURRENT_THREAD: libc::pid_t = 0;

/// Counts on whichever processor the thread happens to run.
const ANY_CPU: libc::c_int = -1;

const NO_GROUP: RawFd = -1;

/// A `perf_event_open` counter group, one counter per event, led by the first event.
///
/// The group is scheduled onto the performance monitoring unit as a unit, so all counters
/// cover exactly the same stretch of execution. When the kernel has to share the unit with
/// other groups it multiplexes, in which case the values are scaled up by the ratio of enabled
/// time to running time.
#[derive(Debug)]
pub(crate) struct CountersImpl {
    bindings: BindingsFacade,

    /// The group leader comes first.
    fds: Vec<RawFd>,

    /// Scratch space for group reads, header included.
    read_buffer: Vec<u64>,
}

impl CountersImpl {
    pub(crate) fn open(bindings: BindingsFacade, events: &[Event]) -> Result<Self> {
        let mut counters = Self {
            bindings,
            fds: Vec::with_capacity(events.len()),
            read_buffer: vec![
                0;
                READ_HEADER_WORDS
                    .checked_add(events.len())
                    .expect("event count is far below usize::MAX")
            ],
        };

        for &event in events {
            let mut attr = attributes(event);
            let group_fd = counters.fds.first().copied().unwrap_or(NO_GROUP);

            // If this fails, dropping `counters` closes whatever we already opened.
            let fd = counters
                .bindings
                .perf_event_open(
                    &mut attr,
                    CURRENT_THREAD,
                    ANY_CPU,
                    group_fd,
                    PERF_FLAG_FD_CLOEXEC.into(),
                )
                .map_err(|source| Error::Open { event, source })?;

            trace!(%event, fd, group_fd, "opened counter");
            counters.fds.push(fd);
        }

        Ok(counters)
    }

    fn leader(&self) -> Option<RawFd> {
        self.fds.first().copied()
    }
}

impl Counters for CountersImpl {
    fn enable(&mut self) -> Result<()> {
        let Some(leader) = self.leader() else {
            return Ok(());
        };

        self.bindings
            .ioctl_reset(leader, PERF_IOC_FLAG_GROUP)
            .map_err(Error::Start)?;
        self.bindings
            .ioctl_enable(leader, PERF_IOC_FLAG_GROUP)
            .map_err(Error::Start)
    }

    fn read(&mut self, values: &mut [u64]) -> Result<()> {
        let Some(leader) = self.leader() else {
            return Ok(());
        };

        let expected_bytes = mem::size_of_val(self.read_buffer.as_slice());
        let bytes = self
            .bindings
            .read(leader, &mut self.read_buffer)
            .map_err(Error::Read)?;

        if bytes != expected_bytes {
            return Err(Error::Read(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("group read returned {bytes} bytes, expected {expected_bytes}"),
            )));
        }

        let (header, counts) = self.read_buffer.split_at(READ_HEADER_WORDS);
        let &[count, time_enabled, time_running] = header else {
            unreachable!("header is split off at its exact length");
        };

        debug_assert_eq!(
            usize::try_from(count).ok(),
            Some(counts.len()),
            "kernel reported a different group size than we opened"
        );

        for (value, &raw) in values.iter_mut().zip(counts) {
            *value = scale(raw, time_enabled, time_running);
        }

        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        let Some(leader) = self.leader() else {
            return Ok(());
        };

        self.bindings
            .ioctl_disable(leader, PERF_IOC_FLAG_GROUP)
            .map_err(Error::Stop)
    }
}

impl Drop for CountersImpl {
    fn drop(&mut self) {
        // Members before the leader.
        for fd in self.fds.drain(..).rev() {
            self.bindings.close(fd);
        }
    }
}

/// Extrapolates a raw count to the full enabled time if the group was multiplexed.
fn scale(raw: u64, time_enabled: u64, time_running: u64) -> u64 {
    if time_running == 0 || time_running >= time_enabled {
        return raw;
    }

    u128::from(raw)
        .checked_mul(u128::from(time_enabled))
        .and_then(|product| product.checked_div(u128::from(time_running)))
        .and_then(|scaled| u64::try_from(scaled).ok())
        .unwrap_or(u64::MAX)
}

fn attributes(event: Event) -> perf_event_attr {
    let (type_, config): (u32, u64) = match event {
        Event::CpuCycles => (PERF_TYPE_HARDWARE, PERF_COUNT_HW_CPU_CYCLES.into()),
        Event::Instructions => (PERF_TYPE_HARDWARE, PERF_COUNT_HW_INSTRUCTIONS.into()),
        Event::CacheReferences => (PERF_TYPE_HARDWARE, PERF_COUNT_HW_CACHE_REFERENCES.into()),
        Event::CacheMisses => (PERF_TYPE_HARDWARE, PERF_COUNT_HW_CACHE_MISSES.into()),
        Event::BranchInstructions => {
            (PERF_TYPE_HARDWARE, PERF_COUNT_HW_BRANCH_INSTRUCTIONS.into())
        }
        Event::BranchMisses => (PERF_TYPE_HARDWARE, PERF_COUNT_HW_BRANCH_MISSES.into()),
        Event::BusCycles => (PERF_TYPE_HARDWARE, PERF_COUNT_HW_BUS_CYCLES.into()),
        Event::StalledCyclesFrontend => (
            PERF_TYPE_HARDWARE,
            PERF_COUNT_HW_STALLED_CYCLES_FRONTEND.into(),
        ),
        Event::StalledCyclesBackend => (
            PERF_TYPE_HARDWARE,
            PERF_COUNT_HW_STALLED_CYCLES_BACKEND.into(),
        ),
        Event::RefCpuCycles => (PERF_TYPE_HARDWARE, PERF_COUNT_HW_REF_CPU_CYCLES.into()),
        Event::CpuClock => (PERF_TYPE_SOFTWARE, PERF_COUNT_SW_CPU_CLOCK.into()),
        Event::TaskClock => (PERF_TYPE_SOFTWARE, PERF_COUNT_SW_TASK_CLOCK.into()),
        Event::PageFaults => (PERF_TYPE_SOFTWARE, PERF_COUNT_SW_PAGE_FAULTS.into()),
        Event::ContextSwitches => (PERF_TYPE_SOFTWARE, PERF_COUNT_SW_CONTEXT_SWITCHES.into()),
        Event::CpuMigrations => (PERF_TYPE_SOFTWARE, PERF_COUNT_SW_CPU_MIGRATIONS.into()),
        Event::MinorFaults => (PERF_TYPE_SOFTWARE, PERF_COUNT_SW_PAGE_FAULTS_MIN.into()),
        Event::MajorFaults => (PERF_TYPE_SOFTWARE, PERF_COUNT_SW_PAGE_FAULTS_MAJ.into()),
        Event::Raw(config) => (PERF_TYPE_RAW, config),
    };

    let mut attr = perf_event_attr {
        size: u32::try_from(mem::size_of::<perf_event_attr>())
            .expect("perf_event_attr is a few hundred bytes"),
        type_,
        config,
        read_format: u64::from(
            PERF_FORMAT_GROUP | PERF_FORMAT_TOTAL_TIME_ENABLED | PERF_FORMAT_TOTAL_TIME_RUNNING,
        ),
        ..perf_event_attr::default()
    };

    // The whole group starts disabled and is enabled through the leader. Only user space
    // activity of the measured code is counted.
    attr.set_disabled(1);
    attr.set_exclude_kernel(1);
    attr.set_exclude_hv(1);

    attr
}
