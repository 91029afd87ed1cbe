use std::fmt::Debug;
use std::io;
use std::os::fd::RawFd;
#[cfg(test)]
use std::sync::Arc;

use libc::{c_int, c_uint, c_ulong, pid_t};
use perf_event_open_sys::bindings::perf_event_attr;

#[cfg(test)]
use crate::pal::linux::MockBindings;
use crate::pal::linux::{Bindings, BuildTargetBindings};

#[derive(Clone)]
pub(crate) enum BindingsFacade {
    Real(&'static BuildTargetBindings),

    #[cfg(test)]
    Mock(Arc<MockBindings>),
}

impl BindingsFacade {
    pub(crate) const fn real() -> Self {
        Self::Real(&BuildTargetBindings)
    }
}

impl Bindings for BindingsFacade {
    fn perf_event_open(
        &self,
        attr: &mut perf_event_attr,
        pid: pid_t,
        cpu: c_int,
        group_fd: RawFd,
        flags: c_ulong,
    ) -> io::Result<RawFd> {
        match self {
            Self::Real(bindings) => bindings.perf_event_open(attr, pid, cpu, group_fd, flags),
            #[cfg(test)]
            Self::Mock(bindings) => bindings.perf_event_open(attr, pid, cpu, group_fd, flags),
        }
    }

    fn ioctl_enable(&self, fd: RawFd, flags: c_uint) -> io::Result<()> {
        match self {
            Self::Real(bindings) => bindings.ioctl_enable(fd, flags),
            #[cfg(test)]
            Self::Mock(bindings) => bindings.ioctl_enable(fd, flags),
        }
    }

    fn ioctl_disable(&self, fd: RawFd, flags: c_uint) -> io::Result<()> {
        match self {
            Self::Real(bindings) => bindings.ioctl_disable(fd, flags),
            #[cfg(test)]
            Self::Mock(bindings) => bindings.ioctl_disable(fd, flags),
        }
    }

    fn ioctl_reset(&self, fd: RawFd, flags: c_uint) -> io::Result<()> {
        match self {
            Self::Real(bindings) => bindings.ioctl_reset(fd, flags),
            #[cfg(test)]
            Self::Mock(bindings) => bindings.ioctl_reset(fd, flags),
        }
    }

    fn read(&self, fd: RawFd, buffer: &mut [u64]) -> io::Result<usize> {
        match self {
            Self::Real(bindings) => bindings.read(fd, buffer),
            #[cfg(test)]
            Self::Mock(bindings) => bindings.read(fd, buffer),
        }
    }

    fn close(&self, fd: RawFd) {
        match self {
            Self::Real(bindings) => bindings.close(fd),
            #[cfg(test)]
            Self::Mock(bindings) => bindings.close(fd),
        }
    }

    fn malloc_trim(&self) {
        match self {
            Self::Real(bindings) => bindings.malloc_trim(),
            #[cfg(test)]
            Self::Mock(bindings) => bindings.malloc_trim(),
        }
    }
}

impl From<&'static BuildTargetBindings> for BindingsFacade {
    fn from(bindings: &'static BuildTargetBindings) -> Self {
        Self::Real(bindings)
    }
}

#[cfg(test)]
impl From<MockBindings> for BindingsFacade {
    fn from(bindings: MockBindings) -> Self {
        Self::Mock(Arc::new(bindings))
    }
}

impl Debug for BindingsFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real(bindings) => bindings.fmt(f),
            #[cfg(test)]
            Self::Mock(bindings) => bindings.fmt(f),
        }
    }
}
