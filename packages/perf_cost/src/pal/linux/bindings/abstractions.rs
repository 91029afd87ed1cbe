use std::fmt::Debug;
use std::io;
use std::os::fd::RawFd;

use libc::{c_int, c_uint, c_ulong, pid_t};
use perf_event_open_sys::bindings::perf_event_attr;

/// Bindings for FFI calls into the operating system.
///
/// All PAL FFI calls must go through this trait, enabling them to be mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Bindings: Debug + Send + Sync + 'static {
    fn perf_event_open(
        &self,
        attr: &mut perf_event_attr,
        pid: pid_t,
        cpu: c_int,
        group_fd: RawFd,
        flags: c_ulong,
    ) -> io::Result<RawFd>;

    fn ioctl_enable(&self, fd: RawFd, flags: c_uint) -> io::Result<()>;

    fn ioctl_disable(&self, fd: RawFd, flags: c_uint) -> io::Result<()>;

    fn ioctl_reset(&self, fd: RawFd, flags: c_uint) -> io::Result<()>;

    /// Reads from the file descriptor into `buffer`, returning the number of bytes read.
    fn read(&self, fd: RawFd, buffer: &mut [u64]) -> io::Result<usize>;

    fn close(&self, fd: RawFd);

    /// Returns free heap memory to the operating system, if the C runtime supports it.
    fn malloc_trim(&self);
}
