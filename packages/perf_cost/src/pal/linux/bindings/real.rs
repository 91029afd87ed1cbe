use std::io;
use std::mem;
use std::os::fd::RawFd;

use libc::{c_int, c_uint, c_ulong, pid_t};
use perf_event_open_sys as sys;
use perf_event_open_sys::bindings::perf_event_attr;

use crate::pal::linux::Bindings;

/// FFI bindings that target the real operating system that the build is targeting.
///
/// You would only use different bindings in PAL unit tests that need to use mock bindings.
/// Even then, whenever possible, unit tests should use real bindings for maximum realism.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetBindings;

/// Converts the return value of an ioctl into a `Result`.
fn check_ioctl(result: c_int) -> io::Result<()> {
    if result == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

impl Bindings for BuildTargetBindings {
    fn perf_event_open(
        &self,
        attr: &mut perf_event_attr,
        pid: pid_t,
        cpu: c_int,
        group_fd: RawFd,
        flags: c_ulong,
    ) -> io::Result<RawFd> {
        // SAFETY: The attribute structure is valid for the duration of the call and its size
        // field is set by the caller. No other safety requirements.
        let fd = unsafe { sys::perf_event_open(attr, pid, cpu, group_fd, flags) };

        if fd == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(fd)
        }
    }

    fn ioctl_enable(&self, fd: RawFd, flags: c_uint) -> io::Result<()> {
        // SAFETY: An invalid descriptor is reported as an error, no other safety requirements.
        check_ioctl(unsafe { sys::ioctls::ENABLE(fd, flags) })
    }

    fn ioctl_disable(&self, fd: RawFd, flags: c_uint) -> io::Result<()> {
        // SAFETY: An invalid descriptor is reported as an error, no other safety requirements.
        check_ioctl(unsafe { sys::ioctls::DISABLE(fd, flags) })
    }

    fn ioctl_reset(&self, fd: RawFd, flags: c_uint) -> io::Result<()> {
        // SAFETY: An invalid descriptor is reported as an error, no other safety requirements.
        check_ioctl(unsafe { sys::ioctls::RESET(fd, flags) })
    }

    fn read(&self, fd: RawFd, buffer: &mut [u64]) -> io::Result<usize> {
        // SAFETY: The pointer and length describe memory we exclusively borrow for the
        // duration of the call. Any bit pattern is a valid u64.
        let result = unsafe {
            libc::read(
                fd,
                buffer.as_mut_ptr().cast(),
                mem::size_of_val(buffer),
            )
        };

        if result < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(result.unsigned_abs())
        }
    }

    #[cfg_attr(test, mutants::skip)] // Closing leaves no trace a test could observe.
    fn close(&self, fd: RawFd) {
        // SAFETY: The caller gives up ownership of the descriptor. There is nothing useful to
        // do if closing fails, the descriptor is gone either way.
        unsafe {
            libc::close(fd);
        }
    }

    #[cfg(target_env = "gnu")]
    #[cfg_attr(test, mutants::skip)] // Returning memory to the OS is not observable from a test.
    fn malloc_trim(&self) {
        // SAFETY: No safety requirements.
        unsafe {
            libc::malloc_trim(0);
        }
    }

    #[cfg(not(target_env = "gnu"))]
    fn malloc_trim(&self) {}
}
