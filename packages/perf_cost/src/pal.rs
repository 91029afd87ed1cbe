//! Platform abstraction layer for performance counters.
//!
//! The measurement logic only talks to the [`Platform`] and [`Counters`] traits. The build
//! target decides which real implementation sits behind them, and unit tests can swap in a
//! fake platform whose counters and clock they control.

mod abstractions;
mod facade;

pub(crate) use abstractions::*;
pub(crate) use facade::*;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub(crate) use linux::*;

#[cfg(not(target_os = "linux"))]
mod unsupported;
#[cfg(not(target_os = "linux"))]
pub(crate) use unsupported::*;

#[cfg(test)]
mod fake;
#[cfg(test)]
pub(crate) use fake::*;
