mod bindings;
mod counters;
mod platform;

pub(crate) use bindings::*;
pub(crate) use counters::*;
pub(crate) use platform::*;
