pub(crate) mod calendar;
mod virtual_time;

pub use virtual_time::VirtualTime;
