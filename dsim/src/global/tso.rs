//! Global unique identifier generation.
//!
//! The TSO (Timestamp Oracle) hands out monotonically increasing identifiers
//! within a single simulation run. Events take their [`EventId`] from it,
//! and models may use it for anything else that needs a run-unique number.
//!
//! [`EventId`]: crate::EventId

use std::cell::Cell;

thread_local! {
    pub(crate) static TSO: Cell<usize> = Cell::new(0)
}

/// Generates an identifier unique within the current simulation run.
///
/// The counter is thread-local and reset when the simulation is dropped, so
/// two runs built the same way see the same sequence of identifiers.
///
/// # Examples
///
/// ```rust
/// use dsim::global_unique_id;
///
/// let first = global_unique_id();
/// let second = global_unique_id();
/// assert!(second > first);
/// ```
pub fn global_unique_id() -> usize {
    TSO.replace(TSO.get() + 1)
}

pub(crate) fn drop_tso() {
    TSO.take();
}
