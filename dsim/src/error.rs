//! Kernel invariant violations.
//!
//! Every variant means the model is broken, not that something routine
//! happened inside it: a run that returns one of these must be discarded.

use thiserror::Error;

use crate::time::VirtualTime;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// The calendar produced an entry earlier than the current clock.
    #[error("time went backwards: present {present}, future {future}")]
    TimeWentBackwards {
        present: VirtualTime,
        future: VirtualTime,
    },

    /// An event was scheduled at NaN or infinity.
    #[error("event scheduled at non-finite time {0}")]
    NonFiniteTime(VirtualTime),

    /// Nothing left to fire but the horizon was not reached yet.
    #[error("ended prematurely at {now}, horizon was {horizon}")]
    EndedPrematurely {
        now: VirtualTime,
        horizon: VirtualTime,
    },
}
