use std::cell::Cell;

use log::debug;

use crate::{SimulationError, VirtualTime};

thread_local! {
    pub(crate) static CLOCK: Cell<VirtualTime> = Cell::new(VirtualTime::ZERO)
}

pub(crate) fn drop_clock() {
    CLOCK.take();
}

pub(crate) fn fast_forward_clock(future: VirtualTime) -> Result<(), SimulationError> {
    if !future.is_finite() {
        return Err(SimulationError::NonFiniteTime(future));
    }
    let present = CLOCK.get();
    if future < present {
        return Err(SimulationError::TimeWentBackwards { present, future });
    }
    CLOCK.set(future);
    debug!("Global time now: {future}");
    Ok(())
}

/// Current virtual time of the simulation running on this thread.
pub fn now() -> VirtualTime {
    CLOCK.get()
}
