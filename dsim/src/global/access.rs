use std::cell::RefCell;

use crate::{
    Event, ProcessId,
    global::clock,
    random::{Distributions, Randomizer},
    time::{VirtualTime, calendar::Calendar},
};

pub(crate) struct SimulationAccess {
    process_on_execution: ProcessId,
    calendar: Calendar,
    random: Randomizer,
}

impl SimulationAccess {
    pub(crate) fn new(random: Randomizer) -> Self {
        Self {
            process_on_execution: 0,
            calendar: Calendar::new(),
            random,
        }
    }
}

impl SimulationAccess {
    fn schedule_at(&mut self, event: Event, at: VirtualTime) {
        self.calendar.schedule(event, at);
    }

    fn next_scheduled(&self) -> Option<VirtualTime> {
        self.calendar.peek_time()
    }

    fn pop_scheduled(&mut self) -> Option<(VirtualTime, Event)> {
        self.calendar.pop()
    }

    fn random_time(&mut self, distribution: Distributions) -> VirtualTime {
        self.random.random_time(distribution)
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.random.chance(probability)
    }

    fn random_int(&mut self, low: u32, high: u32) -> u32 {
        self.random.random_int(low, high)
    }

    fn set_process(&mut self, id: ProcessId) {
        self.process_on_execution = id
    }

    fn rank(&self) -> ProcessId {
        self.process_on_execution
    }
}

// Kernel state of the simulation running on this thread. Borrows are kept
// short: no process code ever runs while the handle is borrowed, so processes
// may call into it freely from inside `resume`.
thread_local! {
    pub(crate) static ACCESS_HANDLE: RefCell<Option<SimulationAccess>> = const { RefCell::new(None) };
}

pub(crate) fn drop_access() {
    ACCESS_HANDLE.take();
}

pub(crate) fn setup_access(random: Randomizer) {
    ACCESS_HANDLE.with_borrow_mut(|access| *access = Some(SimulationAccess::new(random)));
}

pub(crate) fn with_access<F, T>(f: F) -> T
where
    F: FnOnce(&mut SimulationAccess) -> T,
{
    ACCESS_HANDLE.with_borrow_mut(|access| f(access.as_mut().expect("Out of simulation context")))
}

pub(crate) fn set_process(id: ProcessId) {
    with_access(|access| access.set_process(id));
}

pub(crate) fn schedule_at(event: Event, at: VirtualTime) {
    with_access(|access| access.schedule_at(event, at));
}

pub(crate) fn schedule_now(event: Event) {
    schedule_at(event, clock::now());
}

pub(crate) fn next_scheduled() -> Option<VirtualTime> {
    with_access(|access| access.next_scheduled())
}

pub(crate) fn pop_scheduled() -> Option<(VirtualTime, Event)> {
    with_access(|access| access.pop_scheduled())
}

/// Schedules a pending `event` to fire `delay` after the current time.
///
/// # Panics
///
/// If the event was already triggered or scheduled.
pub fn schedule(event: &Event, delay: VirtualTime) {
    event.schedule_after(delay);
}

/// Returns a new event that fires `delay` after the current time.
pub fn timeout(delay: VirtualTime) -> Event {
    let event = Event::new();
    schedule(&event, delay);
    event
}

/// Draws a duration from the run's seeded random source.
pub fn random_time(distribution: Distributions) -> VirtualTime {
    with_access(|access| access.random_time(distribution))
}

/// True with the given probability.
pub fn chance(probability: f64) -> bool {
    with_access(|access| access.chance(probability))
}

/// Uniform integer in `[low, high]`.
pub fn random_int(low: u32, high: u32) -> u32 {
    with_access(|access| access.random_int(low, high))
}

/// Id of the process currently executing.
pub fn rank() -> ProcessId {
    with_access(|access| access.rank())
}
