use log::{error, info};

use crate::{
    Event, ProcessHandle, ProcessId, SimulationError,
    event::Callback,
    global,
    nursery::Nursery,
    progress::Bar,
    random::{Randomizer, Seed},
    time::VirtualTime,
};

/// A single simulation run: the process table plus the kernel state living
/// in this thread's globals.
///
/// Only one simulation may exist per thread at a time. Dropping it clears
/// the clock, the calendar and the id counter, so the next one built on the
/// same thread starts from scratch.
pub struct Simulation {
    nursery: Nursery,
    time_budget: VirtualTime,
    progress_bar: Bar,
    processed: u64,
}

impl Simulation {
    pub(crate) fn new(seed: Seed, time_budget: VirtualTime) -> Self {
        global::drop_all();
        global::setup_access(Randomizer::new(seed));

        Self {
            nursery: Nursery::new(),
            time_budget,
            progress_bar: Bar::new(time_budget),
            processed: 0,
        }
    }

    /// Registers a process. It first runs at the current time, after
    /// everything already scheduled for that time.
    pub fn spawn(&mut self, name: &str, process: impl ProcessHandle + 'static) -> ProcessId {
        let id = self.nursery.register(name, Box::new(process));
        let init = Event::new();
        init.add_callback(Callback::Resume(id));
        init.succeed();
        id
    }

    /// Runs until the time budget the simulation was built with.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        self.run_until(self.time_budget)
    }

    /// Processes every event scheduled up to and including `horizon`, then
    /// moves the clock to `horizon`.
    ///
    /// Running out of events before the horizon is an error: some process
    /// is waiting on something that will never happen.
    pub fn run_until(&mut self, horizon: VirtualTime) -> Result<(), SimulationError> {
        loop {
            match global::next_scheduled() {
                None if global::now() < horizon => {
                    error!("DEADLOCK! (ﾉಥ益ಥ）ﾉ ┻━┻ Try with RUST_LOG=debug");
                    return Err(SimulationError::EndedPrematurely {
                        now: global::now(),
                        horizon,
                    });
                }
                None => break,
                Some(at) if at > horizon => break,
                Some(_) => self.step()?,
            }
        }

        if horizon > global::now() {
            global::fast_forward_clock(horizon)?;
        }

        // For small simulations progress bar is not fullfilling
        self.progress_bar.finish();

        info!("Looks good! ヽ('ー`)ノ");
        Ok(())
    }

    /// Processes the single earliest calendar entry.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        let Some((at, event)) = global::pop_scheduled() else {
            return Ok(());
        };
        global::fast_forward_clock(at)?;

        for callback in event.process() {
            match callback {
                Callback::Resume(id) => self.nursery.resume(id, &event),
                Callback::Check(condition) => {
                    if let Some(condition) = Event::from_weak(&condition) {
                        condition.check_condition();
                    }
                }
            }
        }

        self.processed += 1;
        self.progress_bar.make_progress(at.min(self.time_budget));
        Ok(())
    }

    pub fn now(&self) -> VirtualTime {
        global::now()
    }

    /// Number of calendar entries processed so far.
    pub fn processed_events(&self) -> u64 {
        self.processed
    }

    pub fn process_count(&self) -> usize {
        self.nursery.size()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        global::drop_all(); // Clear thread_locals
    }
}
