//! Process trait and identification types.
//!
//! A process is a resumable computation. The kernel calls
//! [`ProcessHandle::resume`] each time the event the process last suspended
//! on has been processed, and the process answers with the next event to
//! wait for. Suspension points are therefore explicit values rather than
//! stack frames, which keeps every process an ordinary state machine.

use crate::Event;

/// Identifier of a process within a single simulation run.
///
/// Ids are handed out by [`Simulation::spawn`] in spawn order, starting from
/// zero, so two runs set up the same way see the same ids. The id of the
/// process being resumed is available through [`rank`].
///
/// [`Simulation::spawn`]: crate::Simulation::spawn
/// [`rank`]: crate::rank
pub type ProcessId = usize;

/// What a process does after a resume.
#[derive(Debug)]
pub enum Suspend {
    /// Wait until the given event has been processed.
    ///
    /// If the event was already processed, the process is resumed again
    /// straight away, inside the same step.
    On(Event),
    /// Terminate. The process is never resumed again.
    Exit,
}

/// Core trait for all simulated processes.
///
/// # Lifecycle
///
/// 1. The process is spawned and an initialisation event is triggered for it
///    at the current time.
/// 2. When that event is processed, `resume` is called with it.
/// 3. From then on `resume` is called with whatever event the process
///    suspended on, once that event has been processed.
///
/// While `resume` runs the process may freely create events, trigger them,
/// put into and take from [`Store`]s and draw random numbers. It must not
/// block: everything that takes virtual time is expressed by returning
/// [`Suspend::On`] with a timeout or some other event.
///
/// # Examples
///
/// ```rust
/// use dsim::{Event, ProcessHandle, Suspend, SimulationBuilder, VirtualTime, now, timeout};
///
/// struct Ticker {
///     ticks: usize,
/// }
///
/// impl ProcessHandle for Ticker {
///     fn resume(&mut self, _fired: &Event) -> Suspend {
///         if self.ticks == 3 {
///             return Suspend::Exit;
///         }
///         self.ticks += 1;
///         Suspend::On(timeout(VirtualTime(10.0)))
///     }
/// }
///
/// let mut sim = SimulationBuilder::default()
///     .time_budget(VirtualTime(100.0))
///     .build();
/// sim.spawn("ticker", Ticker { ticks: 0 });
/// sim.spawn("idle", |_: &Event| Suspend::On(timeout(VirtualTime(1_000.0))));
/// sim.run().unwrap();
/// assert_eq!(now(), VirtualTime(100.0));
/// ```
///
/// [`Store`]: crate::Store
pub trait ProcessHandle {
    /// Continues the process. `fired` is the event it was waiting on, or the
    /// initialisation event on the first call.
    fn resume(&mut self, fired: &Event) -> Suspend;
}

impl<F> ProcessHandle for F
where
    F: FnMut(&Event) -> Suspend,
{
    fn resume(&mut self, fired: &Event) -> Suspend {
        self(fired)
    }
}
