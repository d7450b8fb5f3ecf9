use log::debug;

use crate::{
    Event, ProcessHandle, ProcessId, Suspend,
    event::Callback,
    global::set_process,
};

struct ProcessSlot {
    name: String,
    handle: Box<dyn ProcessHandle>,
    // Conditions are held only by their waiters: children keep weak links.
    waiting: Option<Event>,
    terminated: bool,
}

pub(crate) struct Nursery {
    procs: Vec<ProcessSlot>, // indexed by ProcessId
}

impl Nursery {
    pub(crate) fn new() -> Self {
        Self { procs: Vec::new() }
    }

    pub(crate) fn register(&mut self, name: &str, handle: Box<dyn ProcessHandle>) -> ProcessId {
        let id = self.procs.len();
        self.procs.push(ProcessSlot {
            name: name.to_string(),
            handle,
            waiting: None,
            terminated: false,
        });
        id
    }

    pub(crate) fn resume(&mut self, id: ProcessId, fired: &Event) {
        let slot = self.procs.get_mut(id).expect("Invalid ProcessId");
        if slot.terminated {
            return;
        }
        set_process(id);
        slot.waiting = None;

        let mut fired = fired.clone();
        loop {
            debug!("Resuming P{id} ({}) on {fired:?}", slot.name);
            match slot.handle.resume(&fired) {
                Suspend::Exit => {
                    debug!("P{id} ({}) exited", slot.name);
                    slot.terminated = true;
                    return;
                }
                Suspend::On(next) if next.is_processed() => fired = next,
                Suspend::On(next) => {
                    next.add_callback(Callback::Resume(id));
                    slot.waiting = Some(next);
                    return;
                }
            }
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.procs.len()
    }
}
