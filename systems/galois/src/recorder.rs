use std::{cell::RefCell, rc::Rc};

use dsim::{Event, ProcessHandle, Suspend, VirtualTime, now, timeout};

use crate::registry::Registry;

/// Returns the memory in use, in megabytes, at the given virtual time.
/// `None` skips the sample.
pub type MemorySampler = Box<dyn FnMut(VirtualTime) -> Option<f64>>;

pub(crate) type SharedSampler = Rc<RefCell<Option<MemorySampler>>>;

/// Feeds a memory sample into the run statistics every recording period.
pub struct MemoryRecorder {
    registry: Rc<Registry>,
    sampler: SharedSampler,
    started: bool,
}

impl MemoryRecorder {
    pub(crate) fn new(registry: Rc<Registry>, sampler: SharedSampler) -> Self {
        Self {
            registry,
            sampler,
            started: false,
        }
    }
}

impl ProcessHandle for MemoryRecorder {
    fn resume(&mut self, _fired: &Event) -> Suspend {
        if self.started {
            let sample = self
                .sampler
                .borrow_mut()
                .as_mut()
                .and_then(|sample| sample(now()));
            if let Some(megabytes) = sample {
                self.registry.stats().borrow_mut().add_used_memory(megabytes);
            }
        }
        self.started = true;
        Suspend::On(timeout(self.registry.config().memory_recording_frequency))
    }
}
