use std::{cell::RefCell, mem, rc::Rc};

use dsim::{Event, ProcessHandle, Store, Suspend, debug_process, timeout};

use crate::{
    packets::UdpFrame,
    registry::{FrameSink, Registry, delivered},
    stats::RunStats,
};

/// Input side of the shared switch: a buffer of at most `frame_count`
/// frames.
pub struct SwitchPort {
    frames: Store<UdpFrame>,
    stats: Rc<RefCell<RunStats>>,
}

impl SwitchPort {
    pub fn new(frame_count: Option<usize>, stats: Rc<RefCell<RunStats>>) -> Self {
        Self {
            frames: Store::with_capacity(frame_count),
            stats,
        }
    }

    /// Frames waiting to be forwarded.
    pub fn buffered(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSink for SwitchPort {
    fn receive(&self, frame: UdpFrame) {
        if self.frames.is_full() {
            debug_process!("Switch lost {frame}");
            self.stats.borrow_mut().message_lost();
        } else {
            debug_process!("Switch buffering {frame}");
            self.frames.put(frame);
        }
    }
}

enum State {
    Start,
    Receiving,
    Forwarding(UdpFrame),
}

/// Relays buffered frames one at a time, each after its transfer delay.
pub struct Switch {
    registry: Rc<Registry>,
    state: State,
}

impl Switch {
    pub fn new(registry: Rc<Registry>) -> Self {
        Self {
            registry,
            state: State::Start,
        }
    }
}

impl ProcessHandle for Switch {
    fn resume(&mut self, fired: &Event) -> Suspend {
        match mem::replace(&mut self.state, State::Receiving) {
            State::Start => {}
            State::Receiving => {
                let frame: UdpFrame = delivered(fired);
                self.state = State::Forwarding(frame);
                return Suspend::On(timeout(self.registry.config().wait_for_send(frame.len)));
            }
            State::Forwarding(frame) => {
                debug_process!("Switch forwarding {frame}");
                self.registry.destination(&frame).receive(frame);
            }
        }
        Suspend::On(self.registry.switch().frames.get())
    }
}

#[cfg(test)]
mod tests {
    use dsim::SimulationBuilder;

    use super::*;
    use crate::packets::SessionId;

    fn frame(src: usize) -> UdpFrame {
        UdpFrame::request(SessionId { client: src, nonce: 1 }, src, 0, 64)
    }

    #[test]
    fn full_buffer_drops_and_counts() {
        let _sim = SimulationBuilder::default().build();
        let stats = Rc::new(RefCell::new(RunStats::default()));
        let port = SwitchPort::new(Some(2), stats.clone());

        port.receive(frame(1));
        port.receive(frame(2));
        assert_eq!(port.buffered(), 2);
        assert_eq!(stats.borrow().lost_switch_messages(), 0);

        port.receive(frame(3));
        assert_eq!(port.buffered(), 2);
        assert_eq!(stats.borrow().lost_switch_messages(), 1);
    }

    #[test]
    fn zero_capacity_drops_everything() {
        let _sim = SimulationBuilder::default().build();
        let stats = Rc::new(RefCell::new(RunStats::default()));
        let port = SwitchPort::new(Some(0), stats.clone());
        for src in 0..5 {
            port.receive(frame(src));
        }
        assert_eq!(port.buffered(), 0);
        assert_eq!(stats.borrow().lost_switch_messages(), 5);
    }
}
