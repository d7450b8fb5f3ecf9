use std::{collections::VecDeque, rc::Rc};

use dsim::{Event, ProcessHandle, Store, Suspend, debug_process, timeout};

use crate::{
    MachineId,
    packets::{AnswerInfo, CodePacket, FrameKind, RequestPacket, SessionId, UdpFrame},
    registry::{FrameSink, Registry, Requestable, Sendable, delivered},
};

/// Splits `packet` into answer frames of at most `mtu` bytes, addressed
/// from its keeper to its owner.
pub fn fragment_frames(packet: &CodePacket, session: SessionId, mtu: usize) -> Vec<UdpFrame> {
    let count = packet.len.div_ceil(mtu);
    (0..count)
        .map(|i| UdpFrame {
            session,
            src: packet.keeper,
            dst: packet.owner,
            len: if i + 1 < count {
                mtu
            } else {
                packet.len - (count - 1) * mtu
            },
            kind: FrameKind::Answer,
            count,
        })
        .collect()
}

pub struct ServerOsPort {
    inbox: Store<UdpFrame>,
    outbox: Store<AnswerInfo>,
}

impl ServerOsPort {
    pub fn new() -> Self {
        Self {
            inbox: Store::unbounded(),
            outbox: Store::unbounded(),
        }
    }

    #[cfg(test)]
    pub(crate) fn outbox(&self) -> Store<AnswerInfo> {
        self.outbox.clone()
    }
}

impl Default for ServerOsPort {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for ServerOsPort {
    fn receive(&self, frame: UdpFrame) {
        self.inbox.put(frame);
    }
}

impl Sendable<AnswerInfo> for ServerOsPort {
    fn send(&self, answer: AnswerInfo) {
        self.outbox.put(answer);
    }
}

pub struct ServerOs {
    id: MachineId,
    registry: Rc<Registry>,
    incoming: Option<Event>,
    send: Option<Event>,
    outgoing: VecDeque<UdpFrame>,
    sending: Option<UdpFrame>,
}

impl ServerOs {
    pub fn new(id: MachineId, registry: Rc<Registry>) -> Self {
        Self {
            id,
            registry,
            incoming: None,
            send: None,
            outgoing: VecDeque::new(),
            sending: None,
        }
    }

    fn send_next(&mut self) -> Option<Suspend> {
        let frame = self.outgoing.pop_front()?;
        self.sending = Some(frame);
        Some(Suspend::On(timeout(
            self.registry.config().wait_for_send(frame.len),
        )))
    }
}

impl ProcessHandle for ServerOs {
    fn resume(&mut self, _fired: &Event) -> Suspend {
        let registry = self.registry.clone();
        let port = registry.server_os(self.id);

        if let Some(frame) = self.sending.take() {
            registry.switch().receive(frame);
        }
        // The next answer is only picked up once every frame of the current
        // one went out.
        if let Some(suspend) = self.send_next() {
            return suspend;
        }

        loop {
            let incoming = self.incoming.get_or_insert_with(|| port.inbox.get()).clone();
            let send = self.send.get_or_insert_with(|| port.outbox.get()).clone();
            if !incoming.is_triggered() && !send.is_triggered() {
                return Suspend::On(Event::any_of(&[incoming, send]));
            }
            if incoming.is_triggered() {
                self.incoming = None;
                let frame: UdpFrame = delivered(&incoming);
                registry.server(self.id).receive(RequestPacket {
                    requester: frame.src,
                    session: frame.session,
                });
            }
            if send.is_triggered() {
                self.send = None;
                let answer: AnswerInfo = delivered(&send);
                self.outgoing = fragment_frames(&answer.packet, answer.session, registry.config().mtu).into();
                debug_process!(
                    "Answering session {} with {} frames",
                    answer.session,
                    self.outgoing.len()
                );
                if let Some(suspend) = self.send_next() {
                    return suspend;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: SessionId = SessionId {
        client: 4,
        nonce: 77,
    };

    fn packet(len: usize) -> CodePacket {
        CodePacket {
            owner: 4,
            keeper: 1,
            len,
        }
    }

    #[test]
    fn frames_cover_fragment() {
        for (len, mtu) in [(8192, 1024), (8000, 1024), (1, 1024), (1024, 1024), (1025, 1024), (5000, 7)] {
            let frames = fragment_frames(&packet(len), SESSION, mtu);
            assert_eq!(frames.len(), len.div_ceil(mtu));
            assert_eq!(frames.iter().map(|f| f.len).sum::<usize>(), len);
            assert!(frames.iter().all(|f| f.count == frames.len() && f.len <= mtu && f.len > 0));
        }
    }

    #[test]
    fn frames_address_owner_from_keeper() {
        let frames = fragment_frames(&packet(2500), SESSION, 1024);
        let lens: Vec<_> = frames.iter().map(|f| f.len).collect();
        assert_eq!(lens, vec![1024, 1024, 452]);
        for frame in frames {
            assert_eq!((frame.src, frame.dst), (1, 4));
            assert_eq!(frame.kind, FrameKind::Answer);
            assert_eq!(frame.session, SESSION);
        }
    }
}
