use std::{
    cell::Cell,
    collections::{BTreeMap, HashSet},
    rc::Rc,
};

use dsim::{Event, ProcessHandle, Store, Suspend, debug_process, timeout};

use crate::{
    MachineId,
    packets::{CodePacket, SessionId, UdpFrame},
    registry::{FrameSink, Registry, Sendable, delivered},
};

pub struct ClientOsPort {
    inbox: Store<UdpFrame>,
    outbox: Store<UdpFrame>,
    session: Cell<Option<SessionId>>,
}

impl ClientOsPort {
    pub fn new() -> Self {
        Self {
            inbox: Store::unbounded(),
            outbox: Store::unbounded(),
            session: Cell::new(None),
        }
    }

    /// Session of the last frame the client sent.
    pub fn session(&self) -> Option<SessionId> {
        self.session.get()
    }

    #[cfg(test)]
    pub(crate) fn outbox(&self) -> Store<UdpFrame> {
        self.outbox.clone()
    }
}

impl Default for ClientOsPort {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for ClientOsPort {
    fn receive(&self, frame: UdpFrame) {
        self.inbox.put(frame);
    }
}

impl Sendable<UdpFrame> for ClientOsPort {
    fn send(&self, frame: UdpFrame) {
        self.session.set(Some(frame.session));
        self.outbox.put(frame);
    }
}

/// Rebuilds fragments out of the answer frames of one session.
#[derive(Default)]
pub struct Reassembler {
    session: Option<SessionId>,
    frames: Vec<UdpFrame>,
    delivered: HashSet<MachineId>,
}

impl Reassembler {
    /// Buffers `frame` and returns the fragments it completed, with
    /// `owner` as their owner. Switching to another session drops whatever
    /// was buffered for the previous one.
    pub fn accept(&mut self, owner: MachineId, frame: UdpFrame) -> Vec<CodePacket> {
        if self.session != Some(frame.session) {
            self.session = Some(frame.session);
            self.frames.clear();
            self.delivered.clear();
        }
        if self.delivered.contains(&frame.src) {
            return Vec::new();
        }
        self.frames.push(frame);
        self.reassemble(owner)
    }

    /// Frames still waiting for the rest of their fragment.
    pub fn buffered(&self) -> usize {
        self.frames.len()
    }

    fn reassemble(&mut self, owner: MachineId) -> Vec<CodePacket> {
        // (frames seen, declared count, bytes) per source, in arrival order.
        let mut order = Vec::new();
        let mut progress: BTreeMap<MachineId, (usize, usize, usize)> = BTreeMap::new();
        for frame in &self.frames {
            let entry = progress.entry(frame.src).or_insert_with(|| {
                order.push(frame.src);
                (0, frame.count, 0)
            });
            entry.0 += 1;
            entry.2 += frame.len;
        }

        let mut packets = Vec::new();
        for src in order {
            let (seen, declared, len) = progress[&src];
            if seen >= declared {
                packets.push(CodePacket {
                    owner,
                    keeper: src,
                    len,
                });
                self.delivered.insert(src);
            }
        }
        self.frames
            .retain(|frame| !self.delivered.contains(&frame.src));
        packets
    }
}

pub struct ClientOs {
    id: MachineId,
    registry: Rc<Registry>,
    incoming: Option<Event>,
    send: Option<Event>,
    sending: Option<UdpFrame>,
    reassembler: Reassembler,
}

impl ClientOs {
    pub fn new(id: MachineId, registry: Rc<Registry>) -> Self {
        Self {
            id,
            registry,
            incoming: None,
            send: None,
            sending: None,
            reassembler: Reassembler::default(),
        }
    }

    fn on_frame(&mut self, frame: UdpFrame) {
        let port = self.registry.client_os(self.id);
        if port.session() != Some(frame.session) {
            debug_process!("Discarding stale {frame}");
            return;
        }
        let packets = self.reassembler.accept(self.id, frame);
        if !packets.is_empty() {
            debug_process!("Reassembled {} fragments", packets.len());
            self.registry.client(self.id).receive(packets);
        }
    }
}

impl ProcessHandle for ClientOs {
    fn resume(&mut self, _fired: &Event) -> Suspend {
        let registry = self.registry.clone();
        let port = registry.client_os(self.id);

        if let Some(frame) = self.sending.take() {
            registry.switch().receive(frame);
        }

        loop {
            let incoming = self.incoming.get_or_insert_with(|| port.inbox.get()).clone();
            let send = self.send.get_or_insert_with(|| port.outbox.get()).clone();
            if !incoming.is_triggered() && !send.is_triggered() {
                return Suspend::On(Event::any_of(&[incoming, send]));
            }
            if incoming.is_triggered() {
                self.incoming = None;
                self.on_frame(delivered(&incoming));
            }
            if send.is_triggered() {
                self.send = None;
                let frame: UdpFrame = delivered(&send);
                self.sending = Some(frame);
                return Suspend::On(timeout(registry.config().wait_for_send(frame.len)));
            }
        }
    }
}
