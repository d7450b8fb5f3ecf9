//! Client side of a machine: repeatedly rebuilds its own file by asking
//! peers for the fragments they keep.
//!
//! A session goes through rounds. Each round walks the ring of peers that
//! starts right after this machine, sending one request to every peer that
//! is still considered up until enough requests are out, then waits for
//! either a quorum of fragments or a timeout proportional to the number of
//! requests sent. Peers that already answered are marked down so the next
//! round asks somebody else.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use dsim::{
    Distributions, Event, ProcessHandle, Suspend, VirtualTime, chance, debug_process, now,
    random_int, random_time, timeout,
};

use crate::{
    MachineId,
    packets::{CodePacket, SessionId, UdpFrame},
    registry::{Registry, Sendable},
};

const MAX_SESSION_NONCE: u32 = 10_000;

/// What the client's OS hands reassembled fragments to.
pub struct ClientPort {
    quorum: usize,
    received: RefCell<Vec<CodePacket>>,
    completion: RefCell<Event>,
    received_total: Cell<u64>,
}

impl ClientPort {
    pub fn new(quorum: usize) -> Self {
        Self {
            quorum,
            received: RefCell::new(Vec::new()),
            completion: RefCell::new(Event::new()),
            received_total: Cell::new(0),
        }
    }

    /// Accepts fragments and fires the completion event once a quorum is in.
    pub fn receive(&self, packets: Vec<CodePacket>) {
        self.received_total
            .set(self.received_total.get() + packets.len() as u64);
        let mut received = self.received.borrow_mut();
        received.extend(packets);
        let completion = self.completion.borrow();
        if received.len() >= self.quorum && !completion.is_triggered() {
            completion.succeed();
        }
    }

    /// Fragments received in the current session.
    pub fn received_count(&self) -> usize {
        self.received.borrow().len()
    }

    /// Fragments received over the whole run.
    pub fn received_total(&self) -> u64 {
        self.received_total.get()
    }

    fn completion(&self) -> Event {
        self.completion.borrow().clone()
    }

    fn renew_completion(&self) {
        *self.completion.borrow_mut() = Event::new();
    }

    fn clear_received(&self) {
        self.received.borrow_mut().clear();
    }

    fn answered(&self, keeper: MachineId) -> bool {
        self.received
            .borrow()
            .iter()
            .any(|packet| packet.keeper == keeper)
    }
}

struct Peer {
    id: MachineId,
    up: bool,
}

struct Session {
    id: SessionId,
    still_needed: usize,
    next_server: usize,
    total_requests: usize,
    started_at: VirtualTime,
}

enum State {
    Deciding,
    Sleeping,
    Awaiting,
}

pub struct Client {
    id: MachineId,
    registry: Rc<Registry>,
    peers: Vec<Peer>,
    session: Option<Session>,
    state: State,
}

impl Client {
    pub fn new(id: MachineId, registry: Rc<Registry>) -> Self {
        let machine_count = registry.machine_count();
        let peers = (1..machine_count)
            .map(|i| Peer {
                id: (id + i) % machine_count,
                up: true,
            })
            .collect();
        Self {
            id,
            registry,
            peers,
            session: None,
            state: State::Deciding,
        }
    }

    fn port(&self) -> &ClientPort {
        self.registry.client(self.id)
    }

    fn start_session(&mut self) {
        let config = self.registry.config();
        for peer in &mut self.peers {
            peer.up = true;
        }
        self.port().clear_received();
        self.port().renew_completion();

        let id = SessionId {
            client: self.id,
            nonce: random_int(0, MAX_SESSION_NONCE),
        };
        debug_process!("Starting session {id}");
        self.session = Some(Session {
            id,
            still_needed: config.request_count + config.extra_request_count,
            next_server: 0,
            total_requests: 0,
            started_at: now(),
        });
    }

    // Sends this round's requests. Returns the event to wait on, or `None`
    // if the quorum was already reached.
    fn request_round(&mut self) -> Option<Event> {
        let registry = self.registry.clone();
        let config = registry.config();
        let client_os = registry.client_os(self.id);
        let session = self.session.as_mut()?;

        let ring = self.peers.len();
        let mut sent = 0;
        for s in session.next_server..session.next_server + ring {
            if sent == session.still_needed {
                session.next_server = s % ring;
                break;
            }
            let peer = &self.peers[s % ring];
            if !peer.up {
                continue;
            }
            debug_process!("Requesting fragment from {}", peer.id);
            client_os.send(UdpFrame::request(
                session.id,
                self.id,
                peer.id,
                config.request_size,
            ));
            sent += 1;
        }
        session.total_requests += sent;

        let completion = self.port().completion();
        if completion.is_triggered() {
            return None;
        }
        let deadline = timeout(config.timeout * (sent * 8) as f64);
        Some(Event::any_of(&[completion, deadline]))
    }

    // Marks down every peer that already handed over its fragment.
    fn set_peers_down(&mut self) {
        let port = self.registry.client(self.id);
        for peer in &mut self.peers {
            if peer.up && port.answered(peer.id) {
                peer.up = false;
            }
        }
    }

    fn finish_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let fragments = self.port().received_count();
        debug_assert!(
            fragments >= self.registry.config().request_count,
            "session {} finished with {fragments} fragments",
            session.id
        );
        debug_process!(
            "Session {} rebuilt the file with {} requests",
            session.id,
            session.total_requests
        );
        let mut stats = self.registry.stats().borrow_mut();
        stats.add_client_time_waited(now() - session.started_at);
        stats.add_client_requests(session.total_requests);
        stats.add_session_fragments(fragments);
        stats.file_reconstructed();
    }
}

impl ProcessHandle for Client {
    fn resume(&mut self, _fired: &Event) -> Suspend {
        loop {
            match self.state {
                State::Deciding => {
                    let config = self.registry.config();
                    if chance(config.client_sleep_prob) {
                        let nap = random_time(Distributions::Exponential(config.client_stop_mean));
                        debug_process!("Going inactive for {nap}");
                        self.state = State::Sleeping;
                        return Suspend::On(timeout(nap));
                    }
                    self.state = State::Sleeping;
                }
                State::Sleeping => {
                    self.start_session();
                    self.state = State::Awaiting;
                    if let Some(wait) = self.request_round() {
                        return Suspend::On(wait);
                    }
                }
                State::Awaiting => {
                    self.port().renew_completion();
                    self.set_peers_down();

                    let config = self.registry.config();
                    let wanted = config.request_count + config.extra_request_count;
                    let extra = config.extra_request_count;
                    let received = self.port().received_count();
                    if let Some(session) = self.session.as_mut() {
                        session.still_needed = wanted.saturating_sub(received);
                        if session.still_needed > extra {
                            if let Some(wait) = self.request_round() {
                                return Suspend::On(wait);
                            }
                            continue;
                        }
                    }
                    self.finish_session();
                    self.state = State::Deciding;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dsim::SimulationBuilder;

    use super::*;
    use crate::{GaloisConfig, registry::delivered};

    fn packet(keeper: MachineId) -> CodePacket {
        CodePacket {
            owner: 0,
            keeper,
            len: 1024,
        }
    }

    #[test]
    fn completion_fires_at_quorum() {
        let _sim = SimulationBuilder::default().build();
        let port = ClientPort::new(2);
        let completion = port.completion();

        port.receive(vec![packet(1)]);
        assert!(!completion.is_triggered());
        port.receive(vec![packet(2)]);
        assert!(completion.is_triggered());

        // Past the quorum nothing is triggered twice.
        port.receive(vec![packet(3)]);
        assert_eq!(port.received_count(), 3);
        assert!(port.answered(3));
        assert!(!port.answered(4));
    }

    #[test]
    fn renewed_completion_starts_pending() {
        let _sim = SimulationBuilder::default().build();
        let port = ClientPort::new(1);
        port.receive(vec![packet(1)]);
        assert!(port.completion().is_triggered());

        port.renew_completion();
        port.clear_received();
        assert!(!port.completion().is_triggered());
        assert_eq!(port.received_count(), 0);
        assert_eq!(port.received_total(), 1);
    }

    #[test]
    fn timed_out_rounds_continue_around_the_ring() {
        let mut config = GaloisConfig::default()
            .with_machines(5, 2)
            .with_probabilities(0.0, 0.0);
        config.timeout = VirtualTime::from_micros(10.0);
        let mut sim = SimulationBuilder::default().build();
        let registry = Rc::new(Registry::new(config));
        let sent: Rc<RefCell<Vec<(VirtualTime, MachineId)>>> = Rc::default();

        sim.spawn("client-0", Client::new(0, registry.clone()));
        {
            let outbox = registry.client_os(0).outbox();
            let sent = sent.clone();
            let mut started = false;
            sim.spawn("wire", move |fired: &Event| {
                if started {
                    let frame: UdpFrame = delivered(fired);
                    sent.borrow_mut().push((now(), frame.dst));
                }
                started = true;
                Suspend::On(outbox.get())
            });
        }
        {
            // Only machine 1 ever answers.
            let registry = registry.clone();
            let mut answered = false;
            sim.spawn("peer-1", move |_: &Event| {
                if answered {
                    registry.client(0).receive(vec![packet(1)]);
                    return Suspend::Exit;
                }
                answered = true;
                Suspend::On(timeout(VirtualTime::from_micros(50.0)))
            });
        }

        sim.run_until(VirtualTime::from_micros(330.0)).unwrap();

        // Each round waits timeout * 8 per request sent, then asks the next
        // peers in the ring for the one missing fragment. Machine 1 answered
        // and is skipped once the ring wraps.
        let t = VirtualTime::from_micros;
        assert_eq!(
            *sent.borrow(),
            vec![(t(0.0), 1), (t(0.0), 2), (t(160.0), 3), (t(240.0), 4), (t(320.0), 2)]
        );
        assert_eq!(registry.client(0).received_count(), 1);
        assert_eq!(registry.stats().borrow().reconstructed_files(), 0);
    }
}
