use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
    mem,
    rc::Rc,
};

use dsim::{Distributions, Event, ProcessHandle, Store, Suspend, VirtualTime, chance, debug_process, random_time, timeout};
use log::warn;

use crate::{
    MachineId,
    packets::{AnswerInfo, CodePacket, RequestPacket},
    registry::{Registry, Requestable, Sendable, delivered},
};

pub struct ServerPort {
    requests: Store<RequestPacket>,
    up: Cell<bool>,
    fragments: RefCell<BTreeMap<MachineId, CodePacket>>,
}

impl ServerPort {
    pub fn new() -> Self {
        Self {
            requests: Store::unbounded(),
            up: Cell::new(true),
            fragments: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.up.get()
    }

    /// Fragment of `owner`'s file kept here, if any.
    pub fn fragment(&self, owner: MachineId) -> Option<CodePacket> {
        self.fragments.borrow().get(&owner).copied()
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.borrow().len()
    }

    /// Returns false if a fragment of the same owner is already kept.
    pub(crate) fn store(&self, packet: CodePacket) -> bool {
        let mut fragments = self.fragments.borrow_mut();
        if fragments.contains_key(&packet.owner) {
            return false;
        }
        fragments.insert(packet.owner, packet);
        true
    }
}

impl Default for ServerPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Requestable for ServerPort {
    fn receive(&self, request: RequestPacket) {
        if !self.up.get() {
            debug_process!("Server down, dropping request of session {}", request.session);
            return;
        }
        self.requests.put(request);
    }
}

enum State {
    Start,
    Receiving,
    Gathering(AnswerInfo),
    Offline,
}

/// Serves kept fragments, occasionally going offline.
pub struct Server {
    id: MachineId,
    registry: Rc<Registry>,
    cache: HashMap<MachineId, CodePacket>,
    state: State,
}

impl Server {
    pub fn new(id: MachineId, registry: Rc<Registry>) -> Self {
        Self {
            id,
            registry,
            cache: HashMap::new(),
            state: State::Start,
        }
    }

    fn port(&self) -> &ServerPort {
        self.registry.server(self.id)
    }

    // Looks the fragment up and returns the access delay.
    fn gather(&mut self, request: RequestPacket) -> Option<VirtualTime> {
        let config = self.registry.config();
        let (packet, delay) = match self.cache.get(&request.requester) {
            Some(packet) => {
                debug_process!("Fragment of {} found in cache", request.requester);
                (*packet, config.cache_access_time)
            }
            None => {
                let Some(packet) = self.port().fragment(request.requester) else {
                    warn!(
                        "Machine {} keeps no fragment of machine {}, dropping request",
                        self.id, request.requester
                    );
                    return None;
                };
                self.cache.insert(request.requester, packet);
                let delay = random_time(Distributions::Uniform(
                    VirtualTime::ZERO,
                    config.max_access_time,
                ));
                debug_process!("Fragment of {} read from disk in {delay}", request.requester);
                (packet, delay)
            }
        };
        self.state = State::Gathering(AnswerInfo {
            packet,
            session: request.session,
        });
        Some(delay)
    }
}

impl ProcessHandle for Server {
    fn resume(&mut self, fired: &Event) -> Suspend {
        match mem::replace(&mut self.state, State::Receiving) {
            State::Start => {}
            State::Receiving => {
                if let Some(delay) = self.gather(delivered(fired)) {
                    return Suspend::On(timeout(delay));
                }
            }
            State::Gathering(answer) => {
                self.registry.server_os(self.id).send(answer);

                let config = self.registry.config();
                if chance(config.server_down_prob) {
                    let downtime = random_time(Distributions::Exponential(config.server_stop_mean));
                    debug_process!("Going offline for {downtime}");
                    self.port().up.set(false);
                    self.state = State::Offline;
                    return Suspend::On(timeout(downtime));
                }
            }
            State::Offline => {
                debug_process!("Back online");
                self.cache.clear();
                self.port().up.set(true);
            }
        }
        Suspend::On(self.port().requests.get())
    }
}
