//! Machine arena.
//!
//! Every process of a run reaches its peers through the [`Registry`]: the
//! shared switch, and one set of ports per machine indexed by [`MachineId`].
//! Ports only hold the state other processes need to touch (inboxes, flags,
//! the fragment table). The processes themselves live in the simulation's
//! process table.

use std::{cell::RefCell, rc::Rc};

use dsim::Event;

use crate::{
    GaloisConfig, MachineId,
    client::ClientPort,
    client_os::ClientOsPort,
    packets::{FrameKind, RequestPacket, UdpFrame},
    server::ServerPort,
    server_os::ServerOsPort,
    stats::RunStats,
    switch::SwitchPort,
};

/// Accepts fragment requests.
pub trait Requestable {
    fn receive(&self, request: RequestPacket);
}

/// Queues outbound items of type `T` for a sending process.
pub trait Sendable<T> {
    fn send(&self, item: T);
}

/// Accepts frames coming off the wire.
pub trait FrameSink {
    fn receive(&self, frame: UdpFrame);
}

pub(crate) struct MachinePorts {
    pub(crate) client: ClientPort,
    pub(crate) client_os: ClientOsPort,
    pub(crate) server: ServerPort,
    pub(crate) server_os: ServerOsPort,
}

pub struct Registry {
    config: GaloisConfig,
    switch: SwitchPort,
    machines: Vec<MachinePorts>,
    stats: Rc<RefCell<RunStats>>,
}

impl Registry {
    pub(crate) fn new(config: GaloisConfig) -> Self {
        let stats = Rc::new(RefCell::new(RunStats::default()));
        let machines = (0..config.machine_count)
            .map(|_| MachinePorts {
                client: ClientPort::new(config.request_count),
                client_os: ClientOsPort::new(),
                server: ServerPort::new(),
                server_os: ServerOsPort::new(),
            })
            .collect();
        Self {
            switch: SwitchPort::new(config.frame_count, stats.clone()),
            config,
            machines,
            stats,
        }
    }

    pub fn config(&self) -> &GaloisConfig {
        &self.config
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn switch(&self) -> &SwitchPort {
        &self.switch
    }

    pub fn client(&self, id: MachineId) -> &ClientPort {
        &self.machine(id).client
    }

    pub fn client_os(&self, id: MachineId) -> &ClientOsPort {
        &self.machine(id).client_os
    }

    pub fn server(&self, id: MachineId) -> &ServerPort {
        &self.machine(id).server
    }

    pub fn server_os(&self, id: MachineId) -> &ServerOsPort {
        &self.machine(id).server_os
    }

    /// Where the switch delivers `frame`: requests go to the destination's
    /// server side, answers to its client side.
    pub fn destination(&self, frame: &UdpFrame) -> &dyn FrameSink {
        match frame.kind {
            FrameKind::Request => self.server_os(frame.dst),
            FrameKind::Answer => self.client_os(frame.dst),
        }
    }

    pub(crate) fn stats(&self) -> &RefCell<RunStats> {
        &self.stats
    }

    fn machine(&self, id: MachineId) -> &MachinePorts {
        self.machines.get(id).expect("Invalid MachineId")
    }
}

/// Item a store get fired with.
pub(crate) fn delivered<T: Clone + 'static>(event: &Event) -> T {
    event
        .value::<T>()
        .expect("Store delivered an item of another type")
}
