use std::{cell::RefCell, rc::Rc};

use dsim::{Seed, Simulation, SimulationBuilder, VirtualTime};
use log::info;

use crate::{
    GaloisConfig, GaloisError, MachineId,
    client::Client,
    client_os::ClientOs,
    packets::CodePacket,
    recorder::{MemoryRecorder, MemorySampler, SharedSampler},
    registry::Registry,
    server::Server,
    server_os::ServerOs,
    stats::{RunSnapshot, RunStats},
    switch::Switch,
};

/// One seeded run of the Galois protocol.
///
/// Every process is spawned on construction; fragments have to be stored
/// before the first call to [`run`](Self::run) or
/// [`run_until`](Self::run_until).
pub struct GaloisSimulation {
    sim: Simulation,
    registry: Rc<Registry>,
    sampler: SharedSampler,
    started: bool,
}

impl GaloisSimulation {
    pub fn new(seed: Seed, config: GaloisConfig) -> Result<Self, GaloisError> {
        config.validate()?;

        let mut sim = SimulationBuilder::default()
            .seed(seed)
            .time_budget(config.max_sim_time)
            .build();
        let registry = Rc::new(Registry::new(config));
        let sampler: SharedSampler = Rc::new(RefCell::new(None));

        sim.spawn("switch", Switch::new(registry.clone()));
        for id in 0..registry.machine_count() {
            sim.spawn(&format!("server-os-{id}"), ServerOs::new(id, registry.clone()));
            sim.spawn(&format!("server-{id}"), Server::new(id, registry.clone()));
            sim.spawn(&format!("client-os-{id}"), ClientOs::new(id, registry.clone()));
            sim.spawn(&format!("client-{id}"), Client::new(id, registry.clone()));
        }
        sim.spawn(
            "memory-recorder",
            MemoryRecorder::new(registry.clone(), sampler.clone()),
        );

        Ok(Self {
            sim,
            registry,
            sampler,
            started: false,
        })
    }

    /// Installs the callback sampling memory usage.
    pub fn with_memory_sampler(self, sampler: impl FnMut(VirtualTime) -> Option<f64> + 'static) -> Self {
        let sampler: MemorySampler = Box::new(sampler);
        *self.sampler.borrow_mut() = Some(sampler);
        self
    }

    /// Gives `keeper` a fragment of `owner`'s file, `len` bytes long.
    pub fn store_code_packet(
        &mut self,
        keeper: MachineId,
        owner: MachineId,
        len: usize,
    ) -> Result<(), GaloisError> {
        if self.started {
            return Err(GaloisError::StoreAfterStart);
        }
        for id in [keeper, owner] {
            if id >= self.registry.machine_count() {
                return Err(GaloisError::UnknownMachine(id));
            }
        }
        if keeper == owner {
            return Err(GaloisError::SelfOwnedCodePacket(keeper));
        }
        if len == 0 {
            return Err(GaloisError::EmptyCodePacket { keeper, owner });
        }
        let packet = CodePacket { owner, keeper, len };
        if !self.registry.server(keeper).store(packet) {
            return Err(GaloisError::DuplicateCodePacket { keeper, owner });
        }
        Ok(())
    }

    /// Gives every machine a fragment of every other machine's file, each
    /// `file_size / request_count` bytes long.
    pub fn store_all_code_packets(&mut self) -> Result<(), GaloisError> {
        let machines = self.registry.machine_count();
        let len = self.registry.config().fragment_len();
        for owner in 0..machines {
            for keeper in (0..machines).filter(|&keeper| keeper != owner) {
                self.store_code_packet(keeper, owner, len)?;
            }
        }
        Ok(())
    }

    /// Runs up to the configured simulation time.
    pub fn run(&mut self) -> Result<(), GaloisError> {
        self.run_until(self.registry.config().max_sim_time)
    }

    pub fn run_until(&mut self, horizon: VirtualTime) -> Result<(), GaloisError> {
        if !self.started {
            info!(
                "Simulating {} machines up to {horizon}",
                self.registry.machine_count()
            );
        }
        self.started = true;
        self.sim.run_until(horizon)?;
        Ok(())
    }

    pub fn now(&self) -> VirtualTime {
        self.sim.now()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn stats(&self) -> RunSnapshot {
        self.registry.stats().borrow().snapshot()
    }

    /// Copy of the run's raw tallies, to be merged into cumulative stats.
    pub fn run_stats(&self) -> RunStats {
        self.registry.stats().borrow().clone()
    }
}
