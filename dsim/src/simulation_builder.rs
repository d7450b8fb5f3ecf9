use crate::{Simulation, random::Seed, time::VirtualTime};

fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let module_path = record.module_path().unwrap_or("unknown");
            let crate_name = module_path.split("::").next().unwrap_or(module_path);
            use std::io::Write;
            writeln!(buf, "[{}] {}", crate_name, record.args())
        })
        .try_init();
}

pub struct SimulationBuilder {
    seed: Seed,
    time_budget: VirtualTime,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        SimulationBuilder {
            seed: 69,
            time_budget: VirtualTime::from_secs(1.0),
        }
    }
}

impl SimulationBuilder {
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    pub fn time_budget(mut self, time_budget: VirtualTime) -> Self {
        self.time_budget = time_budget;
        self
    }

    pub fn build(self) -> Simulation {
        init_logger();
        Simulation::new(self.seed, self.time_budget)
    }
}
