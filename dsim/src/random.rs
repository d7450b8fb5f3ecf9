use rand::{Rng, SeedableRng, distr::Uniform};
use rand_distr::{Bernoulli, Exp};

use crate::VirtualTime;

pub type Seed = u64;

#[derive(Copy, Clone, Debug)]
pub enum Distributions {
    /// Uniform over `[from, to]`.
    Uniform(VirtualTime, VirtualTime),
    /// Exponential with the given mean.
    Exponential(VirtualTime),
}

pub struct Randomizer {
    rnd: rand::rngs::StdRng,
}

impl Randomizer {
    pub fn new(seed: Seed) -> Self {
        Self {
            rnd: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    pub fn random_time(&mut self, d: Distributions) -> VirtualTime {
        match d {
            Distributions::Uniform(VirtualTime(from), VirtualTime(to)) => {
                if from == to {
                    return VirtualTime(from);
                }
                let distr = Uniform::new_inclusive(from, to).expect("Invalid bounds");
                VirtualTime(self.rnd.sample(distr))
            }
            Distributions::Exponential(VirtualTime(mean)) => {
                if mean <= 0.0 {
                    return VirtualTime::ZERO;
                }
                let distr = Exp::new(1.0 / mean).expect("Invalid mean");
                VirtualTime(self.rnd.sample(distr))
            }
        }
    }

    pub fn chance(&mut self, p: f64) -> bool {
        let distr = Bernoulli::new(p).expect("Invalid probability");
        self.rnd.sample(distr)
    }

    pub fn random_int(&mut self, low: u32, high: u32) -> u32 {
        self.rnd.random_range(low..=high)
    }
}
