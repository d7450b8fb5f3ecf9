mod alloc;
mod error;
mod event;
pub mod global;
pub mod helpers;
mod nursery;
mod process;
mod progress;
mod random;
mod simulation;
mod simulation_builder;
mod store;
pub mod time;

pub use error::SimulationError;

pub use event::ConditionValue;
pub use event::Event;
pub use event::EventId;

pub use process::ProcessHandle;
pub use process::ProcessId;
pub use process::Suspend;

pub use simulation::Simulation;
pub use simulation_builder::SimulationBuilder;

pub use store::Store;

pub use global::chance;
pub use global::global_unique_id;
pub use global::now;
pub use global::random_int;
pub use global::random_time;
pub use global::rank;
pub use global::schedule;
pub use global::timeout;

pub use random::Distributions;
pub use random::Seed;

pub use time::VirtualTime;
