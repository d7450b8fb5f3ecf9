//! Discrete-event model of Galois, a peer-to-peer erasure-coded file
//! retrieval protocol.
//!
//! Every machine keeps one fragment of every other machine's file. Clients
//! rebuild their own file by collecting a quorum of fragments from peers
//! through a single shared switch with bounded buffer, latency and
//! bandwidth, while servers randomly go offline.

pub mod client;
pub mod client_os;
mod config;
mod error;
pub mod packets;
mod recorder;
pub mod registry;
pub mod server;
pub mod server_os;
mod simulation;
pub mod stats;
pub mod switch;

pub use config::GaloisConfig;
pub use error::GaloisError;
pub use packets::MachineId;
pub use recorder::MemorySampler;
pub use simulation::GaloisSimulation;
pub use stats::{CumulativeStats, RunSnapshot, RunStats, SharedStats, TotalsSnapshot};
