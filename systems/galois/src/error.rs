use dsim::SimulationError;
use thiserror::Error;

use crate::MachineId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GaloisError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("code packets must be stored before the simulation starts")]
    StoreAfterStart,

    #[error("machine {keeper} already keeps a fragment of machine {owner}")]
    DuplicateCodePacket { keeper: MachineId, owner: MachineId },

    #[error("machine {0} cannot keep a fragment of its own file")]
    SelfOwnedCodePacket(MachineId),

    #[error("unknown machine {0}")]
    UnknownMachine(MachineId),

    #[error("fragment of machine {owner} kept by machine {keeper} is empty")]
    EmptyCodePacket { keeper: MachineId, owner: MachineId },
}
