mod debug;

pub use crate::debug_process;
