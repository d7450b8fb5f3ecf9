mod handle;

pub use handle::ProcessHandle;
pub use handle::ProcessId;
pub use handle::Suspend;
