//! Worker handles and their lifecycle state machine.

mod context;
mod handle;
mod state;

pub use context::WorkerContext;
pub use handle::{WorkerHandle, WorkerSnapshot};
pub use state::{WorkerId, WorkerState};
