//! Cooperative cancellation primitives.
//!
//! This module provides:
//! - CancellationSignal, the set-once flag shared with a workload
//! - PausePolicy, which fixes how long a paused workload may miss a stop request

mod pause;
mod signal;

pub use pause::{PausePolicy, DEFAULT_POLL_INTERVAL};
pub use signal::{CancellationSignal, RequestCallback};
