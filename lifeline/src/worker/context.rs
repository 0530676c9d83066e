//! The view of its own lifecycle a workload receives.

use super::WorkerId;
use crate::cancellation::{CancellationSignal, PausePolicy};
use std::sync::Arc;
use std::time::Duration;

/// Handed to every workload when its thread starts.
///
/// This is the only channel between a workload and its owner: the workload
/// observes its own signal and may pause itself, but cannot reach the manager.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    id: WorkerId,
    signal: Arc<CancellationSignal>,
    pause_policy: PausePolicy,
}

impl WorkerContext {
    pub(crate) fn new(id: WorkerId, signal: Arc<CancellationSignal>, pause_policy: PausePolicy) -> Self {
        Self {
            id,
            signal,
            pause_policy,
        }
    }

    /// The id of the worker running this workload.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Returns whether the owner has asked this worker to stop.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.signal.is_requested()
    }

    /// The signal shared with the owning handle.
    #[must_use]
    pub fn signal(&self) -> &Arc<CancellationSignal> {
        &self.signal
    }

    /// The policy applied by [`pause`](Self::pause).
    #[must_use]
    pub fn pause_policy(&self) -> PausePolicy {
        self.pause_policy
    }

    /// Suspends this workload for `duration` under the worker's pause policy.
    ///
    /// Returns true if a stop had been requested by the time the pause ended,
    /// so loops can write `if ctx.pause(d) { return; }`.
    pub fn pause(&self, duration: Duration) -> bool {
        self.pause_policy.pause(&self.signal, duration)
    }
}
