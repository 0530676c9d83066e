//! Error types for worker lifecycle operations.
//!
//! Every fallible operation on a [`WorkerHandle`](crate::worker::WorkerHandle)
//! or [`LifecycleManager`](crate::manager::LifecycleManager) returns a
//! [`LifecycleError`]. Teardown paths collect per-worker failures into an
//! [`AggregateError`] instead of stopping at the first one.

use crate::worker::{WorkerId, WorkerState};
use std::fmt;
use thiserror::Error;

/// Convenience alias for lifecycle results.
pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;

/// The main error type for lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start` was called on a handle that is no longer in the Created state.
    #[error("worker {id} already started (state: {state})")]
    AlreadyStarted {
        /// The worker that was started twice.
        id: WorkerId,
        /// The state it was in.
        state: WorkerState,
    },

    /// The operation is not valid for the worker's current state.
    #[error("cannot {operation} worker {id} in state {state}")]
    InvalidState {
        /// The worker the operation targeted.
        id: WorkerId,
        /// Name of the rejected operation.
        operation: &'static str,
        /// The state that rejected it.
        state: WorkerState,
    },

    /// No worker with the given identity is owned by the manager.
    #[error("worker {0} not found")]
    NotFound(WorkerId),

    /// The operating system refused to create the thread.
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailure(#[from] std::io::Error),

    /// The workload panicked. The handle is still reconciled to Joined.
    #[error("worker {id} panicked: {message}")]
    WorkerPanicked {
        /// The worker whose workload panicked.
        id: WorkerId,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// The manager has already been shut down and accepts no new workers.
    #[error("lifecycle manager is shut down")]
    ShutDown,

    /// Several errors collected during an exhaustive teardown.
    #[error("{0}")]
    Aggregate(#[from] AggregateError),
}

impl LifecycleError {
    pub(crate) fn invalid_state(id: WorkerId, operation: &'static str, state: WorkerState) -> Self {
        Self::InvalidState {
            id,
            operation,
            state,
        }
    }

    /// Returns true for [`LifecycleError::InvalidState`].
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Returns true for [`LifecycleError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors gathered while visiting every worker during teardown.
///
/// Errors are kept in the order they were encountered, which is spawn order.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<LifecycleError>,
}

impl AggregateError {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    pub fn push(&mut self, error: LifecycleError) {
        self.errors.push(error);
    }

    /// Returns the collected errors in encounter order.
    #[must_use]
    pub fn errors(&self) -> &[LifecycleError] {
        &self.errors
    }

    /// Consumes the aggregate and returns the collected errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<LifecycleError> {
        self.errors
    }

    /// Returns the number of collected errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Ok(())` when empty, otherwise the aggregate as an error.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} worker error(s) during teardown", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            write!(f, "\n  [{i}] {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

impl FromIterator<LifecycleError> for AggregateError {
    fn from_iter<I: IntoIterator<Item = LifecycleError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

/// Errors raised while loading a [`ManagerConfig`](crate::config::ManagerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document is not valid JSON for the expected shape.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
