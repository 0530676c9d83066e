//! Worker identity and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of a worker.
///
/// Backed by a time-ordered UUID so ids sort roughly by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(Uuid);

impl WorkerId {
    /// Generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for WorkerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Lifecycle state of a worker handle.
///
/// ```text
/// Created -> Running -> { Stopped, Detached, Joined }
/// Stopped -> Joined
/// Detached -> { Joined, Abandoned }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Handle exists but no thread has been spawned.
    Created,
    /// Thread is executing and owes a join.
    Running,
    /// Thread has finished on its own and has not been reaped yet.
    Stopped,
    /// Thread runs independently; a later rejoin is still possible.
    Detached,
    /// Thread has been joined.
    Joined,
    /// Detached thread released without a join, after a stop request.
    Abandoned,
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::Created
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Detached => write!(f, "detached"),
            Self::Joined => write!(f, "joined"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl WorkerState {
    /// Returns true if no further transition can occur.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Joined | Self::Abandoned)
    }

    /// Returns true while a thread is outstanding and owes a join.
    ///
    /// `Stopped` is not joinable because its thread already exited, but
    /// `join` still accepts it to reap the result (see [`accepts_join`](Self::accepts_join)).
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Running | Self::Detached)
    }

    /// Returns true if a stop request is still meaningful.
    #[must_use]
    pub fn accepts_stop(&self) -> bool {
        matches!(self, Self::Running | Self::Detached | Self::Stopped)
    }

    /// Returns true if `join` is allowed.
    #[must_use]
    pub fn accepts_join(&self) -> bool {
        matches!(self, Self::Running | Self::Detached | Self::Stopped)
    }
}
