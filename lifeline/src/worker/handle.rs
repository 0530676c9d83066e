//! A handle owning exactly one worker thread.

use super::{WorkerContext, WorkerId, WorkerState};
use crate::cancellation::{CancellationSignal, PausePolicy};
use crate::errors::{LifecycleError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Point-in-time view of a worker, suitable for logging or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// The worker id.
    pub id: WorkerId,
    /// The thread name, if one was set.
    pub name: Option<String>,
    /// The lifecycle state when the snapshot was taken.
    pub state: WorkerState,
    /// Whether a stop had been requested.
    pub stop_requested: bool,
    /// When the thread was spawned.
    pub spawned_at: Option<DateTime<Utc>>,
}

/// Owns one thread, its cancellation signal, and its lifecycle state.
///
/// Dropping a handle that still owes a join requests a stop and joins the
/// thread first, so no execution outlives its handle unnoticed.
pub struct WorkerHandle {
    id: WorkerId,
    name: Option<String>,
    stack_size: Option<usize>,
    state: WorkerState,
    signal: Arc<CancellationSignal>,
    pause_policy: PausePolicy,
    spawned_at: Option<DateTime<Utc>>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Creates a handle in the Created state with a fresh signal.
    #[must_use]
    pub fn new(pause_policy: PausePolicy) -> Self {
        Self {
            id: WorkerId::new(),
            name: None,
            stack_size: None,
            state: WorkerState::Created,
            signal: Arc::new(CancellationSignal::new()),
            pause_policy,
            spawned_at: None,
            thread: None,
        }
    }

    /// Sets the OS thread name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the OS thread stack size in bytes.
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Returns the worker id.
    #[must_use]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Returns the thread name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the current state without checking the thread.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Returns the signal shared with the workload.
    #[must_use]
    pub fn signal(&self) -> &Arc<CancellationSignal> {
        &self.signal
    }

    /// Returns the pause policy handed to the workload.
    #[must_use]
    pub fn pause_policy(&self) -> PausePolicy {
        self.pause_policy
    }

    /// Returns when the thread was spawned.
    #[must_use]
    pub fn spawned_at(&self) -> Option<DateTime<Utc>> {
        self.spawned_at
    }

    /// True only in Running or Detached.
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.state.is_joinable()
    }

    /// Returns true if the thread has run to completion. Never blocks.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(
            matches!(self.state, WorkerState::Joined | WorkerState::Stopped),
            JoinHandle::is_finished,
        )
    }

    /// Spawns the thread: Created -> Running.
    ///
    /// On a spawn failure the handle stays in Created.
    pub fn start<F>(&mut self, workload: F) -> Result<()>
    where
        F: FnOnce(WorkerContext) + Send + 'static,
    {
        if self.state != WorkerState::Created {
            return Err(LifecycleError::AlreadyStarted {
                id: self.id,
                state: self.state,
            });
        }

        let mut builder = thread::Builder::new();
        if let Some(name) = &self.name {
            // Builder::spawn panics on interior NULs instead of returning an error.
            if name.contains('\0') {
                return Err(LifecycleError::SpawnFailure(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "thread name contains a NUL byte",
                )));
            }
            builder = builder.name(name.clone());
        }
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }

        let ctx = WorkerContext::new(self.id, Arc::clone(&self.signal), self.pause_policy);
        let thread = builder.spawn(move || workload(ctx))?;

        self.thread = Some(thread);
        self.spawned_at = Some(Utc::now());
        self.state = WorkerState::Running;
        debug!(worker_id = %self.id, name = ?self.name, pause = %self.pause_policy, "worker started");
        Ok(())
    }

    /// Asks the workload to stop. Does not change state and never blocks.
    pub fn request_stop(&self) -> Result<()> {
        if !self.state.accepts_stop() {
            return Err(LifecycleError::invalid_state(self.id, "stop", self.state));
        }
        self.signal.request();
        debug!(worker_id = %self.id, state = %self.state, "stop requested");
        Ok(())
    }

    /// Releases the synchronous-join obligation: Running -> Detached.
    ///
    /// The thread handle is kept so the worker can still be rejoined.
    pub fn detach(&mut self) -> Result<()> {
        if self.state != WorkerState::Running {
            return Err(LifecycleError::invalid_state(self.id, "detach", self.state));
        }
        self.state = WorkerState::Detached;
        debug!(worker_id = %self.id, "worker detached");
        Ok(())
    }

    /// Blocks until the thread completes: Running/Stopped/Detached -> Joined.
    ///
    /// A panicking workload still leaves the handle Joined; the panic is
    /// reported as [`LifecycleError::WorkerPanicked`].
    pub fn join(&mut self) -> Result<()> {
        if !self.state.accepts_join() {
            return Err(LifecycleError::invalid_state(self.id, "join", self.state));
        }

        let outcome = self.thread.take().map_or(Ok(()), JoinHandle::join);
        let previous = std::mem::replace(&mut self.state, WorkerState::Joined);
        debug!(worker_id = %self.id, from = %previous, "worker joined");

        outcome.map_err(|payload| LifecycleError::WorkerPanicked {
            id: self.id,
            message: panic_message(payload.as_ref()),
        })
    }

    /// Gives up on a detached worker without joining: Detached -> Abandoned.
    ///
    /// A stop is requested before the thread handle is released.
    pub fn abandon(&mut self) -> Result<()> {
        if self.state != WorkerState::Detached {
            return Err(LifecycleError::invalid_state(self.id, "abandon", self.state));
        }
        self.signal.request_with_reason("abandoned");
        drop(self.thread.take());
        self.state = WorkerState::Abandoned;
        warn!(worker_id = %self.id, "detached worker abandoned without join");
        Ok(())
    }

    /// Moves Running to Stopped if the thread already finished on its own.
    pub fn refresh(&mut self) -> WorkerState {
        if self.state == WorkerState::Running
            && self.thread.as_ref().is_some_and(JoinHandle::is_finished)
        {
            self.state = WorkerState::Stopped;
            debug!(worker_id = %self.id, "worker finished without join");
        }
        self.state
    }

    /// Captures the current state.
    #[must_use]
    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            stop_requested: self.signal.is_requested(),
            spawned_at: self.spawned_at,
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if !self.state.accepts_join() {
            return;
        }
        if self.state.is_joinable() {
            debug!(worker_id = %self.id, state = %self.state, "joining worker on drop");
            self.signal.request_with_reason("handle dropped");
        }
        if let Err(e) = self.join() {
            error!(worker_id = %self.id, error = %e, "worker failed while being joined on drop");
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("stop_requested", &self.signal.is_requested())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    fn loop_until_stopped(ctx: WorkerContext) {
        while !ctx.is_requested() {
            ctx.pause(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_new_handle_is_created() {
        let handle = WorkerHandle::new(PausePolicy::default());
        assert_eq!(handle.state(), WorkerState::Created);
        assert!(!handle.is_joinable());
        assert!(handle.spawned_at().is_none());
    }

    #[test]
    fn test_start_then_join() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let mut handle = WorkerHandle::new(PausePolicy::default()).with_name("test-worker");

        handle
            .start(move |_ctx| {
                assert_eq!(thread::current().name(), Some("test-worker"));
                ran_clone.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(handle.state(), WorkerState::Running);
        assert!(handle.is_joinable());

        handle.join().unwrap();
        assert_eq!(handle.state(), WorkerState::Joined);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_start_twice_fails() {
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle.start(|_| {}).unwrap();

        let err = handle.start(|_| {}).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::AlreadyStarted {
                state: WorkerState::Running,
                ..
            }
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_join_on_created_fails() {
        let mut handle = WorkerHandle::new(PausePolicy::default());
        assert!(handle.join().unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_second_join_fails_without_blocking() {
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle.start(|_| {}).unwrap();
        handle.join().unwrap();

        let start = Instant::now();
        assert!(handle.join().unwrap_err().is_invalid_state());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_request_stop_is_monotonic() {
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle.start(loop_until_stopped).unwrap();

        handle.request_stop().unwrap();
        assert!(handle.signal().is_requested());
        assert_eq!(handle.state(), WorkerState::Running);

        handle.join().unwrap();
        assert!(handle.signal().is_requested());
    }

    #[test]
    fn test_request_stop_on_created_fails() {
        let handle = WorkerHandle::new(PausePolicy::default());
        assert!(handle.request_stop().unwrap_err().is_invalid_state());
        assert!(!handle.signal().is_requested());
    }

    #[test]
    fn test_detach_then_join_once() {
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle.start(loop_until_stopped).unwrap();

        handle.detach().unwrap();
        assert_eq!(handle.state(), WorkerState::Detached);
        assert!(handle.is_joinable());
        assert!(handle.detach().unwrap_err().is_invalid_state());

        handle.request_stop().unwrap();
        handle.join().unwrap();
        assert_eq!(handle.state(), WorkerState::Joined);
        assert!(handle.join().unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_abandon_requires_detached() {
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle.start(loop_until_stopped).unwrap();
        assert!(handle.abandon().unwrap_err().is_invalid_state());

        handle.detach().unwrap();
        handle.abandon().unwrap();
        assert_eq!(handle.state(), WorkerState::Abandoned);
        assert!(handle.signal().is_requested());
        assert!(!handle.is_joinable());
        assert!(handle.join().unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_panicking_workload_reports_and_joins() {
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle.start(|_| panic!("workload exploded")).unwrap();

        match handle.join() {
            Err(LifecycleError::WorkerPanicked { message, .. }) => {
                assert_eq!(message, "workload exploded");
            }
            other => panic!("expected WorkerPanicked, got {other:?}"),
        }
        assert_eq!(handle.state(), WorkerState::Joined);
    }

    #[test]
    fn test_refresh_marks_finished_worker_stopped() {
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle.start(|_| {}).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.refresh() == WorkerState::Running && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(handle.state(), WorkerState::Stopped);
        assert!(!handle.is_joinable());
        assert!(handle.is_finished());

        handle.join().unwrap();
        assert_eq!(handle.state(), WorkerState::Joined);
    }

    #[test]
    fn test_nul_in_name_is_spawn_failure() {
        let mut handle = WorkerHandle::new(PausePolicy::default()).with_name("bad\0name");
        let err = handle.start(|_| {}).unwrap_err();
        assert!(matches!(err, LifecycleError::SpawnFailure(_)));
        assert_eq!(handle.state(), WorkerState::Created);
    }

    #[test]
    fn test_drop_requests_stop_and_joins() {
        let exited = Arc::new(AtomicBool::new(false));
        let exited_clone = exited.clone();
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle
            .start(move |ctx| {
                loop_until_stopped(ctx);
                exited_clone.store(true, Ordering::SeqCst);
            })
            .unwrap();

        drop(handle);
        assert!(exited.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_joins_detached_worker() {
        let exited = Arc::new(AtomicBool::new(false));
        let exited_clone = exited.clone();
        let mut handle = WorkerHandle::new(PausePolicy::default());
        handle
            .start(move |ctx| {
                loop_until_stopped(ctx);
                exited_clone.store(true, Ordering::SeqCst);
            })
            .unwrap();
        handle.detach().unwrap();

        drop(handle);
        assert!(exited.load(Ordering::SeqCst));
    }

    #[test]
    fn test_snapshot() {
        let mut handle = WorkerHandle::new(PausePolicy::default()).with_name("snap");
        handle.start(loop_until_stopped).unwrap();
        handle.request_stop().unwrap();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.id, handle.id());
        assert_eq!(snapshot.name.as_deref(), Some("snap"));
        assert_eq!(snapshot.state, WorkerState::Running);
        assert!(snapshot.stop_requested);
        assert!(snapshot.spawned_at.is_some());
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "<non-string panic payload>");
    }
}
