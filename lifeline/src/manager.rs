//! Lifecycle manager owning a spawn-ordered set of workers.

use crate::cancellation::{CancellationSignal, PausePolicy};
use crate::config::ManagerConfig;
use crate::errors::{AggregateError, LifecycleError, Result};
use crate::worker::{WorkerContext, WorkerHandle, WorkerId, WorkerSnapshot, WorkerState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Owns a fixed, caller-declared set of workers and reconciles them on teardown.
///
/// Workers are kept in spawn order, and every traversal (`stop_all`,
/// `join_all`, `shutdown`) follows that order so teardown is deterministic.
/// Dropping the manager without calling [`shutdown`](Self::shutdown) runs it
/// implicitly; no worker thread outlives the manager unjoined unless it was
/// explicitly abandoned.
pub struct LifecycleManager {
    config: ManagerConfig,
    workers: Vec<WorkerHandle>,
    spawned: usize,
    shut_down: bool,
}

impl LifecycleManager {
    /// Creates a manager with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Creates a manager with the given configuration.
    #[must_use]
    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            config,
            workers: Vec::new(),
            spawned: 0,
            shut_down: false,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Spawns a worker named `{thread_name_prefix}-{index}`.
    ///
    /// `pause_policy` falls back to the configured default. On failure the
    /// set of owned workers is left unchanged.
    pub fn spawn<F>(&mut self, workload: F, pause_policy: Option<PausePolicy>) -> Result<WorkerId>
    where
        F: FnOnce(WorkerContext) + Send + 'static,
    {
        let name = format!("{}-{}", self.config.thread_name_prefix, self.spawned);
        self.spawn_named(name, workload, pause_policy)
    }

    /// Spawns a worker with an explicit thread name.
    pub fn spawn_named<F>(
        &mut self,
        name: impl Into<String>,
        workload: F,
        pause_policy: Option<PausePolicy>,
    ) -> Result<WorkerId>
    where
        F: FnOnce(WorkerContext) + Send + 'static,
    {
        if self.shut_down {
            return Err(LifecycleError::ShutDown);
        }

        let mut handle =
            WorkerHandle::new(pause_policy.unwrap_or(self.config.default_pause)).with_name(name);
        if let Some(bytes) = self.config.stack_size {
            handle = handle.with_stack_size(bytes);
        }

        if let Err(e) = handle.start(workload) {
            warn!(error = %e, "failed to spawn worker");
            return Err(e);
        }

        let id = handle.id();
        self.workers.push(handle);
        self.spawned += 1;
        Ok(id)
    }

    /// Asks one worker to stop. Never blocks.
    pub fn request_stop(&self, id: WorkerId) -> Result<()> {
        self.find(id)?.request_stop()
    }

    /// Detaches one worker; it stays tracked for a later [`rejoin`](Self::rejoin).
    pub fn detach(&mut self, id: WorkerId) -> Result<()> {
        self.find_mut(id)?.detach()
    }

    /// Blocks until one worker completes.
    pub fn join(&mut self, id: WorkerId) -> Result<()> {
        self.find_mut(id)?.join()
    }

    /// Reconciles a detached worker by joining it.
    pub fn rejoin(&mut self, id: WorkerId) -> Result<()> {
        let worker = self.find_mut(id)?;
        debug!(worker_id = %id, state = %worker.state(), "rejoining worker");
        worker.join()
    }

    /// Requests a stop on a detached worker and stops tracking its thread.
    pub fn abandon(&mut self, id: WorkerId) -> Result<()> {
        self.find_mut(id)?.abandon()
    }

    /// Requests a stop on every joinable worker in spawn order.
    ///
    /// Returns how many workers were signalled.
    pub fn stop_all(&self) -> usize {
        let mut signalled = 0;
        for worker in self.workers.iter().filter(|w| w.is_joinable()) {
            match worker.request_stop() {
                Ok(()) => signalled += 1,
                Err(e) => warn!(worker_id = %worker.id(), error = %e, "stop request rejected"),
            }
        }
        signalled
    }

    /// Joins every outstanding worker in spawn order.
    ///
    /// Workers that already finished on their own are reaped as well. Every
    /// failure is collected; one failing worker never hides the others.
    pub fn join_all(&mut self) -> Result<(), AggregateError> {
        let mut errors = AggregateError::new();
        for worker in &mut self.workers {
            if !worker.state().accepts_join() {
                continue;
            }
            let started = Instant::now();
            let result = worker.join();
            debug!(
                worker_id = %worker.id(),
                waited_ms = started.elapsed().as_millis() as u64,
                ok = result.is_ok(),
                "join_all visited worker"
            );
            if let Err(e) = result {
                errors.push(e);
            }
        }
        errors.into_result()
    }

    /// Stops and joins every worker, then refuses further spawns.
    ///
    /// Calling it again has no further effect.
    pub fn shutdown(&mut self) -> Result<(), AggregateError> {
        let started = Instant::now();
        let repeated = self.shut_down;
        let signalled = self.stop_all();
        let result = self.join_all();
        self.shut_down = true;

        if self.config.log_teardown && !repeated {
            let mut by_state: HashMap<WorkerState, usize> = HashMap::new();
            for worker in &self.workers {
                *by_state.entry(worker.state()).or_default() += 1;
            }
            info!(
                workers = self.workers.len(),
                signalled,
                joined = by_state.get(&WorkerState::Joined).copied().unwrap_or(0),
                abandoned = by_state.get(&WorkerState::Abandoned).copied().unwrap_or(0),
                errors = result.as_ref().err().map_or(0, AggregateError::len),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "lifecycle manager shut down"
            );
        }
        result
    }

    /// Runs [`shutdown`](Self::shutdown) on tokio's blocking pool.
    #[cfg(feature = "async")]
    pub async fn shutdown_async(self) -> Result<(), AggregateError> {
        let task = tokio::task::spawn_blocking(move || {
            let mut manager = self;
            manager.shutdown()
        });
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                // The closure was dropped unrun, so the manager's Drop already reconciled its workers.
                error!(error = %e, "shutdown task did not run");
                Ok(())
            }
        }
    }

    /// Returns true once [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Returns a worker's state, first noticing whether it finished on its own.
    pub fn state(&mut self, id: WorkerId) -> Result<WorkerState> {
        Ok(self.find_mut(id)?.refresh())
    }

    /// Returns whether a worker is Running or Detached.
    ///
    /// A finished worker reads as not joinable once [`state`](Self::state)
    /// has noticed it, yet [`join`](Self::join) still reaps it.
    pub fn is_joinable(&self, id: WorkerId) -> Result<bool> {
        Ok(self.find(id)?.is_joinable())
    }

    /// Returns a worker's cancellation signal.
    pub fn signal(&self, id: WorkerId) -> Result<Arc<CancellationSignal>> {
        Ok(Arc::clone(self.find(id)?.signal()))
    }

    /// Returns worker ids in spawn order.
    #[must_use]
    pub fn ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(WorkerHandle::id).collect()
    }

    /// Captures every worker in spawn order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.workers.iter().map(WorkerHandle::snapshot).collect()
    }

    /// Returns the number of owned workers, terminal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns true if no worker was ever spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    fn find(&self, id: WorkerId) -> Result<&WorkerHandle> {
        self.workers
            .iter()
            .find(|w| w.id() == id)
            .ok_or(LifecycleError::NotFound(id))
    }

    fn find_mut(&mut self, id: WorkerId) -> Result<&mut WorkerHandle> {
        self.workers
            .iter_mut()
            .find(|w| w.id() == id)
            .ok_or(LifecycleError::NotFound(id))
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        if let Err(e) = self.shutdown() {
            error!(errors = e.len(), "implicit shutdown reported failures: {}", e);
        }
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("workers", &self.workers)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}
