//! Cancellation signal for cooperative worker shutdown.

use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

/// A callback type for cancellation notifications.
pub type RequestCallback = Box<dyn Fn() + Send + Sync>;

/// A set-once flag shared between a worker handle and its workload.
///
/// Requesting is idempotent: the flag never reverts, only the first reason is
/// kept, and callbacks fire exactly once.
#[derive(Default)]
pub struct CancellationSignal {
    /// Whether a stop has been requested.
    requested: AtomicBool,
    /// The reason for the request (first one wins).
    reason: RwLock<Option<String>>,
    /// Callbacks to invoke on the first request.
    callbacks: RwLock<Vec<RequestCallback>>,
    /// Paired with `wakeup` so timed waits return as soon as the flag is set.
    gate: Mutex<()>,
    wakeup: Condvar,
}

impl CancellationSignal {
    /// Creates a new, unrequested signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation without a reason.
    pub fn request(&self) {
        self.request_with_reason("stop requested");
    }

    /// Requests cancellation with a reason.
    ///
    /// Only the first call has any effect. Callbacks are invoked on the
    /// calling thread; a panicking callback is logged and suppressed.
    pub fn request_with_reason(&self, reason: impl Into<String>) {
        let first = {
            let _gate = self.gate.lock();
            self.requested
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        };
        if !first {
            return;
        }

        *self.reason.write() = Some(reason.into());
        self.wakeup.notify_all();

        let callbacks = std::mem::take(&mut *self.callbacks.write());
        for callback in &callbacks {
            run_callback(callback.as_ref());
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Registers a callback to run when cancellation is first requested.
    ///
    /// If already requested, the callback runs immediately.
    pub fn on_request<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        {
            let mut callbacks = self.callbacks.write();
            if !self.is_requested() {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        run_callback(&callback);
    }

    /// Blocks for up to `timeout`, returning early once cancellation is requested.
    ///
    /// A timeout too large to form a deadline waits until cancellation.
    ///
    /// Returns whether cancellation had been requested when the wait ended.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut gate = self.gate.lock();
        while !self.is_requested() {
            match deadline {
                Some(deadline) => {
                    if self.wakeup.wait_until(&mut gate, deadline).timed_out() {
                        break;
                    }
                }
                None => self.wakeup.wait(&mut gate),
            }
        }
        self.is_requested()
    }
}

fn run_callback(callback: &(dyn Fn() + Send + Sync)) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        warn!("Cancellation callback panicked: {:?}", e);
    }
}

impl std::fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("requested", &self.is_requested())
            .field("reason", &self.reason())
            .finish()
    }
}
