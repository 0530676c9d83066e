//! # Lifeline
//!
//! Lifecycle management for a fixed set of worker threads.
//!
//! Lifeline owns worker threads and coordinates how they start, stop and
//! end, with support for:
//!
//! - **Cooperative cancellation**: each worker shares a set-once
//!   [`CancellationSignal`](cancellation::CancellationSignal) with its workload
//! - **Detach and rejoin**: detaching releases the join obligation without
//!   losing the ability to join later
//! - **Pause policies**: a defined cancellation latency for paused workloads
//! - **Join on drop**: handles and managers never drop a running thread
//! - **Exhaustive teardown**: shutdown visits every worker in spawn order and
//!   reports every failure
//!
//! ## Quick Start
//!
//! ```rust
//! use lifeline::prelude::*;
//! use std::time::Duration;
//!
//! let mut manager = LifecycleManager::new();
//!
//! let poller = manager.spawn(
//!     |ctx| {
//!         while !ctx.pause(Duration::from_millis(10)) {
//!             // do a unit of work
//!         }
//!     },
//!     None,
//! )?;
//!
//! manager.request_stop(poller)?;
//! manager.shutdown()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod logging;
pub mod manager;
pub mod worker;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationSignal, PausePolicy};
    pub use crate::config::ManagerConfig;
    pub use crate::errors::{AggregateError, ConfigError, LifecycleError};
    pub use crate::manager::LifecycleManager;
    pub use crate::worker::{
        WorkerContext, WorkerHandle, WorkerId, WorkerSnapshot, WorkerState,
    };
}
