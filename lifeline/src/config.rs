//! Configuration for the lifecycle manager.

use crate::cancellation::PausePolicy;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings applied to every worker a manager spawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Prefix for generated thread names (`{prefix}-{index}`).
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// OS thread stack size in bytes. `None` uses the platform default.
    #[serde(default)]
    pub stack_size: Option<usize>,
    /// Pause policy for workers spawned without one.
    #[serde(default)]
    pub default_pause: PausePolicy,
    /// Whether shutdown logs a per-worker summary.
    #[serde(default = "default_log_teardown")]
    pub log_teardown: bool,
}

fn default_thread_name_prefix() -> String {
    "worker".to_string()
}

fn default_log_teardown() -> bool {
    true
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size: None,
            default_pause: PausePolicy::default(),
            log_teardown: default_log_teardown(),
        }
    }
}

impl ManagerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Sets the stack size.
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Sets the default pause policy.
    #[must_use]
    pub fn with_default_pause(mut self, policy: PausePolicy) -> Self {
        self.default_pause = policy;
        self
    }

    /// Enables or disables the shutdown summary.
    #[must_use]
    pub fn with_log_teardown(mut self, enabled: bool) -> Self {
        self.log_teardown = enabled;
        self
    }

    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
