/*!
 * Completion Configuration
 *
 * Worker count, shutdown grace period and thread naming, with presets and
 * environment overrides
 */

use crate::core::errors::ConfigError;
use crate::core::limits::{
    DEFAULT_SHUTDOWN_GRACE, DEFAULT_WORKER_THREADS, DEFAULT_WORKER_THREAD_NAME,
    MAX_WORKER_THREADS,
};
use std::time::Duration;

/// Environment variable for the worker thread count
pub const ENV_WORKER_THREADS: &str = "CQ_WORKER_THREADS";
/// Environment variable for the shutdown grace period in milliseconds
pub const ENV_SHUTDOWN_GRACE_MS: &str = "CQ_SHUTDOWN_GRACE_MS";
/// Environment variable for the worker thread name prefix
pub const ENV_THREAD_NAME: &str = "CQ_THREAD_NAME";

/// Completion queue and worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    /// Number of threads running `CompletionQueue::run`
    pub worker_threads: usize,
    /// How long real completions are still accepted after shutdown
    pub shutdown_grace: Duration,
    /// Prefix for worker thread names (`{prefix}-{index}`)
    pub thread_name: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl CompletionConfig {
    /// Configuration with `threads` workers and default everything else
    pub fn with_workers(threads: usize) -> Self {
        Self {
            worker_threads: threads,
            ..Default::default()
        }
    }

    /// Override the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Load defaults, then apply environment overrides
    ///
    /// Environment variables:
    /// - CQ_WORKER_THREADS: worker count (1..=256)
    /// - CQ_SHUTDOWN_GRACE_MS: grace period in milliseconds
    /// - CQ_THREAD_NAME: worker thread name prefix
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_WORKER_THREADS) {
            config.worker_threads = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: ENV_WORKER_THREADS.to_string(),
                value: raw.clone(),
                reason: format!("{}", e),
            })?;
        }

        if let Ok(raw) = std::env::var(ENV_SHUTDOWN_GRACE_MS) {
            let ms: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: ENV_SHUTDOWN_GRACE_MS.to_string(),
                value: raw.clone(),
                reason: format!("{}", e),
            })?;
            config.shutdown_grace = Duration::from_millis(ms);
        }

        if let Ok(raw) = std::env::var(ENV_THREAD_NAME) {
            config.thread_name = raw;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 || self.worker_threads > MAX_WORKER_THREADS {
            return Err(ConfigError::InvalidValue {
                key: ENV_WORKER_THREADS.to_string(),
                value: self.worker_threads.to_string(),
                reason: format!("must be between 1 and {}", MAX_WORKER_THREADS),
            });
        }
        if self.thread_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: ENV_THREAD_NAME.to_string(),
                value: self.thread_name.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
