//! Executor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::execute::Throttle;

/// Default number of concurrently running operations.
pub const DEFAULT_PARALLEL_LIMIT: usize = 3;

pub const ENV_PARALLEL_LIMIT: &str = "TANDEM_PARALLEL_LIMIT";
pub const ENV_MIN_DURATION_MS: &str = "TANDEM_MIN_DURATION_MS";
pub const ENV_TIMEOUT_MS: &str = "TANDEM_TIMEOUT_MS";
pub const ENV_CHUNK_SIZE: &str = "TANDEM_CHUNK_SIZE";
pub const ENV_FAIL_FAST: &str = "TANDEM_FAIL_FAST";

/// What a run does when an operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure in its slot and keep going.
    #[default]
    Continue,
    /// Record the failure, then abort the run.
    Abort,
}

/// Configuration for an [`Executor`](crate::Executor).
///
/// Missing fields deserialize to their defaults. Deserialized values are
/// checked by [`ExecutorConfig::validate`] when the executor is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of operations in flight at once (at least 1).
    pub parallel_limit: usize,

    /// Minimum span of each successful task. Zero disables the throttle.
    pub min_duration: Duration,

    /// Behavior when an operation fails.
    pub failure_policy: FailurePolicy,

    /// Abort the run once this much time has passed.
    pub timeout: Option<Duration>,

    /// Process the input in consecutive chunks of this size, each chunk
    /// fully concurrent. `None` uses a worker pool of `parallel_limit`.
    pub chunk_size: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallel_limit: DEFAULT_PARALLEL_LIMIT,
            min_duration: Duration::ZERO,
            failure_policy: FailurePolicy::Continue,
            timeout: None,
            chunk_size: None,
        }
    }
}

impl ExecutorConfig {
    /// One item at a time, in input order.
    pub fn sequential() -> Self {
        Self {
            parallel_limit: 1,
            ..Self::default()
        }
    }

    /// Consecutive chunks of `size` items, each chunk run concurrently.
    pub fn chunked(size: usize) -> Self {
        Self {
            chunk_size: Some(size),
            ..Self::default()
        }
    }

    /// Defaults overridden by `TANDEM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env(|var| std::env::var(var).ok())
    }

    /// Override fields from a variable lookup (used by [`from_env`](Self::from_env)).
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(limit) = parse_var::<usize>(&lookup, ENV_PARALLEL_LIMIT)? {
            self.parallel_limit = limit;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_MIN_DURATION_MS)? {
            self.min_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_TIMEOUT_MS)? {
            self.timeout = Some(Duration::from_millis(ms));
        }
        if let Some(size) = parse_var::<usize>(&lookup, ENV_CHUNK_SIZE)? {
            self.chunk_size = Some(size);
        }
        if let Some(fail_fast) = parse_var::<bool>(&lookup, ENV_FAIL_FAST)? {
            self.failure_policy = if fail_fast {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            };
        }
        Ok(self)
    }

    pub fn with_parallel_limit(mut self, limit: usize) -> Self {
        self.parallel_limit = limit;
        self
    }

    pub fn with_min_duration(mut self, min_duration: Duration) -> Self {
        self.min_duration = min_duration;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Check the configuration before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.parallel_limit == 0 {
            return Err(Error::InvalidConfig(
                "parallel_limit must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == Some(0) {
            return Err(Error::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Worker count for a pool over `len` items.
    pub fn worker_count(&self, len: usize) -> usize {
        self.parallel_limit.min(len)
    }

    /// Throttle derived from `min_duration`.
    pub fn throttle(&self) -> Throttle {
        Throttle::new(self.min_duration)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| Error::Env {
                var,
                message: format!("{raw:?}: {e}"),
            }),
    }
}
