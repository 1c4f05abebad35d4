//! Bounded-concurrency task executor.
//!
//! This crate provides:
//! - An ordered, bounded-concurrency executor over a fixed input collection
//! - Cooperative cancellation with abort reasons and deadlines
//! - A minimum per-task duration throttle
//! - A progress bus for task lifecycle events
//! - Chunked batch execution

pub mod config;
pub mod error;
pub mod execute;
pub mod progress;

pub use config::{ExecutorConfig, FailurePolicy};
pub use error::{Error, Result, RunAborted};
pub use execute::{AbortHandle, AbortReason, Executor, RunOutput, RunStats, Slot, Throttle};
pub use progress::{EventKind, ProgressBus, TaskEvent};
