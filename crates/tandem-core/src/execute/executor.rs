//! Bounded-concurrency executor.
//!
//! A fixed pool of workers pulls indices from a shared cursor, runs the
//! operation for each claimed item, and records the outcome in that item's
//! slot. The run finishes when every worker has exited its loop; there is
//! no completion polling.

use std::fmt;
use std::future::Future;
use std::ops::Range;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::abort::{AbortHandle, AbortReason, RunSignal};
use super::output::{RunOutput, RunStats, Slot};
use super::throttle::Throttle;
use crate::config::{ExecutorConfig, FailurePolicy};
use crate::error::{Result, RunAborted};
use crate::progress::{ProgressBus, TaskEvent};

/// Runs an operation over an ordered collection with bounded concurrency.
///
/// # Example
///
/// ```
/// use tandem_core::{Executor, ExecutorConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = Executor::new(ExecutorConfig::default().with_parallel_limit(2)).unwrap();
/// let output = executor
///     .run(&[1, 2, 3], |&n, _index, _items| async move { Ok::<_, String>(n * 2) })
///     .await
///     .unwrap();
///
/// assert_eq!(output.into_values(), vec![Some(2), Some(4), Some(6)]);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutorConfig,
    abort: Option<AbortHandle>,
    progress: Option<ProgressBus>,
}

impl Executor {
    /// Create an executor, rejecting invalid configuration up front.
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            abort: None,
            progress: None,
        })
    }

    /// Observe `handle` for cancellation.
    pub fn with_abort_handle(mut self, handle: AbortHandle) -> Self {
        self.abort = Some(handle);
        self
    }

    /// Publish lifecycle events to `bus`.
    pub fn with_progress(mut self, bus: ProgressBus) -> Self {
        self.progress = Some(bus);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `operation` over every item.
    ///
    /// The operation receives the item, its index, and the whole input.
    /// Slot `i` of the output always belongs to `items[i]`. Failed
    /// operations leave a [`Slot::Failed`]; whether they also stop the run
    /// is decided by [`FailurePolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`RunAborted`] if the abort handle (or the configured
    /// timeout, or a failure under [`FailurePolicy::Abort`]) stopped the run.
    /// The partial output holds exactly the outcomes that settled before the
    /// abort. Operations still in flight are awaited, but their results are
    /// dropped and their slots stay [`Slot::NotAttempted`]; they are counted
    /// in [`RunStats::discarded`].
    pub async fn run<T, U, E, F, Fut>(
        &self,
        items: &[T],
        operation: F,
    ) -> std::result::Result<RunOutput<U, E>, RunAborted<U, E>>
    where
        F: Fn(&T, usize, &[T]) -> Fut,
        Fut: Future<Output = std::result::Result<U, E>>,
        E: fmt::Display,
    {
        let started = Instant::now();
        let signal = RunSignal::new(self.abort.clone());
        let ctx = RunContext {
            items,
            operation: &operation,
            signal: &signal,
            throttle: self.config.throttle(),
            failure_policy: self.config.failure_policy,
            progress: self.progress.as_ref(),
            pool: Mutex::new(Pool::default()),
            abort_announced: AtomicBool::new(false),
        };

        debug!(
            items = items.len(),
            parallel_limit = self.config.parallel_limit,
            chunk_size = ?self.config.chunk_size,
            "Starting run"
        );

        let work = pin!(self.schedule(&ctx));
        let records = match self.config.timeout {
            Some(timeout) => {
                let mut work = work;
                tokio::select! {
                    biased;
                    records = &mut work => records,
                    _ = tokio::time::sleep(timeout) => {
                        signal.abort_with(AbortReason::Timeout);
                        work.await
                    }
                }
            }
            None => work.await,
        };

        let mut slots: Vec<Slot<U, E>> = (0..items.len()).map(|_| Slot::NotAttempted).collect();
        let (claimed, peak_concurrency) = {
            let pool = ctx.pool();
            (pool.claimed, pool.peak)
        };
        for (index, slot) in records {
            debug_assert!(!slots[index].is_attempted(), "index {index} claimed twice");
            slots[index] = slot;
        }

        let completed = slots.iter().filter(|s| s.is_completed()).count();
        let failed = slots.iter().filter(|s| s.is_failed()).count();
        let stats = RunStats {
            claimed,
            completed,
            failed,
            discarded: claimed - completed - failed,
            peak_concurrency,
            elapsed: started.elapsed(),
        };
        let output = RunOutput::new(slots, stats);

        match signal.reason() {
            Some(reason) => {
                ctx.announce_abort().await;
                debug!(%reason, claimed, completed = stats.completed, "Run aborted");
                Err(RunAborted {
                    reason,
                    partial: output,
                })
            }
            None => {
                debug!(
                    completed = stats.completed,
                    failed = stats.failed,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "Run finished"
                );
                Ok(output)
            }
        }
    }

    /// Drive the pool (or the chunk sequence) to completion.
    async fn schedule<T, U, E, F, Fut>(
        &self,
        ctx: &RunContext<'_, T, F>,
    ) -> Vec<(usize, Slot<U, E>)>
    where
        F: Fn(&T, usize, &[T]) -> Fut,
        Fut: Future<Output = std::result::Result<U, E>>,
        E: fmt::Display,
    {
        let len = ctx.items.len();
        match self.config.chunk_size {
            None => ctx.drive(0..len, self.config.worker_count(len)).await,
            Some(size) => {
                let mut records = Vec::with_capacity(len);
                for start in (0..len).step_by(size) {
                    if ctx.signal.is_aborted() {
                        ctx.announce_abort().await;
                        break;
                    }
                    let end = (start + size).min(len);
                    trace!(start, end, "Starting chunk");
                    records.extend(ctx.drive(start..end, end - start).await);
                }
                records
            }
        }
    }
}

/// Cursor and active count, updated together under one lock.
#[derive(Debug, Default)]
struct Pool {
    next: usize,
    end: usize,
    active: usize,
    peak: usize,
    /// Claims across every chunk of the run.
    claimed: usize,
}

/// State shared by the workers of one run.
struct RunContext<'a, T, F> {
    items: &'a [T],
    operation: &'a F,
    signal: &'a RunSignal,
    throttle: Throttle,
    failure_policy: FailurePolicy,
    progress: Option<&'a ProgressBus>,
    pool: Mutex<Pool>,
    abort_announced: AtomicBool,
}

impl<T, F> RunContext<'_, T, F> {
    fn pool(&self) -> std::sync::MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the next index and count the claimer as active.
    fn claim(&self) -> Option<usize> {
        let mut pool = self.pool();
        if pool.next >= pool.end {
            return None;
        }
        let index = pool.next;
        pool.next += 1;
        pool.claimed += 1;
        pool.active += 1;
        pool.peak = pool.peak.max(pool.active);
        Some(index)
    }

    fn release(&self) {
        let mut pool = self.pool();
        pool.active -= 1;
    }

    async fn publish(&self, event: TaskEvent) {
        if let Some(bus) = self.progress {
            bus.publish(event).await;
        }
    }

    /// Publish the `Aborted` event, once per run.
    async fn announce_abort(&self) {
        if self.abort_announced.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(reason) = self.signal.reason() {
            warn!(%reason, "Run aborted");
            self.publish(TaskEvent::Aborted { reason }).await;
        }
    }

    /// Run `workers` workers over `range` and collect their slots.
    async fn drive<U, E, Fut>(&self, range: Range<usize>, workers: usize) -> Vec<(usize, Slot<U, E>)>
    where
        F: Fn(&T, usize, &[T]) -> Fut,
        Fut: Future<Output = std::result::Result<U, E>>,
        E: fmt::Display,
    {
        {
            let mut pool = self.pool();
            pool.next = range.start;
            pool.end = range.end;
        }
        join_all((0..workers).map(|worker| self.worker(worker)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn worker<U, E, Fut>(&self, worker: usize) -> Vec<(usize, Slot<U, E>)>
    where
        F: Fn(&T, usize, &[T]) -> Fut,
        Fut: Future<Output = std::result::Result<U, E>>,
        E: fmt::Display,
    {
        let mut records = Vec::new();
        loop {
            if self.signal.is_aborted() {
                self.announce_abort().await;
                break;
            }
            let Some(index) = self.claim() else {
                break;
            };
            trace!(worker, index, "Claimed task");
            self.publish(TaskEvent::Started { index }).await;

            let task_started = Instant::now();
            let outcome = (self.operation)(&self.items[index], index, self.items).await;
            if self.signal.is_aborted() {
                // Settled after the abort: not part of the partial output.
                debug!(worker, index, "Dropping result settled after abort");
                self.release();
                self.announce_abort().await;
                break;
            }
            match outcome {
                Ok(value) => {
                    records.push((index, Slot::Completed(value)));
                    let wait = self.throttle.remaining(task_started, Instant::now());
                    if !wait.is_zero() {
                        trace!(worker, index, wait_ms = wait.as_millis() as u64, "Throttling");
                        tokio::select! {
                            _ = tokio::time::sleep(wait) => {}
                            _ = self.signal.aborted() => {}
                        }
                    }
                    let duration_ms =
                        u64::try_from(task_started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    self.publish(TaskEvent::Completed { index, duration_ms }).await;
                }
                Err(error) => {
                    warn!(worker, index, %error, "Task failed");
                    let message = error.to_string();
                    records.push((index, Slot::Failed(error)));
                    self.publish(TaskEvent::Failed {
                        index,
                        error: message,
                    })
                    .await;
                    if self.failure_policy == FailurePolicy::Abort {
                        self.signal.abort_with(AbortReason::TaskFailed { index });
                    }
                }
            }
            self.release();
        }
        records
    }
}
