//! Cooperative cancellation for executor runs.

use std::fmt;
use std::pin::pin;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Why a run was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// Someone called [`AbortHandle::abort`].
    Requested,
    /// A deadline elapsed.
    Timeout,
    /// An operation failed while the executor ran with `FailurePolicy::Abort`.
    TaskFailed {
        /// Index of the item whose operation failed.
        index: usize,
    },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "abort requested"),
            Self::Timeout => write!(f, "deadline elapsed"),
            Self::TaskFailed { index } => write!(f, "task {index} failed"),
        }
    }
}

/// Handle for cooperative cancellation of a run.
///
/// `AbortHandle` can be cloned and shared across tasks; any clone can
/// trigger the abort, which is then visible to all other clones. The
/// transition happens once: the first reason wins and later calls are
/// no-ops.
///
/// # Example
///
/// ```
/// use tandem_core::execute::{AbortHandle, AbortReason};
///
/// let handle = AbortHandle::new();
/// let handle_clone = handle.clone();
///
/// assert!(!handle.is_aborted());
///
/// assert!(handle_clone.abort());
/// assert!(!handle_clone.abort());
///
/// assert!(handle.is_aborted());
/// assert_eq!(handle.reason(), Some(AbortReason::Requested));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortState>,
}

#[derive(Debug, Default)]
struct AbortState {
    reason: OnceLock<AbortReason>,
    notify: Notify,
}

impl AbortHandle {
    /// Create a new abort handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if abort has been requested.
    pub fn is_aborted(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    /// The reason recorded by the first abort, if any.
    pub fn reason(&self) -> Option<AbortReason> {
        self.inner.reason.get().copied()
    }

    /// Request abort of execution.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn abort(&self) -> bool {
        self.abort_with(AbortReason::Requested)
    }

    /// Request abort with an explicit reason.
    ///
    /// The new state is visible to every clone before this returns, and all
    /// tasks waiting in [`aborted`](Self::aborted) are woken.
    pub fn abort_with(&self, reason: AbortReason) -> bool {
        let first = self.inner.reason.set(reason).is_ok();
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Wait until the handle is aborted.
    ///
    /// Resolves immediately if the abort already happened.
    pub async fn aborted(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            notified.as_mut().enable();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }

    /// Abort with [`AbortReason::Timeout`] once `deadline` has elapsed.
    ///
    /// The spawned timer exits early if the handle is aborted for another
    /// reason first. Must be called from within a tokio runtime.
    pub fn abort_after(&self, deadline: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    handle.abort_with(AbortReason::Timeout);
                }
                _ = handle.aborted() => {}
            }
        })
    }
}

/// Abort state seen by one run.
///
/// Combines the caller's handle with a run-local one so that strict-mode
/// failures and run timeouts never leave the caller's handle aborted.
#[derive(Debug, Clone)]
pub(crate) struct RunSignal {
    external: Option<AbortHandle>,
    local: AbortHandle,
}

impl RunSignal {
    pub(crate) fn new(external: Option<AbortHandle>) -> Self {
        Self {
            external,
            local: AbortHandle::new(),
        }
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.local.is_aborted() || self.external.as_ref().is_some_and(AbortHandle::is_aborted)
    }

    /// The reason of whichever source fired first.
    ///
    /// A caller abort seen here is latched into the local handle, so later
    /// run-local aborts cannot replace it.
    pub(crate) fn reason(&self) -> Option<AbortReason> {
        if let Some(reason) = self.local.reason() {
            return Some(reason);
        }
        let reason = self.external.as_ref().and_then(AbortHandle::reason)?;
        self.local.abort_with(reason);
        self.local.reason()
    }

    /// Abort the run unless it is already aborted from either source.
    pub(crate) fn abort_with(&self, reason: AbortReason) -> bool {
        if self.reason().is_some() {
            return false;
        }
        self.local.abort_with(reason)
    }

    pub(crate) async fn aborted(&self) {
        match &self.external {
            Some(external) => {
                tokio::select! {
                    _ = self.local.aborted() => {}
                    _ = external.aborted() => {}
                }
            }
            None => self.local.aborted().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_handle_creation() {
        let handle = AbortHandle::new();
        assert!(!handle.is_aborted());
        assert_eq!(handle.reason(), None);
    }

    #[test]
    fn test_abort_handle_clone_shares_state() {
        let handle = AbortHandle::new();
        let clone = handle.clone();

        clone.abort();

        assert!(handle.is_aborted());
        assert!(clone.is_aborted());
    }

    #[test]
    fn test_abort_is_idempotent() {
        let handle = AbortHandle::new();

        assert!(handle.abort_with(AbortReason::Timeout));
        assert!(!handle.abort());
        assert!(!handle.abort_with(AbortReason::TaskFailed { index: 3 }));

        // First reason wins
        assert_eq!(handle.reason(), Some(AbortReason::Timeout));
    }

    #[test]
    fn test_abort_reason_display() {
        assert_eq!(AbortReason::Requested.to_string(), "abort requested");
        assert_eq!(AbortReason::TaskFailed { index: 2 }.to_string(), "task 2 failed");
    }

    #[tokio::test]
    async fn test_aborted_resolves_when_already_aborted() {
        let handle = AbortHandle::new();
        handle.abort();
        handle.aborted().await;
    }

    #[tokio::test]
    async fn test_aborted_wakes_waiter() {
        let handle = AbortHandle::new();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.aborted().await })
        };

        tokio::task::yield_now().await;
        handle.abort();

        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_after_signals_timeout() {
        let handle = AbortHandle::new();
        let timer = handle.abort_after(Duration::from_millis(250));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_aborted());

        timer.await.unwrap();
        assert_eq!(handle.reason(), Some(AbortReason::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_after_keeps_earlier_reason() {
        let handle = AbortHandle::new();
        let timer = handle.abort_after(Duration::from_secs(5));

        handle.abort();
        timer.await.unwrap();

        assert_eq!(handle.reason(), Some(AbortReason::Requested));
    }

    #[test]
    fn test_run_signal_local_abort_leaves_external_untouched() {
        let external = AbortHandle::new();
        let signal = RunSignal::new(Some(external.clone()));

        signal.abort_with(AbortReason::TaskFailed { index: 1 });

        assert!(signal.is_aborted());
        assert!(!external.is_aborted());
        assert_eq!(signal.reason(), Some(AbortReason::TaskFailed { index: 1 }));
    }

    #[test]
    fn test_run_signal_sees_external_abort() {
        let external = AbortHandle::new();
        let signal = RunSignal::new(Some(external.clone()));

        external.abort();

        assert!(signal.is_aborted());
        assert_eq!(signal.reason(), Some(AbortReason::Requested));
    }

    #[test]
    fn test_run_signal_keeps_earlier_external_reason() {
        let external = AbortHandle::new();
        let signal = RunSignal::new(Some(external.clone()));

        external.abort_with(AbortReason::Timeout);

        assert!(!signal.abort_with(AbortReason::TaskFailed { index: 1 }));
        assert_eq!(signal.reason(), Some(AbortReason::Timeout));
        assert_eq!(external.reason(), Some(AbortReason::Timeout));
    }

    #[test]
    fn test_run_signal_keeps_earlier_local_reason() {
        let external = AbortHandle::new();
        let signal = RunSignal::new(Some(external.clone()));

        assert!(signal.abort_with(AbortReason::TaskFailed { index: 0 }));
        external.abort();

        assert_eq!(signal.reason(), Some(AbortReason::TaskFailed { index: 0 }));
    }
}
