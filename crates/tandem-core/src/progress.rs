//! Progress events and the bus that delivers them.
//!
//! The executor publishes a [`TaskEvent`] for every lifecycle transition.
//! Subscribers register for one [`EventKind`] or for everything.
//!
//! # Delivery
//!
//! Delivery is **sequential-await**: [`ProgressBus::publish`] runs each
//! matching handler in registration order and awaits it before moving on.
//! A slow handler therefore slows the worker that published the event.
//! Subscribers that must not block can use [`ProgressBus::channel`] and
//! consume events from a broadcast receiver instead.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::execute::AbortReason;

/// Lifecycle event emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// An item was claimed and its operation is about to run.
    ///
    /// An operation that settles after an abort gets no terminal event.
    Started {
        /// Index of the item in the input collection.
        index: usize,
    },

    /// An operation succeeded.
    ///
    /// The value itself is not carried; read it from slot `index` of the
    /// run output ([`RunOutput::slots`](crate::RunOutput::slots)).
    Completed {
        /// Index of the item in the input collection.
        index: usize,
        /// Task span in milliseconds, throttle padding included.
        duration_ms: u64,
    },

    /// An operation failed.
    Failed {
        /// Index of the item in the input collection.
        index: usize,
        /// Error message.
        error: String,
    },

    /// The run observed an abort. Published at most once per run.
    Aborted {
        /// Why the run stopped.
        reason: AbortReason,
    },
}

impl TaskEvent {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Started { .. } => EventKind::Started,
            Self::Completed { .. } => EventKind::Completed,
            Self::Failed { .. } => EventKind::Failed,
            Self::Aborted { .. } => EventKind::Aborted,
        }
    }

    /// Item index, for per-item events.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Started { index } | Self::Completed { index, .. } | Self::Failed { index, .. } => {
                Some(*index)
            }
            Self::Aborted { .. } => None,
        }
    }
}

/// Event discriminant used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Started,
    Completed,
    Failed,
    Aborted,
}

type Handler = Arc<dyn Fn(TaskEvent) -> BoxFuture<'static, ()> + Send + Sync>;

struct Subscription {
    /// `None` matches every kind.
    kind: Option<EventKind>,
    handler: Handler,
}

/// Multi-subscriber channel for [`TaskEvent`]s.
///
/// Cloning is cheap and clones share their subscriber list, so a bus can be
/// handed to an executor while the caller keeps subscribing.
#[derive(Clone, Default)]
pub struct ProgressBus {
    subscribers: Arc<RwLock<Vec<Subscription>>>,
}

impl fmt::Debug for ProgressBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ProgressBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), sync_handler(handler));
    }

    /// Register a synchronous handler for every event.
    pub fn subscribe_all<F>(&self, handler: F)
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        self.register(None, sync_handler(handler));
    }

    /// Register an asynchronous handler for one event kind.
    ///
    /// The returned future is awaited before the next handler runs.
    pub fn subscribe_async<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(TaskEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(Some(kind), Arc::new(move |event| handler(event).boxed()));
    }

    /// Forward every event into a broadcast channel.
    ///
    /// Receivers that fall more than `capacity` events behind lose the
    /// oldest ones. The channel closes when the last bus clone is dropped.
    pub fn channel(&self, capacity: usize) -> broadcast::Receiver<TaskEvent> {
        let (tx, rx) = broadcast::channel(capacity);
        self.subscribe_all(move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver an event to every matching handler, in registration order.
    pub async fn publish(&self, event: TaskEvent) {
        let kind = event.kind();
        // Snapshot so no lock is held across handler awaits.
        let handlers: Vec<Handler> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|sub| sub.kind.is_none_or(|k| k == kind))
            .map(|sub| Arc::clone(&sub.handler))
            .collect();

        for handler in handlers {
            handler(event.clone()).await;
        }
    }

    fn register(&self, kind: Option<EventKind>, handler: Handler) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription { kind, handler });
    }
}

fn sync_handler<F>(handler: F) -> Handler
where
    F: Fn(&TaskEvent) + Send + Sync + 'static,
{
    Arc::new(move |event: TaskEvent| {
        handler(&event);
        futures::future::ready(()).boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = ProgressBus::new();
        bus.publish(TaskEvent::Started { index: 0 }).await;
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_filters_by_kind() {
        let bus = ProgressBus::new();
        let started = Arc::new(AtomicUsize::new(0));
        let everything = Arc::new(AtomicUsize::new(0));

        {
            let started = started.clone();
            bus.subscribe(EventKind::Started, move |_| {
                started.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let everything = everything.clone();
            bus.subscribe_all(move |_| {
                everything.fetch_add(1, Ordering::SeqCst);
            });
        }

        bus.publish(TaskEvent::Started { index: 0 }).await;
        bus.publish(TaskEvent::Completed { index: 0, duration_ms: 5 }).await;
        bus.publish(TaskEvent::Aborted { reason: AbortReason::Requested }).await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(everything.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_handlers_run_in_registration_order() {
        let bus = ProgressBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (id, delay) in [(1, 30), (2, 10), (3, 20)] {
            let order = order.clone();
            bus.subscribe_async(EventKind::Failed, move |_| {
                let order = order.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    order.lock().unwrap().push(id);
                }
            });
        }

        bus.publish(TaskEvent::Failed {
            index: 4,
            error: "boom".to_string(),
        })
        .await;

        // publish returned only after every handler finished
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_channel_receives_events() {
        let bus = ProgressBus::new();
        let mut rx = bus.channel(8);

        bus.publish(TaskEvent::Started { index: 2 }).await;
        bus.publish(TaskEvent::Completed { index: 2, duration_ms: 1 }).await;

        assert_eq!(rx.recv().await.unwrap(), TaskEvent::Started { index: 2 });
        assert_eq!(
            rx.recv().await.unwrap(),
            TaskEvent::Completed { index: 2, duration_ms: 1 }
        );
    }

    #[tokio::test]
    async fn test_clones_share_subscribers() {
        let bus = ProgressBus::new();
        let clone = bus.clone();
        let count = Arc::new(AtomicUsize::new(0));
        {
            let count = count.clone();
            clone.subscribe(EventKind::Completed, move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        bus.publish(TaskEvent::Completed { index: 0, duration_ms: 0 }).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_event_accessors() {
        let event = TaskEvent::Failed {
            index: 7,
            error: "nope".to_string(),
        };
        assert_eq!(event.kind(), EventKind::Failed);
        assert_eq!(event.index(), Some(7));

        let aborted = TaskEvent::Aborted { reason: AbortReason::Timeout };
        assert_eq!(aborted.index(), None);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(TaskEvent::Completed { index: 1, duration_ms: 40 }).unwrap();
        assert_eq!(json["type"], "completed");
        assert_eq!(json["index"], 1);
        assert_eq!(json["duration_ms"], 40);

        let json = serde_json::to_value(TaskEvent::Aborted {
            reason: AbortReason::TaskFailed { index: 3 },
        })
        .unwrap();
        assert_eq!(json["type"], "aborted");
        assert_eq!(json["reason"]["kind"], "task_failed");
        assert_eq!(json["reason"]["index"], 3);
    }
}
