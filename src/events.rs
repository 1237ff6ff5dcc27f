use std::{
    collections::HashMap,
    fmt::Display,
    panic::{catch_unwind, AssertUnwindSafe},
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, trace};

use crate::error::StoreError;

/// The two notifications a store emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// An entry reached its expiration deadline and was removed.
    Expiry,
    /// An entry's refresh interval elapsed. The entry stays in the store.
    Refresh,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Expiry, EventKind::Refresh];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Expiry => "expiry",
            EventKind::Refresh => "refresh",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expiry" => Ok(EventKind::Expiry),
            "refresh" => Ok(EventKind::Refresh),
            other => Err(StoreError::UnknownEvent(other.to_string())),
        }
    }
}

/// A single firing of an entry timer, carrying the value held at fire time.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification<K, V> {
    pub kind: EventKind,
    pub key: K,
    pub value: V,
    /// Wall-clock time of the firing.
    pub fired_at: DateTime<Utc>,
}

impl<K, V> Notification<K, V> {
    pub(crate) fn new(kind: EventKind, key: K, value: V) -> Self {
        Self {
            kind,
            key,
            value,
            fired_at: Utc::now(),
        }
    }
}

/// Handle returned by `Store::subscribe`, used to remove the callback again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<K, V> = Arc<dyn Fn(&K, &V) + Send + Sync>;

struct Subscriber<K, V> {
    id: SubscriptionId,
    kind: EventKind,
    callback: Callback<K, V>,
}

/// Callback registry plus one broadcast channel per event kind.
pub(crate) struct Events<K, V> {
    subscribers: Mutex<Vec<Subscriber<K, V>>>,
    channels: HashMap<EventKind, broadcast::Sender<Notification<K, V>>>,
    next_id: AtomicU64,
}

impl<K, V> Events<K, V>
where
    K: Clone,
    V: Clone,
{
    pub(crate) fn new(capacity: usize) -> Self {
        let channels = EventKind::ALL
            .into_iter()
            .map(|kind| (kind, broadcast::channel(capacity).0))
            .collect();

        Self {
            subscribers: Mutex::new(Vec::new()),
            channels,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.lock().push(Subscriber {
            id,
            kind,
            callback: Arc::new(callback),
        });

        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Request a receiver for every notification of `kind`.
    #[cfg_attr(not(feature = "stream"), allow(dead_code))]
    pub(crate) fn listen(&self, kind: EventKind) -> broadcast::Receiver<Notification<K, V>> {
        self.channels[&kind].subscribe()
    }

    /// Delivers `notification` to the current callbacks of its kind, in
    /// subscription order, then publishes it to stream listeners.
    ///
    /// The registry lock is released before any callback runs, so a callback
    /// may subscribe or unsubscribe. A panicking callback is logged and does
    /// not stop delivery to the others.
    pub(crate) fn emit(&self, notification: Notification<K, V>) {
        let callbacks: Vec<Callback<K, V>> = self
            .lock()
            .iter()
            .filter(|s| s.kind == notification.kind)
            .map(|s| s.callback.clone())
            .collect();

        let kind = notification.kind;

        for callback in callbacks {
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                callback(&notification.key, &notification.value)
            }));

            if delivered.is_err() {
                error!(%kind, "notification callback panicked");
            }
        }

        // a send error only means nobody is listening
        let listeners = self.channels[&kind].send(notification).unwrap_or(0);
        trace!(%kind, listeners, "notification published");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber<K, V>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
