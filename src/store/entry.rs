use tokio::time::{Duration, Instant};

use crate::timers::Timer;

/// A live key's value and its optional timers.
#[derive(Debug)]
pub(crate) struct Entry<V> {
    pub(super) value: V,
    /// Position of the key in insertion order.
    pub(super) seq: u64,
    pub(super) expiration: Option<Timer>,
    pub(super) refresh: Option<Timer>,
}

impl<V> Entry<V> {
    pub(crate) fn new(value: V, seq: u64) -> Self {
        Self {
            value,
            seq,
            expiration: None,
            refresh: None,
        }
    }

    /// Replaces the expiration timer. The previous one, if any, is cancelled
    /// before the new one is installed.
    pub(crate) fn set_expiration(&mut self, timer: Timer) {
        self.expiration.take();
        self.expiration = Some(timer);
    }

    pub(crate) fn set_refresh(&mut self, timer: Timer) {
        self.refresh.take();
        self.refresh = Some(timer);
    }

    pub(crate) fn expiration_period(&self) -> Option<Duration> {
        self.expiration.as_ref().map(|t| t.schedule().period())
    }

    pub(crate) fn refresh_period(&self) -> Option<Duration> {
        self.refresh.as_ref().map(|t| t.schedule().period())
    }

    pub(crate) fn expires_in(&self, now: Instant) -> Option<Duration> {
        self.expiration
            .as_ref()
            .map(|t| t.due_at().saturating_duration_since(now))
    }
}
