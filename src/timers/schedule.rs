use std::fmt::Debug;

use tokio::time::{Duration, Instant};

use crate::error::StoreError;

/// How an entry timer fires.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Schedule {
    /// Fire a single time, `delay` after being armed.
    Once { delay: Duration },
    /// Fire every `interval`, the first time one interval after being armed.
    Every { interval: Duration },
}

impl Schedule {
    pub(crate) fn once(delay: Duration) -> Self {
        Self::Once { delay }
    }

    pub(crate) fn every(interval: Duration) -> Self {
        Self::Every { interval }
    }

    pub(crate) fn period(&self) -> Duration {
        match self {
            Schedule::Once { delay } => *delay,
            Schedule::Every { interval } => *interval,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Schedule::Once { .. } => "Expiration duration",
            Schedule::Every { .. } => "Refresh interval",
        }
    }

    /// Validates the schedule and computes its first due instant relative to `now`.
    ///
    /// A zero period, or one that pushes the deadline past what the clock can
    /// represent, is rejected.
    pub(crate) fn first_due(&self, now: Instant) -> Result<Instant, StoreError> {
        let period = self.period();

        if period.is_zero() {
            return Err(StoreError::invalid(format!(
                "{} must be greater than 0ms.",
                self.name()
            )));
        }

        now.checked_add(period).ok_or_else(|| {
            StoreError::invalid(format!(
                "{} of {period:?} is not a finite deadline.",
                self.name()
            ))
        })
    }

    /// The due instant following a firing that was due at `due_at`.
    ///
    /// Periodic schedules advance by a fixed step from the previous due
    /// instant, so a slow callback does not push later firings back.
    pub(crate) fn next_due(&self, due_at: Instant) -> Option<Instant> {
        match self {
            Schedule::Once { .. } => None,
            Schedule::Every { interval } => due_at.checked_add(*interval),
        }
    }
}

impl Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Schedule::Once { delay } => format!("Once {{ delay: {}ms }}", delay.as_millis()),
            Schedule::Every { interval } => {
                format!("Every {{ interval: {}ms }}", interval.as_millis())
            }
        };

        write!(f, "{}", s)
    }
}
