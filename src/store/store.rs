use std::{
    fmt::Debug,
    hash::Hash,
    sync::{Arc, Mutex, Weak},
};

use parking_lot::ReentrantMutex;
use tokio::{
    runtime::Handle,
    time::{sleep_until, Duration, Instant},
};
use tracing::{debug, instrument, trace, warn};

use super::{shared_state::SharedState, state::State};
use crate::{
    config::StoreConfig,
    error::StoreError,
    events::{EventKind, Events, Notification, SubscriptionId},
    timers::{Schedule, Timer, TimerId},
};

/// In-process key-value store whose entries may carry an expiration deadline
/// and a periodic refresh notification.
///
/// The two timers of an entry are independent: a write that supplies one of
/// them leaves the other running on its original schedule. Cloning a `Store`
/// yields another handle to the same entries. Once the last handle is dropped
/// every pending timer is cancelled.
///
/// Timers run as tasks on the tokio runtime the store was created in.
pub struct Store<K, V> {
    shared: Arc<SharedState<K, V>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<K, V> Debug for Store<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("Store")
            .field("len", &state.data.len())
            .field("reset_on_access", &state.reset_on_access)
            .finish()
    }
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty store. Reads do not extend expirations until
    /// [`Store::enable_reset_on_access`] is called.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime context.
    pub fn new() -> Self {
        Self::build(StoreConfig::default(), Handle::current())
    }

    /// Creates an empty store from `config`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime context.
    pub fn with_config(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self::build(config, Handle::current()))
    }

    /// Creates an empty store whose timers run on `runtime`. Usable from
    /// threads that are not part of a runtime.
    pub fn with_runtime(config: StoreConfig, runtime: Handle) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self::build(config, runtime))
    }

    fn build(config: StoreConfig, runtime: Handle) -> Self {
        let shared = Arc::new(SharedState {
            state: Mutex::new(State::new(config.reset_on_access)),
            events: Events::new(config.event_capacity),
            dispatch: ReentrantMutex::new(()),
            runtime,
        });

        Self { shared }
    }

    /// Writes `value` under `key` and returns it.
    ///
    /// A supplied `expiration` replaces the entry's expiration timer, counting
    /// from now. A supplied `refresh` replaces its refresh timer. Omitted ones
    /// are left exactly as they were.
    ///
    /// Zero or unrepresentable durations are rejected with
    /// [`StoreError::InvalidArgument`] and the store is left unchanged.
    #[instrument(name = "put", skip(self, value))]
    pub fn put(
        &self,
        key: K,
        value: V,
        expiration: Option<Duration>,
        refresh: Option<Duration>,
    ) -> Result<V, StoreError> {
        let now = Instant::now();

        let expiration = expiration
            .map(Schedule::once)
            .map(|s| s.first_due(now).map(|due| (s, due)))
            .transpose()
            .map_err(|e| {
                warn!(error = %e, "rejected write");
                e
            })?;

        let refresh = refresh
            .map(Schedule::every)
            .map(|s| s.first_due(now).map(|due| (s, due)))
            .transpose()
            .map_err(|e| {
                warn!(error = %e, "rejected write");
                e
            })?;

        let _dispatch = self.shared.lock_dispatch();
        let mut state = self.shared.lock_state();
        let entry = state.upsert(key.clone(), value.clone());

        if let Some((schedule, due_at)) = expiration {
            entry.set_expiration(arm_expiration(&self.shared, key.clone(), schedule, due_at));
        }

        if let Some((schedule, due_at)) = refresh {
            entry.set_refresh(arm_refresh(&self.shared, key, schedule, due_at));
        }

        Ok(value)
    }

    /// Returns the value stored under `key`.
    ///
    /// With reset-on-access enabled, reading an entry that has an expiration
    /// restarts its full countdown from now.
    #[instrument(name = "get", skip(self))]
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.shared.lock_state();
        let reset = state.reset_on_access;
        let entry = state.data.get_mut(key)?;

        if reset {
            if let Some(delay) = entry.expiration_period() {
                let schedule = Schedule::once(delay);
                match schedule.first_due(Instant::now()) {
                    Ok(due_at) => {
                        debug!(?delay, "expiration reset on access");
                        entry.set_expiration(arm_expiration(
                            &self.shared,
                            key.clone(),
                            schedule,
                            due_at,
                        ));
                    }
                    // the duration was accepted once, so this only happens near the clock's limit
                    Err(e) => warn!(error = %e, "expiration left unchanged"),
                }
            }
        }

        Some(entry.value.clone())
    }

    /// Removes `key`, cancelling both of its timers. No notification is
    /// emitted. Returns whether the key was present.
    ///
    /// Waits for a notification that is being delivered on another thread, so
    /// nothing is delivered for `key` once this returns.
    #[instrument(name = "delete", skip(self))]
    pub fn delete(&self, key: &K) -> bool {
        let _dispatch = self.shared.lock_dispatch();
        let removed = self.shared.lock_state().remove(key);
        // dropping the entry cancels its timers
        removed.is_some()
    }

    /// Removes every entry and cancels every timer. No notification is
    /// emitted for any entry that was present.
    #[instrument(name = "clear", skip(self))]
    pub fn clear(&self) {
        let _dispatch = self.shared.lock_dispatch();
        let removed = self.shared.lock_state().clear();
        debug!(removed, "store cleared");
    }

    pub fn len(&self) -> usize {
        self.shared.lock_state().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.shared.lock_state().data.contains_key(key)
    }

    /// Live keys in insertion order. Updating a key keeps its position.
    pub fn keys(&self) -> Vec<K> {
        self.shared.lock_state().keys()
    }

    /// Time left before `key` expires, or `None` if it is absent or has no
    /// expiration.
    pub fn expires_in(&self, key: &K) -> Option<Duration> {
        let now = Instant::now();
        self.shared
            .lock_state()
            .data
            .get(key)
            .and_then(|e| e.expires_in(now))
    }

    /// The refresh interval of `key`, if it has one.
    pub fn refresh_interval(&self, key: &K) -> Option<Duration> {
        self.shared
            .lock_state()
            .data
            .get(key)
            .and_then(|e| e.refresh_period())
    }

    /// Sets whether reads restart expiration countdowns.
    pub fn set_reset_on_access(&self, flag: bool) {
        self.shared.lock_state().reset_on_access = flag;
    }

    /// Same as `set_reset_on_access(true)`.
    pub fn enable_reset_on_access(&self) {
        self.set_reset_on_access(true);
    }

    pub fn reset_on_access(&self) -> bool {
        self.shared.lock_state().reset_on_access
    }

    /// Registers `callback` for every notification of `kind`.
    ///
    /// Callbacks run synchronously on the timer task that fired, after the
    /// store has been updated. They may call back into the store. Writes from
    /// other threads wait while callbacks run, so callbacks should be short.
    ///
    /// A panicking callback is logged and skipped. The remaining callbacks,
    /// stream listeners, and the timer itself are unaffected.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(kind, callback)
    }

    /// Removes a callback. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    /// A stream of every notification of `kind` emitted from now on.
    ///
    /// A listener that falls more than the configured event capacity behind
    /// skips the notifications it missed. The stream ends when the store is
    /// dropped.
    #[cfg(feature = "stream")]
    pub fn events(
        &self,
        kind: EventKind,
    ) -> impl tokio_stream::Stream<Item = Notification<K, V>> + Send + 'static {
        use tokio::sync::broadcast::error::RecvError;

        let mut rx = self.shared.events.listen(kind);

        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(n) => yield n,
                    Err(RecvError::Lagged(skipped)) => trace!(skipped, "notification listener lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}

fn arm_expiration<K, V>(
    shared: &Arc<SharedState<K, V>>,
    key: K,
    schedule: Schedule,
    due_at: Instant,
) -> Timer
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let weak = Arc::downgrade(shared);
    debug!(?key, ?schedule, "expiration armed");

    Timer::spawn(&shared.runtime, schedule, due_at, move |id| async move {
        sleep_until(due_at).await;
        fire_expiration(&weak, &key, id);
    })
}

fn arm_refresh<K, V>(
    shared: &Arc<SharedState<K, V>>,
    key: K,
    schedule: Schedule,
    first_due: Instant,
) -> Timer
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let weak = Arc::downgrade(shared);
    debug!(?key, ?schedule, "refresh armed");

    Timer::spawn(&shared.runtime, schedule, first_due, move |id| async move {
        let mut due_at = first_due;

        loop {
            sleep_until(due_at).await;

            match fire_refresh(&weak, &key, id) {
                Some(next) => due_at = next,
                None => break,
            }
        }
    })
}

/// Removes the entry and emits an expiry notification, provided timer `id`
/// is still the entry's expiration timer.
#[instrument(name = "fire_expiration", skip(weak))]
fn fire_expiration<K, V>(weak: &Weak<SharedState<K, V>>, key: &K, id: TimerId)
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let Some(shared) = weak.upgrade() else {
        return;
    };

    let dispatch = shared.lock_dispatch();
    let mut state = shared.lock_state();

    let current = state
        .data
        .get(key)
        .and_then(|e| e.expiration.as_ref())
        .map(Timer::id);

    if current != Some(id) {
        trace!("stale expiration timer");
        return;
    }

    let Some(mut entry) = state.remove(key) else {
        return;
    };
    drop(state);

    if let Some(timer) = entry.expiration.take() {
        timer.detach();
    }
    // the refresh timer is cancelled with the entry
    let value = entry.value.clone();
    drop(entry);

    debug!("entry expired");
    shared
        .events
        .emit(Notification::new(EventKind::Expiry, key.clone(), value));
    drop(dispatch);
}

/// Emits a refresh notification if timer `id` is still the entry's refresh
/// timer, and returns when it is next due. `None` stops the timer task.
#[instrument(name = "fire_refresh", skip(weak))]
fn fire_refresh<K, V>(weak: &Weak<SharedState<K, V>>, key: &K, id: TimerId) -> Option<Instant>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let shared = weak.upgrade()?;

    let dispatch = shared.lock_dispatch();
    let mut state = shared.lock_state();

    let entry = state.data.get_mut(key)?;
    let timer = match entry.refresh.as_mut() {
        Some(timer) if timer.id() == id => timer,
        _ => {
            trace!("stale refresh timer");
            return None;
        }
    };

    let next = timer.schedule().next_due(timer.due_at());
    if let Some(next) = next {
        timer.advance(next);
    }

    let value = entry.value.clone();
    drop(state);

    trace!("entry refreshed");
    shared
        .events
        .emit(Notification::new(EventKind::Refresh, key.clone(), value));
    drop(dispatch);

    next
}
