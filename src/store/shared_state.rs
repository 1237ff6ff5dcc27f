use std::sync::{Mutex, MutexGuard, PoisonError};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tokio::runtime::Handle;

use super::state::State;
use crate::events::Events;

/// State shared between store handles and timer tasks.
///
/// Lock order is `dispatch` then `state`. Timer tasks hold `dispatch` for the
/// whole firing, including delivery, with `state` released before callbacks
/// run. Writers take `dispatch` first too, so a `delete` or `clear` that
/// returns has no notification for the removed keys still in flight.
/// `dispatch` is reentrant so a callback can write to the store from the
/// thread that is delivering.
pub(crate) struct SharedState<K, V> {
    pub(crate) state: Mutex<State<K, V>>,
    pub(crate) events: Events<K, V>,
    pub(crate) dispatch: ReentrantMutex<()>,
    /// Runtime that timer tasks are spawned onto.
    pub(crate) runtime: Handle,
}

impl<K, V> SharedState<K, V> {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_dispatch(&self) -> ReentrantMutexGuard<'_, ()> {
        self.dispatch.lock()
    }
}
