
use std::sync::{Arc, Mutex, Once};

use tokio::time::{sleep, Duration};

use crate::{EventKind, Store};

static TRACING: Once = Once::new();

pub(super) fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
    });
}

pub(super) type Log = Arc<Mutex<Vec<(String, i32)>>>;

/// Records every notification of `kind` as `(key, value)`.
pub(super) fn record(store: &Store<String, i32>, kind: EventKind) -> Log {
    let log: Log = Arc::new(Mutex::new(vec![]));
    let sink = log.clone();

    store.subscribe(kind, move |k, v| sink.lock().unwrap().push((k.clone(), *v)));
    log
}

pub(super) fn seen(log: &Log) -> Vec<(String, i32)> {
    log.lock().unwrap().clone()
}

pub(super) fn ms(ms: u64) -> Option<Duration> {
    Some(Duration::from_millis(ms))
}

/// Moves the paused clock forward, letting due timers fire on the way.
pub(super) async fn advance(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

pub(super) fn key(k: &str) -> String {
    k.to_string()
}
