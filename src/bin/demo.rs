use std::time::Duration;

use timed_store::{EventKind, Store, StoreConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_filter(tracing_subscriber::filter::LevelFilter::INFO),
        )
        .init();

    let config = StoreConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid store configuration");
        e
    })?;
    let store: Store<String, String> = Store::with_config(config)?;

    for kind in EventKind::ALL {
        store.subscribe(kind, move |key, value| {
            info!(%kind, %key, %value, "notification");
        });
    }

    store.put(
        "session".to_string(),
        "guest".to_string(),
        Some(Duration::from_millis(1500)),
        None,
    )?;
    store.put(
        "ticker".to_string(),
        "0".to_string(),
        None,
        Some(Duration::from_millis(400)),
    )?;

    tokio::time::sleep(Duration::from_millis(1000)).await;

    // value-only write: the session deadline is unchanged
    store.put("session".to_string(), "alice".to_string(), None, None)?;
    store.put("ticker".to_string(), "1".to_string(), None, None)?;

    tokio::time::sleep(Duration::from_millis(1000)).await;

    info!(keys = ?store.keys(), "live keys");
    store.clear();
    Ok(())
}
