//! # timed_store
//!
//! An in-process key-value store where each entry may carry its own
//! expiration deadline and its own periodic refresh notification.
//!
//! - An expiring entry is removed when its deadline passes and an
//!   [`EventKind::Expiry`] notification is emitted with the value it held.
//! - A refreshing entry emits an [`EventKind::Refresh`] notification with its
//!   current value on every interval until it is removed or re-armed.
//! - A write may re-arm either timer without touching the other. A write that
//!   supplies neither only replaces the value.
//! - Optionally, reads restart the expiration countdown
//!   ([`Store::enable_reset_on_access`]).
//!
//! Timers are tokio tasks, so a store must be created inside a tokio runtime
//! (or given a runtime handle with [`Store::with_runtime`]).
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use timed_store::{EventKind, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), timed_store::StoreError> {
//!     let store: Store<String, String> = Store::new();
//!
//!     store.subscribe(EventKind::Expiry, |key, value| {
//!         println!("{key} expired holding {value}");
//!     });
//!
//!     store.put("session".into(), "abc".into(), Some(Duration::from_secs(30)), None)?;
//!     store.put("feed".into(), "v1".into(), None, Some(Duration::from_secs(5)))?;
//!
//!     // replaces the value only; the 30s deadline keeps running
//!     store.put("session".into(), "def".into(), None, None)?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod store;
mod timers;

#[cfg(test)]
mod tests;

pub use config::{
    parse_flag, StoreConfig, DEFAULT_EVENT_CAPACITY, EVENT_CAPACITY_ENV, RESET_ON_ACCESS_ENV,
};
pub use error::StoreError;
pub use events::{EventKind, Notification, SubscriptionId};
pub use store::store::Store;
