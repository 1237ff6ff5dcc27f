use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const RESET_ON_ACCESS_ENV: &str = "TIMED_STORE_RESET_ON_ACCESS";
pub const EVENT_CAPACITY_ENV: &str = "TIMED_STORE_EVENT_CAPACITY";

/// Capacity of each notification broadcast channel. Slow stream listeners
/// skip notifications once they fall this far behind.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Construction-time settings for a `Store`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Whether reads restart an entry's expiration countdown.
    pub reset_on_access: bool,
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reset_on_access: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reset_on_access(mut self, flag: bool) -> Self {
        self.reset_on_access = flag;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Reads overrides from `TIMED_STORE_RESET_ON_ACCESS` and
    /// `TIMED_STORE_EVENT_CAPACITY`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`StoreConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(RESET_ON_ACCESS_ENV) {
            config.reset_on_access = parse_flag(&raw)?;
        }

        if let Some(raw) = lookup(EVENT_CAPACITY_ENV) {
            config.event_capacity = raw.trim().parse().map_err(|_| {
                StoreError::invalid(format!(
                    "{EVENT_CAPACITY_ENV} must be a positive integer. Found: {raw:?}"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.event_capacity == 0 {
            return Err(StoreError::invalid(
                "Event capacity must be greater than 0.",
            ));
        }

        Ok(())
    }
}

/// Parses a reset-on-access flag. Only `true` and `false` are accepted.
pub fn parse_flag(raw: &str) -> Result<bool, StoreError> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(StoreError::invalid(format!(
            "Reset-on-access flag must be a boolean. Found: {other:?}"
        ))),
    }
}
