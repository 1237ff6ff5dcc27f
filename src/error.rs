use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A duration, interval, or configuration value was rejected before any state changed.
    #[error("[Invalid Argument] {0}")]
    InvalidArgument(String),

    #[error("[Unknown Event] {0}. Expected `expiry` or `refresh`.")]
    UnknownEvent(String),
}

impl StoreError {
    pub(crate) fn invalid(msg: impl ToString) -> Self {
        Self::InvalidArgument(msg.to_string())
    }
}
