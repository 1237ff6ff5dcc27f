pub(crate) mod entry;
pub(crate) mod shared_state;
pub(crate) mod state;
#[allow(clippy::module_inception)]
pub(crate) mod store;
