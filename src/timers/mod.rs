pub(crate) mod schedule;
pub(crate) mod timer;

pub(crate) use schedule::Schedule;
pub(crate) use timer::{Timer, TimerId};
