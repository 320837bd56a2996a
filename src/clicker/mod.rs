//! Click module for timed synthetic left clicks
//!
//! A click session runs on its own worker thread, independent of the
//! controller, and reads its timing from shared settings every cycle.

mod engine;
mod mouse;
mod settings;

pub use engine::{ClickEngine, ClickError};
pub use mouse::EnigoBackend;
pub use settings::{ClickConfig, ClickSettings};

#[cfg(test)]
pub(crate) use mouse::testing;
