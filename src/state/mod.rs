//! Controller module
//!
//! Tracks whether clicking is Stopped or Running and turns hotkey
//! triggers and UI commands into click engine and hotkey listener calls.

mod machine;

pub use machine::{ClickState, Command, ControlRequest, Controller};
