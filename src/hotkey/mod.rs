//! Hotkey module for global keyboard and mouse listening
//!
//! Watches system-wide presses and releases and reports each time the
//! configured chord of keys and/or mouse buttons becomes fully held.

mod chord;
mod keys;
mod listener;
mod rdev_hook;
mod tracker;

pub use listener::{HotkeyError, HotkeyEvent, HotkeyListener};
pub use rdev_hook::RdevHook;

#[cfg(test)]
pub(crate) use keys::{InputEvent, InputKey, MouseButton, NamedKey};

#[cfg(test)]
pub(crate) use listener::testing;
