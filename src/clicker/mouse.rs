//! Synthetic mouse input
//!
//! The clicker is opened on the worker thread that uses it, so platform
//! connections never cross threads.

use enigo::{Button, Direction, Enigo, Mouse, Settings};

use super::engine::ClickError;

/// Produces one left click at the current cursor position
pub trait MouseClicker {
    fn left_click(&mut self) -> Result<(), ClickError>;
}

/// Opens a [`MouseClicker`] for a click session
pub trait ClickBackend: Send + Sync {
    fn open(&self) -> Result<Box<dyn MouseClicker>, ClickError>;
}

/// Cross-platform click backend using enigo
#[derive(Debug, Default, Clone, Copy)]
pub struct EnigoBackend;

impl ClickBackend for EnigoBackend {
    fn open(&self) -> Result<Box<dyn MouseClicker>, ClickError> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| {
            ClickError::SynthesisFailed(format!("failed to connect to input system: {e}"))
        })?;
        Ok(Box::new(EnigoClicker { enigo }))
    }
}

struct EnigoClicker {
    enigo: Enigo,
}

impl MouseClicker for EnigoClicker {
    fn left_click(&mut self) -> Result<(), ClickError> {
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| ClickError::SynthesisFailed(format!("failed to click: {e}")))
    }
}
