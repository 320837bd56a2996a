//! Events module for controller notifications
//!
//! Structured events broadcast whenever clicking starts or stops, the
//! hotkey changes, or one of the engines fails.

use serde::{Deserialize, Serialize};

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClickerEvent {
    /// A click session started
    ClickingStarted {
        interval_ms: u64,
    },

    /// A click session was stopped
    ClickingStopped {
        /// Clicks produced by the session
        clicks: u64,
        /// How long the session ran
        duration_ms: u64,
    },

    /// A click session ended because a click could not be produced
    ClickFailed {
        message: String,
    },

    /// The hotkey was replaced and detection restarted
    HotkeyChanged {
        hotkey: String,
    },

    /// Hotkey detection is unavailable
    HotkeyFailed {
        message: String,
    },
}

impl std::fmt::Display for ClickerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClickerEvent::ClickingStarted { interval_ms } => {
                write!(f, "CLICKING_STARTED ({}ms)", interval_ms)
            }
            ClickerEvent::ClickingStopped { clicks, duration_ms } => {
                write!(f, "CLICKING_STOPPED ({} clicks, {}ms)", clicks, duration_ms)
            }
            ClickerEvent::ClickFailed { message } => write!(f, "CLICK_FAILED: {}", message),
            ClickerEvent::HotkeyChanged { hotkey } => write!(f, "HOTKEY_CHANGED ({})", hotkey),
            ClickerEvent::HotkeyFailed { message } => write!(f, "HOTKEY_FAILED: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ClickerEvent::ClickingStopped {
            clicks: 12,
            duration_ms: 1500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("clicking_stopped"));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"hotkey_changed","hotkey":"Ctrl+F6"}"#;
        let event: ClickerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClickerEvent::HotkeyChanged {
                hotkey: "Ctrl+F6".to_string()
            }
        );
    }

    #[test]
    fn test_display() {
        let event = ClickerEvent::ClickingStarted { interval_ms: 250 };
        assert_eq!(event.to_string(), "CLICKING_STARTED (250ms)");
    }
}
