//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::clicker::ClickConfig;
use crate::events::ClickerEvent;
use crate::state::{ClickState, Command};

/// Largest frame either side accepts
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Start clicking if stopped, stop if running
    Toggle,

    Start,

    Stop,

    /// Change the click interval, effective from the next wait
    SetInterval { interval_ms: u64 },

    /// Turn jitter on or off, optionally changing its percentage
    SetJitter {
        enabled: bool,
        #[serde(default)]
        percent: Option<u8>,
    },

    /// Replace the hotkey, e.g. "Ctrl+Shift+C" or "mouse_x1"
    SetHotkey { hotkey: String },

    /// Ping to check connectivity
    Ping,

    /// Subscribe to event notifications
    Subscribe,
}

impl Request {
    /// The controller command behind this request, if any
    pub fn into_command(self) -> Option<Command> {
        let command = match self {
            Request::GetStatus => Command::GetStatus,
            Request::Toggle => Command::Toggle,
            Request::Start => Command::Start,
            Request::Stop => Command::Stop,
            Request::SetInterval { interval_ms } => Command::SetInterval(interval_ms),
            Request::SetJitter { enabled, percent } => Command::SetJitter { enabled, percent },
            Request::SetHotkey { hotkey } => Command::SetHotkey(hotkey),
            Request::Ping | Request::Subscribe => return None,
        };
        Some(command)
    }
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Event { event: ClickerEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    pub state: ClickState,

    /// Click timing in effect
    pub click: ClickConfig,

    /// Hotkey as the user wrote it
    pub hotkey: String,

    /// Canonical tokens being detected, e.g. "ctrl_l+f6"
    pub hotkey_chord: Option<String>,

    /// Whether the hotkey is being detected
    pub hotkey_active: bool,

    /// Why hotkey detection is unavailable, if it is
    pub hotkey_error: Option<String>,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: ClickState::default(),
            click: ClickConfig::default(),
            hotkey: String::new(),
            hotkey_chord: None,
            hotkey_active: false,
            hotkey_error: None,
            uptime_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetInterval { interval_ms: 250 };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_interval"));
        assert!(json.contains("250"));
    }

    #[test]
    fn test_request_deserialization() {
        let req: Request = serde_json::from_str(r#"{"type":"set_jitter","enabled":true}"#).unwrap();
        assert_eq!(
            req,
            Request::SetJitter {
                enabled: true,
                percent: None
            }
        );

        let req: Request =
            serde_json::from_str(r#"{"type":"set_hotkey","hotkey":"Ctrl+Shift+C"}"#).unwrap();
        assert_eq!(
            req.into_command(),
            Some(Command::SetHotkey("Ctrl+Shift+C".to_string()))
        );
    }

    #[test]
    fn test_local_requests_have_no_command() {
        assert_eq!(Request::Ping.into_command(), None);
        assert_eq!(Request::Subscribe.into_command(), None);
        assert_eq!(Request::Toggle.into_command(), Some(Command::Toggle));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""state":"stopped""#));
    }

    #[test]
    fn test_notification_serialization() {
        let note = Notification::Event {
            event: ClickerEvent::ClickingStarted { interval_ms: 100 },
        };
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.starts_with(r#"{"type":"event""#));
        assert!(json.contains("clicking_started"));
    }
}
