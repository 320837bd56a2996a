//! System-wide input hook backed by rdev
//!
//! rdev delivers keyboard and mouse events through one blocking `listen`
//! call that runs on a dedicated thread for the rest of the process. It
//! has no unhook call, so the hook is installed once and the listener
//! detaches from it instead of tearing it down.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rdev::{Button, Event, EventType, Key};
use tracing::{error, info};

use super::keys::{InputEvent, InputKey, MouseButton, NamedKey};
use super::listener::{EventSink, HotkeyError, InputHook};

/// How long `listen` gets to report an installation error
const STARTUP_GRACE: Duration = Duration::from_millis(300);

/// Global keyboard and mouse hook using `rdev::listen`
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevHook;

/// Whether `install` is still waiting to hear about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Starting,
    Running,
}

impl InputHook for RdevHook {
    fn install(&self, sink: EventSink) -> Result<(), HotkeyError> {
        let (failed_tx, failed_rx) = mpsc::channel::<String>();
        let phase = Arc::new(Mutex::new(Phase::Starting));
        let thread_phase = Arc::clone(&phase);

        thread::Builder::new()
            .name("input-hook".to_string())
            .spawn(move || {
                info!("input hook thread started");

                let input_sink = sink.clone();
                let mut translator = Translator::default();
                let result = rdev::listen(move |event| {
                    if let Some(input) = translator.translate(&event) {
                        input_sink.input(input);
                    }
                });

                let message = match result {
                    Err(e) => format!("{e:?}"),
                    Ok(()) => "input hook exited".to_string(),
                };
                error!(%message, "input hook stopped");

                let phase = thread_phase.lock();
                if *phase == Phase::Starting {
                    let _ = failed_tx.send(message);
                } else {
                    drop(phase);
                    sink.hook_failed(message);
                }
            })
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        // `listen` only returns on failure; silence means it is running
        match failed_rx.recv_timeout(STARTUP_GRACE) {
            Ok(message) => Err(HotkeyError::HookInstallFailed(message)),
            Err(RecvTimeoutError::Timeout) => {
                let mut phase = phase.lock();
                // a failure that raced the timeout is still an install failure
                if let Ok(message) = failed_rx.try_recv() {
                    return Err(HotkeyError::HookInstallFailed(message));
                }
                *phase = Phase::Running;
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => Err(HotkeyError::HookInstallFailed(
                "input hook thread exited".to_string(),
            )),
        }
    }
}

/// Turns rdev events into presses and releases
///
/// Character keys resolve through the text the OS reports for the press,
/// so the token follows the active keyboard layout. rdev reports no text
/// on release, so each release reuses the key its press resolved to.
#[derive(Debug, Default)]
struct Translator {
    pressed: Vec<(Key, InputKey)>,
}

impl Translator {
    /// Normalize an rdev event; motion and wheel events are not inputs
    fn translate(&mut self, event: &Event) -> Option<InputEvent> {
        match event.event_type {
            EventType::KeyPress(key) => {
                let input = resolve_key(key, event.name.as_deref());
                self.pressed.retain(|(k, _)| *k != key);
                self.pressed.push((key, input));
                Some(InputEvent::Pressed(input))
            }
            EventType::KeyRelease(key) => {
                let input = match self.pressed.iter().position(|(k, _)| *k == key) {
                    Some(i) => self.pressed.swap_remove(i).1,
                    None => from_key(key),
                };
                Some(InputEvent::Released(input))
            }
            EventType::ButtonPress(button) => {
                Some(InputEvent::Pressed(InputKey::Mouse(from_button(button))))
            }
            EventType::ButtonRelease(button) => {
                Some(InputEvent::Released(InputKey::Mouse(from_button(button))))
            }
            EventType::MouseMove { .. } | EventType::Wheel { .. } => None,
        }
    }
}

/// Named keys by identity, character keys by the text they produced
fn resolve_key(key: Key, name: Option<&str>) -> InputKey {
    if let Some(named) = named_key(key) {
        return InputKey::Named(named);
    }
    match name.and_then(produced_char) {
        Some(c) => InputKey::Character(c),
        None => from_key(key),
    }
}

/// The single printable character in `name`, lowercased
///
/// Control characters, which Ctrl combinations produce, don't count.
fn produced_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    let c = chars.next()?;
    if chars.next().is_some() || c.is_control() || c.is_whitespace() {
        return None;
    }
    c.to_lowercase().next()
}

fn from_key(key: Key) -> InputKey {
    if let Some(named) = named_key(key) {
        return InputKey::Named(named);
    }
    if let Some(c) = base_char(key) {
        return InputKey::Character(c);
    }
    match key {
        Key::Unknown(code) => InputKey::RawCode(code),
        // every other rdev key is covered above
        _ => InputKey::RawCode(0),
    }
}

fn named_key(key: Key) -> Option<NamedKey> {
    let named = match key {
        Key::ControlLeft => NamedKey::CtrlLeft,
        Key::ControlRight => NamedKey::CtrlRight,
        Key::ShiftLeft => NamedKey::ShiftLeft,
        Key::ShiftRight => NamedKey::ShiftRight,
        Key::Alt => NamedKey::AltLeft,
        Key::AltGr => NamedKey::AltGr,
        Key::MetaLeft => NamedKey::CmdLeft,
        Key::MetaRight => NamedKey::CmdRight,
        Key::F1 => NamedKey::F(1),
        Key::F2 => NamedKey::F(2),
        Key::F3 => NamedKey::F(3),
        Key::F4 => NamedKey::F(4),
        Key::F5 => NamedKey::F(5),
        Key::F6 => NamedKey::F(6),
        Key::F7 => NamedKey::F(7),
        Key::F8 => NamedKey::F(8),
        Key::F9 => NamedKey::F(9),
        Key::F10 => NamedKey::F(10),
        Key::F11 => NamedKey::F(11),
        Key::F12 => NamedKey::F(12),
        Key::Escape => NamedKey::Escape,
        Key::Return | Key::KpReturn => NamedKey::Enter,
        Key::Tab => NamedKey::Tab,
        Key::Space => NamedKey::Space,
        Key::Backspace => NamedKey::Backspace,
        Key::Delete | Key::KpDelete => NamedKey::Delete,
        Key::Insert => NamedKey::Insert,
        Key::Home => NamedKey::Home,
        Key::End => NamedKey::End,
        Key::PageUp => NamedKey::PageUp,
        Key::PageDown => NamedKey::PageDown,
        Key::UpArrow => NamedKey::Up,
        Key::DownArrow => NamedKey::Down,
        Key::LeftArrow => NamedKey::Left,
        Key::RightArrow => NamedKey::Right,
        Key::CapsLock => NamedKey::CapsLock,
        Key::NumLock => NamedKey::NumLock,
        Key::ScrollLock => NamedKey::ScrollLock,
        Key::PrintScreen => NamedKey::PrintScreen,
        Key::Pause => NamedKey::Pause,
        Key::Function => NamedKey::Fn,
        _ => return None,
    };
    Some(named)
}

/// Character a key produces with no modifiers held
fn base_char(key: Key) -> Option<char> {
    let c = match key {
        Key::KeyA => 'a',
        Key::KeyB => 'b',
        Key::KeyC => 'c',
        Key::KeyD => 'd',
        Key::KeyE => 'e',
        Key::KeyF => 'f',
        Key::KeyG => 'g',
        Key::KeyH => 'h',
        Key::KeyI => 'i',
        Key::KeyJ => 'j',
        Key::KeyK => 'k',
        Key::KeyL => 'l',
        Key::KeyM => 'm',
        Key::KeyN => 'n',
        Key::KeyO => 'o',
        Key::KeyP => 'p',
        Key::KeyQ => 'q',
        Key::KeyR => 'r',
        Key::KeyS => 's',
        Key::KeyT => 't',
        Key::KeyU => 'u',
        Key::KeyV => 'v',
        Key::KeyW => 'w',
        Key::KeyX => 'x',
        Key::KeyY => 'y',
        Key::KeyZ => 'z',
        Key::Num0 | Key::Kp0 => '0',
        Key::Num1 | Key::Kp1 => '1',
        Key::Num2 | Key::Kp2 => '2',
        Key::Num3 | Key::Kp3 => '3',
        Key::Num4 | Key::Kp4 => '4',
        Key::Num5 | Key::Kp5 => '5',
        Key::Num6 | Key::Kp6 => '6',
        Key::Num7 | Key::Kp7 => '7',
        Key::Num8 | Key::Kp8 => '8',
        Key::Num9 | Key::Kp9 => '9',
        Key::BackQuote => '`',
        Key::Minus | Key::KpMinus => '-',
        Key::Equal => '=',
        Key::KpPlus => '+',
        Key::KpMultiply => '*',
        Key::Slash | Key::KpDivide => '/',
        Key::LeftBracket => '[',
        Key::RightBracket => ']',
        Key::SemiColon => ';',
        Key::Quote => '\'',
        Key::BackSlash | Key::IntlBackslash => '\\',
        Key::Comma => ',',
        Key::Dot => '.',
        _ => return None,
    };
    Some(c)
}

fn from_button(button: Button) -> MouseButton {
    match button {
        Button::Left => MouseButton::Left,
        Button::Right => MouseButton::Right,
        Button::Middle => MouseButton::Middle,
        Button::Unknown(n) => side_button(n).unwrap_or(MouseButton::Other(n)),
    }
}

/// Platform numbering of the two side buttons
fn side_button(n: u8) -> Option<MouseButton> {
    #[cfg(target_os = "windows")]
    let (x1, x2) = (1, 2);
    #[cfg(target_os = "macos")]
    let (x1, x2) = (3, 4);
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let (x1, x2) = (8, 9);

    if n == x1 {
        Some(MouseButton::X1)
    } else if n == x2 {
        Some(MouseButton::X2)
    } else {
        None
    }
}
