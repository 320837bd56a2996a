//! Key and button definitions
//!
//! Every physical input the listener can observe is described by an
//! [`InputKey`], and every `InputKey` maps to exactly one canonical token.
//! Tokens are the vocabulary that chords are written in.

/// Non-character keys, named the way chords refer to them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    CtrlLeft,
    CtrlRight,
    ShiftLeft,
    ShiftRight,
    AltLeft,
    AltGr,
    CmdLeft,
    CmdRight,
    /// Function key F1..=F12
    F(u8),
    Escape,
    Enter,
    Tab,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    CapsLock,
    NumLock,
    ScrollLock,
    PrintScreen,
    Pause,
    Fn,
}

impl NamedKey {
    /// Canonical token for this key
    pub fn token(&self) -> String {
        let name = match self {
            NamedKey::CtrlLeft => "ctrl_l",
            NamedKey::CtrlRight => "ctrl_r",
            NamedKey::ShiftLeft => "shift_l",
            NamedKey::ShiftRight => "shift_r",
            NamedKey::AltLeft => "alt_l",
            NamedKey::AltGr => "alt_gr",
            NamedKey::CmdLeft => "cmd_l",
            NamedKey::CmdRight => "cmd_r",
            NamedKey::F(n) => return format!("f{n}"),
            NamedKey::Escape => "esc",
            NamedKey::Enter => "enter",
            NamedKey::Tab => "tab",
            NamedKey::Space => "space",
            NamedKey::Backspace => "backspace",
            NamedKey::Delete => "delete",
            NamedKey::Insert => "insert",
            NamedKey::Home => "home",
            NamedKey::End => "end",
            NamedKey::PageUp => "page_up",
            NamedKey::PageDown => "page_down",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::CapsLock => "caps_lock",
            NamedKey::NumLock => "num_lock",
            NamedKey::ScrollLock => "scroll_lock",
            NamedKey::PrintScreen => "print_screen",
            NamedKey::Pause => "pause",
            NamedKey::Fn => "fn",
        };
        name.to_string()
    }
}

/// Mouse buttons, kept in their own `mouse_` token namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// First side button ("back")
    X1,
    /// Second side button ("forward")
    X2,
    /// Any other button, by platform button number
    Other(u8),
}

impl MouseButton {
    pub fn token(&self) -> String {
        match self {
            MouseButton::Left => "mouse_left".to_string(),
            MouseButton::Right => "mouse_right".to_string(),
            MouseButton::Middle => "mouse_middle".to_string(),
            MouseButton::X1 => "mouse_x1".to_string(),
            MouseButton::X2 => "mouse_x2".to_string(),
            MouseButton::Other(n) => format!("mouse_button_{n}"),
        }
    }
}

/// A single physical key or button as reported by the input hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKey {
    Named(NamedKey),
    /// Key that produces a character; holds the character it typed
    Character(char),
    /// Key with no known name or character, by platform key code
    RawCode(u32),
    Mouse(MouseButton),
}

impl InputKey {
    /// Canonical lowercase token used for chord matching
    pub fn token(&self) -> String {
        match self {
            InputKey::Named(key) => key.token(),
            InputKey::Character(c) => c.to_lowercase().collect(),
            InputKey::RawCode(code) => format!("keycode_{code}"),
            InputKey::Mouse(button) => button.token(),
        }
    }
}

/// A press or release observed by the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(InputKey),
    Released(InputKey),
}
