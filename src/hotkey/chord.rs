//! Hotkey chord parsing
//!
//! Turns a human-readable hotkey such as `"Ctrl+Shift+C"`, `"F6"` or
//! `"mouse_x1"` into the ordered list of canonical tokens that must all be
//! held at once.
//!
//! Parsing is permissive: words that are not known key names are kept as
//! literal tokens. Such a chord can never be satisfied by real input.
//! The plain modifier words map to the left-hand key only, so `"Ctrl"` is
//! not satisfied by the right Ctrl key.

use std::fmt;

use super::listener::HotkeyError;

/// Ordered, non-empty list of canonical tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyChord {
    source: String,
    tokens: Vec<String>,
}

impl HotkeyChord {
    /// Parse a hotkey string
    ///
    /// Only a blank string is rejected. Every `+`-separated part is kept,
    /// so a stray `+` leaves an empty token that no key ever produces.
    pub fn parse(spec: &str) -> Result<Self, HotkeyError> {
        if spec.trim().is_empty() {
            return Err(HotkeyError::InvalidChordSpec(spec.to_string()));
        }

        let tokens = spec
            .split('+')
            .map(|part| canonicalize(&part.trim().to_lowercase()))
            .collect();

        Ok(Self {
            source: spec.trim().to_string(),
            tokens,
        })
    }

    /// Tokens in the order they were written
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The string this chord was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `token` is one of the chord's keys
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

impl fmt::Display for HotkeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join("+"))
    }
}

/// Map one lowercased chord word to its token
fn canonicalize(part: &str) -> String {
    match part {
        "ctrl" => "ctrl_l".to_string(),
        "alt" => "alt_l".to_string(),
        "shift" => "shift_l".to_string(),
        _ => function_key(part)
            .map(|n| format!("f{n}"))
            .unwrap_or_else(|| part.to_string()),
    }
}

/// F1 to F12 written as `f<digits>`, e.g. `f06`
fn function_key(part: &str) -> Option<u8> {
    let digits = part.strip_prefix('f')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u8 = digits.parse().ok()?;
    (1..=12).contains(&n).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(spec: &str) -> Vec<String> {
        HotkeyChord::parse(spec).unwrap().tokens().to_vec()
    }

    #[test]
    fn test_single_function_key() {
        assert_eq!(tokens("F6"), vec!["f6"]);
    }

    #[test]
    fn test_modifiers_map_to_left_variant() {
        assert_eq!(tokens("ctrl+f6"), vec!["ctrl_l", "f6"]);
        assert_eq!(tokens("Ctrl+Shift+C"), vec!["ctrl_l", "shift_l", "c"]);
        assert_eq!(tokens("Alt+X"), vec!["alt_l", "x"]);
    }

    #[test]
    fn test_whitespace_and_case_are_normalized() {
        assert_eq!(tokens("  CTRL +  a "), vec!["ctrl_l", "a"]);
    }

    #[test]
    fn test_mouse_buttons_pass_through() {
        assert_eq!(tokens("mouse_x1"), vec!["mouse_x1"]);
        assert_eq!(tokens("Ctrl+Mouse_Left"), vec!["ctrl_l", "mouse_left"]);
    }

    #[test]
    fn test_unknown_words_are_kept_literally() {
        assert_eq!(tokens("Hyper+F13"), vec!["hyper", "f13"]);
    }

    #[test]
    fn test_empty_chord_is_rejected() {
        assert!(matches!(
            HotkeyChord::parse(""),
            Err(HotkeyError::InvalidChordSpec(_))
        ));
        assert!(matches!(
            HotkeyChord::parse("  "),
            Err(HotkeyError::InvalidChordSpec(_))
        ));
    }

    #[test]
    fn test_empty_parts_are_kept() {
        assert_eq!(tokens("Ctrl+Shift+"), vec!["ctrl_l", "shift_l", ""]);
        assert_eq!(tokens("F6+"), vec!["f6", ""]);
        assert_eq!(tokens(" + "), vec!["", ""]);
    }

    #[test]
    fn test_function_key_numbers_are_normalized() {
        assert_eq!(tokens("F06"), vec!["f6"]);
        assert_eq!(tokens("Ctrl+f012"), vec!["ctrl_l", "f12"]);
        assert_eq!(tokens("F13"), vec!["f13"]);
        assert_eq!(tokens("F0"), vec!["f0"]);
        assert_eq!(tokens("f"), vec!["f"]);
        assert_eq!(tokens("f+1"), vec!["f", "1"]);
    }

    #[test]
    fn test_display_and_source() {
        let chord = HotkeyChord::parse(" Ctrl+F6 ").unwrap();
        assert_eq!(chord.to_string(), "ctrl_l+f6");
        assert_eq!(chord.source(), "Ctrl+F6");
        assert!(chord.contains("f6"));
        assert!(!chord.contains("ctrl_r"));
    }
}
