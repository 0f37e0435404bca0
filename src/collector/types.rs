//! Raw input event types produced by platform hooks.
//!
//! A [`KeyEvent`] carries the key identity so the sensitive-context tracker can
//! classify it. Key events are consumed once by the tracker and are never
//! persisted verbatim: persistence only ever sees [`KeystrokeToken`]s.
//!
//! [`KeystrokeToken`]: crate::storage::KeystrokeToken

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keys without a printable character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Return,
    Tab,
    Backspace,
    Space,
    Escape,
    Shift,
    Control,
    Alt,
    Meta,
    Up,
    Down,
    Left,
    Right,
    Other(String),
}

impl NamedKey {
    fn name(&self) -> &str {
        match self {
            NamedKey::Enter => "enter",
            NamedKey::Return => "return",
            NamedKey::Tab => "tab",
            NamedKey::Backspace => "backspace",
            NamedKey::Space => "space",
            NamedKey::Escape => "esc",
            NamedKey::Shift => "shift",
            NamedKey::Control => "ctrl",
            NamedKey::Alt => "alt",
            NamedKey::Meta => "meta",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::Other(name) => name,
        }
    }

    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "enter" => NamedKey::Enter,
            "return" => NamedKey::Return,
            "tab" => NamedKey::Tab,
            "backspace" => NamedKey::Backspace,
            "space" => NamedKey::Space,
            "esc" | "escape" => NamedKey::Escape,
            "shift" => NamedKey::Shift,
            "ctrl" | "control" => NamedKey::Control,
            "alt" => NamedKey::Alt,
            "meta" | "cmd" | "super" => NamedKey::Meta,
            "up" => NamedKey::Up,
            "down" => NamedKey::Down,
            "left" => NamedKey::Left,
            "right" => NamedKey::Right,
            other => NamedKey::Other(other.to_string()),
        }
    }
}

/// Identity of a pressed key: a character or a named key.
///
/// The textual form is the character itself for `Char` keys and `<name>` for
/// named keys, e.g. `a`, `<enter>`, `<shift>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Char(char),
    Named(NamedKey),
}

impl Key {
    /// Whether this key terminates a line of input (Enter/Return).
    pub fn is_submit(&self) -> bool {
        matches!(
            self,
            Key::Named(NamedKey::Enter) | Key::Named(NamedKey::Return) | Key::Char('\n' | '\r')
        )
    }

    /// The printable character, if any.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Key::Char(c) => Some(*c),
            Key::Named(NamedKey::Space) => Some(' '),
            Key::Named(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Named(named) => write!(f, "<{}>", named.name()),
        }
    }
}

/// Error parsing a key from its textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyError(String);

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid key: {:?}", self.0)
    }
}

impl std::error::Error for ParseKeyError {}

impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Key::Char(c)),
            _ => {
                let name = s
                    .strip_prefix('<')
                    .and_then(|rest| rest.strip_suffix('>'))
                    .unwrap_or(s)
                    .trim();
                if name.is_empty() {
                    return Err(ParseKeyError(s.to_string()));
                }
                Ok(Key::Named(NamedKey::from_name(name)))
            }
        }
    }
}

impl TryFrom<String> for Key {
    type Error = ParseKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

/// A key-down event as delivered by an input hook.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: Key,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key }
    }
}
