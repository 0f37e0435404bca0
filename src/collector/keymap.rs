//! Virtual-key code translation.
//!
//! Maps Windows virtual-key codes to [`Key`] using a US keyboard layout. The
//! table is plain data so it is tested on every platform.

use crate::collector::types::{Key, NamedKey};

/// Modifier state sampled when the key went down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub caps_lock: bool,
}

const SHIFTED_DIGITS: [char; 10] = [')', '!', '@', '#', '$', '%', '^', '&', '*', '('];

/// Translate a virtual-key code into a [`Key`].
pub fn key_from_virtual_key(vk: u32, modifiers: Modifiers) -> Key {
    match vk {
        0x08 => Key::Named(NamedKey::Backspace),
        0x09 => Key::Named(NamedKey::Tab),
        0x0D => Key::Named(NamedKey::Enter),
        0x1B => Key::Named(NamedKey::Escape),
        0x20 => Key::Named(NamedKey::Space),
        0x10 | 0xA0 | 0xA1 => Key::Named(NamedKey::Shift),
        0x11 | 0xA2 | 0xA3 => Key::Named(NamedKey::Control),
        0x12 | 0xA4 | 0xA5 => Key::Named(NamedKey::Alt),
        0x5B | 0x5C => Key::Named(NamedKey::Meta),
        0x25 => Key::Named(NamedKey::Left),
        0x26 => Key::Named(NamedKey::Up),
        0x27 => Key::Named(NamedKey::Right),
        0x28 => Key::Named(NamedKey::Down),
        // 0-9
        0x30..=0x39 => {
            let digit = (vk - 0x30) as usize;
            if modifiers.shift {
                Key::Char(SHIFTED_DIGITS[digit])
            } else {
                Key::Char(char::from(b'0' + digit as u8))
            }
        }
        // A-Z
        0x41..=0x5A => {
            let letter = char::from(vk as u8);
            if modifiers.shift != modifiers.caps_lock {
                Key::Char(letter)
            } else {
                Key::Char(letter.to_ascii_lowercase())
            }
        }
        // Numpad 0-9
        0x60..=0x69 => Key::Char(char::from(b'0' + (vk - 0x60) as u8)),
        0x6A => Key::Char('*'),
        0x6B => Key::Char('+'),
        0x6D => Key::Char('-'),
        0x6E => Key::Char('.'),
        0x6F => Key::Char('/'),
        // F1-F24
        0x70..=0x87 => Key::Named(NamedKey::Other(format!("f{}", vk - 0x6F))),
        0xBA..=0xC0 | 0xDB..=0xDE => oem_key(vk, modifiers.shift),
        other => Key::Named(NamedKey::Other(format!("vk{other:02x}"))),
    }
}

fn oem_key(vk: u32, shift: bool) -> Key {
    let (plain, shifted) = match vk {
        0xBA => (';', ':'),
        0xBB => ('=', '+'),
        0xBC => (',', '<'),
        0xBD => ('-', '_'),
        0xBE => ('.', '>'),
        0xBF => ('/', '?'),
        0xC0 => ('`', '~'),
        0xDB => ('[', '{'),
        0xDC => ('\\', '|'),
        0xDD => (']', '}'),
        0xDE => ('\'', '"'),
        other => return Key::Named(NamedKey::Other(format!("vk{other:02x}"))),
    };
    Key::Char(if shift { shifted } else { plain })
}
