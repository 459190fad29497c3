//! Key press decoding: raw keycode plus modifier mask in, text out.
//!
//! The keyboard map fetched from the server at startup plays the part of an
//! input method. Without one, key presses still report their raw keycode.

use crate::event::KeyPress;
use anyhow::{Context, Result};
use std::fmt;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, KeyButMask, Keysym};

const NO_SYMBOL: Keysym = 0;
const UNICODE_OFFSET: Keysym = 0x0100_0000;

mod keysym {
    use super::Keysym;

    pub const BACKSPACE: Keysym = 0xff08;
    pub const TAB: Keysym = 0xff09;
    pub const LINEFEED: Keysym = 0xff0a;
    pub const RETURN: Keysym = 0xff0d;
    pub const ESCAPE: Keysym = 0xff1b;
    pub const DELETE: Keysym = 0xffff;
    pub const KP_SPACE: Keysym = 0xff80;
    pub const KP_TAB: Keysym = 0xff89;
    pub const KP_ENTER: Keysym = 0xff8d;
    pub const KP_MULTIPLY: Keysym = 0xffaa;
    pub const KP_9: Keysym = 0xffb9;
    pub const KP_EQUAL: Keysym = 0xffbd;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub caps_lock: bool,
}

impl Modifiers {
    pub fn from_state(state: u16) -> Self {
        let has = |mask: KeyButMask| state & u16::from(mask) != 0;
        Self {
            shift: has(KeyButMask::SHIFT),
            control: has(KeyButMask::CONTROL),
            alt: has(KeyButMask::MOD1),
            caps_lock: has(KeyButMask::LOCK),
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shift={} control={} alt={} caps_lock={}",
            self.shift, self.control, self.alt, self.caps_lock
        )
    }
}

/// Keycode to keysym table, as returned by `GetKeyboardMapping`.
#[derive(Debug, Clone)]
pub struct KeyboardMap {
    keysyms: Vec<Keysym>,
    keysyms_per_keycode: u8,
    min_keycode: u8,
}

impl KeyboardMap {
    pub fn new(min_keycode: u8, keysyms_per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            keysyms,
            keysyms_per_keycode,
            min_keycode,
        }
    }

    pub fn fetch<C: Connection>(conn: &C) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;
        let reply = conn
            .get_keyboard_mapping(min_keycode, count)?
            .reply()
            .context("failed to read keyboard mapping")?;
        Ok(Self::new(
            min_keycode,
            reply.keysyms_per_keycode,
            reply.keysyms,
        ))
    }

    /// Picks the keysym for `keycode` under the given modifiers.
    pub fn keysym(&self, keycode: u8, modifiers: Modifiers) -> Option<Keysym> {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return None;
        }
        let base = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode as usize;
        let column = |col: usize| {
            self.keysyms
                .get(base + col)
                .copied()
                .filter(|&sym| sym != NO_SYMBOL)
        };

        let unshifted = column(0)?;
        let keysym = if modifiers.shift {
            column(1).unwrap_or_else(|| upper_latin1(unshifted))
        } else {
            unshifted
        };

        if modifiers.caps_lock {
            Some(upper_latin1(keysym))
        } else {
            Some(keysym)
        }
    }

    pub fn lookup(&self, keycode: u8, modifiers: Modifiers) -> Option<String> {
        let keysym = self.keysym(keycode, modifiers)?;
        let ch = keysym_to_char(keysym)?;
        let ch = if modifiers.control {
            control_char(ch)
        } else {
            ch
        };
        Some(ch.to_string())
    }
}

fn upper_latin1(keysym: Keysym) -> Keysym {
    match char::from_u32(keysym) {
        Some(ch) if keysym <= 0xff && ch.is_lowercase() => {
            let mut upper = ch.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) if (u as u32) <= 0xff => u as Keysym,
                _ => keysym,
            }
        }
        _ => keysym,
    }
}

fn keysym_to_char(keysym: Keysym) -> Option<char> {
    match keysym {
        0x20..=0x7e | 0xa0..=0xff => char::from_u32(keysym),
        keysym::BACKSPACE => Some('\u{8}'),
        keysym::TAB | keysym::KP_TAB => Some('\t'),
        keysym::LINEFEED => Some('\n'),
        keysym::RETURN | keysym::KP_ENTER => Some('\r'),
        keysym::ESCAPE => Some('\u{1b}'),
        keysym::DELETE => Some('\u{7f}'),
        keysym::KP_SPACE => Some(' '),
        keysym::KP_MULTIPLY..=keysym::KP_9 | keysym::KP_EQUAL => {
            char::from_u32(keysym - keysym::KP_SPACE)
        }
        _ if keysym > UNICODE_OFFSET => char::from_u32(keysym - UNICODE_OFFSET),
        _ => None,
    }
}

fn control_char(ch: char) -> char {
    match ch {
        '@'..='~' => char::from(ch as u8 & 0x1f),
        ' ' => '\0',
        _ => ch,
    }
}

/// Result of decoding one key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    pub keycode: u8,
    pub text: Option<String>,
    pub modifiers: Modifiers,
}

impl fmt::Display for DecodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key pressed: {} text=", self.keycode)?;
        match &self.text {
            Some(text) => write!(f, "\"{}\"", text.escape_debug())?,
            None => f.write_str("none")?,
        }
        write!(f, " {}", self.modifiers)
    }
}

/// Owns the input context for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct TextDecoder {
    context: Option<KeyboardMap>,
}

impl TextDecoder {
    pub fn new(context: Option<KeyboardMap>) -> Self {
        Self { context }
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn decode(&self, key: KeyPress) -> DecodedKey {
        let modifiers = Modifiers::from_state(key.state);
        let text = self
            .context
            .as_ref()
            .and_then(|map| map.lookup(key.keycode, modifiers))
            .filter(|text| !text.is_empty());
        DecodedKey {
            keycode: key.keycode,
            text,
            modifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIFT: u16 = 0x01;
    const LOCK: u16 = 0x02;
    const CONTROL: u16 = 0x04;
    const MOD1: u16 = 0x08;

    /// Tiny US-like layout: keycodes 8.. with two columns each.
    fn us_map() -> KeyboardMap {
        let mut keysyms = vec![NO_SYMBOL; 2 * 60];
        let mut set = |keycode: usize, lower: Keysym, upper: Keysym| {
            keysyms[(keycode - 8) * 2] = lower;
            keysyms[(keycode - 8) * 2 + 1] = upper;
        };
        set(9, keysym::ESCAPE, NO_SYMBOL);
        set(10, '1' as Keysym, '!' as Keysym);
        set(36, keysym::RETURN, NO_SYMBOL);
        set(38, 'a' as Keysym, 'A' as Keysym);
        set(50, 0xffe1, NO_SYMBOL); // Shift_L
        set(51, 0xe9, 0xc9); // eacute / Eacute
        set(52, UNICODE_OFFSET + 0x20ac, NO_SYMBOL); // EuroSign
        set(53, 0xffb7, NO_SYMBOL); // KP_7
        KeyboardMap::new(8, 2, keysyms)
    }

    fn key(keycode: u8, state: u16) -> KeyPress {
        KeyPress { keycode, state }
    }

    #[test]
    fn test_printable_key_decodes_text() {
        let decoder = TextDecoder::new(Some(us_map()));
        let decoded = decoder.decode(key(38, 0));
        assert_eq!(decoded.keycode, 38);
        assert_eq!(decoded.text.as_deref(), Some("a"));
    }

    #[test]
    fn test_shift_selects_second_column() {
        let decoder = TextDecoder::new(Some(us_map()));
        assert_eq!(decoder.decode(key(38, SHIFT)).text.as_deref(), Some("A"));
        assert_eq!(decoder.decode(key(10, SHIFT)).text.as_deref(), Some("!"));
    }

    #[test]
    fn test_shift_on_single_column_letter_uppercases() {
        // Only the lowercase keysym is listed, as some keymaps do.
        let map = KeyboardMap::new(8, 2, vec!['b' as Keysym, NO_SYMBOL, '5' as Keysym, NO_SYMBOL]);
        let decoder = TextDecoder::new(Some(map));
        assert_eq!(decoder.decode(key(8, SHIFT)).text.as_deref(), Some("B"));
        assert_eq!(decoder.decode(key(8, 0)).text.as_deref(), Some("b"));
        assert_eq!(decoder.decode(key(9, SHIFT)).text.as_deref(), Some("5"));
    }

    #[test]
    fn test_caps_lock_uppercases_letters_only() {
        let decoder = TextDecoder::new(Some(us_map()));
        assert_eq!(decoder.decode(key(38, LOCK)).text.as_deref(), Some("A"));
        assert_eq!(decoder.decode(key(51, LOCK)).text.as_deref(), Some("É"));
        assert_eq!(decoder.decode(key(10, LOCK)).text.as_deref(), Some("1"));
    }

    #[test]
    fn test_modifier_only_key_has_no_text() {
        let decoder = TextDecoder::new(Some(us_map()));
        let decoded = decoder.decode(key(50, 0));
        assert_eq!(decoded.keycode, 50);
        assert_eq!(decoded.text, None);
    }

    #[test]
    fn test_unmapped_keycode_still_reports_code() {
        let decoder = TextDecoder::new(Some(us_map()));
        let decoded = decoder.decode(key(200, 0));
        assert_eq!(decoded.keycode, 200);
        assert_eq!(decoded.text, None);
    }

    #[test]
    fn test_without_context_degrades_to_raw_code() {
        let decoder = TextDecoder::default();
        assert!(!decoder.has_context());
        let decoded = decoder.decode(key(38, CONTROL));
        assert_eq!(decoded.keycode, 38);
        assert_eq!(decoded.text, None);
        assert!(decoded.modifiers.control);
    }

    #[test]
    fn test_function_and_keypad_keys() {
        let decoder = TextDecoder::new(Some(us_map()));
        assert_eq!(decoder.decode(key(9, 0)).text.as_deref(), Some("\u{1b}"));
        assert_eq!(decoder.decode(key(36, 0)).text.as_deref(), Some("\r"));
        assert_eq!(decoder.decode(key(53, 0)).text.as_deref(), Some("7"));
        assert_eq!(decoder.decode(key(52, 0)).text.as_deref(), Some("€"));
    }

    #[test]
    fn test_control_produces_c0_characters() {
        let decoder = TextDecoder::new(Some(us_map()));
        assert_eq!(decoder.decode(key(38, CONTROL)).text.as_deref(), Some("\u{1}"));
        assert_eq!(
            decoder.decode(key(38, CONTROL | SHIFT)).text.as_deref(),
            Some("\u{1}")
        );
    }

    #[test]
    fn test_modifier_flags_are_independent() {
        assert_eq!(
            Modifiers::from_state(CONTROL),
            Modifiers {
                shift: false,
                control: true,
                alt: false,
                caps_lock: false
            }
        );
        assert_eq!(
            Modifiers::from_state(SHIFT | MOD1),
            Modifiers {
                shift: true,
                control: false,
                alt: true,
                caps_lock: false
            }
        );
        assert_eq!(
            Modifiers::from_state(LOCK),
            Modifiers {
                caps_lock: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_modifiers_ignore_button_bits() {
        // Button1 held during the key press.
        assert_eq!(Modifiers::from_state(0x100), Modifiers::default());
    }

    #[test]
    fn test_report_line() {
        let decoded = DecodedKey {
            keycode: 36,
            text: Some("\r".into()),
            modifiers: Modifiers {
                shift: true,
                ..Default::default()
            },
        };
        assert_eq!(
            decoded.to_string(),
            "Key pressed: 36 text=\"\\r\" shift=true control=false alt=false caps_lock=false"
        );

        let bare = DecodedKey {
            keycode: 50,
            text: None,
            modifiers: Modifiers::default(),
        };
        assert_eq!(
            bare.to_string(),
            "Key pressed: 50 text=none shift=false control=false alt=false caps_lock=false"
        );
    }
}
