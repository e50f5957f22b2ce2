//! Key mapping for terminal input
//!
//! Converts key events to VT sequences for PTY input.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Input-related terminal modes set by the program in the terminal
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputModes {
    /// DECCKM: arrows send `ESC O x`
    pub application_cursor: bool,
    /// Bracketed paste (mode 2004)
    pub bracketed_paste: bool,
}

impl InputModes {
    pub fn from_screen(screen: &vt100::Screen) -> Self {
        Self {
            application_cursor: screen.application_cursor(),
            bracketed_paste: screen.bracketed_paste(),
        }
    }
}

/// Key mapper for converting key events to bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to bytes for PTY
    pub fn map(event: &KeyEvent, modes: &InputModes) -> Option<Vec<u8>> {
        let mods = Modifiers::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) => Some(Self::map_char(ch, mods)),
            KeyCode::Enter => Some(vec![0x0D]),
            KeyCode::Backspace => {
                if mods.contains(Modifiers::ALT) {
                    Some(vec![0x1B, 0x7F])
                } else {
                    Some(vec![0x7F])
                }
            }
            KeyCode::Tab => Some(vec![0x09]),
            KeyCode::BackTab => Some(b"\x1b[Z".to_vec()),
            KeyCode::Esc => Some(vec![0x1B]),

            KeyCode::Up => Some(Self::arrow_key(b'A', mods, modes)),
            KeyCode::Down => Some(Self::arrow_key(b'B', mods, modes)),
            KeyCode::Right => Some(Self::arrow_key(b'C', mods, modes)),
            KeyCode::Left => Some(Self::arrow_key(b'D', mods, modes)),

            KeyCode::Home => Some(Self::special_key(b'H', mods)),
            KeyCode::End => Some(Self::special_key(b'F', mods)),
            KeyCode::PageUp => Some(Self::tilde_key(5, mods)),
            KeyCode::PageDown => Some(Self::tilde_key(6, mods)),
            KeyCode::Insert => Some(Self::tilde_key(2, mods)),
            KeyCode::Delete => Some(Self::tilde_key(3, mods)),

            KeyCode::F(n) => {
                let bytes = Self::function_key(n, mods);
                (!bytes.is_empty()).then_some(bytes)
            }

            _ => None,
        }
    }

    /// Wrap pasted text for the child
    pub fn paste(text: &str, modes: &InputModes) -> Vec<u8> {
        if modes.bracketed_paste {
            let mut bytes = b"\x1b[200~".to_vec();
            bytes.extend_from_slice(text.as_bytes());
            bytes.extend_from_slice(b"\x1b[201~");
            bytes
        } else {
            text.replace("\r\n", "\r").replace('\n', "\r").into_bytes()
        }
    }

    fn map_char(ch: char, mods: Modifiers) -> Vec<u8> {
        if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::ALT) {
            if let Some(code) = Self::control_code(ch) {
                return vec![code];
            }
        }

        if mods.contains(Modifiers::CTRL) && mods.contains(Modifiers::ALT) {
            if let Some(code) = Self::control_code(ch) {
                return vec![0x1B, code];
            }
        }

        // Alt + key = ESC + key
        if mods.contains(Modifiers::ALT) {
            let mut bytes = vec![0x1B];
            bytes.extend(ch.to_string().as_bytes());
            return bytes;
        }

        ch.to_string().into_bytes()
    }

    fn control_code(ch: char) -> Option<u8> {
        match ch {
            'a'..='z' => Some(ch as u8 - b'a' + 1),
            'A'..='Z' => Some(ch as u8 - b'A' + 1),
            '@' | '`' | ' ' | '2' => Some(0x00),
            '[' | '3' => Some(0x1B),
            '\\' | '4' => Some(0x1C),
            ']' | '5' => Some(0x1D),
            '^' | '~' | '6' => Some(0x1E),
            '_' | '?' | '7' => Some(0x1F),
            _ => None,
        }
    }

    fn arrow_key(key: u8, mods: Modifiers, modes: &InputModes) -> Vec<u8> {
        if !mods.is_empty() {
            let mod_code = Self::modifier_code(mods);
            format!("\x1b[1;{}{}", mod_code, key as char).into_bytes()
        } else if modes.application_cursor {
            vec![0x1B, b'O', key]
        } else {
            vec![0x1B, b'[', key]
        }
    }

    /// Home / End
    fn special_key(key: u8, mods: Modifiers) -> Vec<u8> {
        if mods.is_empty() {
            vec![0x1B, b'[', key]
        } else {
            let mod_code = Self::modifier_code(mods);
            format!("\x1b[1;{}{}", mod_code, key as char).into_bytes()
        }
    }

    /// PageUp, PageDown, Insert, Delete
    fn tilde_key(code: u8, mods: Modifiers) -> Vec<u8> {
        if mods.is_empty() {
            format!("\x1b[{}~", code).into_bytes()
        } else {
            let mod_code = Self::modifier_code(mods);
            format!("\x1b[{};{}~", code, mod_code).into_bytes()
        }
    }

    fn function_key(n: u8, mods: Modifiers) -> Vec<u8> {
        let code = match n {
            1..=4 => {
                let key = b"PQRS"[(n - 1) as usize] as char;
                return if mods.is_empty() {
                    format!("\x1bO{}", key).into_bytes()
                } else {
                    format!("\x1b[1;{}{}", Self::modifier_code(mods), key).into_bytes()
                };
            }
            5 => 15,
            6 => 17,
            7 => 18,
            8 => 19,
            9 => 20,
            10 => 21,
            11 => 23,
            12 => 24,
            _ => return vec![],
        };
        Self::tilde_key(code, mods)
    }

    /// xterm modifier parameter
    fn modifier_code(mods: Modifiers) -> u8 {
        1 + if mods.contains(Modifiers::SHIFT) { 1 } else { 0 }
            + if mods.contains(Modifiers::ALT) { 2 } else { 0 }
            + if mods.contains(Modifiers::CTRL) { 4 } else { 0 }
    }
}
