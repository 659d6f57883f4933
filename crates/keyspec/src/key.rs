use serde::{Deserialize, Serialize};

/// Non-modifier keys addressable from action strings.
///
/// Discriminants are macOS virtual keycodes (HIToolbox values) for the
/// subset carried here: letters, digits, common named keys, and F1-F20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum Key {
    A = 0x00,
    S = 0x01,
    D = 0x02,
    F = 0x03,
    H = 0x04,
    G = 0x05,
    Z = 0x06,
    X = 0x07,
    C = 0x08,
    V = 0x09,
    B = 0x0B,
    Q = 0x0C,
    W = 0x0D,
    E = 0x0E,
    R = 0x0F,
    Y = 0x10,
    T = 0x11,
    Digit1 = 0x12,
    Digit2 = 0x13,
    Digit3 = 0x14,
    Digit4 = 0x15,
    Digit6 = 0x16,
    Digit5 = 0x17,
    Digit9 = 0x19,
    Digit7 = 0x1A,
    Digit8 = 0x1C,
    Digit0 = 0x1D,
    O = 0x1F,
    U = 0x20,
    I = 0x22,
    P = 0x23,
    L = 0x25,
    J = 0x26,
    K = 0x28,
    N = 0x2D,
    M = 0x2E,
    Return = 0x24,
    Tab = 0x30,
    Space = 0x31,
    Backspace = 0x33,
    Escape = 0x35,
    ForwardDelete = 0x75,
    Home = 0x73,
    End = 0x77,
    PageUp = 0x74,
    PageDown = 0x79,
    LeftArrow = 0x7B,
    RightArrow = 0x7C,
    DownArrow = 0x7D,
    UpArrow = 0x7E,
    F1 = 0x7A,
    F2 = 0x78,
    F3 = 0x63,
    F4 = 0x76,
    F5 = 0x60,
    F6 = 0x61,
    F7 = 0x62,
    F8 = 0x64,
    F9 = 0x65,
    F10 = 0x6D,
    F11 = 0x67,
    F12 = 0x6F,
    F13 = 0x69,
    F14 = 0x6B,
    F15 = 0x71,
    F16 = 0x6A,
    F17 = 0x40,
    F18 = 0x4F,
    F19 = 0x50,
    F20 = 0x5A,
}

/// Named key specs that are longer than a single character.
const NAMED: &[(&str, Key)] = &[
    ("enter", Key::Return),
    ("return", Key::Return),
    ("tab", Key::Tab),
    ("space", Key::Space),
    ("backspace", Key::Backspace),
    ("delete", Key::ForwardDelete),
    ("esc", Key::Escape),
    ("escape", Key::Escape),
    ("up", Key::UpArrow),
    ("down", Key::DownArrow),
    ("left", Key::LeftArrow),
    ("right", Key::RightArrow),
    ("home", Key::Home),
    ("end", Key::End),
    ("pageup", Key::PageUp),
    ("pagedown", Key::PageDown),
];

impl Key {
    /// Resolve a lowercase key spec: a letter, a digit, a named key, or a
    /// numbered function key (`f1`..`f20`).
    pub fn from_spec(spec: &str) -> Option<Self> {
        if let Some(n) = spec
            .strip_prefix('f')
            .and_then(|digits| digits.parse::<u8>().ok())
            && let Some(key) = Self::function(n)
        {
            return Some(key);
        }
        let mut chars = spec.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_char(c);
        }
        NAMED.iter().find(|(name, _)| *name == spec).map(|(_, k)| *k)
    }

    /// Canonical spec name for this key.
    pub fn to_spec(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
            Self::D => "d",
            Self::E => "e",
            Self::F => "f",
            Self::G => "g",
            Self::H => "h",
            Self::I => "i",
            Self::J => "j",
            Self::K => "k",
            Self::L => "l",
            Self::M => "m",
            Self::N => "n",
            Self::O => "o",
            Self::P => "p",
            Self::Q => "q",
            Self::R => "r",
            Self::S => "s",
            Self::T => "t",
            Self::U => "u",
            Self::V => "v",
            Self::W => "w",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::Digit0 => "0",
            Self::Digit1 => "1",
            Self::Digit2 => "2",
            Self::Digit3 => "3",
            Self::Digit4 => "4",
            Self::Digit5 => "5",
            Self::Digit6 => "6",
            Self::Digit7 => "7",
            Self::Digit8 => "8",
            Self::Digit9 => "9",
            Self::Return => "enter",
            Self::Tab => "tab",
            Self::Space => "space",
            Self::Backspace => "backspace",
            Self::ForwardDelete => "delete",
            Self::Escape => "esc",
            Self::UpArrow => "up",
            Self::DownArrow => "down",
            Self::LeftArrow => "left",
            Self::RightArrow => "right",
            Self::Home => "home",
            Self::End => "end",
            Self::PageUp => "pageup",
            Self::PageDown => "pagedown",
            Self::F1 => "f1",
            Self::F2 => "f2",
            Self::F3 => "f3",
            Self::F4 => "f4",
            Self::F5 => "f5",
            Self::F6 => "f6",
            Self::F7 => "f7",
            Self::F8 => "f8",
            Self::F9 => "f9",
            Self::F10 => "f10",
            Self::F11 => "f11",
            Self::F12 => "f12",
            Self::F13 => "f13",
            Self::F14 => "f14",
            Self::F15 => "f15",
            Self::F16 => "f16",
            Self::F17 => "f17",
            Self::F18 => "f18",
            Self::F19 => "f19",
            Self::F20 => "f20",
        }
    }

    /// The macOS virtual keycode for this key.
    pub fn virtual_keycode(self) -> u16 {
        self as u16
    }

    /// Resolve a single-character spec.
    fn from_char(c: char) -> Option<Self> {
        let key = match c {
            'a' => Self::A,
            'b' => Self::B,
            'c' => Self::C,
            'd' => Self::D,
            'e' => Self::E,
            'f' => Self::F,
            'g' => Self::G,
            'h' => Self::H,
            'i' => Self::I,
            'j' => Self::J,
            'k' => Self::K,
            'l' => Self::L,
            'm' => Self::M,
            'n' => Self::N,
            'o' => Self::O,
            'p' => Self::P,
            'q' => Self::Q,
            'r' => Self::R,
            's' => Self::S,
            't' => Self::T,
            'u' => Self::U,
            'v' => Self::V,
            'w' => Self::W,
            'x' => Self::X,
            'y' => Self::Y,
            'z' => Self::Z,
            '0' => Self::Digit0,
            '1' => Self::Digit1,
            '2' => Self::Digit2,
            '3' => Self::Digit3,
            '4' => Self::Digit4,
            '5' => Self::Digit5,
            '6' => Self::Digit6,
            '7' => Self::Digit7,
            '8' => Self::Digit8,
            '9' => Self::Digit9,
            _ => return None,
        };
        Some(key)
    }

    /// Resolve a numbered function key (1-20).
    fn function(n: u8) -> Option<Self> {
        let key = match n {
            1 => Self::F1,
            2 => Self::F2,
            3 => Self::F3,
            4 => Self::F4,
            5 => Self::F5,
            6 => Self::F6,
            7 => Self::F7,
            8 => Self::F8,
            9 => Self::F9,
            10 => Self::F10,
            11 => Self::F11,
            12 => Self::F12,
            13 => Self::F13,
            14 => Self::F14,
            15 => Self::F15,
            16 => Self::F16,
            17 => Self::F17,
            18 => Self::F18,
            19 => Self::F19,
            20 => Self::F20,
            _ => return None,
        };
        Some(key)
    }
}
