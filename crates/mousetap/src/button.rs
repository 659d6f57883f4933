use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical mouse button.
///
/// `Side1` is the lower thumb button ("back" on most mice), `Side2` the
/// upper one ("forward"). Platform adapters map their native codes onto
/// these five values; everything above the source layer speaks only in
/// `ButtonKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonKey {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel click.
    Middle,
    /// Lower side (back) button.
    Side1,
    /// Upper side (forward) button.
    Side2,
}

impl ButtonKey {
    /// All logical buttons, in ordinal order.
    pub const ALL: [Self; 5] = [
        Self::Left,
        Self::Right,
        Self::Middle,
        Self::Side1,
        Self::Side2,
    ];

    /// Map a platform button ordinal (0 = left .. 4 = side2) to a key.
    pub fn from_ordinal(n: i64) -> Option<Self> {
        match n {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Middle),
            3 => Some(Self::Side1),
            4 => Some(Self::Side2),
            _ => None,
        }
    }

    /// The ordinal this key maps from.
    pub fn ordinal(self) -> i64 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Middle => 2,
            Self::Side1 => 3,
            Self::Side2 => 4,
        }
    }

    /// Resolve a lowercase button name as stored in configuration.
    pub fn from_spec(spec: &str) -> Option<Self> {
        match spec {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "middle" => Some(Self::Middle),
            "side1" => Some(Self::Side1),
            "side2" => Some(Self::Side2),
            _ => None,
        }
    }

    /// Canonical name for this button.
    pub fn to_spec(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
            Self::Side1 => "side1",
            Self::Side2 => "side2",
        }
    }
}

impl fmt::Display for ButtonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_spec())
    }
}
