use serde::{Deserialize, Serialize};

/// Modifier keys usable in action strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    /// Command on macOS, Super/Windows elsewhere.
    Command,
    /// Control.
    Control,
    /// Option/Alt.
    Option,
    /// Shift.
    Shift,
}

impl Modifier {
    /// Resolve a lowercase modifier spec, accepting the usual aliases.
    pub fn from_spec(spec: &str) -> Option<Self> {
        match spec {
            "cmd" | "command" | "win" | "super" => Some(Self::Command),
            "ctrl" | "control" => Some(Self::Control),
            "alt" | "opt" | "option" => Some(Self::Option),
            "shift" => Some(Self::Shift),
            _ => None,
        }
    }

    /// Canonical spec name for this modifier.
    pub fn to_spec(self) -> &'static str {
        match self {
            Self::Command => "cmd",
            Self::Control => "ctrl",
            Self::Option => "alt",
            Self::Shift => "shift",
        }
    }
}
