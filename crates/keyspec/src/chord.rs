use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Key, Modifier};

/// Errors from parsing an action string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The action string is empty after trimming.
    #[error("empty action string")]
    Empty,
    /// A stray `+` produced an empty token (e.g. `ctrl++` or `1+2+3+`).
    #[error("empty token in action string (stray '+')")]
    EmptyToken,
    /// A token contains characters outside `[a-z0-9_]`.
    #[error("invalid token {0:?}: expected lowercase letters, digits or '_'")]
    BadToken(String),
    /// A non-final token is not a known modifier.
    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),
    /// The final token is not a known key.
    #[error("unknown key {0:?}")]
    UnknownKey(String),
}

/// Trim and lowercase an action string. Actions are matched and stored in
/// this normalized form.
pub fn normalize(action: &str) -> String {
    action.trim().to_ascii_lowercase()
}

/// Check the `tok+tok+...` grammar without resolving tokens.
///
/// System command keywords (e.g. `launchpad`, `mission_control`) share this
/// grammar with key chords, so the store validates against it while the
/// executor decides which of the two an action actually is.
pub fn validate_grammar(action: &str) -> Result<(), ParseError> {
    if action.is_empty() {
        return Err(ParseError::Empty);
    }
    for token in action.split('+') {
        if token.is_empty() {
            return Err(ParseError::EmptyToken);
        }
        if !token
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        {
            return Err(ParseError::BadToken(token.to_string()));
        }
    }
    Ok(())
}

/// A key chord: zero or more modifiers plus a single key.
///
/// Modifiers keep the order they were written in; the executor presses them
/// in that order and releases them in reverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    /// Modifier keys in press order, deduplicated.
    pub modifiers: Vec<Modifier>,
    /// The non-modifier key.
    pub key: Key,
}

impl Chord {
    /// Parse an action string of the form `ctrl+shift+v`.
    ///
    /// Input is trimmed and lowercased first. All tokens but the last must
    /// be modifiers; the last is the key.
    pub fn parse(action: &str) -> Result<Self, ParseError> {
        let action = normalize(action);
        validate_grammar(&action)?;

        let mut tokens: Vec<&str> = action.split('+').collect();
        let key_raw = tokens.pop().ok_or(ParseError::Empty)?;
        let key = Key::from_spec(key_raw).ok_or_else(|| ParseError::UnknownKey(key_raw.into()))?;

        let mut modifiers = Vec::with_capacity(tokens.len());
        for token in tokens {
            let m =
                Modifier::from_spec(token).ok_or_else(|| ParseError::UnknownModifier(token.into()))?;
            if !modifiers.contains(&m) {
                modifiers.push(m);
            }
        }
        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.to_spec())?;
        }
        write!(f, "{}", self.key.to_spec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_chord() {
        let c = Chord::parse("ctrl+shift+v").expect("parse");
        assert_eq!(c.modifiers, vec![Modifier::Control, Modifier::Shift]);
        assert_eq!(c.key, Key::V);
        assert_eq!(c.to_string(), "ctrl+shift+v");
    }

    #[test]
    fn input_is_normalized() {
        let c = Chord::parse("  CTRL+C ").expect("parse");
        assert_eq!(c.modifiers, vec![Modifier::Control]);
        assert_eq!(c.key, Key::C);
    }

    #[test]
    fn trailing_delimiter_is_rejected() {
        assert_eq!(Chord::parse("ctrl++"), Err(ParseError::EmptyToken));
        assert_eq!(Chord::parse("1+2+3+"), Err(ParseError::EmptyToken));
        assert_eq!(Chord::parse("+v"), Err(ParseError::EmptyToken));
    }

    #[test]
    fn bad_tokens_are_rejected() {
        assert_eq!(Chord::parse(""), Err(ParseError::Empty));
        assert!(matches!(
            Chord::parse("ctrl+sh ift+v"),
            Err(ParseError::BadToken(_))
        ));
        assert!(matches!(
            Chord::parse("ctrl+ä"),
            Err(ParseError::BadToken(_))
        ));
    }

    #[test]
    fn unknown_tokens_are_distinguished() {
        assert_eq!(
            Chord::parse("hyper+v"),
            Err(ParseError::UnknownModifier("hyper".into()))
        );
        assert_eq!(
            Chord::parse("ctrl+launchpad"),
            Err(ParseError::UnknownKey("launchpad".into()))
        );
        // A bare keyword parses as an unknown key; the executor checks the
        // system command table before ever parsing a chord.
        assert_eq!(
            Chord::parse("launchpad"),
            Err(ParseError::UnknownKey("launchpad".into()))
        );
    }

    #[test]
    fn duplicate_modifiers_collapse() {
        let c = Chord::parse("shift+shift+a").expect("parse");
        assert_eq!(c.modifiers, vec![Modifier::Shift]);
    }

    #[test]
    fn grammar_accepts_command_keywords() {
        assert!(validate_grammar("launchpad").is_ok());
        assert!(validate_grammar("mission_control").is_ok());
        assert!(validate_grammar("volume_up").is_ok());
        assert_eq!(validate_grammar("ctrl++"), Err(ParseError::EmptyToken));
    }
}
