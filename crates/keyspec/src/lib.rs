//! keyspec: the symbolic key vocabulary behind sidetap action strings.
//!
//! - [`Key`]: non-modifier keys addressable from action strings. The
//!   discriminants are macOS virtual keycodes so the macOS poster can cast
//!   directly; other platforms translate by name.
//! - [`Modifier`]: modifier keys with their spec aliases.
//! - [`Chord`]: a parsed `+`-delimited action string such as
//!   `ctrl+shift+v`, with modifiers kept in press order.

mod chord;
mod key;
mod modifier;

pub use chord::{Chord, ParseError, normalize, validate_grammar};
pub use key::Key;
pub use modifier::Modifier;
