//! Executes mapped actions: synthetic key chords and named system commands.
//!
//! An action string is first checked against the system command table
//! ([`commands`]); anything else must parse as a key chord, which is posted
//! through a platform [`Poster`]. Modifiers are pressed in written order,
//! the key is tapped, and modifiers are released in reverse. A failure
//! mid-chord still releases whatever was pressed so no modifier is left
//! stuck down.

pub mod commands;
mod error;

pub use error::{Error, Result};

#[cfg(target_os = "macos")]
mod mac;
#[cfg(target_os = "linux")]
mod uinput;

use std::sync::Arc;

use keyspec::{Chord, Key, Modifier, normalize};
use tracing::{info, trace, warn};

/// Posts individual key and modifier transitions to the OS.
pub trait Poster: Send + Sync {
    /// Press or release a non-modifier key.
    fn key(&self, key: Key, down: bool) -> Result<()>;
    /// Press or release a modifier key.
    fn modifier(&self, m: Modifier, down: bool) -> Result<()>;
}

/// Runs normalized action strings.
#[derive(Clone)]
pub struct Executor {
    poster: Arc<dyn Poster>,
}

impl Executor {
    /// Executor backed by the platform's injection mechanism.
    #[cfg(target_os = "macos")]
    pub fn system() -> Self {
        Self {
            poster: Arc::new(mac::MacPoster::new()),
        }
    }

    /// Executor backed by the platform's injection mechanism.
    #[cfg(target_os = "linux")]
    pub fn system() -> Self {
        Self {
            poster: Arc::new(uinput::UinputPoster::new()),
        }
    }

    /// Executor backed by the platform's injection mechanism.
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    pub fn system() -> Self {
        struct NoPoster;
        impl Poster for NoPoster {
            fn key(&self, _key: Key, _down: bool) -> Result<()> {
                Err(Error::Inject("no injection backend on this platform".into()))
            }
            fn modifier(&self, _m: Modifier, _down: bool) -> Result<()> {
                Err(Error::Inject("no injection backend on this platform".into()))
            }
        }
        Self {
            poster: Arc::new(NoPoster),
        }
    }

    /// Executor with a caller-supplied poster.
    pub fn with_poster(poster: Arc<dyn Poster>) -> Self {
        Self { poster }
    }

    /// Executor that records posted events instead of injecting them.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn recording() -> (Self, Arc<RecordingPoster>) {
        let poster = Arc::new(RecordingPoster::default());
        (
            Self {
                poster: poster.clone(),
            },
            poster,
        )
    }

    /// Execute one action string.
    ///
    /// The input is trimmed and lowercased; system command names win over
    /// chord parsing, so `sleep` is `pmset sleepnow`, never the S-L-E-E-P
    /// keys.
    pub fn run(&self, action: &str) -> Result<()> {
        let action = normalize(action);
        if commands::run(&action)? {
            return Ok(());
        }
        let chord = Chord::parse(&action)?;
        trace!(%chord, "posting_chord");
        self.post_chord(&chord)?;
        info!(%chord, "chord_posted");
        Ok(())
    }

    fn post_chord(&self, chord: &Chord) -> Result<()> {
        let mut held: Vec<Modifier> = Vec::with_capacity(chord.modifiers.len());
        let result = (|| {
            for &m in &chord.modifiers {
                self.poster.modifier(m, true)?;
                held.push(m);
            }
            self.poster.key(chord.key, true)?;
            self.poster.key(chord.key, false)?;
            Ok(())
        })();
        for &m in held.iter().rev() {
            if let Err(e) = self.poster.modifier(m, false) {
                warn!(modifier = m.to_spec(), error = %e, "modifier_release_failed");
            }
        }
        result
    }
}

/// One key or modifier transition captured by [`RecordingPoster`].
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostedEvent {
    /// A non-modifier key transition.
    Key(Key, bool),
    /// A modifier transition.
    Modifier(Modifier, bool),
}

/// Poster that appends every transition to an in-memory log.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct RecordingPoster {
    events: std::sync::Mutex<Vec<PostedEvent>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingPoster {
    /// Snapshot of everything posted so far.
    pub fn events(&self) -> Vec<PostedEvent> {
        self.events.lock().expect("poster log").clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Poster for RecordingPoster {
    fn key(&self, key: Key, down: bool) -> Result<()> {
        self.events
            .lock()
            .expect("poster log")
            .push(PostedEvent::Key(key, down));
        Ok(())
    }

    fn modifier(&self, m: Modifier, down: bool) -> Result<()> {
        self.events
            .lock()
            .expect("poster log")
            .push(PostedEvent::Modifier(m, down));
        Ok(())
    }
}
