//! Low-level mouse button press sources.
//!
//! This crate owns the logical button vocabulary ([`ButtonKey`]) and the
//! capability seam between the OS hook and the sequence engine: a source
//! delivers raw presses to a [`PressHandler`] on an OS-managed callback
//! context, and the handler's [`Decision`] tells the source whether to
//! withhold the event from normal OS delivery.
//!
//! Two adapters are provided: a session-level CGEventTap on macOS (which
//! can genuinely suppress events) and an evdev reader on Linux (which
//! observes without grabbing devices). Other platforms get a source whose
//! registration fails with a structured error.

mod button;
mod error;

pub use button::ButtonKey;
pub use error::{Error, Result};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod mac;
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
mod unsupported;

use std::sync::Arc;

/// Whether a handled press should be withheld from normal OS delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The press was handled; drop the OS event if the platform allows it.
    Suppress,
    /// Not handled; let the OS default behavior proceed.
    PassThrough,
}

/// Receives raw presses on the source's callback context.
///
/// Implementations must return quickly: on macOS the OS silently disables a
/// tap whose callback overruns its time budget.
pub trait PressHandler: Send + Sync {
    /// Handle one physical button press.
    fn on_press(&self, key: ButtonKey) -> Decision;
}

/// A platform hook that delivers button presses to a handler.
pub trait ButtonSource: Send {
    /// Install the hook. Blocks until the hook is live or has failed.
    fn register(&mut self, handler: Arc<dyn PressHandler>) -> Result<()>;

    /// Tear the hook down. Idempotent and best-effort.
    fn unregister(&mut self);
}

/// The default button source for the current platform.
#[cfg(target_os = "macos")]
pub fn system_source() -> Box<dyn ButtonSource> {
    Box::new(mac::MacTap::new())
}

/// The default button source for the current platform.
#[cfg(target_os = "linux")]
pub fn system_source() -> Box<dyn ButtonSource> {
    Box::new(linux::EvdevSource::new())
}

/// The default button source for the current platform.
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn system_source() -> Box<dyn ButtonSource> {
    Box::new(unsupported::Unsupported)
}
