//! macOS key injection via CoreGraphics keyboard events.

use core_graphics::{
    event as cge,
    event_source::{CGEventSource, CGEventSourceStateID},
};
use keyspec::{Key, Modifier};
use tracing::{trace, warn};

use crate::{Error, Poster, Result};

/// Left-side virtual keycode for a modifier.
fn modifier_keycode(m: Modifier) -> u16 {
    match m {
        Modifier::Command => 0x37,
        Modifier::Shift => 0x38,
        Modifier::Option => 0x3A,
        Modifier::Control => 0x3B,
    }
}

/// Posts HID-level keyboard events.
pub(crate) struct MacPoster;

impl MacPoster {
    pub(crate) fn new() -> Self {
        Self
    }

    fn post_keycode(&self, keycode: u16, down: bool) -> Result<()> {
        // The source is lightweight; create it per event.
        let source = match CGEventSource::new(CGEventSourceStateID::HIDSystemState) {
            Ok(s) => s,
            Err(_) => {
                if !permissions::accessibility_ok() {
                    warn!("accessibility_permission_missing_for_event_source");
                    return Err(Error::PermissionDenied("Accessibility"));
                }
                return Err(Error::EventSource);
            }
        };
        let e = match cge::CGEvent::new_keyboard_event(source, cge::CGKeyCode::from(keycode), down)
        {
            Ok(e) => e,
            Err(_) => {
                if !permissions::accessibility_ok() {
                    warn!("accessibility_permission_missing_for_event_create");
                    return Err(Error::PermissionDenied("Accessibility"));
                }
                return Err(Error::EventCreate);
            }
        };
        e.post(cge::CGEventTapLocation::HID);
        trace!(keycode, down, "posted_keyboard_event");
        Ok(())
    }
}

impl Poster for MacPoster {
    fn key(&self, key: Key, down: bool) -> Result<()> {
        self.post_keycode(key.virtual_keycode(), down)
    }

    fn modifier(&self, m: Modifier, down: bool) -> Result<()> {
        self.post_keycode(modifier_keycode(m), down)
    }
}
