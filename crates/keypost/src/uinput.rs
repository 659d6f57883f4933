//! Linux key injection through a uinput virtual keyboard.
//!
//! The virtual device is created lazily on the first post so the crate can
//! be constructed without /dev/uinput access; the device advertises every
//! key we can emit up front since uinput capabilities are fixed at creation.

use evdev::{
    AttributeSet, EventType, InputEvent, Key as EvKey,
    uinput::{VirtualDevice, VirtualDeviceBuilder},
};
use keyspec::{Key, Modifier};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{Error, Poster, Result};

fn ev_key(key: Key) -> EvKey {
    match key {
        Key::A => EvKey::KEY_A,
        Key::B => EvKey::KEY_B,
        Key::C => EvKey::KEY_C,
        Key::D => EvKey::KEY_D,
        Key::E => EvKey::KEY_E,
        Key::F => EvKey::KEY_F,
        Key::G => EvKey::KEY_G,
        Key::H => EvKey::KEY_H,
        Key::I => EvKey::KEY_I,
        Key::J => EvKey::KEY_J,
        Key::K => EvKey::KEY_K,
        Key::L => EvKey::KEY_L,
        Key::M => EvKey::KEY_M,
        Key::N => EvKey::KEY_N,
        Key::O => EvKey::KEY_O,
        Key::P => EvKey::KEY_P,
        Key::Q => EvKey::KEY_Q,
        Key::R => EvKey::KEY_R,
        Key::S => EvKey::KEY_S,
        Key::T => EvKey::KEY_T,
        Key::U => EvKey::KEY_U,
        Key::V => EvKey::KEY_V,
        Key::W => EvKey::KEY_W,
        Key::X => EvKey::KEY_X,
        Key::Y => EvKey::KEY_Y,
        Key::Z => EvKey::KEY_Z,
        Key::Digit0 => EvKey::KEY_0,
        Key::Digit1 => EvKey::KEY_1,
        Key::Digit2 => EvKey::KEY_2,
        Key::Digit3 => EvKey::KEY_3,
        Key::Digit4 => EvKey::KEY_4,
        Key::Digit5 => EvKey::KEY_5,
        Key::Digit6 => EvKey::KEY_6,
        Key::Digit7 => EvKey::KEY_7,
        Key::Digit8 => EvKey::KEY_8,
        Key::Digit9 => EvKey::KEY_9,
        Key::Return => EvKey::KEY_ENTER,
        Key::Tab => EvKey::KEY_TAB,
        Key::Space => EvKey::KEY_SPACE,
        Key::Backspace => EvKey::KEY_BACKSPACE,
        Key::ForwardDelete => EvKey::KEY_DELETE,
        Key::Escape => EvKey::KEY_ESC,
        Key::Home => EvKey::KEY_HOME,
        Key::End => EvKey::KEY_END,
        Key::PageUp => EvKey::KEY_PAGEUP,
        Key::PageDown => EvKey::KEY_PAGEDOWN,
        Key::LeftArrow => EvKey::KEY_LEFT,
        Key::RightArrow => EvKey::KEY_RIGHT,
        Key::UpArrow => EvKey::KEY_UP,
        Key::DownArrow => EvKey::KEY_DOWN,
        Key::F1 => EvKey::KEY_F1,
        Key::F2 => EvKey::KEY_F2,
        Key::F3 => EvKey::KEY_F3,
        Key::F4 => EvKey::KEY_F4,
        Key::F5 => EvKey::KEY_F5,
        Key::F6 => EvKey::KEY_F6,
        Key::F7 => EvKey::KEY_F7,
        Key::F8 => EvKey::KEY_F8,
        Key::F9 => EvKey::KEY_F9,
        Key::F10 => EvKey::KEY_F10,
        Key::F11 => EvKey::KEY_F11,
        Key::F12 => EvKey::KEY_F12,
        Key::F13 => EvKey::KEY_F13,
        Key::F14 => EvKey::KEY_F14,
        Key::F15 => EvKey::KEY_F15,
        Key::F16 => EvKey::KEY_F16,
        Key::F17 => EvKey::KEY_F17,
        Key::F18 => EvKey::KEY_F18,
        Key::F19 => EvKey::KEY_F19,
        Key::F20 => EvKey::KEY_F20,
    }
}

fn ev_modifier(m: Modifier) -> EvKey {
    match m {
        Modifier::Command => EvKey::KEY_LEFTMETA,
        Modifier::Control => EvKey::KEY_LEFTCTRL,
        Modifier::Option => EvKey::KEY_LEFTALT,
        Modifier::Shift => EvKey::KEY_LEFTSHIFT,
    }
}

/// Posts key events through a lazily created uinput device.
pub(crate) struct UinputPoster {
    device: Mutex<Option<VirtualDevice>>,
}

impl UinputPoster {
    pub(crate) fn new() -> Self {
        Self {
            device: Mutex::new(None),
        }
    }

    fn emit(&self, code: EvKey, down: bool) -> Result<()> {
        let mut guard = self.device.lock();
        if guard.is_none() {
            *guard = Some(create_device()?);
            debug!("uinput_device_created");
        }
        let dev = guard.as_mut().ok_or_else(|| {
            Error::Inject("uinput device unavailable".into())
        })?;
        let value = i32::from(down);
        dev.emit(&[InputEvent::new(EventType::KEY, code.code(), value)])
            .map_err(|e| Error::Inject(e.to_string()))?;
        trace!(code = code.code(), down, "posted_uinput_event");
        Ok(())
    }
}

fn create_device() -> Result<VirtualDevice> {
    let mut keys = AttributeSet::<EvKey>::new();
    // Advertise the full addressable range; capabilities cannot grow later.
    for code in 0..=248u16 {
        keys.insert(EvKey::new(code));
    }
    VirtualDeviceBuilder::new()
        .and_then(|b| b.name("sidetap virtual keyboard").with_keys(&keys))
        .and_then(|b| b.build())
        .map_err(|e| Error::Inject(format!("uinput setup failed: {e}")))
}

impl Poster for UinputPoster {
    fn key(&self, key: Key, down: bool) -> Result<()> {
        self.emit(ev_key(key), down)
    }

    fn modifier(&self, m: Modifier, down: bool) -> Result<()> {
        self.emit(ev_modifier(m), down)
    }
}
