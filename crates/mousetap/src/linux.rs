//! Linux evdev reader for mouse button capture.
//!
//! Devices are opened read-only and never grabbed, so presses are observed
//! but cannot be withheld from the display server. A `Suppress` decision is
//! honored for the pipeline (the press is consumed by the sequence machine)
//! and logged as pass-through at the OS level.

use std::{
    io,
    os::fd::AsRawFd,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    thread::JoinHandle,
    time::Duration,
};

use evdev::{Device, InputEventKind, Key as EvKey};
use tracing::{debug, info, trace, warn};

use crate::{ButtonKey, ButtonSource, Decision, Error, PressHandler, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

// BTN_SIDE..BTN_TASK, the extended mouse button range.
const BTN_EXTENDED_LO: u16 = 0x113;
const BTN_EXTENDED_HI: u16 = 0x117;

/// Map an evdev key code to a logical button.
///
/// Beyond the three standard buttons, mice report their thumb buttons under
/// a handful of names (BTN_SIDE/BTN_EXTRA on most, BTN_BACK/BTN_FORWARD on
/// some). Matching on the name keeps the table honest across those, but is
/// restricted to the extended button code range so unrelated keys whose
/// names contain "back" or "forward" cannot slip in.
fn classify(code: EvKey) -> Option<ButtonKey> {
    match code {
        EvKey::BTN_LEFT => return Some(ButtonKey::Left),
        EvKey::BTN_RIGHT => return Some(ButtonKey::Right),
        EvKey::BTN_MIDDLE => return Some(ButtonKey::Middle),
        _ => {}
    }
    if !(BTN_EXTENDED_LO..=BTN_EXTENDED_HI).contains(&code.code()) {
        return None;
    }
    let name = format!("{code:?}").to_ascii_lowercase();
    if name.contains("side") || name.contains("back") {
        Some(ButtonKey::Side1)
    } else if name.contains("extra") || name.contains("forward") {
        Some(ButtonKey::Side2)
    } else {
        None
    }
}

fn is_mouse(dev: &Device) -> bool {
    dev.supported_keys()
        .is_some_and(|keys| keys.contains(EvKey::BTN_LEFT))
}

fn set_nonblocking(dev: &Device) {
    let fd = dev.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags >= 0 {
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
}

/// Polling reader over every evdev device that reports BTN_LEFT.
pub(crate) struct EvdevSource {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EvdevSource {
    pub(crate) fn new() -> Self {
        Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl ButtonSource for EvdevSource {
    fn register(&mut self, handler: Arc<dyn PressHandler>) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        let mut devices: Vec<Device> = evdev::enumerate()
            .map(|(_, dev)| dev)
            .filter(is_mouse)
            .collect();
        if devices.is_empty() {
            return Err(Error::PermissionDenied("read access to /dev/input"));
        }
        for dev in &devices {
            debug!(device = dev.name().unwrap_or("?"), "watching_mouse_device");
            set_nonblocking(dev);
        }

        self.shutdown.store(false, Ordering::SeqCst);
        let shutdown = self.shutdown.clone();
        let reader = thread::Builder::new()
            .name("mousetap".into())
            .spawn(move || {
                info!(devices = devices.len(), "evdev_reader_started");
                while !shutdown.load(Ordering::SeqCst) {
                    for dev in &mut devices {
                        let events = match dev.fetch_events() {
                            Ok(events) => events,
                            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                            Err(e) => {
                                warn!(error = %e, "evdev_read_failed");
                                continue;
                            }
                        };
                        for ev in events {
                            // value 1 is press; 0 release, 2 autorepeat.
                            if ev.value() != 1 {
                                continue;
                            }
                            let InputEventKind::Key(code) = ev.kind() else {
                                continue;
                            };
                            let Some(key) = classify(code) else {
                                continue;
                            };
                            trace!(button = %key, "evdev_press");
                            if handler.on_press(key) == Decision::Suppress {
                                // Devices are not grabbed, so the press
                                // still reaches the display server.
                                trace!(button = %key, "suppress_unavailable_passing_through");
                            }
                        }
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                info!("evdev_reader_stopped");
            })
            .map_err(|e| Error::HookStart(e.to_string()))?;
        self.thread = Some(reader);
        Ok(())
    }

    fn unregister(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for EvdevSource {
    fn drop(&mut self) {
        self.unregister();
    }
}
