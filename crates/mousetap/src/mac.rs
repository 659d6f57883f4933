//! macOS event tap (CoreGraphics) for mouse button capture.
//!
//! The tap is created at session level and listens to `OtherMouseDown`
//! only: left, right and middle clicks never enter the pipeline on macOS,
//! so ordinary pointer use is untouched even when capture is active. A
//! handled press is answered with `CallbackResult::Drop`, which maps to a
//! NULL `CGEventRef` at the C boundary and is the only return CoreGraphics
//! treats as suppression.

use std::{
    ffi::c_void,
    sync::{
        Arc,
        atomic::{AtomicPtr, Ordering},
    },
    thread,
    thread::JoinHandle,
};

use core_foundation::{
    base::TCFType,
    mach_port::CFMachPortRef,
    runloop::{CFRunLoop, kCFRunLoopCommonModes},
};
use core_graphics::event::{self as cge, CallbackResult};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{ButtonKey, ButtonSource, Decision, Error, PressHandler, Result};

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    fn CGEventTapIsEnabled(tap: CFMachPortRef) -> bool;
}

// kCGMouseEventButtonNumber
const FIELD_MOUSE_EVENT_BUTTON_NUMBER: u32 = 23;

// Shared control handle to stop the run loop from other threads.
struct TapControl {
    rl: Mutex<Option<CFRunLoop>>,
}

impl TapControl {
    fn new() -> Self {
        Self {
            rl: Mutex::new(None),
        }
    }

    fn set_rl(&self, rl: CFRunLoop) {
        let mut g = self.rl.lock();
        *g = Some(rl);
    }

    fn stop(&self) {
        let mut g = self.rl.lock();
        if let Some(rl) = g.take() {
            rl.stop();
        }
    }
}

/// Session-level CGEventTap source.
pub(crate) struct MacTap {
    ctrl: Arc<TapControl>,
    thread: Option<JoinHandle<()>>,
}

impl MacTap {
    pub(crate) fn new() -> Self {
        Self {
            ctrl: Arc::new(TapControl::new()),
            thread: None,
        }
    }
}

impl ButtonSource for MacTap {
    fn register(&mut self, handler: Arc<dyn PressHandler>) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);
        let ctrl = self.ctrl.clone();
        let tap_thread = thread::Builder::new()
            .name("mousetap".into())
            .spawn(move || {
                if let Err(e) = run_event_loop(handler, ready_tx, ctrl) {
                    warn!(error = %e, "mouse_tap_loop_exited_with_error");
                }
            })
            .map_err(|e| Error::HookStart(e.to_string()))?;
        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.thread = Some(tap_thread);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = tap_thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = tap_thread.join();
                Err(Error::HookStart("tap thread exited before ready".into()))
            }
        }
    }

    fn unregister(&mut self) {
        self.ctrl.stop();
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for MacTap {
    fn drop(&mut self) {
        self.unregister();
    }
}

fn run_event_loop(
    handler: Arc<dyn PressHandler>,
    ready: Sender<Result<()>>,
    ctrl: Arc<TapControl>,
) -> Result<()> {
    // Preflight Accessibility permission; a session tap created without it
    // silently receives nothing.
    if !permissions::accessibility_ok() {
        warn!("accessibility_permission_missing");
        let _ = ready.send(Err(Error::PermissionDenied("Accessibility")));
        return Err(Error::PermissionDenied("Accessibility"));
    }

    // Capture for re-enabling the tap from inside the closure.
    let tap_port_ptr: Arc<AtomicPtr<c_void>> = Arc::new(AtomicPtr::new(std::ptr::null_mut()));

    debug!("creating_mouse_event_tap");
    let tap_port_ptr_cb = tap_port_ptr.clone();
    let tap = match cge::CGEventTap::new(
        cge::CGEventTapLocation::Session,
        cge::CGEventTapPlacement::HeadInsertEventTap,
        cge::CGEventTapOptions::Default,
        vec![cge::CGEventType::OtherMouseDown],
        move |_proxy, etype, event| {
            // The OS disables a tap whose callback stalls; re-enable before
            // doing anything else so a slow press can cost at most one event.
            let p = tap_port_ptr_cb.load(Ordering::SeqCst) as CFMachPortRef;
            if !p.is_null() && !unsafe { CGEventTapIsEnabled(p) } {
                warn!("tap_disabled_by_os_reenabling");
                unsafe { CGEventTapEnable(p, true) };
            }

            match etype {
                cge::CGEventType::OtherMouseDown => {
                    let n = event.get_integer_value_field(FIELD_MOUSE_EVENT_BUTTON_NUMBER);
                    let Some(key) = ButtonKey::from_ordinal(n) else {
                        trace!(button = n, "unmapped_button_number");
                        return CallbackResult::Keep;
                    };
                    trace!(button = %key, "tap_press");
                    match handler.on_press(key) {
                        Decision::Suppress => CallbackResult::Drop,
                        Decision::PassThrough => CallbackResult::Keep,
                    }
                }
                cge::CGEventType::TapDisabledByTimeout
                | cge::CGEventType::TapDisabledByUserInput => {
                    let p = tap_port_ptr_cb.load(Ordering::SeqCst) as CFMachPortRef;
                    if !p.is_null() {
                        warn!("tap_disabled_event_reenabling");
                        unsafe { CGEventTapEnable(p, true) };
                    }
                    CallbackResult::Keep
                }
                _ => CallbackResult::Keep,
            }
        },
    ) {
        Ok(t) => t,
        Err(_) => {
            warn!("mouse_event_tap_create_failed");
            let _ = ready.send(Err(Error::HookStart("CGEventTapCreate failed".into())));
            return Err(Error::HookStart("CGEventTapCreate failed".into()));
        }
    };

    // Share the CFMachPort for re-enabling inside the callback.
    tap_port_ptr.store(
        tap.mach_port().as_concrete_TypeRef() as *mut c_void,
        Ordering::SeqCst,
    );

    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(s) => s,
        Err(_) => {
            warn!("run_loop_source_create_failed");
            let _ = ready.send(Err(Error::HookStart(
                "run loop source creation failed".into(),
            )));
            return Err(Error::HookStart("run loop source creation failed".into()));
        }
    };

    let rl = CFRunLoop::get_current();
    ctrl.set_rl(rl.clone());
    let mode = unsafe { kCFRunLoopCommonModes };
    rl.add_source(&source, mode);

    tap.enable();

    let _ = ready.send(Ok(()));
    debug!("mouse_event_tap_started");

    CFRunLoop::run_current();

    debug!("mouse_event_tap_exited");
    Ok(())
}
