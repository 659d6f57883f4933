//! Input-capture permission checks for sidetap.
//!
//! Exposes a minimal API to query whether the process is allowed to observe
//! and inject input events, and a [`PermissionReport`] pairing the boolean
//! with a reason a human can act on. There is no prompting logic here: the
//! caller is responsible for guiding the user to the relevant settings when
//! the check fails.
//!
//! All calls are fast and side-effect free.

use serde::Serialize;

#[cfg(target_os = "macos")]
#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn CGPreflightListenEventAccess() -> bool;
}

/// Check the global macOS Accessibility permission.
///
/// An event tap created with default (modifying) options requires it.
#[cfg(target_os = "macos")]
pub fn accessibility_ok() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Check the macOS Input Monitoring permission (listening to input events).
#[cfg(target_os = "macos")]
pub fn input_monitoring_ok() -> bool {
    unsafe { CGPreflightListenEventAccess() }
}

/// Outcome of a permission probe.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionReport {
    /// Whether the process may capture input.
    pub granted: bool,
    /// Human-readable explanation of the result.
    pub reason: String,
}

impl PermissionReport {
    fn granted(reason: &str) -> Self {
        Self {
            granted: true,
            reason: reason.to_string(),
        }
    }

    fn denied(reason: &str) -> Self {
        Self {
            granted: false,
            reason: reason.to_string(),
        }
    }
}

/// Probe whether the process may capture mouse input on this platform.
#[cfg(target_os = "macos")]
pub fn input_capture() -> PermissionReport {
    if accessibility_ok() {
        PermissionReport::granted("Accessibility permission granted; mouse buttons can be captured")
    } else {
        PermissionReport::denied(
            "Accessibility permission missing; grant it under \
             System Settings > Privacy & Security > Accessibility",
        )
    }
}

/// Probe whether the process may capture mouse input on this platform.
///
/// Linux input capture reads `/dev/input/event*` directly, so the probe
/// checks that at least one event node is readable.
#[cfg(target_os = "linux")]
pub fn input_capture() -> PermissionReport {
    use std::fs;

    let entries = match fs::read_dir("/dev/input") {
        Ok(entries) => entries,
        Err(e) => {
            return PermissionReport::denied(&format!("cannot list /dev/input: {e}"));
        }
    };

    let mut total = 0usize;
    let mut readable = 0usize;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("event") {
            continue;
        }
        total += 1;
        if fs::File::open(entry.path()).is_ok() {
            readable += 1;
        }
    }

    if total == 0 {
        PermissionReport::denied("no /dev/input event devices found")
    } else if readable == 0 {
        PermissionReport::denied(
            "cannot read /dev/input event devices; add the user to the \
             'input' group or run with elevated privileges",
        )
    } else {
        PermissionReport::granted("input event devices are readable; mouse buttons can be captured")
    }
}

/// Probe whether the process may capture mouse input on this platform.
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn input_capture() -> PermissionReport {
    PermissionReport::granted("no input-capture permission required on this platform")
}
