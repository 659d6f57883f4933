//! Named system commands.
//!
//! Commands share the action grammar with key chords; the executor checks
//! this table first and only falls back to chord parsing when the action is
//! not a known command name. Processes are spawned fully detached with both
//! output streams discarded so a command can never stall the press path.

use std::process::{Command, Stdio};

use tracing::info;

use crate::{Error, Result};

/// How a named command is carried out.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
enum Invocation {
    /// Exec an argv directly.
    Argv(&'static [&'static str]),
    /// Run a line through `sh -c` (osascript one-liners and the like).
    Shell(&'static str),
    /// `open` a directory under the user's home.
    OpenHome(&'static str),
}

#[cfg(target_os = "macos")]
const COMMANDS: &[(&str, Invocation)] = &[
    ("launchpad", Invocation::Argv(&["open", "-a", "Launchpad"])),
    (
        "mission_control",
        Invocation::Argv(&["open", "-a", "Mission Control"]),
    ),
    ("mission", Invocation::Argv(&["open", "-a", "Mission Control"])),
    ("screenshot", Invocation::Argv(&["screencapture", "-i", "-c"])),
    (
        "screenshot_area",
        Invocation::Argv(&["screencapture", "-i", "-c"]),
    ),
    (
        "screenshot_window",
        Invocation::Argv(&["screencapture", "-i", "-w", "-c"]),
    ),
    ("screenshot_full", Invocation::Argv(&["screencapture", "-c"])),
    ("finder", Invocation::Argv(&["open", "-a", "Finder"])),
    ("desktop", Invocation::OpenHome("Desktop")),
    ("downloads", Invocation::OpenHome("Downloads")),
    ("documents", Invocation::OpenHome("Documents")),
    ("siri", Invocation::Argv(&["open", "-a", "Siri"])),
    ("sleep", Invocation::Argv(&["pmset", "sleepnow"])),
    (
        "spotlight",
        Invocation::Shell(
            "osascript -e 'tell application \"System Events\" to keystroke space using command down'",
        ),
    ),
    (
        "notification_center",
        Invocation::Shell(
            "open -g \"x-apple.systempreferences:com.apple.preference.notifications\"",
        ),
    ),
    (
        "notification",
        Invocation::Shell(
            "open -g \"x-apple.systempreferences:com.apple.preference.notifications\"",
        ),
    ),
    (
        "dictation",
        Invocation::Shell(
            "osascript -e 'tell application \"System Events\" to keystroke \"d\" using {command down, fn down}'",
        ),
    ),
    (
        "volume_up",
        Invocation::Shell(
            "osascript -e \"set volume output volume (output volume of (get volume settings) + 10)\"",
        ),
    ),
    (
        "volume_down",
        Invocation::Shell(
            "osascript -e \"set volume output volume (output volume of (get volume settings) - 10)\"",
        ),
    ),
    (
        "volume_mute",
        Invocation::Shell(
            "osascript -e \"set volume output muted not (output muted of (get volume settings))\"",
        ),
    ),
    (
        "play_pause",
        Invocation::Shell(
            "osascript -e 'tell application \"System Events\" to key code 16 using {command down, option down}'",
        ),
    ),
    (
        "next_track",
        Invocation::Shell(
            "osascript -e 'tell application \"System Events\" to key code 17 using {command down, option down}'",
        ),
    ),
    (
        "prev_track",
        Invocation::Shell(
            "osascript -e 'tell application \"System Events\" to key code 18 using {command down, option down}'",
        ),
    ),
    (
        "lock_screen",
        Invocation::Shell(
            "osascript -e 'tell application \"System Events\" to keystroke \"q\" using {command down, control down}'",
        ),
    ),
    (
        "show_desktop",
        Invocation::Shell("osascript -e 'tell application \"System Events\" to key code 103'"),
    ),
];

#[cfg(not(target_os = "macos"))]
const COMMANDS: &[(&str, Invocation)] = &[];

fn lookup(name: &str) -> Option<&'static Invocation> {
    COMMANDS.iter().find(|(n, _)| *n == name).map(|(_, inv)| inv)
}

/// Whether a normalized action names a system command on this platform.
pub fn available(name: &str) -> bool {
    lookup(name).is_some()
}

/// All command names available on this platform, in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|(n, _)| *n)
}

/// Run a named command detached. Returns `Ok(false)` if the name is not a
/// command on this platform.
pub(crate) fn run(name: &str) -> Result<bool> {
    let Some(inv) = lookup(name) else {
        return Ok(false);
    };
    let mut cmd = match inv {
        Invocation::Argv(argv) => {
            let mut c = Command::new(argv[0]);
            c.args(&argv[1..]);
            c
        }
        Invocation::Shell(line) => {
            let mut c = Command::new("sh");
            c.arg("-c").arg(line);
            c
        }
        Invocation::OpenHome(dir) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".into());
            let mut c = Command::new("open");
            c.arg(format!("{home}/{dir}"));
            c
        }
    };
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let child = cmd
        .spawn()
        .map_err(|e| Error::Spawn(name.to_string(), e))?;
    info!(command = name, pid = child.id(), "system_command_spawned");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_are_not_commands() {
        assert!(!available("ctrl"));
        assert!(!available("no_such_command"));
        assert!(!run("no_such_command").expect("lookup"));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn macos_table_is_populated() {
        assert!(available("launchpad"));
        assert!(available("mission_control"));
        assert!(available("volume_up"));
        assert!(names().count() > 10);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn table_is_empty_off_macos() {
        assert_eq!(names().count(), 0);
    }
}
