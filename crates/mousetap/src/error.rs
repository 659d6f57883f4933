/// Errors raised while installing or running a button source.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The OS refused to create the hook.
    #[error("failed to install the mouse hook: {0}")]
    HookStart(String),
    /// The process lacks the permission the hook needs.
    #[error("missing permission: {0}")]
    PermissionDenied(&'static str),
    /// An OS call failed after the hook was installed.
    #[error("os error: {0}")]
    Os(String),
    /// No button source exists for this platform.
    #[error("mouse button capture is not supported on this platform")]
    Unsupported,
}

/// Convenience result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
