/// Errors from executing an action.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The action string is neither a system command nor a valid chord.
    #[error(transparent)]
    Parse(#[from] keyspec::ParseError),
    /// The OS refused to create an event source.
    #[error("failed to create synthetic event source")]
    EventSource,
    /// The OS refused to create a synthetic event.
    #[error("failed to create synthetic event")]
    EventCreate,
    /// The process lacks the permission injection needs.
    #[error("missing permission: {0}")]
    PermissionDenied(&'static str),
    /// A system command process could not be spawned.
    #[error("failed to spawn {0}: {1}")]
    Spawn(String, #[source] std::io::Error),
    /// A platform injection call failed.
    #[error("injection failed: {0}")]
    Inject(String),
}

/// Convenience result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
