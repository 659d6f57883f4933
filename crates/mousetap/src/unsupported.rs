use std::sync::Arc;

use crate::{ButtonSource, Error, PressHandler, Result};

/// Placeholder source for platforms without a capture backend.
pub(crate) struct Unsupported;

impl ButtonSource for Unsupported {
    fn register(&mut self, _handler: Arc<dyn PressHandler>) -> Result<()> {
        Err(Error::Unsupported)
    }

    fn unregister(&mut self) {}
}
