//! Turns raw mouse button presses into executed actions.
//!
//! The pipeline: a [`mousetap::ButtonSource`] delivers presses to the
//! sequence machine, which recognizes configured sequences, debounces
//! singles that could begin a sequence, and hands completed actions to a
//! dedicated executor thread backed by [`keypost`]. [`MouseListener`] owns
//! the lifecycle: idempotent start, permission gating, live reload and a
//! stop that guarantees no action fires afterwards.

mod debounce;
mod listener;
mod machine;
mod mappings;

pub use listener::{
    EngineDeps, EngineError, ListenerStatus, MouseListener, SingleBinding, StartOutcome,
};
pub use machine::Timing;
pub use mappings::{MappingTable, SequenceMapping};
