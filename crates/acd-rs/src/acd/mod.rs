//! The per-address conflict detection state machine (RFC 5227).
//!
//! Transitions are computed by `DetectionContext` and returned as a list of
//! `AcdAction`s. The context never performs I/O itself; the engine executes
//! the actions against the transport, the callback and the diagnostic sink.

pub mod actions;
pub mod context;
pub mod jitter;
pub mod states;

pub use actions::AcdAction;
pub use context::DetectionContext;
pub use states::{AcdOutcome, AcdState};
