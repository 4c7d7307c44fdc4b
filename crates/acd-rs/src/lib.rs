#![cfg_attr(not(any(feature = "std", test)), no_std)]

// 'alloc' is used for dynamic allocation (registry slots, action lists, callbacks)
extern crate alloc;

// --- Foundation Modules ---
pub mod types;
pub mod hal;
pub mod config;
pub(crate) mod log;

// --- Wire Format ---
pub mod frame;

// --- Conflict Detection ---
pub mod acd;
pub mod diagnostics;
pub mod engine;

// --- Top-level Exports ---
pub use types::{InterfaceId, MacAddress};
pub use hal::{AcdError, ArpTransport};
pub use config::{AcdConfig, AcdTimings};
pub use frame::arp::{ArpOperation, ArpPacket};
pub use acd::{AcdAction, AcdOutcome, AcdState, DetectionContext};
pub use diagnostics::{AcdActivity, DiagnosticSink, LastConflictRecorder, LoggingDiagnosticSink, NoOpDiagnosticSink};
pub use engine::{AcdEngine, ContextHandle, FrameKind, SendFailure};
