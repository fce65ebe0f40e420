//! Error types for the capture engine.
//!
//! These errors signal broken internal invariants (an illegal status change,
//! a second outstanding scanner command, a reply that does not answer the
//! pending command). Scanner faults are not errors at this level; they are
//! events the sequencer classifies and recovers from.

use fingercap_core::{CaptureStatus, FingerId};
use fingercap_hardware::{DeviceCommand, HardwareError};

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the capture engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid status transition for {finger}: {from} to {to}")]
    InvalidStatusTransition {
        finger: FingerId,
        from: CaptureStatus,
        to: CaptureStatus,
    },

    #[error("Cannot issue {requested} while {pending} is outstanding")]
    CommandAlreadyPending {
        pending: DeviceCommand,
        requested: DeviceCommand,
    },

    #[error("Reply {reply} does not answer {pending}")]
    UnexpectedReply {
        pending: DeviceCommand,
        reply: String,
    },

    #[error("No capture snapshot to roll back to for {0}")]
    MissingSnapshot(FingerId),

    #[error("Finger {0} is not in the active set")]
    FingerNotActive(FingerId),

    #[error("Finger index {index} out of range for {len} active fingers")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid settings: {0}")]
    Settings(#[from] fingercap_core::Error),

    #[error("Scanner error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Event channel closed")]
    ChannelClosed,
}
