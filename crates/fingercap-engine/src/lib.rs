//! Fingerprint capture engine.
//!
//! This crate turns operator input and scanner completions into a finished
//! capture session: a payload of templates, a cancellation, or a failure
//! with the alert the operator saw.
//!
//! # Architecture
//!
//! - [`FingerRegistry`]: finger slots, the ordered active set and the cursor
//! - [`StatusMachine`]: validated per-finger status changes with rollback
//! - [`QualityGate`]: keeps the best template, reports the latest attempt
//! - [`classifier`]: maps scanner fault codes to recovery policies
//! - [`ReconnectionCoordinator`]: connect / sync / verify after a lost link
//! - [`Sequencer`]: pure transition function from [`CaptureEvent`] to
//!   [`Effect`]s
//! - [`SubmissionAssembler`]: checks required fingers and builds the payload
//! - [`CaptureWorkflow`]: async interpreter running the effects against a
//!   scanner
//!
//! The sequencer is synchronous and deterministic; only the workflow awaits.

pub mod classifier;
pub mod effects;
pub mod error;
pub mod events;
pub mod quality;
pub mod reconnect;
pub mod registry;
pub mod sequencer;
pub mod state_machine;
pub mod submission;
pub mod workflow;

pub use classifier::{FaultClass, FaultRecord, RecoveryPolicy};
pub use effects::{Effect, ScreenUpdate};
pub use error::{EngineError, Result};
pub use events::CaptureEvent;
pub use quality::{QualityGate, QualityVerdict};
pub use reconnect::{ReconnectFailure, ReconnectOutcome, ReconnectStep, ReconnectionCoordinator};
pub use registry::{ActiveSetEdit, FingerRegistry, FingerSlot};
pub use sequencer::{Attempt, Phase, Sequencer};
pub use state_machine::{StatusMachine, StatusTransition};
pub use submission::{
    CaptureOutcome, CapturedFingerprint, FailureReason, SubmissionAssembler, SubmissionPayload,
    SubmissionRejected,
};
pub use workflow::{CaptureContext, CaptureWorkflow, WorkflowHandle};
