//! Effects requested by the sequencer and the screen updates it publishes.
//!
//! The sequencer never performs I/O. It returns a list of [`Effect`]s and the
//! workflow carries them out in order.

use std::time::Duration;

use fingercap_core::{AlertKind, CaptureStatus, FingerId};
use fingercap_hardware::DeviceCommand;
use serde::Serialize;

use crate::submission::CaptureOutcome;

/// What the screen layer should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScreenUpdate {
    StatusChanged {
        index: usize,
        finger: FingerId,
        status: CaptureStatus,
    },
    CursorMoved {
        index: usize,
        finger: FingerId,
    },
    ActiveSetChanged {
        fingers: Vec<FingerId>,
        cursor: usize,
    },
    Haptic {
        duration: Duration,
    },
    ReconnectingShown,
    ReconnectingHidden,
    AlertRequested {
        alert: AlertKind,
    },
    /// Submit was pressed without enough required fingers.
    SubmissionRejected {
        required_accepted: usize,
    },
    /// Whether the continue/submit control should be enabled.
    ContinueAvailable {
        available: bool,
    },
}

/// One instruction for the workflow interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run a scanner command; its reply comes back as an event.
    Issue(DeviceCommand),
    /// Cancel the in-flight command. The command still reports back.
    CancelCommand,
    Publish(ScreenUpdate),
    ScheduleNudge {
        finger: FingerId,
        delay: Duration,
    },
    CancelNudge,
    BindTrigger,
    UnbindTrigger,
    StartReconnect,
    CancelReconnect,
    /// End the session.
    Finish(CaptureOutcome),
}
