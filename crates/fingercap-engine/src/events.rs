//! Inputs consumed by the sequencer.

use fingercap_core::FingerId;
use fingercap_hardware::{DeviceReply, FaultCode};

use crate::reconnect::ReconnectOutcome;

/// Everything that can happen to a capture session.
///
/// Operator actions, scanner completions, timer expiries and reconnection
/// results all arrive through the same channel as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// On-screen scan button.
    ScanPressed,
    /// Physical button on the scanner.
    TriggerPressed,
    /// Long press on the scan button.
    ClearPressed,
    BackPressed,
    /// Operator tapped the finger at this position of the active set.
    FingerSelected(usize),
    /// Operator toggles from the finger picker.
    EditActiveSet(Vec<(FingerId, bool)>),
    AutoAddFinger,
    SubmitPressed,
    /// The nudge delay for this finger ran out.
    NudgeElapsed(FingerId),
    /// The outstanding scanner command succeeded.
    CommandCompleted(DeviceReply),
    /// The outstanding scanner command failed.
    CommandFailed(FaultCode),
    ReconnectFinished(ReconnectOutcome),
}
