//! Per-finger capture status machine.
//!
//! [`StatusMachine`] is the only code that changes a [`FingerSlot`]'s
//! status. Every change is checked against
//! [`CaptureStatus::can_transition_to`] and recorded in a bounded history.
//!
//! # Transitions
//!
//! - `begin_capture`: NotCollected / BadScan / RescanGoodScan → Collecting,
//!   remembering the previous status as the rollback snapshot
//! - `mark_rescan`: GoodScan → RescanGoodScan, template kept
//! - `complete`: Collecting → GoodScan / BadScan
//! - `rollback`: Collecting → snapshot
//! - `clear`: any → NotCollected, template discarded
//!
//! # Examples
//!
//! ```
//! use fingercap_core::{CaptureSettings, CaptureStatus, FingerId};
//! use fingercap_engine::{FingerRegistry, StatusMachine};
//!
//! let mut registry = FingerRegistry::from_settings(&CaptureSettings::default()).unwrap();
//! let mut machine = StatusMachine::new();
//! let slot = registry.slot_mut(FingerId::LeftThumb).unwrap();
//!
//! machine.begin_capture(slot).unwrap();
//! assert_eq!(slot.status, CaptureStatus::Collecting);
//!
//! machine.rollback(slot).unwrap();
//! assert_eq!(slot.status, CaptureStatus::NotCollected);
//! ```

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use fingercap_core::{CaptureStatus, FingerId};
use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::registry::FingerSlot;

/// Maximum number of status transitions to keep in history.
///
/// A full ten-finger session with a couple of rescans per finger stays well
/// under this.
const MAX_HISTORY_SIZE: usize = 100;

/// A single status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub finger: FingerId,
    pub from: CaptureStatus,
    pub to: CaptureStatus,
    pub at: DateTime<Utc>,
}

/// Validates status changes, keeps the rollback snapshot and a history.
#[derive(Debug, Clone)]
pub struct StatusMachine {
    snapshot: Option<(FingerId, CaptureStatus)>,
    history: VecDeque<StatusTransition>,
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMachine {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Status the finger had before the capture in progress.
    pub fn snapshot(&self) -> Option<(FingerId, CaptureStatus)> {
        self.snapshot
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StatusTransition> {
        &self.history
    }

    fn transition(&mut self, slot: &mut FingerSlot, to: CaptureStatus) -> Result<StatusTransition> {
        if !slot.status.can_transition_to(&to) {
            return Err(EngineError::InvalidStatusTransition {
                finger: slot.id,
                from: slot.status,
                to,
            });
        }

        let transition = StatusTransition {
            finger: slot.id,
            from: slot.status,
            to,
            at: Utc::now(),
        };
        debug!("{}: {} -> {}", slot.id, slot.status, to);
        slot.status = to;

        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(transition.clone());

        Ok(transition)
    }

    /// Start a capture on `slot`, snapshotting its current status.
    pub fn begin_capture(&mut self, slot: &mut FingerSlot) -> Result<StatusTransition> {
        let previous = slot.status;
        let transition = self.transition(slot, CaptureStatus::Collecting)?;
        self.snapshot = Some((slot.id, previous));
        Ok(transition)
    }

    /// Ask for another attempt on a good finger.
    pub fn mark_rescan(&mut self, slot: &mut FingerSlot) -> Result<StatusTransition> {
        self.transition(slot, CaptureStatus::RescanGoodScan)
    }

    /// Finish the capture with the status the quality gate chose.
    pub fn complete(
        &mut self,
        slot: &mut FingerSlot,
        status: CaptureStatus,
    ) -> Result<StatusTransition> {
        if slot.status != CaptureStatus::Collecting {
            return Err(EngineError::InvalidStatusTransition {
                finger: slot.id,
                from: slot.status,
                to: status,
            });
        }
        let transition = self.transition(slot, status)?;
        self.snapshot = None;
        Ok(transition)
    }

    /// Restore the status the finger had before the capture started.
    pub fn rollback(&mut self, slot: &mut FingerSlot) -> Result<StatusTransition> {
        let previous = match self.snapshot {
            Some((finger, status)) if finger == slot.id => status,
            _ => return Err(EngineError::MissingSnapshot(slot.id)),
        };
        if slot.status != CaptureStatus::Collecting {
            return Err(EngineError::InvalidStatusTransition {
                finger: slot.id,
                from: slot.status,
                to: previous,
            });
        }
        let transition = self.transition(slot, previous)?;
        self.snapshot = None;
        Ok(transition)
    }

    /// Reset the finger to NotCollected and discard its template.
    pub fn clear(&mut self, slot: &mut FingerSlot) -> Result<StatusTransition> {
        let transition = self.transition(slot, CaptureStatus::NotCollected)?;
        slot.template = None;
        if self.snapshot.is_some_and(|(finger, _)| finger == slot.id) {
            self.snapshot = None;
        }
        Ok(transition)
    }
}
