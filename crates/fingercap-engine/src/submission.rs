//! Submission assembly and session outcomes.

use chrono::{DateTime, Utc};
use fingercap_core::{AlertKind, FingerId, constants::MIN_REQUIRED_ACCEPTED};
use fingercap_hardware::FaultCode;
use serde::Serialize;
use uuid::Uuid;

use crate::registry::FingerRegistry;

/// One finger's template as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedFingerprint {
    pub finger: FingerId,
    pub quality: u8,
    pub template: Vec<u8>,
    /// When the frame was taken; absent for a finger marked bad without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

/// The templates collected during a session, in capture order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub fingerprints: Vec<CapturedFingerprint>,
}

impl SubmissionPayload {
    pub fn fingers(&self) -> Vec<FingerId> {
        self.fingerprints.iter().map(|print| print.finger).collect()
    }
}

/// Why a session ended without a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub alert: AlertKind,
    pub code: Option<FaultCode>,
    pub message: String,
}

/// How a capture session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaptureOutcome {
    Submitted(SubmissionPayload),
    Cancelled,
    Failed(FailureReason),
}

/// Submit refused: not enough required fingers have an accepted scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionRejected {
    pub required_accepted: usize,
}

/// Builds the payload from the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionAssembler;

impl SubmissionAssembler {
    /// Number of active required fingers with an accepted scan.
    pub fn required_accepted(registry: &FingerRegistry) -> usize {
        registry
            .active_slots()
            .filter(|slot| slot.requirement.is_required() && slot.has_accepted_scan())
            .count()
    }

    pub fn can_submit(registry: &FingerRegistry) -> bool {
        Self::required_accepted(registry) >= MIN_REQUIRED_ACCEPTED
    }

    /// Assemble the payload, or reject when no required finger has an
    /// accepted scan.
    ///
    /// Every active finger with an accepted scan is included, good or bad,
    /// in active-set order. A finger marked bad without a frame carries an
    /// empty template with quality 0.
    pub fn assemble(
        registry: &FingerRegistry,
        session_id: Uuid,
    ) -> std::result::Result<SubmissionPayload, SubmissionRejected> {
        let required_accepted = Self::required_accepted(registry);
        if required_accepted < MIN_REQUIRED_ACCEPTED {
            return Err(SubmissionRejected { required_accepted });
        }

        let fingerprints = registry
            .active_slots()
            .filter(|slot| slot.has_accepted_scan())
            .map(|slot| match &slot.template {
                Some(template) => CapturedFingerprint {
                    finger: slot.id,
                    quality: template.quality(),
                    template: template.bytes().to_vec(),
                    captured_at: Some(template.captured_at()),
                },
                // Marked bad without a frame: the scanner could not force one.
                None => CapturedFingerprint {
                    finger: slot.id,
                    quality: 0,
                    template: Vec::new(),
                    captured_at: None,
                },
            })
            .collect();

        Ok(SubmissionPayload {
            session_id,
            created_at: Utc::now(),
            fingerprints,
        })
    }
}
