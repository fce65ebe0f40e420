//! Quality gate: keep the best template, report the latest attempt.

use fingercap_core::{CaptureStatus, Template};

use crate::registry::FingerSlot;

/// Decision for one scored sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityVerdict {
    /// `GoodScan` when the sample reached the threshold, else `BadScan`.
    pub status: CaptureStatus,
    /// Whether the sample replaced the stored template.
    pub replaced: bool,
}

/// Compares samples against a threshold and against the stored template.
///
/// ```
/// use fingercap_core::CaptureStatus;
/// use fingercap_engine::QualityGate;
///
/// let gate = QualityGate::new(60);
/// let verdict = gate.evaluate(None, 45);
/// assert_eq!(verdict.status, CaptureStatus::BadScan);
/// assert!(verdict.replaced);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    threshold: u8,
}

impl QualityGate {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Judge a sample of `quality` against the `stored` template.
    ///
    /// The sample replaces the stored template only if there is none or it
    /// scores strictly higher. The status depends on the threshold alone.
    pub fn evaluate(&self, stored: Option<&Template>, quality: u8) -> QualityVerdict {
        let replaced = stored.is_none_or(|template| quality > template.quality());
        let status = if quality >= self.threshold {
            CaptureStatus::GoodScan
        } else {
            CaptureStatus::BadScan
        };
        QualityVerdict { status, replaced }
    }

    /// Evaluate `candidate` and store it on `slot` if it wins.
    ///
    /// The slot's status is left alone; the caller moves it through the
    /// status machine.
    pub fn apply(&self, slot: &mut FingerSlot, candidate: Template) -> QualityVerdict {
        let verdict = self.evaluate(slot.template.as_ref(), candidate.quality());
        if verdict.replaced {
            slot.template = Some(candidate);
        }
        verdict
    }
}
