use crate::{Result, constants::MAX_QUALITY_SCORE, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the ten anatomical finger positions.
///
/// Variants are listed left hand first, thumb to little finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerId {
    LeftThumb,
    LeftIndex,
    LeftMiddle,
    LeftRing,
    LeftLittle,
    RightThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightLittle,
}

impl FingerId {
    /// All ten fingers in declaration order.
    pub const ALL: [FingerId; 10] = [
        FingerId::LeftThumb,
        FingerId::LeftIndex,
        FingerId::LeftMiddle,
        FingerId::LeftRing,
        FingerId::LeftLittle,
        FingerId::RightThumb,
        FingerId::RightIndex,
        FingerId::RightMiddle,
        FingerId::RightRing,
        FingerId::RightLittle,
    ];

    /// Stable snake_case name, identical to the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FingerId::LeftThumb => "left_thumb",
            FingerId::LeftIndex => "left_index",
            FingerId::LeftMiddle => "left_middle",
            FingerId::LeftRing => "left_ring",
            FingerId::LeftLittle => "left_little",
            FingerId::RightThumb => "right_thumb",
            FingerId::RightIndex => "right_index",
            FingerId::RightMiddle => "right_middle",
            FingerId::RightRing => "right_ring",
            FingerId::RightLittle => "right_little",
        }
    }
}

impl fmt::Display for FingerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FingerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FingerId::ALL
            .into_iter()
            .find(|finger| finger.as_str() == s)
            .ok_or_else(|| Error::UnknownFinger(s.to_string()))
    }
}

/// Whether a finger must, may, or must not be captured in this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerRequirement {
    /// Always active; the operator cannot remove it.
    Required,
    /// May be added or removed by the operator.
    Optional,
    /// Never active.
    Excluded,
}

impl FingerRequirement {
    #[must_use]
    pub fn is_required(self) -> bool {
        self == FingerRequirement::Required
    }

    #[must_use]
    pub fn is_excluded(self) -> bool {
        self == FingerRequirement::Excluded
    }
}

impl fmt::Display for FingerRequirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FingerRequirement::Required => write!(f, "Required"),
            FingerRequirement::Optional => write!(f, "Optional"),
            FingerRequirement::Excluded => write!(f, "Excluded"),
        }
    }
}

/// Visible capture status of a single finger.
///
/// # Valid Transitions
///
/// - NotCollected / BadScan / RescanGoodScan → Collecting (start capture)
/// - GoodScan → RescanGoodScan (operator asks for another attempt)
/// - Collecting → GoodScan / BadScan (sample scored)
/// - Collecting → the status it had before (cancel or transient fault)
/// - any → NotCollected (clear, forced-error rollback)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    #[default]
    NotCollected,
    Collecting,
    GoodScan,
    BadScan,
    RescanGoodScan,
}

impl CaptureStatus {
    /// Check if moving from this status to `target` is allowed.
    ///
    /// ```
    /// use fingercap_core::CaptureStatus;
    ///
    /// assert!(CaptureStatus::GoodScan.can_transition_to(&CaptureStatus::RescanGoodScan));
    /// assert!(!CaptureStatus::GoodScan.can_transition_to(&CaptureStatus::Collecting));
    /// ```
    #[must_use]
    pub fn can_transition_to(&self, target: &CaptureStatus) -> bool {
        use CaptureStatus::*;

        matches!(
            (self, target),
            // Start capture
            (NotCollected | BadScan | RescanGoodScan, Collecting)
            // Re-trigger on a good finger
            | (GoodScan, RescanGoodScan)
            // Scored, or rolled back to the pre-capture snapshot
            | (Collecting, GoodScan | BadScan | NotCollected | RescanGoodScan)
            // Clear
            | (GoodScan | BadScan | RescanGoodScan | NotCollected, NotCollected)
        )
    }

    /// Statuses that count towards a submission.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(
            self,
            CaptureStatus::GoodScan | CaptureStatus::BadScan | CaptureStatus::RescanGoodScan
        )
    }

    /// Statuses reached by a sample at or above the quality threshold.
    #[must_use]
    pub fn is_good(self) -> bool {
        matches!(self, CaptureStatus::GoodScan | CaptureStatus::RescanGoodScan)
    }

    #[must_use]
    pub fn is_collecting(self) -> bool {
        self == CaptureStatus::Collecting
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let status_str = match self {
            CaptureStatus::NotCollected => "NotCollected",
            CaptureStatus::Collecting => "Collecting",
            CaptureStatus::GoodScan => "GoodScan",
            CaptureStatus::BadScan => "BadScan",
            CaptureStatus::RescanGoodScan => "RescanGoodScan",
        };
        write!(f, "{}", status_str)
    }
}

/// A captured fingerprint template.
///
/// The bytes are opaque to fingercap. A template is only ever replaced as a
/// whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    bytes: Vec<u8>,
    quality: u8,
    captured_at: DateTime<Utc>,
}

impl Template {
    /// Create a template stamped with the current time.
    ///
    /// # Errors
    /// Returns `Error::QualityOutOfRange` if `quality` exceeds 100.
    pub fn new(bytes: Vec<u8>, quality: u8) -> Result<Self> {
        Self::with_timestamp(bytes, quality, Utc::now())
    }

    /// Create a template with an explicit capture time.
    ///
    /// # Errors
    /// Returns `Error::QualityOutOfRange` if `quality` exceeds 100.
    pub fn with_timestamp(bytes: Vec<u8>, quality: u8, captured_at: DateTime<Utc>) -> Result<Self> {
        if quality > MAX_QUALITY_SCORE {
            return Err(Error::QualityOutOfRange(quality));
        }
        Ok(Self {
            bytes,
            quality,
            captured_at,
        })
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn quality(&self) -> u8 {
        self.quality
    }

    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// Terminal alert shown to the operator when a session cannot continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The scanner could not be reached again after a connection fault.
    Disconnected,
    /// Any fault without a more specific alert.
    UnexpectedError,
    BluetoothNotEnabled,
    BluetoothNotSupported,
    /// The scanner is not paired with this host.
    NotPaired,
    /// Sensor voltage too low to capture.
    LowBattery,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind_str = match self {
            AlertKind::Disconnected => "Disconnected",
            AlertKind::UnexpectedError => "UnexpectedError",
            AlertKind::BluetoothNotEnabled => "BluetoothNotEnabled",
            AlertKind::BluetoothNotSupported => "BluetoothNotSupported",
            AlertKind::NotPaired => "NotPaired",
            AlertKind::LowBattery => "LowBattery",
        };
        write!(f, "{}", kind_str)
    }
}
