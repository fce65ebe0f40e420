//! Scanner fault classification.
//!
//! Every [`FaultCode`] maps to exactly one [`RecoveryPolicy`]; this module
//! is the only place in the engine that looks at raw codes. Codes without a
//! known meaning are fatal.
//!
//! | Policy | Codes |
//! |---|---|
//! | Transient | Interrupted, Timeout |
//! | RetryOperation | Busy |
//! | ConnectionLost | InvalidState, ScannerUnreachable, SensorInvalidState |
//! | FirmwareVersionStale | OutdatedScannerInfo |
//! | HardwareCapabilityGap | SensorSdkError |
//! | Fatal | everything else |

use std::fmt;

use fingercap_core::AlertKind;
use fingercap_hardware::FaultCode;
use serde::Serialize;

/// What the sequencer does about a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Roll back to the pre-attempt status, no alert.
    Transient,
    /// Re-issue the same command once.
    RetryOperation,
    /// Roll back and reconnect.
    ConnectionLost,
    /// Roll back, refresh scanner metadata, retry the command.
    FirmwareVersionStale,
    /// Mark the finger as a bad scan without retrying.
    HardwareCapabilityGap,
    /// Roll back, raise a terminal alert, end the session.
    Fatal,
}

/// Coarse fault family, as reported in fault records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultClass {
    Transient,
    ConnectionLost,
    HardwareFirmwareFault,
    Fatal,
}

impl RecoveryPolicy {
    pub fn class(self) -> FaultClass {
        match self {
            Self::Transient | Self::RetryOperation => FaultClass::Transient,
            Self::ConnectionLost => FaultClass::ConnectionLost,
            Self::FirmwareVersionStale | Self::HardwareCapabilityGap => {
                FaultClass::HardwareFirmwareFault
            }
            Self::Fatal => FaultClass::Fatal,
        }
    }
}

impl fmt::Display for RecoveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Map a fault code to its recovery policy.
pub fn classify(code: FaultCode) -> RecoveryPolicy {
    match code {
        FaultCode::Interrupted | FaultCode::Timeout => RecoveryPolicy::Transient,
        FaultCode::Busy => RecoveryPolicy::RetryOperation,
        FaultCode::InvalidState | FaultCode::ScannerUnreachable | FaultCode::SensorInvalidState => {
            RecoveryPolicy::ConnectionLost
        }
        FaultCode::OutdatedScannerInfo => RecoveryPolicy::FirmwareVersionStale,
        FaultCode::SensorSdkError => RecoveryPolicy::HardwareCapabilityGap,
        _ => RecoveryPolicy::Fatal,
    }
}

/// Alert shown when `code` ends the session.
pub fn alert_kind(code: FaultCode) -> AlertKind {
    match code {
        FaultCode::BluetoothDisabled => AlertKind::BluetoothNotEnabled,
        FaultCode::BluetoothNotSupported => AlertKind::BluetoothNotSupported,
        FaultCode::ScannerUnbonded => AlertKind::NotPaired,
        FaultCode::SensorLowVoltage => AlertKind::LowBattery,
        _ => AlertKind::UnexpectedError,
    }
}

/// Alert shown when reconnection fails with `code`.
///
/// Connection-level and transient causes mean the scanner is gone; anything
/// else keeps its own alert.
pub fn reconnect_alert_kind(code: FaultCode) -> AlertKind {
    match classify(code) {
        RecoveryPolicy::ConnectionLost
        | RecoveryPolicy::Transient
        | RecoveryPolicy::RetryOperation => AlertKind::Disconnected,
        _ => alert_kind(code),
    }
}

/// A classified fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    pub code: FaultCode,
    pub policy: RecoveryPolicy,
}

impl FaultRecord {
    pub fn new(code: FaultCode) -> Self {
        Self {
            code,
            policy: classify(code),
        }
    }

    pub fn class(&self) -> FaultClass {
        self.policy.class()
    }
}
