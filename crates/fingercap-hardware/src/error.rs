//! Error types for scanner operations.
//!
//! [`HardwareError`] describes what went wrong talking to a scanner.
//! [`FaultCode`] is the scanner's own error vocabulary; every
//! `HardwareError` maps onto exactly one code through
//! [`HardwareError::fault_code`], which is what the capture engine
//! classifies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Error codes reported by fingerprint scanners.
///
/// `Sensor*` codes come from the fingerprint sensor module rather than the
/// scanner's main controller. Codes outside the known set are preserved as
/// [`FaultCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FaultCode {
    Busy,
    Interrupted,
    Timeout,
    OutdatedScannerInfo,
    InvalidState,
    ScannerUnreachable,
    SensorInvalidState,
    SensorSdkError,
    IoError,
    NoResponse,
    Unexpected,
    BluetoothDisabled,
    BluetoothNotSupported,
    ScannerUnbonded,
    SensorFailure,
    SensorLowVoltage,
    /// Raw code with no known meaning.
    Unknown(u16),
}

impl FaultCode {
    /// Decode a raw scanner error code.
    ///
    /// ```
    /// use fingercap_hardware::FaultCode;
    ///
    /// assert_eq!(FaultCode::from_raw(1), FaultCode::Busy);
    /// assert_eq!(FaultCode::from_raw(999), FaultCode::Unknown(999));
    /// ```
    pub fn from_raw(code: u16) -> Self {
        match code {
            1 => Self::Busy,
            2 => Self::Interrupted,
            3 => Self::Timeout,
            4 => Self::OutdatedScannerInfo,
            5 => Self::InvalidState,
            6 => Self::ScannerUnreachable,
            7 => Self::SensorInvalidState,
            8 => Self::SensorSdkError,
            9 => Self::IoError,
            10 => Self::NoResponse,
            11 => Self::Unexpected,
            12 => Self::BluetoothDisabled,
            13 => Self::BluetoothNotSupported,
            14 => Self::ScannerUnbonded,
            15 => Self::SensorFailure,
            16 => Self::SensorLowVoltage,
            other => Self::Unknown(other),
        }
    }

    /// Raw scanner error code.
    pub fn raw(self) -> u16 {
        match self {
            Self::Busy => 1,
            Self::Interrupted => 2,
            Self::Timeout => 3,
            Self::OutdatedScannerInfo => 4,
            Self::InvalidState => 5,
            Self::ScannerUnreachable => 6,
            Self::SensorInvalidState => 7,
            Self::SensorSdkError => 8,
            Self::IoError => 9,
            Self::NoResponse => 10,
            Self::Unexpected => 11,
            Self::BluetoothDisabled => 12,
            Self::BluetoothNotSupported => 13,
            Self::ScannerUnbonded => 14,
            Self::SensorFailure => 15,
            Self::SensorLowVoltage => 16,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Errors that can occur during scanner operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Scanner is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Operation is not supported by this scanner.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Transport-level failure.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Scanner (re)initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// The scanner reported an error code while running `operation`.
    #[error("Scanner fault {code} during {operation}")]
    Fault { code: FaultCode, operation: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a scanner fault error.
    pub fn fault(code: FaultCode, operation: impl Into<String>) -> Self {
        Self::Fault {
            code,
            operation: operation.into(),
        }
    }

    /// The scanner fault code this error corresponds to.
    ///
    /// Errors raised by the host side rather than the scanner map onto the
    /// nearest scanner code.
    pub fn fault_code(&self) -> FaultCode {
        match self {
            Self::Fault { code, .. } => *code,
            Self::Disconnected { .. } | Self::InitializationFailed { .. } => {
                FaultCode::ScannerUnreachable
            }
            Self::Timeout { .. } => FaultCode::Timeout,
            Self::CommunicationError { .. } | Self::Io(_) => FaultCode::IoError,
            Self::Unsupported { .. } => {
                FaultCode::Unexpected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("Vero 2");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: Vero 2");
        assert_eq!(error.fault_code(), FaultCode::ScannerUnreachable);
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(3000);
        assert_eq!(error.to_string(), "Operation timeout after 3000ms");
        assert_eq!(error.fault_code(), FaultCode::Timeout);
    }

    #[test]
    fn test_fault_error() {
        let error = HardwareError::fault(FaultCode::Busy, "reset_ui");
        assert_eq!(error.to_string(), "Scanner fault Busy during reset_ui");
        assert_eq!(error.fault_code(), FaultCode::Busy);

        let error = HardwareError::fault(FaultCode::Unknown(77), "connect");
        assert_eq!(error.to_string(), "Scanner fault Unknown(77) during connect");
    }

    #[test]
    fn test_host_errors_map_to_codes() {
        assert_eq!(
            HardwareError::communication("link dropped").fault_code(),
            FaultCode::IoError
        );
        assert_eq!(
            HardwareError::unsupported("force_capture").fault_code(),
            FaultCode::Unexpected
        );
        assert_eq!(
            HardwareError::initialization_failed("no handshake").fault_code(),
            FaultCode::ScannerUnreachable
        );
    }

    #[test]
    fn test_raw_codes_are_stable() {
        for raw in 1..=16u16 {
            let code = FaultCode::from_raw(raw);
            assert!(!matches!(code, FaultCode::Unknown(_)));
            assert_eq!(code.raw(), raw);
        }
        assert_eq!(FaultCode::from_raw(0), FaultCode::Unknown(0));
        assert_eq!(FaultCode::Unknown(512).raw(), 512);
    }
}
