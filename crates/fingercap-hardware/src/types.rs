//! Types shared by scanner implementations.

use fingercap_core::constants::LAST_REVISION_WITHOUT_FORCE_CAPTURE;
use serde::{Deserialize, Serialize};

/// Scanner metadata.
///
/// Contains name, model, serial number, firmware version and the hardware
/// revision, which decides whether forced single-shot capture exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "Vero 2", "Mock Scanner").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Optional device serial number.
    pub serial_number: Option<String>,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,

    /// Hardware revision, when the scanner reports one.
    pub hardware_revision: Option<u16>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            serial_number: None,
            firmware_version: None,
            hardware_revision: None,
        }
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }

    /// Set the hardware revision.
    pub fn with_hardware_revision(mut self, revision: u16) -> Self {
        self.hardware_revision = Some(revision);
        self
    }

    /// Whether the scanner can force a single-shot capture.
    ///
    /// Scanners that do not report a revision are treated as old hardware.
    ///
    /// ```
    /// use fingercap_hardware::DeviceInfo;
    ///
    /// let old = DeviceInfo::new("Vero", "v4").with_hardware_revision(4);
    /// let new = DeviceInfo::new("Vero", "v6").with_hardware_revision(6);
    /// assert!(!old.supports_force_capture());
    /// assert!(new.supports_force_capture());
    /// ```
    pub fn supports_force_capture(&self) -> bool {
        self.hardware_revision
            .is_some_and(|revision| revision > LAST_REVISION_WITHOUT_FORCE_CAPTURE)
    }
}

/// A press of the scanner's physical trigger button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPress;
