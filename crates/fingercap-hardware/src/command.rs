//! Scanner commands as data.
//!
//! The capture engine decides *which* command to run next without touching
//! the scanner; [`DeviceCommand::execute`] is where a command meets a real
//! [`ScannerDevice`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::traits::ScannerDevice;
use crate::types::DeviceInfo;

/// A single scanner operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCommand {
    StartContinuousCapture { quality_floor: u8, timeout: Duration },
    ForceCapture { quality_floor: u8 },
    ExtractImageQuality,
    GenerateTemplate,
    ExtractTemplate,
    ResetUi,
    UpdateFirmwareInfo,
}

impl DeviceCommand {
    /// Short operation name used in logs and fault records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartContinuousCapture { .. } => "start_continuous_capture",
            Self::ForceCapture { .. } => "force_capture",
            Self::ExtractImageQuality => "extract_image_quality",
            Self::GenerateTemplate => "generate_template",
            Self::ExtractTemplate => "extract_template",
            Self::ResetUi => "reset_ui",
            Self::UpdateFirmwareInfo => "update_firmware_info",
        }
    }

    /// Run the command against `device`.
    pub async fn execute<D: ScannerDevice>(&self, device: &mut D) -> Result<DeviceReply> {
        match *self {
            Self::StartContinuousCapture {
                quality_floor,
                timeout,
            } => {
                device
                    .start_continuous_capture(quality_floor, timeout)
                    .await?;
                Ok(DeviceReply::Captured)
            }
            Self::ForceCapture { quality_floor } => {
                device.force_capture(quality_floor).await?;
                Ok(DeviceReply::Captured)
            }
            Self::ExtractImageQuality => {
                let quality = device.extract_image_quality().await?;
                Ok(DeviceReply::ImageQuality(quality))
            }
            Self::GenerateTemplate => {
                device.generate_template().await?;
                Ok(DeviceReply::TemplateGenerated)
            }
            Self::ExtractTemplate => {
                let template = device.extract_template().await?;
                Ok(DeviceReply::Template(template))
            }
            Self::ResetUi => {
                device.reset_ui().await?;
                Ok(DeviceReply::UiReset)
            }
            Self::UpdateFirmwareInfo => {
                let info = device.update_firmware_info().await?;
                Ok(DeviceReply::FirmwareInfoUpdated(info))
            }
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Successful completion of a [`DeviceCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReply {
    /// A frame was captured (continuous or forced).
    Captured,
    ImageQuality(u8),
    TemplateGenerated,
    Template(Vec<u8>),
    UiReset,
    FirmwareInfoUpdated(DeviceInfo),
}

impl DeviceReply {
    /// Whether this reply is the expected answer to `command`.
    pub fn answers(&self, command: &DeviceCommand) -> bool {
        matches!(
            (command, self),
            (
                DeviceCommand::StartContinuousCapture { .. } | DeviceCommand::ForceCapture { .. },
                DeviceReply::Captured
            ) | (DeviceCommand::ExtractImageQuality, DeviceReply::ImageQuality(_))
                | (DeviceCommand::GenerateTemplate, DeviceReply::TemplateGenerated)
                | (DeviceCommand::ExtractTemplate, DeviceReply::Template(_))
                | (DeviceCommand::ResetUi, DeviceReply::UiReset)
                | (
                    DeviceCommand::UpdateFirmwareInfo,
                    DeviceReply::FirmwareInfoUpdated(_)
                )
        )
    }
}
