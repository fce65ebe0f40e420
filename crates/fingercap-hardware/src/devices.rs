//! Enum wrapper for scanner dispatch.
//!
//! Native `async fn` in traits (RPITIT, Edition 2024) are not object-safe,
//! so `Box<dyn ScannerDevice>` is not available. [`AnyScannerDevice`] gives
//! the capture engine one concrete, `Send` scanner type it can share with
//! spawned tasks, while each variant keeps its own implementation.
//!
//! # Examples
//!
//! ```
//! use fingercap_hardware::devices::AnyScannerDevice;
//! use fingercap_hardware::mock::MockScanner;
//!
//! let (scanner, _handle) = MockScanner::new();
//! let any_scanner = AnyScannerDevice::Mock(scanner);
//! ```

use std::time::Duration;

use tokio::sync::broadcast;

use crate::mock::MockScanner;
use crate::traits::ScannerDevice;
use crate::{DeviceInfo, Result, TriggerPress};

/// Enum wrapper for scanner dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyScannerDevice {
    /// Mock scanner for development and testing.
    Mock(MockScanner),
}

impl From<MockScanner> for AnyScannerDevice {
    fn from(scanner: MockScanner) -> Self {
        Self::Mock(scanner)
    }
}

impl ScannerDevice for AnyScannerDevice {
    async fn start_continuous_capture(
        &mut self,
        quality_floor: u8,
        timeout: Duration,
    ) -> Result<()> {
        match self {
            Self::Mock(device) => device.start_continuous_capture(quality_floor, timeout).await,
        }
    }

    async fn force_capture(&mut self, quality_floor: u8) -> Result<()> {
        match self {
            Self::Mock(device) => device.force_capture(quality_floor).await,
        }
    }

    async fn stop_continuous_capture(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.stop_continuous_capture().await,
        }
    }

    async fn extract_image_quality(&mut self) -> Result<u8> {
        match self {
            Self::Mock(device) => device.extract_image_quality().await,
        }
    }

    async fn generate_template(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.generate_template().await,
        }
    }

    async fn extract_template(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::Mock(device) => device.extract_template().await,
        }
    }

    fn image_quality(&self) -> Option<u8> {
        match self {
            Self::Mock(device) => device.image_quality(),
        }
    }

    fn template(&self) -> Option<&[u8]> {
        match self {
            Self::Mock(device) => device.template(),
        }
    }

    async fn reset_ui(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.reset_ui().await,
        }
    }

    async fn update_firmware_info(&mut self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.update_firmware_info().await,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.connect().await,
        }
    }

    async fn sync_device_info(&mut self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.sync_device_info().await,
        }
    }

    async fn verify_firmware(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.verify_firmware().await,
        }
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(device) => device.get_device_info().await,
        }
    }

    fn subscribe_trigger(&mut self) -> broadcast::Receiver<TriggerPress> {
        match self {
            Self::Mock(device) => device.subscribe_trigger(),
        }
    }

    fn unsubscribe_trigger(&mut self) {
        match self {
            Self::Mock(device) => device.unsubscribe_trigger(),
        }
    }
}
