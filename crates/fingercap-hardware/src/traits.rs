//! Scanner device trait definition.
//!
//! [`ScannerDevice`] is the contract between the capture engine and a
//! fingerprint scanner. A capture attempt runs as four separate calls
//! (continuous capture, image-quality extraction, template generation,
//! template extraction) so that each step can fail, be retried or be
//! cancelled on its own.
//!
//! All methods use native `async fn` (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::{DeviceInfo, TriggerPress};

/// Fingerprint scanner abstraction.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic parameters, or the enum wrapper
/// [`AnyScannerDevice`](crate::devices::AnyScannerDevice) where a concrete
/// type is needed (for example to move a scanner into a spawned task).
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use fingercap_hardware::traits::ScannerDevice;
/// use fingercap_hardware::error::Result;
///
/// async fn capture_once<S: ScannerDevice>(scanner: &mut S) -> Result<(u8, Vec<u8>)> {
///     scanner.start_continuous_capture(60, Duration::from_secs(3)).await?;
///     let quality = scanner.extract_image_quality().await?;
///     scanner.generate_template().await?;
///     let template = scanner.extract_template().await?;
///     Ok((quality, template))
/// }
/// ```
pub trait ScannerDevice: Send + Sync {
    /// Scan continuously until a frame reaches `quality_floor`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Timeout`](crate::HardwareError::Timeout) if no
    /// frame reaches the floor within `timeout`, or a scanner fault.
    async fn start_continuous_capture(&mut self, quality_floor: u8, timeout: Duration)
    -> Result<()>;

    /// Take a single frame regardless of quality.
    ///
    /// Only available on hardware newer than revision 4; see
    /// [`DeviceInfo::supports_force_capture`].
    async fn force_capture(&mut self, quality_floor: u8) -> Result<()>;

    /// Abort a running continuous capture. A no-op when none is running.
    async fn stop_continuous_capture(&mut self) -> Result<()>;

    /// Score the captured frame.
    async fn extract_image_quality(&mut self) -> Result<u8>;

    /// Build a template from the captured frame, on the scanner.
    async fn generate_template(&mut self) -> Result<()>;

    /// Read the generated template back from the scanner.
    ///
    /// An empty buffer means the scanner rejected the frame.
    async fn extract_template(&mut self) -> Result<Vec<u8>>;

    /// Quality of the last extracted frame.
    fn image_quality(&self) -> Option<u8>;

    /// Last extracted template.
    fn template(&self) -> Option<&[u8]>;

    /// Return the scanner's indicator LEDs to their idle state.
    async fn reset_ui(&mut self) -> Result<()>;

    /// Re-read the scanner's cached sensor metadata.
    async fn update_firmware_info(&mut self) -> Result<DeviceInfo>;

    /// Establish the connection to the scanner.
    async fn connect(&mut self) -> Result<()>;

    /// Fetch device metadata after connecting.
    async fn sync_device_info(&mut self) -> Result<DeviceInfo>;

    /// Check the scanner runs firmware this host can talk to.
    async fn verify_firmware(&mut self) -> Result<()>;

    /// Get cached device information.
    async fn get_device_info(&self) -> Result<DeviceInfo>;

    /// Start receiving trigger-button presses.
    fn subscribe_trigger(&mut self) -> broadcast::Receiver<TriggerPress>;

    /// Stop delivering trigger-button presses.
    fn unsubscribe_trigger(&mut self);
}
