//! Mock fingerprint scanner for testing and development.
//!
//! The scanner is driven from a [`MockScannerHandle`]: tests place fingers
//! on the sensor, press the trigger button, drop the connection and script
//! faults for individual operations.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::debug;

use crate::{
    HardwareError, Result,
    error::FaultCode,
    traits::ScannerDevice,
    types::{DeviceInfo, TriggerPress},
};

/// Hardware revision reported by a default mock scanner.
pub const MOCK_HARDWARE_REVISION: u16 = 6;

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockStep {
    ContinuousCapture,
    ForceCapture,
    StopCapture,
    ExtractImageQuality,
    GenerateTemplate,
    ExtractTemplate,
    ResetUi,
    UpdateFirmwareInfo,
    Connect,
    SyncDeviceInfo,
    VerifyFirmware,
}

impl MockStep {
    fn name(self) -> &'static str {
        match self {
            Self::ContinuousCapture => "start_continuous_capture",
            Self::ForceCapture => "force_capture",
            Self::StopCapture => "stop_continuous_capture",
            Self::ExtractImageQuality => "extract_image_quality",
            Self::GenerateTemplate => "generate_template",
            Self::ExtractTemplate => "extract_template",
            Self::ResetUi => "reset_ui",
            Self::UpdateFirmwareInfo => "update_firmware_info",
            Self::Connect => "connect",
            Self::SyncDeviceInfo => "sync_device_info",
            Self::VerifyFirmware => "verify_firmware",
        }
    }
}

#[derive(Debug, Clone)]
struct Frame {
    template: Vec<u8>,
    quality: u8,
}

/// State shared between the scanner and its handle.
#[derive(Debug)]
struct MockState {
    info: DeviceInfo,
    connected: bool,
    trigger_bound: bool,
    faults: HashMap<MockStep, VecDeque<FaultCode>>,
    calls: Vec<MockStep>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock fingerprint scanner.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use fingercap_hardware::mock::MockScanner;
/// use fingercap_hardware::traits::ScannerDevice;
///
/// #[tokio::main]
/// async fn main() -> fingercap_hardware::Result<()> {
///     let (mut scanner, handle) = MockScanner::new();
///
///     handle.place_finger(vec![1, 2, 3, 4, 5], 75).await?;
///
///     scanner.start_continuous_capture(60, Duration::from_secs(1)).await?;
///     assert_eq!(scanner.extract_image_quality().await?, 75);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockScanner {
    /// Frames placed on the sensor by the handle.
    frame_rx: mpsc::Receiver<Frame>,

    state: Arc<Mutex<MockState>>,

    trigger_tx: broadcast::Sender<TriggerPress>,

    /// Frame accepted by the last capture.
    captured: Option<Frame>,

    /// Most recent frame seen, even if below the quality floor.
    last_seen: Option<Frame>,

    template_ready: bool,
    quality: Option<u8>,
    template: Option<Vec<u8>>,
}

impl MockScanner {
    /// Create a new mock scanner with the default name and a hardware
    /// revision that supports forced capture.
    pub fn new() -> (Self, MockScannerHandle) {
        Self::with_info(
            DeviceInfo::new("Mock Scanner", "Mock Fingerprint Scanner v1.0")
                .with_firmware_version("1.0.0")
                .with_hardware_revision(MOCK_HARDWARE_REVISION),
        )
    }

    /// Create a mock scanner reporting a specific hardware revision.
    pub fn with_revision(revision: u16) -> (Self, MockScannerHandle) {
        let (scanner, handle) = Self::new();
        handle.set_hardware_revision(revision);
        (scanner, handle)
    }

    /// Create a mock scanner with custom device information.
    pub fn with_info(info: DeviceInfo) -> (Self, MockScannerHandle) {
        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (trigger_tx, _) = broadcast::channel(16);

        let state = Arc::new(Mutex::new(MockState {
            info,
            connected: true,
            trigger_bound: false,
            faults: HashMap::new(),
            calls: Vec::new(),
        }));

        let scanner = Self {
            frame_rx,
            state: Arc::clone(&state),
            trigger_tx: trigger_tx.clone(),
            captured: None,
            last_seen: None,
            template_ready: false,
            quality: None,
            template: None,
        };

        let handle = MockScannerHandle {
            frame_tx,
            state,
            trigger_tx,
        };

        (scanner, handle)
    }

    /// Record the call and apply connection state and scripted faults.
    fn begin(&self, step: MockStep) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(step);

        if step != MockStep::Connect && !state.connected {
            return Err(HardwareError::fault(
                FaultCode::ScannerUnreachable,
                step.name(),
            ));
        }

        if let Some(code) = state.faults.get_mut(&step).and_then(VecDeque::pop_front) {
            debug!("Mock scanner injecting {} into {}", code, step.name());
            return Err(HardwareError::fault(code, step.name()));
        }

        if step == MockStep::Connect {
            state.connected = true;
        }

        Ok(())
    }

    fn reset_attempt(&mut self) {
        self.captured = None;
        self.template_ready = false;
        self.quality = None;
        self.template = None;
    }
}

impl ScannerDevice for MockScanner {
    async fn start_continuous_capture(
        &mut self,
        quality_floor: u8,
        timeout: Duration,
    ) -> Result<()> {
        self.begin(MockStep::ContinuousCapture)?;
        self.reset_attempt();

        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.frame_rx.recv()).await {
                Ok(Some(frame)) if frame.quality >= quality_floor => {
                    self.captured = Some(frame);
                    return Ok(());
                }
                Ok(Some(frame)) => {
                    debug!(
                        "Mock scanner skipping frame with quality {} below floor {}",
                        frame.quality, quality_floor
                    );
                    self.last_seen = Some(frame);
                }
                Ok(None) => return Err(HardwareError::disconnected("Mock scanner frame channel closed")),
                Err(_) => return Err(HardwareError::timeout(timeout.as_millis() as u64)),
            }
        }
    }

    async fn force_capture(&mut self, _quality_floor: u8) -> Result<()> {
        self.begin(MockStep::ForceCapture)?;
        if !lock(&self.state).info.supports_force_capture() {
            return Err(HardwareError::fault(
                FaultCode::SensorSdkError,
                MockStep::ForceCapture.name(),
            ));
        }
        self.reset_attempt();

        let frame = match self.frame_rx.try_recv() {
            Ok(frame) => frame,
            Err(_) => self.last_seen.take().unwrap_or(Frame {
                template: vec![0; 16],
                quality: 0,
            }),
        };
        self.captured = Some(frame);
        Ok(())
    }

    async fn stop_continuous_capture(&mut self) -> Result<()> {
        self.begin(MockStep::StopCapture)
    }

    async fn extract_image_quality(&mut self) -> Result<u8> {
        self.begin(MockStep::ExtractImageQuality)?;
        let quality = self
            .captured
            .as_ref()
            .map(|frame| frame.quality)
            .ok_or_else(|| {
                HardwareError::fault(
                    FaultCode::SensorInvalidState,
                    MockStep::ExtractImageQuality.name(),
                )
            })?;
        self.quality = Some(quality);
        Ok(quality)
    }

    async fn generate_template(&mut self) -> Result<()> {
        self.begin(MockStep::GenerateTemplate)?;
        if self.captured.is_none() {
            return Err(HardwareError::fault(
                FaultCode::SensorInvalidState,
                MockStep::GenerateTemplate.name(),
            ));
        }
        self.template_ready = true;
        Ok(())
    }

    async fn extract_template(&mut self) -> Result<Vec<u8>> {
        self.begin(MockStep::ExtractTemplate)?;
        let template = match (&self.captured, self.template_ready) {
            (Some(frame), true) => frame.template.clone(),
            _ => {
                return Err(HardwareError::fault(
                    FaultCode::SensorInvalidState,
                    MockStep::ExtractTemplate.name(),
                ));
            }
        };
        self.template = Some(template.clone());
        Ok(template)
    }

    fn image_quality(&self) -> Option<u8> {
        self.quality
    }

    fn template(&self) -> Option<&[u8]> {
        self.template.as_deref()
    }

    async fn reset_ui(&mut self) -> Result<()> {
        self.begin(MockStep::ResetUi)
    }

    async fn update_firmware_info(&mut self) -> Result<DeviceInfo> {
        self.begin(MockStep::UpdateFirmwareInfo)?;
        Ok(lock(&self.state).info.clone())
    }

    async fn connect(&mut self) -> Result<()> {
        self.begin(MockStep::Connect)
    }

    async fn sync_device_info(&mut self) -> Result<DeviceInfo> {
        self.begin(MockStep::SyncDeviceInfo)?;
        Ok(lock(&self.state).info.clone())
    }

    async fn verify_firmware(&mut self) -> Result<()> {
        self.begin(MockStep::VerifyFirmware)
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(lock(&self.state).info.clone())
    }

    fn subscribe_trigger(&mut self) -> broadcast::Receiver<TriggerPress> {
        lock(&self.state).trigger_bound = true;
        self.trigger_tx.subscribe()
    }

    fn unsubscribe_trigger(&mut self) {
        lock(&self.state).trigger_bound = false;
    }
}

/// Handle for controlling a mock scanner.
#[derive(Debug, Clone)]
pub struct MockScannerHandle {
    frame_tx: mpsc::Sender<Frame>,
    state: Arc<Mutex<MockState>>,
    trigger_tx: broadcast::Sender<TriggerPress>,
}

impl MockScannerHandle {
    /// Place a finger on the sensor.
    ///
    /// The frame is picked up by the next continuous capture if its quality
    /// reaches the floor, or by a forced capture regardless of quality.
    ///
    /// # Errors
    ///
    /// Returns an error if the scanner has been dropped.
    pub async fn place_finger(&self, template: Vec<u8>, quality: u8) -> Result<()> {
        self.frame_tx
            .send(Frame { template, quality })
            .await
            .map_err(|_| HardwareError::disconnected("Mock scanner frame channel closed"))
    }

    /// Make the next call to `step` fail with `code`.
    ///
    /// Calling this repeatedly queues several failures for the same step.
    pub fn fail_next(&self, step: MockStep, code: FaultCode) {
        lock(&self.state)
            .faults
            .entry(step)
            .or_default()
            .push_back(code);
    }

    /// Drop the connection. Every call except `connect` reports the scanner
    /// as unreachable until it reconnects.
    pub fn disconnect(&self) {
        lock(&self.state).connected = false;
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    /// Press the trigger button. Returns `false` if nobody is listening.
    pub fn press_trigger(&self) -> bool {
        lock(&self.state).trigger_bound && self.trigger_tx.send(TriggerPress).is_ok()
    }

    pub fn is_trigger_bound(&self) -> bool {
        lock(&self.state).trigger_bound
    }

    pub fn set_hardware_revision(&self, revision: u16) {
        lock(&self.state).info.hardware_revision = Some(revision);
    }

    /// Every scanner operation called so far, in order.
    pub fn calls(&self) -> Vec<MockStep> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, step: MockStep) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| **call == step)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_scanner_capture() {
        let (mut scanner, handle) = MockScanner::new();
        handle.place_finger(vec![1, 2, 3, 4, 5], 75).await.unwrap();

        scanner
            .start_continuous_capture(60, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(scanner.extract_image_quality().await.unwrap(), 75);
        scanner.generate_template().await.unwrap();
        assert_eq!(scanner.extract_template().await.unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(scanner.image_quality(), Some(75));
        assert_eq!(scanner.template(), Some(&[1, 2, 3, 4, 5][..]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_scanner_skips_low_quality_then_times_out() {
        let (mut scanner, handle) = MockScanner::new();
        handle.place_finger(vec![9], 30).await.unwrap();

        let err = scanner
            .start_continuous_capture(60, Duration::from_secs(3))
            .await
            .unwrap_err();
        assert_eq!(err.fault_code(), FaultCode::Timeout);

        // Forced capture takes the frame the continuous capture rejected.
        scanner.force_capture(60).await.unwrap();
        assert_eq!(scanner.extract_image_quality().await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_mock_scanner_old_revision_cannot_force() {
        let (mut scanner, _handle) = MockScanner::with_revision(4);
        let err = scanner.force_capture(60).await.unwrap_err();
        assert_eq!(err.fault_code(), FaultCode::SensorSdkError);
    }

    #[tokio::test]
    async fn test_mock_scanner_scripted_fault_is_consumed() {
        let (mut scanner, handle) = MockScanner::new();
        handle.fail_next(MockStep::ResetUi, FaultCode::Busy);

        let err = scanner.reset_ui().await.unwrap_err();
        assert_eq!(err.fault_code(), FaultCode::Busy);
        assert!(scanner.reset_ui().await.is_ok());
        assert_eq!(handle.call_count(MockStep::ResetUi), 2);
    }

    #[tokio::test]
    async fn test_mock_scanner_disconnect_and_reconnect() {
        let (mut scanner, handle) = MockScanner::new();
        handle.disconnect();

        let err = scanner.generate_template().await.unwrap_err();
        assert_eq!(err.fault_code(), FaultCode::ScannerUnreachable);

        scanner.connect().await.unwrap();
        assert!(handle.is_connected());
        assert_eq!(
            scanner.sync_device_info().await.unwrap().hardware_revision,
            Some(MOCK_HARDWARE_REVISION)
        );
        scanner.verify_firmware().await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_scanner_extract_without_capture() {
        let (mut scanner, _handle) = MockScanner::new();
        let err = scanner.extract_template().await.unwrap_err();
        assert_eq!(err.fault_code(), FaultCode::SensorInvalidState);
    }

    #[tokio::test]
    async fn test_mock_scanner_trigger_binding() {
        let (mut scanner, handle) = MockScanner::new();
        assert!(!handle.press_trigger());

        let mut presses = scanner.subscribe_trigger();
        assert!(handle.is_trigger_bound());
        assert!(handle.press_trigger());
        assert_eq!(presses.recv().await.unwrap(), TriggerPress);

        scanner.unsubscribe_trigger();
        assert!(!handle.is_trigger_bound());
        assert!(!handle.press_trigger());
    }

    #[tokio::test]
    async fn test_mock_scanner_device_info() {
        let (scanner, handle) = MockScanner::new();
        handle.set_hardware_revision(3);

        let info = scanner.get_device_info().await.unwrap();
        assert_eq!(info.name, "Mock Scanner");
        assert_eq!(info.hardware_revision, Some(3));
        assert!(!info.supports_force_capture());
    }
}
