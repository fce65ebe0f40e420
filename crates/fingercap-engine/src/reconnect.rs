//! Scanner reconnection after a connection-level fault.
//!
//! The coordinator runs connect → sync device info → verify firmware, up to
//! a configured number of passes, and can be cancelled at any point through
//! a [`CancellationToken`]. The trigger binding and the "reconnecting"
//! indicator belong to the sequencer; this module only talks to the
//! scanner.

use std::fmt;

use fingercap_core::AlertKind;
use fingercap_hardware::{DeviceInfo, FaultCode, HardwareError, ScannerDevice};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::{RecoveryPolicy, classify, reconnect_alert_kind};

/// Steps of one reconnection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectStep {
    Connect,
    SyncDeviceInfo,
    VerifyFirmware,
}

impl fmt::Display for ReconnectStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::SyncDeviceInfo => write!(f, "sync_device_info"),
            Self::VerifyFirmware => write!(f, "verify_firmware"),
        }
    }
}

/// Why reconnection gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconnectFailure {
    pub step: ReconnectStep,
    pub code: FaultCode,
    /// Alert the operator should see.
    pub alert: AlertKind,
}

/// Result of a reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectOutcome {
    Reconnected(DeviceInfo),
    Failed(ReconnectFailure),
    /// The operator dismissed the reconnecting indicator.
    Cancelled,
}

/// Drives the reconnection protocol against a shared scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectionCoordinator {
    attempts: u32,
}

impl ReconnectionCoordinator {
    /// Coordinator making up to `attempts` passes (at least one).
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reconnect `device`, or report why it could not be done.
    ///
    /// A failure whose cause is not connection-level (Bluetooth switched
    /// off, scanner unpaired, ...) ends the run immediately instead of
    /// using up the remaining passes.
    pub async fn run<D: ScannerDevice>(
        &self,
        device: &Mutex<D>,
        token: CancellationToken,
    ) -> ReconnectOutcome {
        let mut last_failure = None;

        for attempt in 1..=self.attempts {
            info!("Reconnecting to scanner (attempt {}/{})", attempt, self.attempts);

            let result = tokio::select! {
                result = Self::pass(device) => result,
                _ = token.cancelled() => {
                    info!("Reconnection cancelled");
                    return ReconnectOutcome::Cancelled;
                }
            };

            match result {
                Ok(info) => {
                    info!("Scanner reconnected: {} ({})", info.name, info.model);
                    return ReconnectOutcome::Reconnected(info);
                }
                Err(failure) => {
                    warn!(
                        "Reconnection step {} failed with {}",
                        failure.step, failure.code
                    );
                    let retryable = matches!(
                        classify(failure.code),
                        RecoveryPolicy::ConnectionLost
                            | RecoveryPolicy::Transient
                            | RecoveryPolicy::RetryOperation
                    );
                    last_failure = Some(failure);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        ReconnectOutcome::Failed(last_failure.unwrap_or(ReconnectFailure {
            step: ReconnectStep::Connect,
            code: FaultCode::ScannerUnreachable,
            alert: AlertKind::Disconnected,
        }))
    }

    /// One connect/sync/verify pass.
    async fn pass<D: ScannerDevice>(
        device: &Mutex<D>,
    ) -> std::result::Result<DeviceInfo, ReconnectFailure> {
        let mut device = device.lock().await;

        device
            .connect()
            .await
            .map_err(|e| Self::failure(ReconnectStep::Connect, &e))?;
        debug!("Reconnect: connected");

        let info = device
            .sync_device_info()
            .await
            .map_err(|e| Self::failure(ReconnectStep::SyncDeviceInfo, &e))?;
        debug!("Reconnect: device info synced");

        device
            .verify_firmware()
            .await
            .map_err(|e| Self::failure(ReconnectStep::VerifyFirmware, &e))?;
        debug!("Reconnect: firmware verified");

        Ok(info)
    }

    fn failure(step: ReconnectStep, error: &HardwareError) -> ReconnectFailure {
        let code = error.fault_code();
        ReconnectFailure {
            step,
            code,
            alert: reconnect_alert_kind(code),
        }
    }
}
