//! Scripted operators.

use anyhow::{Result, bail};
use clap::ValueEnum;
use fingercap_core::CaptureStatus;
use fingercap_engine::{CaptureEvent, ScreenUpdate, WorkflowHandle};
use fingercap_hardware::FaultCode;
use fingercap_hardware::mock::{MockScannerHandle, MockStep};
use tracing::info;

/// Operator scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Capture both required fingers and submit.
    Happy,
    /// Bad scan, good scan, worse rescan; the best template is submitted.
    Rescan,
    /// Lose the scanner mid-session, reconnect, carry on.
    Reconnect,
    /// A low-battery fault ends the session.
    Fatal,
}

/// Play `scenario` against a running session.
pub async fn run(
    scenario: Scenario,
    mut handle: WorkflowHandle,
    scanner: &MockScannerHandle,
) -> Result<()> {
    wait(&mut handle, |update| {
        matches!(update, ScreenUpdate::ContinueAvailable { .. })
    })
    .await?;

    match scenario {
        Scenario::Happy => {
            for index in 0..2 {
                scan(&mut handle, scanner, index, 85).await?;
            }
            handle.send(CaptureEvent::SubmitPressed).await?;
        }
        Scenario::Rescan => {
            scan(&mut handle, scanner, 0, 45).await?;
            scan(&mut handle, scanner, 0, 70).await?;
            handle.send(CaptureEvent::FingerSelected(0)).await?;
            handle.send(CaptureEvent::ScanPressed).await?;
            wait_for_status(&mut handle, 0, CaptureStatus::RescanGoodScan).await?;
            scan(&mut handle, scanner, 0, 50).await?;
            handle.send(CaptureEvent::SubmitPressed).await?;
        }
        Scenario::Reconnect => {
            scanner.disconnect();
            handle.send(CaptureEvent::ScanPressed).await?;
            wait(&mut handle, |update| *update == ScreenUpdate::ReconnectingHidden).await?;
            scan(&mut handle, scanner, 0, 80).await?;
            handle.send(CaptureEvent::SubmitPressed).await?;
        }
        Scenario::Fatal => {
            scanner.fail_next(MockStep::ContinuousCapture, FaultCode::SensorLowVoltage);
            handle.send(CaptureEvent::ScanPressed).await?;
        }
    }

    while let Some(update) = handle.next_update().await {
        log_update(&update);
    }
    Ok(())
}

/// Select the finger at `index`, put a finger of `quality` on the sensor
/// and scan it.
async fn scan(
    handle: &mut WorkflowHandle,
    scanner: &MockScannerHandle,
    index: usize,
    quality: u8,
) -> Result<()> {
    handle.send(CaptureEvent::FingerSelected(index)).await?;
    let template = (0..32u8).map(|byte| byte ^ quality).collect();
    scanner.place_finger(template, quality).await?;
    handle.send(CaptureEvent::ScanPressed).await?;

    wait(handle, |update| {
        matches!(
            update,
            ScreenUpdate::StatusChanged { index: i, status, .. }
                if *i == index && matches!(status, CaptureStatus::GoodScan | CaptureStatus::BadScan)
        )
    })
    .await
}

async fn wait_for_status(
    handle: &mut WorkflowHandle,
    index: usize,
    expected: CaptureStatus,
) -> Result<()> {
    wait(handle, |update| {
        matches!(
            update,
            ScreenUpdate::StatusChanged { index: i, status, .. } if *i == index && *status == expected
        )
    })
    .await
}

/// Log updates until one matches `predicate`.
async fn wait(
    handle: &mut WorkflowHandle,
    predicate: impl Fn(&ScreenUpdate) -> bool,
) -> Result<()> {
    while let Some(update) = handle.next_update().await {
        log_update(&update);
        if predicate(&update) {
            return Ok(());
        }
    }
    bail!("capture session ended")
}

fn log_update(update: &ScreenUpdate) {
    match update {
        ScreenUpdate::StatusChanged {
            index,
            finger,
            status,
        } => info!("[{}] {}: {}", index, finger, status),
        ScreenUpdate::AlertRequested { alert } => info!("Alert: {:?}", alert),
        other => info!("{:?}", other),
    }
}
