//! Common test utilities for capture engine integration tests.
//!
//! Helpers come in two groups:
//!
//! 1. **Sequencer helpers** drive the pure [`Sequencer`] with scripted
//!    scanner replies and inspect the returned effects.
//! 2. **Workflow helpers** build a [`CaptureWorkflow`] over a
//!    [`MockScanner`] for tests that run the real async interpreter.

#![allow(dead_code)]

use fingercap_core::{AlertKind, CaptureSettings, CaptureStatus, FingerId};
use fingercap_engine::{
    CaptureContext, CaptureEvent, CaptureWorkflow, Effect, ScreenUpdate, Sequencer, WorkflowHandle,
};
use fingercap_hardware::mock::{MockScanner, MockScannerHandle};
use fingercap_hardware::{DeviceCommand, DeviceInfo, DeviceReply, FaultCode};
use uuid::Uuid;

/// Hardware revision with forced-capture support.
pub const MODERN_REVISION: u16 = 6;

/// Settings with only the required fingers active and nudge off, so the
/// cursor only moves when a test moves it.
pub fn required_only_settings() -> CaptureSettings {
    CaptureSettings {
        activate_optional_by_default: false,
        nudge: false,
        ..Default::default()
    }
}

/// Last hardware revision without forced capture.
pub const LEGACY_REVISION: u16 = 4;

/// A started sequencer on a modern scanner.
pub fn started_sequencer(settings: CaptureSettings) -> Sequencer {
    started_sequencer_on(MODERN_REVISION, settings)
}

/// A started sequencer on a scanner of the given hardware revision.
pub fn started_sequencer_on(revision: u16, settings: CaptureSettings) -> Sequencer {
    let info = DeviceInfo::new("Test Scanner", "Test").with_hardware_revision(revision);
    let mut sequencer =
        Sequencer::new(settings, Uuid::new_v4(), &info).expect("Test helper: invalid settings");
    sequencer.start();
    sequencer
}

pub fn handle(sequencer: &mut Sequencer, event: CaptureEvent) -> Vec<Effect> {
    sequencer
        .handle(event)
        .expect("Test helper: sequencer rejected event")
}

pub fn complete(sequencer: &mut Sequencer, reply: DeviceReply) -> Vec<Effect> {
    handle(sequencer, CaptureEvent::CommandCompleted(reply))
}

pub fn fail(sequencer: &mut Sequencer, code: FaultCode) -> Vec<Effect> {
    handle(sequencer, CaptureEvent::CommandFailed(code))
}

/// Press scan and answer all four capture steps with a template of
/// `quality`. Returns the effects of the final step.
pub fn scan_with_quality(sequencer: &mut Sequencer, quality: u8) -> Vec<Effect> {
    handle(sequencer, CaptureEvent::ScanPressed);
    finish_capture(sequencer, quality)
}

/// Answer the remaining capture steps of an attempt already in progress.
pub fn finish_capture(sequencer: &mut Sequencer, quality: u8) -> Vec<Effect> {
    complete(sequencer, DeviceReply::Captured);
    complete(sequencer, DeviceReply::ImageQuality(quality));
    complete(sequencer, DeviceReply::TemplateGenerated);
    complete(sequencer, DeviceReply::Template(vec![quality; 16]))
}

pub fn status_of(sequencer: &Sequencer, finger: FingerId) -> CaptureStatus {
    sequencer
        .registry()
        .slot(finger)
        .expect("Test helper: unknown finger")
        .status
}

pub fn stored_quality(sequencer: &Sequencer, finger: FingerId) -> Option<u8> {
    sequencer
        .registry()
        .slot(finger)
        .and_then(|slot| slot.template.as_ref())
        .map(|template| template.quality())
}

pub fn alerts(effects: &[Effect]) -> Vec<AlertKind> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Publish(ScreenUpdate::AlertRequested { alert }) => Some(*alert),
            _ => None,
        })
        .collect()
}

pub fn issued(effects: &[Effect]) -> Vec<DeviceCommand> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Issue(command) => Some(*command),
            _ => None,
        })
        .collect()
}

/// A workflow over a fresh mock scanner. The workflow is not started.
pub async fn mock_workflow(
    settings: CaptureSettings,
) -> (CaptureWorkflow, WorkflowHandle, MockScannerHandle) {
    let (scanner, scanner_handle) = MockScanner::new();
    let context = CaptureContext::new(scanner.into(), settings)
        .await
        .expect("Test helper: failed to build capture context");
    let (workflow, handle) =
        CaptureWorkflow::new(context).expect("Test helper: failed to build workflow");
    (workflow, handle, scanner_handle)
}

/// Wait until `finger` is published with `status`.
pub async fn wait_for_status(handle: &mut WorkflowHandle, finger: FingerId, status: CaptureStatus) {
    handle
        .wait_for(|update| {
            matches!(
                update,
                ScreenUpdate::StatusChanged { finger: f, status: s, .. } if *f == finger && *s == status
            )
        })
        .await
        .expect("Test helper: session ended before the status was published");
}
