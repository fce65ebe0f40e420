//! End-to-end capture flows through the sequencer.
//!
//! Every scanner reply is scripted, so these tests pin down the exact
//! effects of each step without any timing involved.

mod common;

use common::*;
use fingercap_core::{AlertKind, CaptureSettings, CaptureStatus, FingerId};
use fingercap_engine::{
    CaptureEvent, CaptureOutcome, Effect, Phase, ReconnectFailure, ReconnectOutcome,
    ReconnectStep, RecoveryPolicy, ScreenUpdate,
};
use fingercap_hardware::{DeviceCommand, DeviceInfo, FaultCode};

// ============================================================================
// Quality gate through the sequencer
// ============================================================================

#[test]
fn test_quality_sequence_keeps_best_template() {
    let mut sequencer = started_sequencer(CaptureSettings::with_threshold(60));
    let finger = FingerId::LeftThumb;

    scan_with_quality(&mut sequencer, 45);
    assert_eq!(status_of(&sequencer, finger), CaptureStatus::BadScan);
    assert_eq!(stored_quality(&sequencer, finger), Some(45));

    // BadScan starts a new capture directly.
    scan_with_quality(&mut sequencer, 70);
    assert_eq!(status_of(&sequencer, finger), CaptureStatus::GoodScan);
    assert_eq!(stored_quality(&sequencer, finger), Some(70));

    // GoodScan needs a rescan press before the next capture.
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    assert_eq!(status_of(&sequencer, finger), CaptureStatus::RescanGoodScan);
    scan_with_quality(&mut sequencer, 50);
    assert_eq!(status_of(&sequencer, finger), CaptureStatus::BadScan);
    assert_eq!(stored_quality(&sequencer, finger), Some(70));
}

#[test]
fn test_capture_steps_in_order() {
    let mut sequencer = started_sequencer(CaptureSettings::default());

    let effects = handle(&mut sequencer, CaptureEvent::ScanPressed);
    assert_eq!(
        issued(&effects),
        vec![DeviceCommand::StartContinuousCapture {
            quality_floor: 60,
            timeout: std::time::Duration::from_secs(3),
        }]
    );
    assert_eq!(
        issued(&complete(&mut sequencer, fingercap_hardware::DeviceReply::Captured)),
        vec![DeviceCommand::ExtractImageQuality]
    );
    assert_eq!(
        issued(&complete(
            &mut sequencer,
            fingercap_hardware::DeviceReply::ImageQuality(88)
        )),
        vec![DeviceCommand::GenerateTemplate]
    );
    assert_eq!(
        issued(&complete(
            &mut sequencer,
            fingercap_hardware::DeviceReply::TemplateGenerated
        )),
        vec![DeviceCommand::ExtractTemplate]
    );
}

// ============================================================================
// Fault recovery
// ============================================================================

#[test]
fn test_connection_lost_mid_capture_reconnects_without_alert() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    scan_with_quality(&mut sequencer, 40);
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    complete(&mut sequencer, fingercap_hardware::DeviceReply::Captured);

    let effects = fail(&mut sequencer, FaultCode::ScannerUnreachable);
    assert_eq!(status_of(&sequencer, FingerId::LeftThumb), CaptureStatus::BadScan);
    assert!(effects.contains(&Effect::UnbindTrigger));
    assert!(effects.contains(&Effect::Publish(ScreenUpdate::ReconnectingShown)));
    assert_eq!(effects.last(), Some(&Effect::StartReconnect));
    assert_eq!(sequencer.pending(), None);

    let info = DeviceInfo::new("Test Scanner", "Test").with_hardware_revision(6);
    let effects = handle(
        &mut sequencer,
        CaptureEvent::ReconnectFinished(ReconnectOutcome::Reconnected(info)),
    );
    assert!(alerts(&effects).is_empty());
    assert_eq!(
        &effects[..2],
        &[
            Effect::Publish(ScreenUpdate::ReconnectingHidden),
            Effect::BindTrigger
        ]
    );
    assert_eq!(sequencer.phase(), Phase::Idle);

    // The session carries on.
    scan_with_quality(&mut sequencer, 90);
    assert_eq!(status_of(&sequencer, FingerId::LeftThumb), CaptureStatus::GoodScan);
}

#[test]
fn test_reconnect_failure_ends_with_one_alert() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    fail(&mut sequencer, FaultCode::InvalidState);

    let effects = handle(
        &mut sequencer,
        CaptureEvent::ReconnectFinished(ReconnectOutcome::Failed(ReconnectFailure {
            step: ReconnectStep::Connect,
            code: FaultCode::ScannerUnreachable,
            alert: AlertKind::Disconnected,
        })),
    );
    assert_eq!(alerts(&effects), vec![AlertKind::Disconnected]);
    match effects.last() {
        Some(Effect::Finish(CaptureOutcome::Failed(reason))) => {
            assert_eq!(reason.alert, AlertKind::Disconnected);
            assert_eq!(reason.code, Some(FaultCode::ScannerUnreachable));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_reconnect_cancelled_by_back() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    fail(&mut sequencer, FaultCode::SensorInvalidState);

    assert_eq!(
        handle(&mut sequencer, CaptureEvent::BackPressed),
        vec![Effect::CancelReconnect]
    );
    // A second press while the cancellation is in flight does nothing.
    assert!(handle(&mut sequencer, CaptureEvent::BackPressed).is_empty());

    let effects = handle(
        &mut sequencer,
        CaptureEvent::ReconnectFinished(ReconnectOutcome::Cancelled),
    );
    assert!(alerts(&effects).is_empty());
    assert_eq!(effects.last(), Some(&Effect::Finish(CaptureOutcome::Cancelled)));
}

#[test]
fn test_back_during_reconnect_beats_late_success() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    fail(&mut sequencer, FaultCode::ScannerUnreachable);
    assert_eq!(
        handle(&mut sequencer, CaptureEvent::BackPressed),
        vec![Effect::CancelReconnect]
    );

    // The reconnect finished before it saw the cancellation.
    let info = DeviceInfo::new("Test Scanner", "Test").with_hardware_revision(MODERN_REVISION);
    let effects = handle(
        &mut sequencer,
        CaptureEvent::ReconnectFinished(ReconnectOutcome::Reconnected(info)),
    );
    assert!(!effects.contains(&Effect::BindTrigger));
    assert!(alerts(&effects).is_empty());
    assert_eq!(effects.last(), Some(&Effect::Finish(CaptureOutcome::Cancelled)));
    assert!(sequencer.is_finished());
}

#[test]
fn test_legacy_timeout_bad_scan_can_be_submitted() {
    let mut sequencer = started_sequencer_on(LEGACY_REVISION, required_only_settings());
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    let effects = fail(&mut sequencer, FaultCode::Timeout);

    assert!(issued(&effects).is_empty());
    assert_eq!(status_of(&sequencer, FingerId::LeftThumb), CaptureStatus::BadScan);
    assert_eq!(stored_quality(&sequencer, FingerId::LeftThumb), None);
    assert!(effects.contains(&Effect::Publish(ScreenUpdate::ContinueAvailable {
        available: true
    })));

    let effects = handle(&mut sequencer, CaptureEvent::SubmitPressed);
    match effects.as_slice() {
        [Effect::Finish(CaptureOutcome::Submitted(payload))] => {
            assert_eq!(payload.fingers(), vec![FingerId::LeftThumb]);
            assert!(payload.fingerprints[0].template.is_empty());
        }
        other => panic!("expected submission, got {other:?}"),
    }
}

#[test]
fn test_capability_gap_during_refresh_marks_bad_scan() {
    let mut sequencer = started_sequencer(required_only_settings());
    handle(&mut sequencer, CaptureEvent::ScanPressed);

    let effects = fail(&mut sequencer, FaultCode::OutdatedScannerInfo);
    assert_eq!(issued(&effects), vec![DeviceCommand::UpdateFirmwareInfo]);
    assert_eq!(
        status_of(&sequencer, FingerId::LeftThumb),
        CaptureStatus::NotCollected
    );

    fail(&mut sequencer, FaultCode::SensorSdkError);
    assert_eq!(status_of(&sequencer, FingerId::LeftThumb), CaptureStatus::BadScan);
    assert_eq!(sequencer.phase(), Phase::Idle);
    assert_eq!(sequencer.pending(), None);
}

#[test]
fn test_unknown_fault_is_fatal_with_one_alert() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    complete(&mut sequencer, fingercap_hardware::DeviceReply::Captured);

    let effects = fail(&mut sequencer, FaultCode::Unknown(4242));
    assert_eq!(alerts(&effects), vec![AlertKind::UnexpectedError]);
    assert_eq!(
        status_of(&sequencer, FingerId::LeftThumb),
        CaptureStatus::NotCollected
    );
    assert!(matches!(
        effects.last(),
        Some(Effect::Finish(CaptureOutcome::Failed(_)))
    ));
    assert_eq!(
        sequencer.faults().last().map(|record| record.policy),
        Some(RecoveryPolicy::Fatal)
    );

    // Nothing happens after the session ended.
    assert!(handle(&mut sequencer, CaptureEvent::ScanPressed).is_empty());
}

#[test]
fn test_fatal_alert_kinds() {
    for (code, expected) in [
        (FaultCode::BluetoothDisabled, AlertKind::BluetoothNotEnabled),
        (FaultCode::BluetoothNotSupported, AlertKind::BluetoothNotSupported),
        (FaultCode::ScannerUnbonded, AlertKind::NotPaired),
        (FaultCode::SensorLowVoltage, AlertKind::LowBattery),
        (FaultCode::SensorFailure, AlertKind::UnexpectedError),
    ] {
        let mut sequencer = started_sequencer(CaptureSettings::default());
        handle(&mut sequencer, CaptureEvent::ScanPressed);
        let effects = fail(&mut sequencer, code);
        assert_eq!(alerts(&effects), vec![expected], "alert for {code}");
    }
}

#[test]
fn test_transient_fault_rolls_back_rescan() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    scan_with_quality(&mut sequencer, 75);
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    handle(&mut sequencer, CaptureEvent::ScanPressed);
    assert_eq!(
        status_of(&sequencer, FingerId::LeftThumb),
        CaptureStatus::Collecting
    );

    let effects = fail(&mut sequencer, FaultCode::Interrupted);
    assert!(alerts(&effects).is_empty());
    assert_eq!(
        status_of(&sequencer, FingerId::LeftThumb),
        CaptureStatus::RescanGoodScan
    );
    assert_eq!(stored_quality(&sequencer, FingerId::LeftThumb), Some(75));
}

#[test]
fn test_forced_capture_after_timeout_completes_attempt() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    handle(&mut sequencer, CaptureEvent::ScanPressed);

    let effects = fail(&mut sequencer, FaultCode::Timeout);
    assert_eq!(
        issued(&effects),
        vec![DeviceCommand::ForceCapture { quality_floor: 60 }]
    );

    finish_capture(&mut sequencer, 30);
    assert_eq!(status_of(&sequencer, FingerId::LeftThumb), CaptureStatus::BadScan);
    assert_eq!(stored_quality(&sequencer, FingerId::LeftThumb), Some(30));
}

// ============================================================================
// Navigation, editing and submission
// ============================================================================

#[test]
fn test_nudge_stops_at_last_finger() {
    let settings = CaptureSettings {
        activate_optional_by_default: false,
        ..Default::default()
    };
    let mut sequencer = started_sequencer(settings);

    let effects = scan_with_quality(&mut sequencer, 80);
    assert!(effects.contains(&Effect::ScheduleNudge {
        finger: FingerId::LeftThumb,
        delay: std::time::Duration::from_millis(500),
    }));
    handle(&mut sequencer, CaptureEvent::NudgeElapsed(FingerId::LeftThumb));
    assert_eq!(sequencer.registry().current_id(), Some(FingerId::LeftIndex));

    let effects = scan_with_quality(&mut sequencer, 80);
    assert!(
        !effects
            .iter()
            .any(|effect| matches!(effect, Effect::ScheduleNudge { .. }))
    );
}

#[test]
fn test_auto_add_and_edit_publish_active_set() {
    let mut sequencer = started_sequencer(required_only_settings());

    let effects = handle(&mut sequencer, CaptureEvent::AutoAddFinger);
    assert!(effects.contains(&Effect::Publish(ScreenUpdate::ActiveSetChanged {
        fingers: vec![FingerId::LeftThumb, FingerId::LeftIndex, FingerId::RightThumb],
        cursor: 0,
    })));

    let effects = handle(
        &mut sequencer,
        CaptureEvent::EditActiveSet(vec![
            (FingerId::RightThumb, false),
            (FingerId::LeftLittle, true),
        ]),
    );
    assert!(effects.contains(&Effect::Publish(ScreenUpdate::ActiveSetChanged {
        fingers: vec![FingerId::LeftThumb, FingerId::LeftIndex, FingerId::LeftLittle],
        cursor: 0,
    })));
    assert!(
        sequencer
            .registry()
            .slot(FingerId::LeftLittle)
            .unwrap()
            .last_in_sequence
    );

    // Required fingers cannot be removed: nothing to publish.
    assert!(
        handle(
            &mut sequencer,
            CaptureEvent::EditActiveSet(vec![(FingerId::LeftIndex, false)])
        )
        .is_empty()
    );
}

#[test]
fn test_submit_with_one_required_finger() {
    let mut sequencer = started_sequencer(required_only_settings());

    let effects = scan_with_quality(&mut sequencer, 35);
    assert!(effects.contains(&Effect::Publish(ScreenUpdate::ContinueAvailable {
        available: true
    })));

    let effects = handle(&mut sequencer, CaptureEvent::SubmitPressed);
    match effects.as_slice() {
        [Effect::Finish(CaptureOutcome::Submitted(payload))] => {
            assert_eq!(payload.fingers(), vec![FingerId::LeftThumb]);
            assert_eq!(payload.fingerprints[0].quality, 35);
            assert_eq!(payload.session_id, sequencer.session_id());
        }
        other => panic!("expected submission, got {other:?}"),
    }
}

#[test]
fn test_select_ignored_while_collecting() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    handle(&mut sequencer, CaptureEvent::ScanPressed);

    assert!(handle(&mut sequencer, CaptureEvent::FingerSelected(2)).is_empty());
    assert!(handle(&mut sequencer, CaptureEvent::SubmitPressed).is_empty());
    assert_eq!(sequencer.registry().cursor(), 0);
}

#[test]
fn test_scan_while_collecting_requests_cancel() {
    let mut sequencer = started_sequencer(CaptureSettings::default());
    handle(&mut sequencer, CaptureEvent::ScanPressed);

    assert_eq!(
        handle(&mut sequencer, CaptureEvent::ScanPressed),
        vec![Effect::CancelCommand]
    );
    let effects = fail(&mut sequencer, FaultCode::Interrupted);
    assert!(alerts(&effects).is_empty());
    assert_eq!(
        status_of(&sequencer, FingerId::LeftThumb),
        CaptureStatus::NotCollected
    );
    assert_eq!(sequencer.phase(), Phase::Idle);
}
