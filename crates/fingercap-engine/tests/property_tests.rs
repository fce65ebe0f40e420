//! Property-based tests for the capture engine invariants.
//!
//! These tests use proptest to generate sample sequences and registry edits
//! and check that the invariants hold for every combination.

mod common;

use common::*;
use fingercap_core::{
    CaptureSettings, CaptureStatus, FingerId, FingerRequirement, Template,
    constants::{MAX_QUALITY_THRESHOLD, MIN_QUALITY_THRESHOLD},
};
use fingercap_engine::{
    CaptureEvent, FingerRegistry, QualityGate, StatusMachine, SubmissionAssembler,
};
use fingercap_hardware::FaultCode;
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for quality thresholds inside the operator-adjustable range.
fn valid_threshold() -> impl Strategy<Value = u8> {
    MIN_QUALITY_THRESHOLD..=MAX_QUALITY_THRESHOLD
}

/// Strategy for one or more sample qualities.
fn quality_samples() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..=100, 1..12)
}

fn finger() -> impl Strategy<Value = FingerId> {
    prop::sample::select(FingerId::ALL.to_vec())
}

/// A registry operation: toggle a set of fingers, or auto-add.
#[derive(Debug, Clone)]
enum RegistryOp {
    Toggle(Vec<(FingerId, bool)>),
    AutoAdd,
    Select(usize),
}

fn registry_op() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        prop::collection::vec((finger(), any::<bool>()), 1..5).prop_map(RegistryOp::Toggle),
        Just(RegistryOp::AutoAdd),
        (0usize..10).prop_map(RegistryOp::Select),
    ]
}

/// Settings with a random subset of optional fingers excluded.
fn settings_with_exclusions() -> impl Strategy<Value = CaptureSettings> {
    (prop::collection::vec(any::<bool>(), 8), any::<bool>()).prop_map(
        |(excluded, activate_optional)| {
            let mut settings = CaptureSettings {
                activate_optional_by_default: activate_optional,
                ..Default::default()
            };
            // The first two entries are the required fingers.
            for (entry, exclude) in settings.fingers[2..].iter_mut().zip(excluded) {
                if exclude {
                    entry.requirement = FingerRequirement::Excluded;
                }
            }
            settings
        },
    )
}

proptest! {
    /// Property: the stored template always has the best quality seen.
    #[test]
    fn prop_stored_quality_is_max(
        threshold in valid_threshold(),
        samples in quality_samples(),
    ) {
        let gate = QualityGate::new(threshold);
        let registry = FingerRegistry::from_settings(&CaptureSettings::default()).unwrap();
        let mut slot = registry.slots()[0].clone();

        for &quality in &samples {
            gate.apply(&mut slot, Template::new(vec![quality], quality).unwrap());
        }

        let best = samples.iter().copied().max().unwrap();
        prop_assert_eq!(slot.template.as_ref().map(Template::quality), Some(best));
    }

    /// Property: after every attempt the status reflects only the latest
    /// sample, and the stored quality is the best one so far.
    #[test]
    fn prop_status_tracks_latest_sample(
        threshold in valid_threshold(),
        samples in quality_samples(),
    ) {
        let mut sequencer = started_sequencer(CaptureSettings {
            nudge: false,
            ..CaptureSettings::with_threshold(threshold)
        });

        let mut best = 0u8;
        for &quality in &samples {
            if status_of(&sequencer, FingerId::LeftThumb) == CaptureStatus::GoodScan {
                handle(&mut sequencer, CaptureEvent::ScanPressed);
            }
            scan_with_quality(&mut sequencer, quality);
            best = best.max(quality);

            let status = status_of(&sequencer, FingerId::LeftThumb);
            prop_assert_eq!(status.is_good(), quality >= threshold);
            prop_assert_eq!(stored_quality(&sequencer, FingerId::LeftThumb), Some(best));
        }
    }

    /// Property: the registry invariants hold after any sequence of edits.
    #[test]
    fn prop_registry_invariants_hold(
        settings in settings_with_exclusions(),
        ops in prop::collection::vec(registry_op(), 0..20),
    ) {
        let mut registry = FingerRegistry::from_settings(&settings).unwrap();
        prop_assert!(registry.check_invariants().is_ok());

        for op in ops {
            match op {
                RegistryOp::Toggle(changes) => {
                    registry.edit_active_set(&changes);
                }
                RegistryOp::AutoAdd => {
                    registry.auto_add();
                }
                RegistryOp::Select(index) => {
                    let _ = registry.select(index);
                }
            }
            if let Err(violation) = registry.check_invariants() {
                prop_assert!(false, "{}", violation);
            }
        }
    }

    /// Property: cancelling a capture restores the exact status it started
    /// from, and leaves the template untouched.
    #[test]
    fn prop_cancel_restores_snapshot(
        prior in prop::option::of(0u8..=100),
        rescan in any::<bool>(),
        code in prop_oneof![Just(FaultCode::Interrupted), Just(FaultCode::Timeout)],
    ) {
        let registry = FingerRegistry::from_settings(&CaptureSettings::default()).unwrap();
        let mut slot = registry.slots()[0].clone();
        let gate = QualityGate::new(60);
        let mut machine = StatusMachine::new();

        if let Some(quality) = prior {
            machine.begin_capture(&mut slot).unwrap();
            let verdict = gate.apply(&mut slot, Template::new(vec![1], quality).unwrap());
            machine.complete(&mut slot, verdict.status).unwrap();
            if rescan && slot.status == CaptureStatus::GoodScan {
                machine.mark_rescan(&mut slot).unwrap();
            }
        }

        let before = slot.clone();
        if before.status == CaptureStatus::GoodScan {
            // A good finger cannot start a capture without a rescan.
            prop_assert!(machine.begin_capture(&mut slot).is_err());
            return Ok(());
        }

        machine.begin_capture(&mut slot).unwrap();
        prop_assert_eq!(slot.status, CaptureStatus::Collecting);
        machine.rollback(&mut slot).unwrap();
        prop_assert_eq!(&slot, &before);

        // The same holds through the sequencer, with the fault the
        // cancellation reports.
        let mut sequencer = started_sequencer(CaptureSettings::default());
        if let Some(quality) = prior {
            scan_with_quality(&mut sequencer, quality);
        }
        let status = status_of(&sequencer, FingerId::LeftThumb);
        if status == CaptureStatus::GoodScan {
            handle(&mut sequencer, CaptureEvent::ScanPressed);
        }
        let status = status_of(&sequencer, FingerId::LeftThumb);
        let stored = stored_quality(&sequencer, FingerId::LeftThumb);

        handle(&mut sequencer, CaptureEvent::ScanPressed);
        handle(&mut sequencer, CaptureEvent::BackPressed);
        fail(&mut sequencer, code);

        prop_assert_eq!(status_of(&sequencer, FingerId::LeftThumb), status);
        prop_assert_eq!(stored_quality(&sequencer, FingerId::LeftThumb), stored);
    }

    /// Property: submission is rejected exactly when no required finger has
    /// an accepted scan.
    #[test]
    fn prop_submission_requires_a_required_finger(
        statuses in prop::collection::vec(
            prop_oneof![
                Just(CaptureStatus::NotCollected),
                Just(CaptureStatus::GoodScan),
                Just(CaptureStatus::BadScan),
                Just(CaptureStatus::RescanGoodScan),
            ],
            10,
        ),
    ) {
        let mut registry = FingerRegistry::from_settings(&CaptureSettings::default()).unwrap();
        let ids = registry.active_ids();

        for (finger, status) in ids.iter().zip(&statuses) {
            let slot = registry.slot_mut(*finger).unwrap();
            slot.status = *status;
            if *status != CaptureStatus::NotCollected {
                slot.template = Some(Template::new(vec![7; 4], 50).unwrap());
            }
        }

        let required_accepted = registry
            .active_slots()
            .filter(|slot| slot.requirement.is_required() && slot.status.is_accepted())
            .count();
        let result = SubmissionAssembler::assemble(&registry, Uuid::new_v4());
        prop_assert_eq!(result.is_err(), required_accepted == 0);

        if let Ok(payload) = result {
            let accepted = registry.active_slots().filter(|slot| slot.status.is_accepted()).count();
            prop_assert_eq!(payload.fingerprints.len(), accepted);
        }
    }
}
