//! Capture sequencer.
//!
//! [`Sequencer::handle`] is a pure transition function: it takes one
//! [`CaptureEvent`], updates the registry and status machine, and returns the
//! [`Effect`]s the workflow must carry out. It never touches the scanner,
//! so every scenario can be driven and checked synchronously.
//!
//! A capture attempt runs four scanner commands in order:
//!
//! 1. continuous capture until a frame reaches the quality threshold
//!    (forced capture after a timeout, when the hardware supports it)
//! 2. image-quality extraction
//! 3. template generation
//! 4. template extraction
//!
//! Exactly one command is outstanding at any time. Faults are handed to the
//! classifier and recovered from according to their policy.

use std::time::Duration;

use fingercap_core::{
    AlertKind, CaptureSettings, CaptureStatus, FingerId, Template, constants::HAPTIC_PULSE_MS,
};
use fingercap_hardware::{DeviceCommand, DeviceInfo, DeviceReply, FaultCode};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{FaultRecord, RecoveryPolicy, alert_kind};
use crate::effects::{Effect, ScreenUpdate};
use crate::error::{EngineError, Result};
use crate::events::CaptureEvent;
use crate::quality::QualityGate;
use crate::reconnect::ReconnectOutcome;
use crate::registry::FingerRegistry;
use crate::state_machine::StatusMachine;
use crate::submission::{CaptureOutcome, FailureReason, SubmissionAssembler};

/// Maximum number of classified faults kept for diagnostics.
const MAX_FAULT_HISTORY: usize = 50;

/// The capture attempt in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub finger: FingerId,
    /// Score reported by the image-quality step.
    pub quality: Option<u8>,
    /// The operator asked to stop; the attempt rolls back when the
    /// outstanding command reports.
    pub cancel_requested: bool,
}

impl Attempt {
    fn new(finger: FingerId) -> Self {
        Self {
            finger,
            quality: None,
            cancel_requested: false,
        }
    }
}

/// What the sequencer is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the operator.
    Idle,
    Capturing(Attempt),
    /// Scanner UI reset after a rejected template.
    ResettingUi,
    /// Scanner metadata refresh before retrying `retry`. `attempt` is the
    /// capture to resume, if the stale reply interrupted one.
    RefreshingFirmware {
        retry: DeviceCommand,
        attempt: Option<Attempt>,
    },
    Reconnecting {
        cancel_requested: bool,
    },
    Finished,
}

/// Registry edits requested while the scanner was busy.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeferredEdit {
    Toggle(Vec<(FingerId, bool)>),
    AutoAdd,
}

/// Drives one capture session.
///
/// # Examples
///
/// ```
/// use fingercap_core::CaptureSettings;
/// use fingercap_engine::{CaptureEvent, Effect, Sequencer};
/// use fingercap_hardware::{DeviceCommand, DeviceInfo};
///
/// let info = DeviceInfo::new("Scanner", "Model").with_hardware_revision(6);
/// let mut sequencer =
///     Sequencer::new(CaptureSettings::default(), uuid::Uuid::new_v4(), &info).unwrap();
/// sequencer.start();
///
/// let effects = sequencer.handle(CaptureEvent::ScanPressed).unwrap();
/// assert!(effects.iter().any(|effect| matches!(
///     effect,
///     Effect::Issue(DeviceCommand::StartContinuousCapture { .. })
/// )));
/// ```
#[derive(Debug)]
pub struct Sequencer {
    settings: CaptureSettings,
    session_id: Uuid,
    registry: FingerRegistry,
    machine: StatusMachine,
    gate: QualityGate,
    phase: Phase,
    pending: Option<DeviceCommand>,
    /// A busy reply has already been retried once.
    busy_retried: bool,
    force_capture_supported: bool,
    /// Finger with a scheduled nudge.
    nudge: Option<FingerId>,
    continue_available: bool,
    deferred: Vec<DeferredEdit>,
    faults: Vec<FaultRecord>,
}

impl Sequencer {
    /// Build a sequencer from validated settings and the connected
    /// scanner's info.
    pub fn new(settings: CaptureSettings, session_id: Uuid, device_info: &DeviceInfo) -> Result<Self> {
        let registry = FingerRegistry::from_settings(&settings)?;
        let gate = QualityGate::new(settings.quality_threshold);

        Ok(Self {
            settings,
            session_id,
            registry,
            machine: StatusMachine::new(),
            gate,
            phase: Phase::Idle,
            pending: None,
            busy_retried: false,
            force_capture_supported: device_info.supports_force_capture(),
            nudge: None,
            continue_available: false,
            deferred: Vec::new(),
            faults: Vec::new(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn registry(&self) -> &FingerRegistry {
        &self.registry
    }

    pub fn machine(&self) -> &StatusMachine {
        &self.machine
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The command the scanner is working on.
    pub fn pending(&self) -> Option<DeviceCommand> {
        self.pending
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn force_capture_supported(&self) -> bool {
        self.force_capture_supported
    }

    /// Classified faults, oldest first.
    pub fn faults(&self) -> &[FaultRecord] {
        &self.faults
    }

    /// Effects that open the session: bind the trigger and draw the
    /// initial finger list.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::BindTrigger];
        self.publish_active_set(&mut effects);
        self.continue_available = SubmissionAssembler::can_submit(&self.registry);
        effects.push(Effect::Publish(ScreenUpdate::ContinueAvailable {
            available: self.continue_available,
        }));
        effects
    }

    /// End the session after an internal error.
    pub fn fail_unexpected(&mut self, error: &EngineError) -> Vec<Effect> {
        if self.is_finished() {
            return Vec::new();
        }
        warn!("Ending capture session after internal error: {}", error);
        let mut effects = Vec::new();
        self.fail(AlertKind::UnexpectedError, None, error.to_string(), &mut effects);
        effects
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Only broken internal invariants are errors: an illegal status change,
    /// a second outstanding command, or a reply that does not answer the
    /// pending command.
    pub fn handle(&mut self, event: CaptureEvent) -> Result<Vec<Effect>> {
        if self.is_finished() {
            debug!("Session finished, ignoring {:?}", event);
            return Ok(Vec::new());
        }

        match event {
            CaptureEvent::ScanPressed => self.on_scan(),
            CaptureEvent::TriggerPressed => self.on_trigger(),
            CaptureEvent::ClearPressed => self.on_clear(),
            CaptureEvent::BackPressed => Ok(self.on_back()),
            CaptureEvent::FingerSelected(index) => Ok(self.on_select(index)),
            CaptureEvent::EditActiveSet(changes) => Ok(self.on_edit(DeferredEdit::Toggle(changes))),
            CaptureEvent::AutoAddFinger => Ok(self.on_edit(DeferredEdit::AutoAdd)),
            CaptureEvent::SubmitPressed => Ok(self.on_submit()),
            CaptureEvent::NudgeElapsed(finger) => Ok(self.on_nudge(finger)),
            CaptureEvent::CommandCompleted(reply) => self.on_reply(reply),
            CaptureEvent::CommandFailed(code) => self.on_fault(code),
            CaptureEvent::ReconnectFinished(outcome) => Ok(self.on_reconnect(outcome)),
        }
    }

    // ---- operator input ----

    fn on_scan(&mut self) -> Result<Vec<Effect>> {
        let mut effects = Vec::new();

        match self.phase {
            Phase::Idle => {}
            Phase::Capturing(_) => {
                self.request_cancel(&mut effects);
                return Ok(effects);
            }
            _ => return Ok(effects),
        }

        let Some(slot) = self.registry.current_mut() else {
            return Ok(effects);
        };
        let finger = slot.id;

        match slot.status {
            CaptureStatus::GoodScan => {
                self.machine.mark_rescan(slot)?;
                effects.push(self.status_changed(finger)?);
            }
            CaptureStatus::NotCollected | CaptureStatus::BadScan | CaptureStatus::RescanGoodScan => {
                self.start_capture(finger, &mut effects)?;
            }
            CaptureStatus::Collecting => {}
        }

        Ok(effects)
    }

    fn on_trigger(&mut self) -> Result<Vec<Effect>> {
        if self.phase == Phase::Idle {
            let all_good = self.registry.active_slots().all(|slot| slot.status.is_good());
            let any_template = self.registry.active_slots().any(|slot| slot.template.is_some());
            if all_good && any_template {
                return Ok(self.on_submit());
            }
            if self
                .registry
                .current()
                .is_some_and(|slot| slot.status == CaptureStatus::GoodScan)
            {
                return Ok(Vec::new());
            }
        }
        self.on_scan()
    }

    fn on_clear(&mut self) -> Result<Vec<Effect>> {
        let mut effects = Vec::new();
        if self.phase != Phase::Idle {
            return Ok(effects);
        }
        let Some(slot) = self.registry.current_mut() else {
            return Ok(effects);
        };
        if slot.status.is_collecting() {
            return Ok(effects);
        }

        let finger = slot.id;
        self.machine.clear(slot)?;
        info!("Cleared {}", finger);
        self.cancel_nudge(&mut effects);
        effects.push(self.status_changed(finger)?);
        self.refresh_continue(&mut effects);
        Ok(effects)
    }

    fn on_back(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.phase {
            Phase::Capturing(_) => self.request_cancel(&mut effects),
            Phase::Reconnecting { cancel_requested } => {
                if !cancel_requested {
                    self.phase = Phase::Reconnecting {
                        cancel_requested: true,
                    };
                    effects.push(Effect::CancelReconnect);
                }
            }
            _ => {
                info!("Capture session cancelled by operator");
                self.finish(CaptureOutcome::Cancelled, &mut effects);
            }
        }
        effects
    }

    fn on_select(&mut self, index: usize) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.phase != Phase::Idle {
            return effects;
        }

        match self.registry.select(index) {
            Ok(finger) => {
                self.cancel_nudge(&mut effects);
                effects.push(Effect::Publish(ScreenUpdate::CursorMoved { index, finger }));
            }
            Err(e) => warn!("Ignoring finger selection: {}", e),
        }
        effects
    }

    fn on_edit(&mut self, edit: DeferredEdit) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.phase == Phase::Idle {
            self.apply_edit(edit, &mut effects);
        } else {
            debug!("Deferring active-set edit until the scanner is idle");
            self.deferred.push(edit);
        }
        effects
    }

    fn on_submit(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.phase != Phase::Idle {
            return effects;
        }

        match SubmissionAssembler::assemble(&self.registry, self.session_id) {
            Ok(payload) => {
                info!("Submitting {} fingerprints", payload.fingerprints.len());
                self.finish(CaptureOutcome::Submitted(payload), &mut effects);
            }
            Err(rejected) => {
                info!("Submission rejected: no required finger captured");
                effects.push(Effect::Publish(ScreenUpdate::SubmissionRejected {
                    required_accepted: rejected.required_accepted,
                }));
            }
        }
        effects
    }

    fn on_nudge(&mut self, finger: FingerId) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.nudge != Some(finger) {
            return effects;
        }
        self.nudge = None;

        if self.phase == Phase::Idle && self.registry.current_id() == Some(finger) {
            if let Some(index) = self.registry.advance() {
                if let Some(next) = self.registry.current_id() {
                    debug!("Nudging from {} to {}", finger, next);
                    effects.push(Effect::Publish(ScreenUpdate::CursorMoved {
                        index,
                        finger: next,
                    }));
                }
            }
        }
        effects
    }

    // ---- scanner replies ----

    fn on_reply(&mut self, reply: DeviceReply) -> Result<Vec<Effect>> {
        let Some(command) = self.pending.take() else {
            warn!("Ignoring scanner reply with no command outstanding: {:?}", reply);
            return Ok(Vec::new());
        };
        if !reply.answers(&command) {
            return Err(EngineError::UnexpectedReply {
                pending: command,
                reply: format!("{reply:?}"),
            });
        }
        debug!("{} completed", command);
        self.busy_retried = false;

        let mut effects = Vec::new();
        match (self.phase, reply) {
            (Phase::Capturing(attempt), _) if attempt.cancel_requested => {
                self.abandon_attempt(&mut effects)?;
                self.settle(&mut effects);
            }
            (Phase::Capturing(_), DeviceReply::Captured) => {
                effects.push(self.issue(DeviceCommand::ExtractImageQuality)?);
            }
            (Phase::Capturing(mut attempt), DeviceReply::ImageQuality(quality)) => {
                attempt.quality = Some(quality);
                self.phase = Phase::Capturing(attempt);
                effects.push(self.issue(DeviceCommand::GenerateTemplate)?);
            }
            (Phase::Capturing(_), DeviceReply::TemplateGenerated) => {
                effects.push(self.issue(DeviceCommand::ExtractTemplate)?);
            }
            (Phase::Capturing(attempt), DeviceReply::Template(bytes)) => {
                self.finish_attempt(attempt, bytes, &mut effects)?;
            }
            (Phase::ResettingUi, DeviceReply::UiReset) => self.settle(&mut effects),
            (
                Phase::RefreshingFirmware { retry, attempt },
                DeviceReply::FirmwareInfoUpdated(info),
            ) => {
                self.force_capture_supported = info.supports_force_capture();
                debug!(
                    "Scanner metadata refreshed (force capture: {})",
                    self.force_capture_supported
                );
                match attempt {
                    Some(attempt) => {
                        self.begin(attempt.finger, &mut effects)?;
                        self.phase = Phase::Capturing(Attempt {
                            cancel_requested: false,
                            ..attempt
                        });
                    }
                    None => self.phase = Phase::ResettingUi,
                }
                effects.push(self.issue(retry)?);
            }
            (_, reply) => {
                return Err(EngineError::UnexpectedReply {
                    pending: command,
                    reply: format!("{reply:?}"),
                });
            }
        }
        Ok(effects)
    }

    fn on_fault(&mut self, code: FaultCode) -> Result<Vec<Effect>> {
        let Some(command) = self.pending.take() else {
            warn!("Ignoring scanner fault {} with no command outstanding", code);
            return Ok(Vec::new());
        };

        let record = FaultRecord::new(code);
        if self.faults.len() >= MAX_FAULT_HISTORY {
            self.faults.remove(0);
        }
        self.faults.push(record);
        warn!("{} failed with {} ({})", command, code, record.policy);

        let mut effects = Vec::new();

        if let Phase::Capturing(attempt) = self.phase {
            if attempt.cancel_requested {
                self.abandon_attempt(&mut effects)?;
                self.settle(&mut effects);
                return Ok(effects);
            }
            if code == FaultCode::Timeout
                && matches!(command, DeviceCommand::StartContinuousCapture { .. })
            {
                self.on_capture_timeout(attempt, &mut effects)?;
                return Ok(effects);
            }
        }

        let mut policy = record.policy;
        if policy == RecoveryPolicy::RetryOperation {
            if !self.busy_retried {
                self.busy_retried = true;
                debug!("Scanner busy, retrying {}", command);
                effects.push(self.issue(command)?);
                return Ok(effects);
            }
            policy = RecoveryPolicy::Transient;
        }
        self.busy_retried = false;

        if policy == RecoveryPolicy::FirmwareVersionStale
            && matches!(self.phase, Phase::RefreshingFirmware { .. })
        {
            policy = RecoveryPolicy::Fatal;
        }

        match policy {
            RecoveryPolicy::Transient | RecoveryPolicy::RetryOperation => {
                self.abandon_attempt(&mut effects)?;
                self.settle(&mut effects);
            }
            RecoveryPolicy::ConnectionLost => {
                self.abandon_attempt(&mut effects)?;
                self.start_reconnect(&mut effects);
            }
            RecoveryPolicy::FirmwareVersionStale => {
                let attempt = match self.phase {
                    Phase::Capturing(attempt) => Some(attempt),
                    _ => None,
                };
                self.abandon_attempt(&mut effects)?;
                self.phase = Phase::RefreshingFirmware {
                    retry: command,
                    attempt,
                };
                effects.push(self.issue(DeviceCommand::UpdateFirmwareInfo)?);
            }
            RecoveryPolicy::HardwareCapabilityGap => {
                match self.phase {
                    Phase::Capturing(attempt) => {
                        self.mark_bad_scan(attempt.finger, &mut effects)?;
                    }
                    // The refresh interrupted a capture that already rolled
                    // back; reopen it so it can land on BadScan.
                    Phase::RefreshingFirmware {
                        attempt: Some(attempt),
                        ..
                    } => {
                        self.begin(attempt.finger, &mut effects)?;
                        self.mark_bad_scan(attempt.finger, &mut effects)?;
                    }
                    _ => {}
                }
                self.settle(&mut effects);
            }
            RecoveryPolicy::Fatal => {
                self.abandon_attempt(&mut effects)?;
                self.fail(
                    alert_kind(code),
                    Some(code),
                    format!("{command} failed with {code}"),
                    &mut effects,
                );
            }
        }
        Ok(effects)
    }

    fn on_capture_timeout(&mut self, attempt: Attempt, effects: &mut Vec<Effect>) -> Result<()> {
        if self.force_capture_supported {
            debug!("Continuous capture timed out, forcing a capture");
            effects.push(self.issue(DeviceCommand::ForceCapture {
                quality_floor: self.settings.quality_threshold,
            })?);
        } else {
            info!(
                "Continuous capture timed out and the scanner cannot force a capture; {} marked bad",
                attempt.finger
            );
            self.mark_bad_scan(attempt.finger, effects)?;
            self.settle(effects);
        }
        Ok(())
    }

    fn on_reconnect(&mut self, outcome: ReconnectOutcome) -> Vec<Effect> {
        let mut effects = Vec::new();
        let Phase::Reconnecting { cancel_requested } = self.phase else {
            warn!("Ignoring reconnection result outside reconnection: {:?}", outcome);
            return effects;
        };
        effects.push(Effect::Publish(ScreenUpdate::ReconnectingHidden));

        if cancel_requested {
            info!("Reconnection cancelled by operator");
            self.finish(CaptureOutcome::Cancelled, &mut effects);
            return effects;
        }

        match outcome {
            ReconnectOutcome::Reconnected(info) => {
                self.force_capture_supported = info.supports_force_capture();
                effects.push(Effect::BindTrigger);
                self.settle(&mut effects);
            }
            ReconnectOutcome::Failed(failure) => {
                self.fail(
                    failure.alert,
                    Some(failure.code),
                    format!("reconnection failed at {} with {}", failure.step, failure.code),
                    &mut effects,
                );
            }
            ReconnectOutcome::Cancelled => {
                info!("Reconnection cancelled by operator");
                self.finish(CaptureOutcome::Cancelled, &mut effects);
            }
        }
        effects
    }

    // ---- helpers ----

    fn issue(&mut self, command: DeviceCommand) -> Result<Effect> {
        if let Some(pending) = self.pending {
            return Err(EngineError::CommandAlreadyPending {
                pending,
                requested: command,
            });
        }
        self.pending = Some(command);
        Ok(Effect::Issue(command))
    }

    fn status_changed(&self, finger: FingerId) -> Result<Effect> {
        let index = self
            .registry
            .position(finger)
            .ok_or(EngineError::FingerNotActive(finger))?;
        let status = self
            .registry
            .slot(finger)
            .map(|slot| slot.status)
            .ok_or(EngineError::FingerNotActive(finger))?;
        Ok(Effect::Publish(ScreenUpdate::StatusChanged {
            index,
            finger,
            status,
        }))
    }

    /// Move `finger` to Collecting and publish it.
    fn begin(&mut self, finger: FingerId, effects: &mut Vec<Effect>) -> Result<()> {
        let slot = self
            .registry
            .slot_mut(finger)
            .ok_or(EngineError::FingerNotActive(finger))?;
        self.machine.begin_capture(slot)?;
        effects.push(self.status_changed(finger)?);
        Ok(())
    }

    fn start_capture(&mut self, finger: FingerId, effects: &mut Vec<Effect>) -> Result<()> {
        self.cancel_nudge(effects);
        self.begin(finger, effects)?;
        self.phase = Phase::Capturing(Attempt::new(finger));
        info!("Capturing {}", finger);
        effects.push(self.issue(DeviceCommand::StartContinuousCapture {
            quality_floor: self.settings.quality_threshold,
            timeout: self.settings.capture_timeout(),
        })?);
        Ok(())
    }

    fn request_cancel(&mut self, effects: &mut Vec<Effect>) {
        if let Phase::Capturing(attempt) = &mut self.phase {
            if !attempt.cancel_requested {
                attempt.cancel_requested = true;
                debug!("Cancelling capture of {}", attempt.finger);
                effects.push(Effect::CancelCommand);
            }
        }
    }

    /// Roll the attempt's finger back to its snapshot. A no-op outside a
    /// capture.
    fn abandon_attempt(&mut self, effects: &mut Vec<Effect>) -> Result<()> {
        let Phase::Capturing(attempt) = self.phase else {
            return Ok(());
        };
        let slot = self
            .registry
            .slot_mut(attempt.finger)
            .ok_or(EngineError::FingerNotActive(attempt.finger))?;
        self.machine.rollback(slot)?;
        effects.push(self.status_changed(attempt.finger)?);
        Ok(())
    }

    fn haptic(&self, effects: &mut Vec<Effect>) {
        if self.settings.vibrate {
            effects.push(Effect::Publish(ScreenUpdate::Haptic {
                duration: Duration::from_millis(HAPTIC_PULSE_MS),
            }));
        }
    }

    fn mark_bad_scan(&mut self, finger: FingerId, effects: &mut Vec<Effect>) -> Result<()> {
        let slot = self
            .registry
            .slot_mut(finger)
            .ok_or(EngineError::FingerNotActive(finger))?;
        self.machine.complete(slot, CaptureStatus::BadScan)?;
        effects.push(self.status_changed(finger)?);
        self.haptic(effects);
        Ok(())
    }

    fn finish_attempt(&mut self, attempt: Attempt, bytes: Vec<u8>, effects: &mut Vec<Effect>) -> Result<()> {
        let candidate = match attempt.quality {
            Some(quality) if !bytes.is_empty() => Template::new(bytes, quality).ok(),
            _ => None,
        };

        let Some(candidate) = candidate else {
            warn!("Scanner rejected the template for {}, resetting", attempt.finger);
            let slot = self
                .registry
                .slot_mut(attempt.finger)
                .ok_or(EngineError::FingerNotActive(attempt.finger))?;
            self.machine.clear(slot)?;
            effects.push(self.status_changed(attempt.finger)?);
            self.phase = Phase::ResettingUi;
            effects.push(self.issue(DeviceCommand::ResetUi)?);
            return Ok(());
        };

        let quality = candidate.quality();
        let slot = self
            .registry
            .slot_mut(attempt.finger)
            .ok_or(EngineError::FingerNotActive(attempt.finger))?;
        let verdict = self.gate.apply(slot, candidate);
        self.machine.complete(slot, verdict.status)?;
        let last_in_sequence = slot.last_in_sequence;

        info!(
            "{} scanned with quality {} ({}{})",
            attempt.finger,
            quality,
            verdict.status,
            if verdict.replaced { ", stored" } else { "" }
        );
        effects.push(self.status_changed(attempt.finger)?);
        self.haptic(effects);

        if verdict.status.is_good() && self.settings.nudge && !last_in_sequence {
            self.nudge = Some(attempt.finger);
            effects.push(Effect::ScheduleNudge {
                finger: attempt.finger,
                delay: self.settings.nudge_delay(),
            });
        }

        self.settle(effects);
        Ok(())
    }

    /// Return to Idle and apply edits that waited for it.
    fn settle(&mut self, effects: &mut Vec<Effect>) {
        self.phase = Phase::Idle;
        for edit in std::mem::take(&mut self.deferred) {
            self.apply_edit(edit, effects);
        }
        self.refresh_continue(effects);
    }

    fn apply_edit(&mut self, edit: DeferredEdit, effects: &mut Vec<Effect>) {
        let changed = match edit {
            DeferredEdit::Toggle(changes) => {
                let edit = self.registry.edit_active_set(&changes);
                for finger in &edit.rejected {
                    warn!("Refusing to toggle {}", finger);
                }
                edit.changed()
            }
            DeferredEdit::AutoAdd => match self.registry.auto_add() {
                Some(finger) => {
                    info!("Added {} to the capture sequence", finger);
                    true
                }
                None => false,
            },
        };

        if changed {
            self.publish_active_set(effects);
            self.refresh_continue(effects);
        }
    }

    fn publish_active_set(&self, effects: &mut Vec<Effect>) {
        let cursor = self.registry.cursor();
        effects.push(Effect::Publish(ScreenUpdate::ActiveSetChanged {
            fingers: self.registry.active_ids(),
            cursor,
        }));
        if let Some(finger) = self.registry.current_id() {
            effects.push(Effect::Publish(ScreenUpdate::CursorMoved {
                index: cursor,
                finger,
            }));
        }
    }

    fn refresh_continue(&mut self, effects: &mut Vec<Effect>) {
        let available = SubmissionAssembler::can_submit(&self.registry);
        if available != self.continue_available {
            self.continue_available = available;
            effects.push(Effect::Publish(ScreenUpdate::ContinueAvailable { available }));
        }
    }

    fn cancel_nudge(&mut self, effects: &mut Vec<Effect>) {
        if self.nudge.take().is_some() {
            effects.push(Effect::CancelNudge);
        }
    }

    fn start_reconnect(&mut self, effects: &mut Vec<Effect>) {
        self.cancel_nudge(effects);
        self.phase = Phase::Reconnecting {
            cancel_requested: false,
        };
        info!("Scanner connection lost, reconnecting");
        effects.push(Effect::UnbindTrigger);
        effects.push(Effect::Publish(ScreenUpdate::ReconnectingShown));
        effects.push(Effect::StartReconnect);
    }

    fn fail(
        &mut self,
        alert: AlertKind,
        code: Option<FaultCode>,
        message: String,
        effects: &mut Vec<Effect>,
    ) {
        warn!("Capture session failed: {}", message);
        effects.push(Effect::Publish(ScreenUpdate::AlertRequested { alert }));
        self.finish(
            CaptureOutcome::Failed(FailureReason {
                alert,
                code,
                message,
            }),
            effects,
        );
    }

    fn finish(&mut self, outcome: CaptureOutcome, effects: &mut Vec<Effect>) {
        self.phase = Phase::Finished;
        self.nudge = None;
        effects.push(Effect::Finish(outcome));
    }
}
