//! Async capture workflow.
//!
//! [`CaptureWorkflow`] owns the sequencer and interprets its effects. All
//! state changes happen on the workflow's event loop; scanner commands, the
//! trigger-button forwarder, nudge timers and reconnection run as spawned
//! tasks that report back over the same event channel. Each task holds a
//! [`CancellationToken`] so it can be stopped without tearing down the
//! session.
//!
//! # Examples
//!
//! ```no_run
//! use fingercap_core::CaptureSettings;
//! use fingercap_engine::{CaptureContext, CaptureEvent, CaptureWorkflow};
//! use fingercap_hardware::mock::MockScanner;
//!
//! # async fn example() -> fingercap_engine::Result<()> {
//! let (scanner, scanner_handle) = MockScanner::new();
//! let context = CaptureContext::new(scanner.into(), CaptureSettings::default()).await?;
//! let (workflow, mut handle) = CaptureWorkflow::new(context)?;
//!
//! let session = tokio::spawn(workflow.run());
//!
//! scanner_handle.place_finger(vec![1, 2, 3], 80).await?;
//! handle.send(CaptureEvent::ScanPressed).await?;
//! while let Some(update) = handle.next_update().await {
//!     println!("{update:?}");
//! }
//! let outcome = session.await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use fingercap_core::{CaptureSettings, FingerId};
use fingercap_hardware::{
    AnyScannerDevice, DeviceCommand, DeviceInfo, FaultCode, ScannerDevice, TriggerPress,
};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::effects::{Effect, ScreenUpdate};
use crate::error::{EngineError, Result};
use crate::events::CaptureEvent;
use crate::reconnect::ReconnectionCoordinator;
use crate::sequencer::Sequencer;
use crate::submission::CaptureOutcome;

/// Capacity of the session's event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything a capture session shares: the scanner, its settings and
/// identity.
#[derive(Debug, Clone)]
pub struct CaptureContext {
    pub device: Arc<Mutex<AnyScannerDevice>>,
    pub settings: CaptureSettings,
    pub session_id: Uuid,
    /// Scanner metadata at session start.
    pub device_info: DeviceInfo,
}

impl CaptureContext {
    /// Validate `settings` and read the scanner's metadata.
    pub async fn new(device: AnyScannerDevice, settings: CaptureSettings) -> Result<Self> {
        settings.validate()?;
        let device_info = device.get_device_info().await?;

        Ok(Self {
            device: Arc::new(Mutex::new(device)),
            settings,
            session_id: Uuid::new_v4(),
            device_info,
        })
    }
}

/// The screen layer's side of a running workflow.
#[derive(Debug)]
pub struct WorkflowHandle {
    events: mpsc::Sender<CaptureEvent>,
    updates: mpsc::UnboundedReceiver<ScreenUpdate>,
}

impl WorkflowHandle {
    /// Deliver an operator event.
    ///
    /// # Errors
    ///
    /// Returns `ChannelClosed` once the session has ended.
    pub async fn send(&self, event: CaptureEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    /// Next screen update. Returns `None` after the session has ended and
    /// every update has been read.
    pub async fn next_update(&mut self) -> Option<ScreenUpdate> {
        self.updates.recv().await
    }

    /// Skip updates until one matches `predicate`.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&ScreenUpdate) -> bool,
    ) -> Option<ScreenUpdate> {
        while let Some(update) = self.updates.recv().await {
            if predicate(&update) {
                return Some(update);
            }
        }
        None
    }
}

/// Cancellation tokens of the tasks the sequencer can stop.
#[derive(Debug, Default)]
struct TaskTokens {
    command: Option<CancellationToken>,
    nudge: Option<CancellationToken>,
    trigger: Option<CancellationToken>,
    reconnect: Option<CancellationToken>,
}

impl TaskTokens {
    fn cancel(slot: &mut Option<CancellationToken>) {
        if let Some(token) = slot.take() {
            token.cancel();
        }
    }

    fn cancel_all(&mut self) {
        Self::cancel(&mut self.command);
        Self::cancel(&mut self.nudge);
        Self::cancel(&mut self.trigger);
        Self::cancel(&mut self.reconnect);
    }
}

/// Runs one capture session.
pub struct CaptureWorkflow {
    context: CaptureContext,
    sequencer: Sequencer,
    events_tx: mpsc::Sender<CaptureEvent>,
    events_rx: mpsc::Receiver<CaptureEvent>,
    updates_tx: mpsc::UnboundedSender<ScreenUpdate>,
    tasks: JoinSet<Result<()>>,
    tokens: TaskTokens,
}

impl CaptureWorkflow {
    /// Create the workflow and the handle the screen layer talks to.
    pub fn new(context: CaptureContext) -> Result<(Self, WorkflowHandle)> {
        let sequencer = Sequencer::new(
            context.settings.clone(),
            context.session_id,
            &context.device_info,
        )?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let handle = WorkflowHandle {
            events: events_tx.clone(),
            updates: updates_rx,
        };

        let workflow = Self {
            context,
            sequencer,
            events_tx,
            events_rx,
            updates_tx,
            tasks: JoinSet::new(),
            tokens: TaskTokens::default(),
        };

        Ok((workflow, handle))
    }

    pub fn session_id(&self) -> Uuid {
        self.context.session_id
    }

    /// Run the session to completion.
    pub async fn run(self) -> CaptureOutcome {
        let span = info_span!("capture_session", session = %self.context.session_id);
        self.run_session().instrument(span).await
    }

    async fn run_session(mut self) -> CaptureOutcome {
        info!(
            "Capture session started on {} ({} active fingers)",
            self.context.device_info.name,
            self.sequencer.registry().active_len()
        );

        let effects = self.sequencer.start();
        let mut outcome = self.apply(effects).await;

        while outcome.is_none() {
            tokio::select! {
                event = self.events_rx.recv() => {
                    let effects = match event {
                        Some(event) => match self.sequencer.handle(event) {
                            Ok(effects) => effects,
                            Err(e) => {
                                error!("Capture sequencer error: {}", e);
                                self.sequencer.fail_unexpected(&e)
                            }
                        },
                        None => self.sequencer.fail_unexpected(&EngineError::ChannelClosed),
                    };
                    outcome = self.apply(effects).await;
                }
                Some(result) = self.tasks.join_next() => {
                    if let TaskTermination::Error | TaskTermination::Panic =
                        Self::classify_task_result(result)
                    {
                        warn!("Capture task ended abnormally");
                    }
                }
            }
        }

        self.shutdown().await;

        let outcome = outcome.unwrap_or(CaptureOutcome::Cancelled);
        match &outcome {
            CaptureOutcome::Submitted(payload) => {
                info!("Capture session submitted {} fingerprints", payload.fingerprints.len())
            }
            CaptureOutcome::Cancelled => info!("Capture session cancelled"),
            CaptureOutcome::Failed(reason) => warn!("Capture session failed: {}", reason.message),
        }
        outcome
    }

    /// Carry out effects in order. Returns the outcome once the session
    /// finishes.
    async fn apply(&mut self, effects: Vec<Effect>) -> Option<CaptureOutcome> {
        for effect in effects {
            match effect {
                Effect::Issue(command) => self.spawn_command(command),
                Effect::CancelCommand => {
                    if let Some(token) = &self.tokens.command {
                        token.cancel();
                    }
                }
                Effect::Publish(update) => {
                    debug!("Screen update: {:?}", update);
                    // The screen layer may have gone away; the session still
                    // runs to its outcome.
                    let _ = self.updates_tx.send(update);
                }
                Effect::ScheduleNudge { finger, delay } => self.spawn_nudge(finger, delay),
                Effect::CancelNudge => TaskTokens::cancel(&mut self.tokens.nudge),
                Effect::BindTrigger => self.bind_trigger().await,
                Effect::UnbindTrigger => self.unbind_trigger().await,
                Effect::StartReconnect => self.spawn_reconnect(),
                Effect::CancelReconnect => {
                    if let Some(token) = &self.tokens.reconnect {
                        token.cancel();
                    }
                }
                Effect::Finish(outcome) => return Some(outcome),
            }
        }
        None
    }

    fn spawn_command(&mut self, command: DeviceCommand) {
        debug!("Issuing {}", command);
        let token = CancellationToken::new();
        self.tokens.command = Some(token.clone());
        self.tasks.spawn(Self::command_task(
            Arc::clone(&self.context.device),
            command,
            token,
            self.events_tx.clone(),
        ));
    }

    fn spawn_nudge(&mut self, finger: FingerId, delay: Duration) {
        TaskTokens::cancel(&mut self.tokens.nudge);
        let token = CancellationToken::new();
        self.tokens.nudge = Some(token.clone());
        self.tasks
            .spawn(Self::nudge_task(finger, delay, token, self.events_tx.clone()));
    }

    fn spawn_reconnect(&mut self) {
        let token = CancellationToken::new();
        self.tokens.reconnect = Some(token.clone());
        self.tasks.spawn(Self::reconnect_task(
            Arc::clone(&self.context.device),
            ReconnectionCoordinator::new(self.context.settings.reconnect_attempts),
            token,
            self.events_tx.clone(),
        ));
    }

    async fn bind_trigger(&mut self) {
        TaskTokens::cancel(&mut self.tokens.trigger);
        let presses = self.context.device.lock().await.subscribe_trigger();
        let token = CancellationToken::new();
        self.tokens.trigger = Some(token.clone());
        self.tasks
            .spawn(Self::trigger_task(presses, token, self.events_tx.clone()));
        debug!("Trigger button bound");
    }

    async fn unbind_trigger(&mut self) {
        TaskTokens::cancel(&mut self.tokens.trigger);
        self.context.device.lock().await.unsubscribe_trigger();
        debug!("Trigger button unbound");
    }

    async fn shutdown(&mut self) {
        self.tokens.cancel_all();
        self.tasks.abort_all();

        let mut error_count = 0;
        let mut panic_count = 0;

        while let Some(result) = self.tasks.join_next().await {
            match Self::classify_task_result(result) {
                TaskTermination::Success | TaskTermination::Cancelled => {}
                TaskTermination::Error => error_count += 1,
                TaskTermination::Panic => panic_count += 1,
            }
        }
        if error_count + panic_count > 0 {
            warn!(
                "Capture tasks at shutdown: {} failed, {} panicked",
                error_count, panic_count
            );
        }

        self.context.device.lock().await.unsubscribe_trigger();
    }

    fn classify_task_result(
        result: std::result::Result<Result<()>, tokio::task::JoinError>,
    ) -> TaskTermination {
        match result {
            Ok(Ok(())) => TaskTermination::Success,
            Ok(Err(e)) => {
                debug!("Capture task error: {}", e);
                TaskTermination::Error
            }
            Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
            Err(_) => TaskTermination::Panic,
        }
    }

    // Task bodies

    async fn command_task(
        device: Arc<Mutex<AnyScannerDevice>>,
        command: DeviceCommand,
        token: CancellationToken,
        tx: mpsc::Sender<CaptureEvent>,
    ) -> Result<()> {
        let event = {
            let mut device = device.lock().await;
            let result = tokio::select! {
                result = command.execute(&mut *device) => Some(result),
                _ = token.cancelled() => None,
            };

            match result {
                Some(Ok(reply)) => CaptureEvent::CommandCompleted(reply),
                Some(Err(e)) => {
                    debug!("{} failed: {}", command, e);
                    CaptureEvent::CommandFailed(e.fault_code())
                }
                None => {
                    debug!("{} cancelled", command);
                    if let Err(e) = device.stop_continuous_capture().await {
                        warn!("Failed to stop capture after cancellation: {}", e);
                    }
                    CaptureEvent::CommandFailed(FaultCode::Interrupted)
                }
            }
        };

        tx.send(event).await.map_err(|_| EngineError::ChannelClosed)
    }

    async fn nudge_task(
        finger: FingerId,
        delay: Duration,
        token: CancellationToken,
        tx: mpsc::Sender<CaptureEvent>,
    ) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                tx.send(CaptureEvent::NudgeElapsed(finger))
                    .await
                    .map_err(|_| EngineError::ChannelClosed)
            }
            _ = token.cancelled() => Ok(()),
        }
    }

    async fn trigger_task(
        mut presses: broadcast::Receiver<TriggerPress>,
        token: CancellationToken,
        tx: mpsc::Sender<CaptureEvent>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = token.cancelled() => return Ok(()),
                press = presses.recv() => match press {
                    Ok(TriggerPress) => {
                        if tx.send(CaptureEvent::TriggerPressed).await.is_err() {
                            return Err(EngineError::ChannelClosed);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Dropped {} trigger presses", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                },
            }
        }
    }

    async fn reconnect_task(
        device: Arc<Mutex<AnyScannerDevice>>,
        coordinator: ReconnectionCoordinator,
        token: CancellationToken,
        tx: mpsc::Sender<CaptureEvent>,
    ) -> Result<()> {
        let outcome = coordinator.run(&device, token).await;
        tx.send(CaptureEvent::ReconnectFinished(outcome))
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}

/// How a spawned task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    Success,
    Error,
    /// Aborted at shutdown.
    Cancelled,
    Panic,
}
