// FallWatch: Engine Task
//
// One serializing loop owns all engine state. Sensor deliveries, user
// actions, lifecycle calls and timer expiry all arrive as `Command`s on a
// single channel, so detection, arming and cancellation never race.
//
// The loop waits on the channel with a timeout equal to the nearest
// deadline (escalation or SOS hold). Commands already queued are applied
// before any deadline is checked. Because cancellation is processed by the
// same loop, a task that has been acknowledged cancelled can never fire
// afterwards.

use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::composer::{AmbientState, EmergencyComposer};
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::drivers::alert::{AlertActions, AlertPresenter};
use crate::drivers::foreground::ForegroundOracle;
use crate::drivers::outbound::MessageChannel;
use crate::drivers::sensor::{SampleSink, SensorSource};
use crate::error::EngineError;
use crate::escalation::{
    AlertPlan, CancelReason, CancelToken, EscalationScheduler, EscalationTask,
};
use crate::events::{
    AmbientReading, Command, EmergencyTrigger, FallEvent, SensorKind, UserAction,
};
use crate::input::{SosHold, SosProgress};
use crate::sampler::SignalSampler;

// Countdown refresh while the SOS button is held.
const SOS_TICK: Duration = Duration::from_secs(1);

/// Everything the engine needs from the host application.
pub struct Collaborators {
    pub sensors: Box<dyn SensorSource>,
    pub presenter: Box<dyn AlertPresenter>,
    pub foreground: Box<dyn ForegroundOracle>,
    pub channel: Box<dyn MessageChannel>,
}

// ---------------------------------------------------------------------------
// Engine (lifecycle owner)
// ---------------------------------------------------------------------------
pub struct Engine {
    tx: Sender<Command>,
    sensors: Box<dyn SensorSource>,
    worker: Option<JoinHandle<()>>,
    loop_thread: ThreadId,
    diagnostics: Arc<Diagnostics>,
    unavailable: Vec<SensorKind>,
}

impl Engine {
    /// Spawn the engine loop and subscribe to the sensor source. A missing
    /// motion sensor is reported and the engine runs without that axis.
    pub fn start(config: EngineConfig, collaborators: Collaborators) -> anyhow::Result<Self> {
        config.validate()?;

        let Collaborators {
            mut sensors,
            presenter,
            foreground,
            channel,
        } = collaborators;

        let (tx, rx) = mpsc::channel();
        let diagnostics = Arc::new(Diagnostics::default());
        let core = EngineCore::new(
            &config,
            presenter,
            foreground,
            channel,
            tx.clone(),
            Arc::clone(&diagnostics),
        );

        let worker = thread::Builder::new()
            .name("engine".into())
            .spawn(move || engine_task(rx, core))
            .context("spawning engine thread")?;
        let loop_thread = worker.thread().id();

        let mut unavailable = Vec::new();
        for kind in SensorKind::MOTION {
            if !sensors.is_available(kind) {
                log::warn!("{}; fall detection degraded", EngineError::SensorUnavailable(kind));
                unavailable.push(kind);
            }
        }
        if let Err(e) = sensors.subscribe(SampleSink::new(tx.clone())) {
            log::warn!("Sensor subscription failed: {e:#}");
            for kind in SensorKind::MOTION {
                if !unavailable.contains(&kind) {
                    log::warn!("{}", EngineError::SensorUnavailable(kind));
                    unavailable.push(kind);
                }
            }
        }

        log::info!(
            "Fall detection engine started (impact > {:.2} m/s², rotation > {:.2} rad/s)",
            config.impact_threshold,
            config.gyro_threshold
        );

        Ok(Self {
            tx,
            sensors,
            worker: Some(worker),
            loop_thread,
            diagnostics,
            unavailable,
        })
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
            loop_thread: self.loop_thread,
        }
    }

    /// Unsubscribe, cancel any pending escalation and join the loop.
    /// Safe to call more than once. Called from the engine thread itself
    /// (a collaborator callback), the stop is queued and not joined.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.sensors.unsubscribe();
        let _ = self.tx.send(Command::Stop);
        if thread::current().id() == self.loop_thread {
            log::warn!("Engine stopped from its own thread; not joining");
            return;
        }
        if worker.join().is_err() {
            log::error!("Engine thread panicked");
        }
        log::info!("Fall detection engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Motion sensors reported unavailable at start.
    pub fn unavailable_sensors(&self) -> &[SensorKind] {
        &self.unavailable
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            unavailable_sensors: self.unavailable.clone(),
            ..self.diagnostics.snapshot()
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// EngineHandle (host-side entry points, cloneable across threads)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: Sender<Command>,
    loop_thread: ThreadId,
}

impl EngineHandle {
    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx.send(command).map_err(|_| EngineError::Stopped)
    }

    /// The application became visible; any pending escalation is cancelled.
    pub fn notify_foreground_entered(&self) -> Result<(), EngineError> {
        self.send(Command::ForegroundEntered)
    }

    pub fn notify_user_action(&self, action: UserAction) -> Result<(), EngineError> {
        self.send(Command::UserAction {
            action,
            token: None,
        })
    }

    pub fn notify_ambient(&self, reading: AmbientReading) -> Result<(), EngineError> {
        self.send(Command::Ambient(reading))
    }

    /// Cancel the pending escalation and wait for the loop to acknowledge.
    /// Returns whether a task was disarmed; false when nothing was pending
    /// or the engine has stopped.
    ///
    /// From a collaborator callback (the engine thread) the cancel is queued
    /// without waiting and false is returned; it takes effect before the
    /// loop next checks its deadlines.
    pub fn cancel_pending(&self) -> bool {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.send(Command::CancelPending(reply_tx)).is_err() {
            return false;
        }
        if thread::current().id() == self.loop_thread {
            log::debug!("Cancel requested from the engine thread; queued");
            return false;
        }
        reply_rx.recv().unwrap_or(false)
    }

    pub fn press_sos(&self) -> Result<(), EngineError> {
        self.send(Command::SosPressed(Instant::now()))
    }

    pub fn release_sos(&self) -> Result<(), EngineError> {
        self.send(Command::SosReleased(Instant::now()))
    }

    /// Send the emergency message now, without a hold countdown.
    pub fn request_emergency(&self) -> Result<(), EngineError> {
        self.send(Command::RequestEmergency)
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------
fn engine_task(rx: Receiver<Command>, mut core: EngineCore) {
    log::info!("Engine task started");

    loop {
        let command = match core.next_deadline(Instant::now()) {
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(command) => Some(command),
                    // Deadline reached: `drain_then_poll` fires the timer.
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => Some(Command::Stop),
                }
            }
            None => Some(rx.recv().unwrap_or(Command::Stop)),
        };

        if let Some(command) = command {
            if !core.handle(command, Instant::now()) {
                break;
            }
        }
        // A steady sample stream never times out, so deadlines are also
        // checked after every command.
        if !drain_then_poll(&mut core, &rx, &Instant::now) {
            break;
        }
    }

    log::info!("Engine task exited");
}

/// Apply every command already queued, then check deadlines. A cancel that
/// was enqueued before a deadline check always wins over the timer.
/// Returns false once a `Stop` was handled.
fn drain_then_poll(
    core: &mut EngineCore,
    rx: &Receiver<Command>,
    clock: &dyn Fn() -> Instant,
) -> bool {
    while let Ok(command) = rx.try_recv() {
        if !core.handle(command, clock()) {
            return false;
        }
    }
    core.handle(Command::TimerFired, clock())
}

pub(crate) struct EngineCore {
    sampler: SignalSampler,
    scheduler: EscalationScheduler,
    composer: EmergencyComposer,
    ambient: AmbientState,
    sos: SosHold,
    last_countdown: Option<u64>,
    presenter: Box<dyn AlertPresenter>,
    foreground: Box<dyn ForegroundOracle>,
    channel: Box<dyn MessageChannel>,
    tx: Sender<Command>,
    diagnostics: Arc<Diagnostics>,
}

impl EngineCore {
    pub(crate) fn new(
        config: &EngineConfig,
        presenter: Box<dyn AlertPresenter>,
        foreground: Box<dyn ForegroundOracle>,
        channel: Box<dyn MessageChannel>,
        tx: Sender<Command>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            sampler: SignalSampler::new(config),
            scheduler: EscalationScheduler::new(config.escalation_delay()),
            composer: EmergencyComposer::new(),
            ambient: AmbientState::default(),
            sos: SosHold::new(config.sos_hold()),
            last_countdown: None,
            presenter,
            foreground,
            channel,
            tx,
            diagnostics,
        }
    }

    /// Apply one command. Returns false once the engine must exit.
    pub(crate) fn handle(&mut self, command: Command, now: Instant) -> bool {
        match command {
            Command::SampleArrived(sample) => {
                let event = self.sampler.on_sample(&sample);
                self.diagnostics
                    .samples_processed
                    .store(self.sampler.processed(), Ordering::Relaxed);
                self.diagnostics
                    .samples_dropped
                    .store(self.sampler.dropped(), Ordering::Relaxed);
                if let Some(event) = event {
                    self.on_fall(event, now);
                }
            }
            Command::Ambient(reading) => self.ambient.record(reading),
            Command::UserAction { action, token } => self.on_user_action(action, token),
            Command::ForegroundEntered => {
                self.scheduler.cancel_pending(CancelReason::ForegroundEntered);
            }
            Command::CancelPending(reply) => {
                let cancelled = self.scheduler.cancel_pending(CancelReason::Host);
                let _ = reply.send(cancelled);
            }
            Command::SosPressed(at) => {
                log::info!("SOS button pressed");
                self.sos.press(at);
            }
            Command::SosReleased(at) => {
                if self.sos.release(at) {
                    log::info!("SOS hold released early, aborted");
                }
                self.last_countdown = None;
            }
            Command::RequestEmergency => {
                self.scheduler.cancel_pending(CancelReason::Confirm);
                self.send_emergency(EmergencyTrigger::ManualSos);
            }
            Command::TimerFired => self.poll_timers(now),
            Command::Stop => {
                self.shutdown(now);
                return false;
            }
        }
        true
    }

    pub(crate) fn poll_timers(&mut self, now: Instant) {
        if let Some(task) = self.scheduler.fire_due(now) {
            self.escalate(task);
        }

        match self.sos.poll(now) {
            SosProgress::Triggered => {
                self.last_countdown = None;
                self.scheduler.cancel_pending(CancelReason::Confirm);
                self.send_emergency(EmergencyTrigger::ManualSos);
            }
            SosProgress::Counting { remaining_secs } => {
                if self.last_countdown != Some(remaining_secs) {
                    self.last_countdown = Some(remaining_secs);
                    self.presenter.show_sos_countdown(remaining_secs);
                }
            }
            SosProgress::Idle => {}
        }
    }

    pub(crate) fn next_deadline(&self, now: Instant) -> Option<Instant> {
        let sos = self.sos.deadline().map(|deadline| deadline.min(now + SOS_TICK));
        match (self.scheduler.next_deadline(), sos) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[cfg(test)]
    pub(crate) fn escalation_state(&self) -> crate::escalation::EscalationState {
        self.scheduler.state()
    }

    fn on_fall(&mut self, event: FallEvent, now: Instant) {
        Diagnostics::bump(&self.diagnostics.falls_detected);
        log::info!("Fall detected");

        let foregrounded = self.foreground.is_foregrounded();
        let permitted = self.presenter.notifications_permitted();
        match self.scheduler.open_alert(&event, foregrounded, permitted, now) {
            Ok(AlertPlan::Confirm) => self.presenter.show_confirmation(),
            Ok(AlertPlan::Notify(task)) => {
                Diagnostics::bump(&self.diagnostics.alerts_opened);
                let actions = AlertActions::new(task.token, self.tx.clone());
                self.presenter.show_initial_alert(actions);
            }
            Err(e) => {
                Diagnostics::bump(&self.diagnostics.permission_denials);
                log::warn!("Fall alert suppressed: {e}");
            }
        }
    }

    fn on_user_action(&mut self, action: UserAction, token: Option<CancelToken>) {
        let reason = match action {
            UserAction::Tap => CancelReason::Tap,
            UserAction::Dismiss => CancelReason::Dismiss,
            UserAction::Confirm => CancelReason::Confirm,
        };
        match token {
            Some(token) => {
                // Callbacks from an alert replaced by a newer fall do nothing.
                if !self.scheduler.is_latest(token) {
                    log::debug!("{:?} from superseded alert {} ignored", action, token);
                    return;
                }
                self.scheduler.cancel_if_current(token, reason);
            }
            None => {
                self.scheduler.cancel_pending(reason);
            }
        }

        match action {
            UserAction::Tap => self.presenter.show_confirmation(),
            UserAction::Dismiss => self.presenter.clear(),
            UserAction::Confirm => {
                self.presenter.clear();
                self.send_emergency(EmergencyTrigger::Confirmed);
            }
        }
    }

    fn escalate(&mut self, task: EscalationTask) {
        Diagnostics::bump(&self.diagnostics.escalations);
        log::warn!(
            "No response {} ms after fall alert, escalating",
            task.fire_at.duration_since(task.armed_at).as_millis()
        );
        self.presenter.show_escalated_alert();
        self.send_emergency(EmergencyTrigger::Escalated);
    }

    fn send_emergency(&mut self, trigger: EmergencyTrigger) {
        let context = self.ambient.snapshot(trigger);
        match self.composer.compose_and_send(context, self.channel.as_mut()) {
            Ok(()) => Diagnostics::bump(&self.diagnostics.emergencies_sent),
            Err(e) => {
                Diagnostics::bump(&self.diagnostics.send_failures);
                log::warn!("{}", EngineError::from(e.clone()));
                self.presenter.show_send_failed(&e);
            }
        }
    }

    fn shutdown(&mut self, now: Instant) {
        self.scheduler.cancel_pending(CancelReason::Stopped);
        self.sos.release(now);
        self.last_countdown = None;
        self.sampler.reset();
        self.presenter.clear();
    }
}
