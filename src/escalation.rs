// FallWatch: Escalation Scheduler
//
// Idle → Alerted → { Resolved | Escalated }
//
// The scheduler is a plain state machine over explicit instants. It owns at
// most one armed `EscalationTask`; the engine loop is the only caller, so a
// cancel and a fire can never interleave. Collaborator calls (presenter,
// outbound channel) are made by the loop based on the values returned here.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::EngineError;
use crate::events::FallEvent;

/// Identifies one armed task. Tokens are never reused within an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CancelToken(u64);

impl fmt::Display for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationTask {
    pub armed_at: Instant,
    pub fire_at: Instant,
    pub token: CancelToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    Idle,
    Alerted,
    Resolved,
    Escalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Tap,
    Dismiss,
    Confirm,
    ForegroundEntered,
    Superseded,
    Host,
    Stopped,
}

/// What the loop must show for a freshly detected fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPlan {
    /// App is in the foreground: show the confirmation UI, nothing armed.
    Confirm,
    /// App is in the background: show the initial alert; `task` is armed.
    Notify(EscalationTask),
}

pub struct EscalationScheduler {
    delay: Duration,
    next_token: u64,
    current: Option<EscalationTask>,
    // Token of the most recent initial alert, armed or not.
    latest: Option<CancelToken>,
    state: EscalationState,
}

impl EscalationScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_token: 1,
            current: None,
            latest: None,
            state: EscalationState::Idle,
        }
    }

    /// Decide how to alert for `event`. Any task left over from an earlier,
    /// unresolved cycle is superseded first.
    pub fn open_alert(
        &mut self,
        event: &FallEvent,
        foregrounded: bool,
        permitted: bool,
        now: Instant,
    ) -> Result<AlertPlan, EngineError> {
        self.cancel_pending(CancelReason::Superseded);
        self.latest = None;

        if foregrounded {
            self.state = EscalationState::Resolved;
            return Ok(AlertPlan::Confirm);
        }
        if !permitted {
            return Err(EngineError::PermissionDenied);
        }

        let task = self.arm(now);
        log::info!(
            "Fall at {:?} alerted; escalation {} armed for {} ms",
            event.detected_at,
            task.token,
            self.delay.as_millis()
        );
        Ok(AlertPlan::Notify(task))
    }

    /// Arm a new task firing `delay` after `now`, replacing any armed one.
    pub fn arm(&mut self, now: Instant) -> EscalationTask {
        if let Some(previous) = self.current.take() {
            log::debug!("Escalation {} superseded", previous.token);
        }
        let task = EscalationTask {
            armed_at: now,
            fire_at: now + self.delay,
            token: CancelToken(self.next_token),
        };
        self.next_token += 1;
        self.current = Some(task);
        self.latest = Some(task.token);
        self.state = EscalationState::Alerted;
        task
    }

    /// Disarm whatever is pending. Returns whether a task was disarmed;
    /// calling it with nothing armed is a no-op.
    pub fn cancel_pending(&mut self, reason: CancelReason) -> bool {
        match self.current.take() {
            Some(task) => {
                log::info!("Escalation {} cancelled ({:?})", task.token, reason);
                self.state = EscalationState::Resolved;
                true
            }
            None => false,
        }
    }

    /// Disarm only if `token` names the armed task. Actions from an alert
    /// that was already superseded or resolved are ignored.
    pub fn cancel_if_current(&mut self, token: CancelToken, reason: CancelReason) -> bool {
        match self.current {
            Some(task) if task.token == token => self.cancel_pending(reason),
            _ => {
                log::debug!("Stale {:?} for escalation {} ignored", reason, token);
                false
            }
        }
    }

    /// Take the armed task if its deadline has passed.
    pub fn fire_due(&mut self, now: Instant) -> Option<EscalationTask> {
        match self.current {
            Some(task) if now >= task.fire_at => {
                self.current = None;
                self.state = EscalationState::Escalated;
                log::info!("Escalation {} fired", task.token);
                Some(task)
            }
            _ => None,
        }
    }

    /// Whether `token` belongs to the most recent initial alert. It stays
    /// current after that alert's task is cancelled or fired, until a newer
    /// fall replaces it.
    pub fn is_latest(&self, token: CancelToken) -> bool {
        self.latest == Some(token)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.current.map(|task| task.fire_at)
    }

    pub fn pending(&self) -> Option<EscalationTask> {
        self.current
    }

    pub fn state(&self) -> EscalationState {
        self.state
    }
}
