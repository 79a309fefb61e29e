// FallWatch: Alert Presenter
//
// Renders alerts and reports user actions back through `AlertActions`.
// Presenter methods are called from the engine loop and must return promptly.

use std::sync::mpsc::Sender;

use crate::error::SendError;
use crate::escalation::CancelToken;
use crate::events::{Command, UserAction};

/// Every method runs on the engine thread and must not block on the engine.
/// `AlertActions` and the other `EngineHandle` calls only enqueue and are
/// safe from here. `EngineHandle::cancel_pending` called from a presenter
/// method is queued and returns false without waiting for the result; it
/// still takes effect before the next deadline check. Do not call
/// `Engine::stop` from here.
pub trait AlertPresenter: Send {
    /// Whether the alert surface may post notifications.
    fn notifications_permitted(&self) -> bool;

    /// Confirmation UI ("did you fall? confirm / cancel").
    fn show_confirmation(&mut self);

    /// First, dismissable fall alert. `actions` wires the tap and dismiss
    /// callbacks back into the engine.
    fn show_initial_alert(&mut self, actions: AlertActions);

    /// High-priority alert shown when the escalation fires.
    fn show_escalated_alert(&mut self);

    /// Remove any alert currently shown.
    fn clear(&mut self);

    /// The emergency message could not be sent.
    fn show_send_failed(&mut self, _error: &SendError) {}

    /// SOS button countdown tick.
    fn show_sos_countdown(&mut self, _remaining_secs: u64) {}
}

/// The `on_tap` / `on_dismiss` pair for one initial alert.
#[derive(Debug, Clone)]
pub struct AlertActions {
    token: CancelToken,
    tx: Sender<Command>,
}

impl AlertActions {
    pub(crate) fn new(token: CancelToken, tx: Sender<Command>) -> Self {
        Self { token, tx }
    }

    pub fn token(&self) -> CancelToken {
        self.token
    }

    pub fn tap(&self) {
        self.send(UserAction::Tap);
    }

    pub fn dismiss(&self) {
        self.send(UserAction::Dismiss);
    }

    fn send(&self, action: UserAction) {
        let command = Command::UserAction {
            action,
            token: Some(self.token),
        };
        if self.tx.send(command).is_err() {
            log::debug!("{:?} after engine stop ignored", action);
        }
    }
}
