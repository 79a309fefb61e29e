// FallWatch: Outbound Messaging Channel

use crate::error::SendError;

/// Transmits the final emergency message (SMS, push, call bridge, ...).
///
/// `send` runs on the engine thread; the same re-entrancy rules as for
/// `AlertPresenter` apply.
pub trait MessageChannel: Send {
    fn send(&mut self, message: String) -> Result<(), SendError>;
}
