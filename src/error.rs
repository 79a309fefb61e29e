// FallWatch: Error Taxonomy
//
// Every variant is recoverable: the engine reports it and keeps evaluating
// samples.

use thiserror::Error;

use crate::events::SensorKind;

/// Outbound message delivery failure. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("outbound messaging channel unavailable")]
    ChannelUnavailable,
    #[error("outbound message rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A required motion sensor is missing; the engine runs degraded.
    #[error("{0} sensor unavailable")]
    SensorUnavailable(SensorKind),
    /// The alert surface may not be used; the escalation path is suppressed.
    #[error("alert permission not granted")]
    PermissionDenied,
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error("engine is not running")]
    Stopped,
}
