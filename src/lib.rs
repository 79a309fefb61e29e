//! FallWatch fall-detection and emergency-escalation engine.
//!
//! Fuses accelerometer and gyroscope streams to detect a fall, then runs a
//! cancellable alert protocol: show an alert, and if nobody answers within
//! the escalation delay, hand a composed emergency message to the outbound
//! channel.
//!
//! The host application supplies the collaborators in [`drivers`] and drives
//! the engine through [`Engine`] and [`EngineHandle`].

pub mod composer;
pub mod config;
pub mod correlator;
mod diagnostics;
pub mod drivers;
pub mod error;
pub mod escalation;
pub mod events;
pub mod impact;
pub mod input;
pub mod sampler;
pub mod tasks;

pub use config::EngineConfig;
pub use diagnostics::DiagnosticsSnapshot;
pub use error::{EngineError, SendError};
pub use events::{AmbientReading, EmergencyTrigger, FallEvent, Sample, SensorKind, UserAction};
pub use tasks::engine::{Collaborators, Engine, EngineHandle};
