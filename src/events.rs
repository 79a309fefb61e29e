// FallWatch: System Events & Data Types

use std::fmt;
use std::sync::mpsc::Sender;
use std::time::Instant;

use crate::escalation::CancelToken;

// ---------------------------------------------------------------------------
// Motion samples (one 3-axis reading from either motion sensor)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Linear acceleration, m/s².
    Accelerometer,
    /// Angular velocity, rad/s.
    Gyroscope,
}

impl SensorKind {
    pub const MOTION: [SensorKind; 2] = [SensorKind::Accelerometer, SensorKind::Gyroscope];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accelerometer => "accelerometer",
            Self::Gyroscope => "gyroscope",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub axis_values: (f64, f64, f64),
    pub source: SensorKind,
    pub observed_at: Instant,
}

impl Sample {
    pub fn new(source: SensorKind, axis_values: (f64, f64, f64), observed_at: Instant) -> Self {
        Self {
            axis_values,
            source,
            observed_at,
        }
    }

    /// Euclidean magnitude of the three axes.
    pub fn magnitude(&self) -> f64 {
        let (x, y, z) = self.axis_values;
        (x * x + y * y + z * z).sqrt()
    }

    /// NaN or infinite axes cannot be compared against thresholds.
    pub fn is_well_formed(&self) -> bool {
        let (x, y, z) = self.axis_values;
        x.is_finite() && y.is_finite() && z.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Detection output
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallEvent {
    pub detected_at: Instant,
}

// ---------------------------------------------------------------------------
// Ambient readings used as emergency-message context
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmbientReading {
    /// Illuminance, lux.
    Light(f64),
    /// Ambient temperature, °C.
    Temperature(f64),
}

// ---------------------------------------------------------------------------
// User actions reported by the alert surface
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Alert tapped; the confirmation UI opens.
    Tap,
    /// Alert dismissed as a false trigger.
    Dismiss,
    /// User confirmed they need help.
    Confirm,
}

/// Why an emergency message is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyTrigger {
    /// Alert went unanswered for the escalation delay.
    Escalated,
    /// User confirmed from the confirmation UI.
    Confirmed,
    /// Emergency button held down.
    ManualSos,
}

impl EmergencyTrigger {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Escalated => "a fall was detected and the alert went unanswered",
            Self::Confirmed => "a fall was detected and the wearer confirmed they need help",
            Self::ManualSos => "the wearer activated the emergency button",
        }
    }
}

// ---------------------------------------------------------------------------
// Engine loop messages. Every state mutation goes through one of these.
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub(crate) enum Command {
    SampleArrived(Sample),
    Ambient(AmbientReading),
    UserAction {
        action: UserAction,
        /// Token of the alert the action came from; `None` for host calls.
        token: Option<CancelToken>,
    },
    ForegroundEntered,
    /// Synchronous cancel: the reply reports whether a task was disarmed.
    CancelPending(Sender<bool>),
    SosPressed(Instant),
    SosReleased(Instant),
    RequestEmergency,
    TimerFired,
    Stop,
}
