// FallWatch: Emergency Composer
//
// Builds the outbound emergency message from the latest ambient context and
// hands it to the messaging channel. One attempt only.

use std::fmt::Write as _;

use crate::config::{AMBIENT_UNAVAILABLE, TEMPERATURE_MAX_C, TEMPERATURE_MIN_C};
use crate::drivers::outbound::MessageChannel;
use crate::error::SendError;
use crate::events::{AmbientReading, EmergencyTrigger};

const EMERGENCY_PHRASE: &str = "EMERGENCY: I may have fallen and need help.";

/// Latest ambient readings. Values stay at the sentinel until sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientState {
    temperature_c: f64,
    light_lux: f64,
}

impl Default for AmbientState {
    fn default() -> Self {
        Self {
            temperature_c: AMBIENT_UNAVAILABLE,
            light_lux: AMBIENT_UNAVAILABLE,
        }
    }
}

impl AmbientState {
    pub fn record(&mut self, reading: AmbientReading) {
        match reading {
            AmbientReading::Light(lux) => {
                self.light_lux = if lux.is_finite() { lux } else { AMBIENT_UNAVAILABLE };
            }
            AmbientReading::Temperature(celsius) => {
                // Readings outside the plausible range are sensor garbage.
                self.temperature_c = if (TEMPERATURE_MIN_C..=TEMPERATURE_MAX_C).contains(&celsius) {
                    celsius
                } else {
                    AMBIENT_UNAVAILABLE
                };
            }
        }
    }

    pub fn snapshot(&self, trigger: EmergencyTrigger) -> Snapshot {
        Snapshot {
            trigger,
            temperature_c: self.temperature_c,
            light_lux: self.light_lux,
        }
    }
}

/// Context captured at the moment an emergency is raised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub trigger: EmergencyTrigger,
    pub temperature_c: f64,
    pub light_lux: f64,
}

#[derive(Debug, Default)]
pub struct EmergencyComposer;

impl EmergencyComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(&self, context: &Snapshot) -> String {
        let mut message = String::from(EMERGENCY_PHRASE);
        let _ = write!(message, " Reason: {}.", context.trigger.describe());
        let _ = write!(
            message,
            " Temperature: {}. Light level: {}.",
            format_reading(context.temperature_c, "°C"),
            format_reading(context.light_lux, "lux"),
        );
        message
    }

    pub fn compose_and_send(
        &self,
        context: Snapshot,
        channel: &mut dyn MessageChannel,
    ) -> Result<(), SendError> {
        let message = self.compose(&context);
        log::info!("Sending emergency message ({:?})", context.trigger);
        channel.send(message)
    }
}

fn format_reading(value: f64, unit: &str) -> String {
    if value == AMBIENT_UNAVAILABLE {
        "unavailable".to_string()
    } else {
        format!("{value:.1} {unit}")
    }
}
