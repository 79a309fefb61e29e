// FallWatch: Detection & Escalation Configuration
//
// Named defaults for every tunable of the engine, plus the overridable
// `EngineConfig` loaded from TOML by hosts that want to calibrate.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------
pub const G: f64 = 9.81; // m/s²

// ---------------------------------------------------------------------------
// Detection thresholds
// ---------------------------------------------------------------------------
pub const IMPACT_THRESHOLD: f64 = 1.0 * G; // m/s², acceleration magnitude
pub const GYRO_THRESHOLD: f64 = 1.0; // rad/s, angular velocity magnitude

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const WINDOW_MS: u64 = 500; // impact → rotation correlation window (inclusive)
pub const COOLDOWN_MS: u64 = 5000; // refractory period after a detected fall
pub const ESCALATION_DELAY_MS: u64 = 10_000; // unattended alert → emergency message
pub const SOS_HOLD_MS: u64 = 4000; // emergency button hold-to-activate

// ---------------------------------------------------------------------------
// Ambient context
// ---------------------------------------------------------------------------
pub const AMBIENT_UNAVAILABLE: f64 = -1.0;
pub const TEMPERATURE_MIN_C: f64 = -100.0;
pub const TEMPERATURE_MAX_C: f64 = 100.0;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------
pub const DEFAULT_EMERGENCY_CONTACT: &str = "000";

/// Overridable engine settings. Every field falls back to the constant of
/// the same name when absent from a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub impact_threshold: f64,
    pub gyro_threshold: f64,
    pub window_ms: u64,
    pub cooldown_ms: u64,
    pub escalation_delay_ms: u64,
    pub sos_hold_ms: u64,
    pub emergency_contact: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            impact_threshold: IMPACT_THRESHOLD,
            gyro_threshold: GYRO_THRESHOLD,
            window_ms: WINDOW_MS,
            cooldown_ms: COOLDOWN_MS,
            escalation_delay_ms: ESCALATION_DELAY_MS,
            sos_hold_ms: SOS_HOLD_MS,
            emergency_contact: DEFAULT_EMERGENCY_CONTACT.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("invalid engine config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading {}", path.display()))
    }

    /// Reject settings the detector cannot work with.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, value) in [
            ("impact_threshold", self.impact_threshold),
            ("gyro_threshold", self.gyro_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.escalation_delay_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "escalation_delay_ms must be greater than zero".into(),
            ));
        }
        if self.emergency_contact.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "emergency_contact must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn escalation_delay(&self) -> Duration {
        Duration::from_millis(self.escalation_delay_ms)
    }

    pub fn sos_hold(&self) -> Duration {
        Duration::from_millis(self.sos_hold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_constants() {
        let config = EngineConfig::default();
        assert!((config.impact_threshold - 9.81).abs() < 1e-9);
        assert_eq!(config.window(), Duration::from_millis(500));
        assert_eq!(config.cooldown(), Duration::from_millis(5000));
        assert_eq!(config.escalation_delay(), Duration::from_secs(10));
        assert_eq!(config.emergency_contact, "000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let toml = "window_ms = 750\ngyro_threshold = 2.5\n";
        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.window_ms, 750);
        assert_eq!(config.gyro_threshold, 2.5);
        assert_eq!(config.cooldown_ms, COOLDOWN_MS);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(EngineConfig::from_toml_str("windw_ms = 10").is_err());
        assert!(EngineConfig::from_toml_str("escalation_delay_ms = 0").is_err());
        assert!(EngineConfig::from_toml_str("impact_threshold = -3.0").is_err());
        assert!(EngineConfig::from_toml_str("emergency_contact = \"  \"").is_err());
    }

    #[test]
    fn rejects_non_finite_thresholds() {
        assert!(EngineConfig::from_toml_str("impact_threshold = nan").is_err());
        assert!(EngineConfig::from_toml_str("gyro_threshold = inf").is_err());

        let config = EngineConfig {
            gyro_threshold: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "escalation_delay_ms = 2500").unwrap();
        writeln!(file, "emergency_contact = \"112\"").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.escalation_delay(), Duration::from_millis(2500));
        assert_eq!(config.emergency_contact, "112");
    }
}
