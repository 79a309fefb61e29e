// FallWatch: Signal Sampler
//
// Entry point for raw motion samples. Computes the magnitude and routes it:
// accelerometer → ImpactTracker, gyroscope → FallCorrelator. Never blocks.

use crate::config::EngineConfig;
use crate::correlator::FallCorrelator;
use crate::events::{FallEvent, Sample, SensorKind};
use crate::impact::ImpactTracker;

pub struct SignalSampler {
    impact: ImpactTracker,
    correlator: FallCorrelator,
    processed: u64,
    dropped: u64,
}

impl SignalSampler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            impact: ImpactTracker::new(config.impact_threshold),
            correlator: FallCorrelator::from_config(config),
            processed: 0,
            dropped: 0,
        }
    }

    /// Feed one sample. Malformed samples are dropped and counted.
    pub fn on_sample(&mut self, sample: &Sample) -> Option<FallEvent> {
        if !sample.is_well_formed() {
            self.dropped += 1;
            log::trace!("Dropped malformed {} sample", sample.source);
            return None;
        }
        self.processed += 1;

        let magnitude = sample.magnitude();
        match sample.source {
            SensorKind::Accelerometer => {
                self.impact.record_if_impact(magnitude, sample.observed_at);
                None
            }
            SensorKind::Gyroscope => {
                self.correlator.evaluate(magnitude, sample.observed_at, &self.impact)
            }
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Forget the impact candidate and the cooldown anchor.
    pub fn reset(&mut self) {
        self.impact.clear();
        self.correlator.clear();
    }
}
