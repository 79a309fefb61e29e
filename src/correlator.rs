// FallWatch: Fall Correlator
//
// Two-stage detector:
//   1. Coincidence: a rotational spike must follow the current impact
//      candidate by at most `window` (inclusive).
//   2. Refractory: no second fall within `cooldown` of the previous one.
//
// Only acceleration-then-rotation correlates. A gyroscope spike stamped
// before the impact candidate is ignored.

use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::events::FallEvent;
use crate::impact::ImpactTracker;

pub struct FallCorrelator {
    gyro_threshold: f64,
    window: Duration,
    cooldown: Duration,
    last_fall_at: Option<Instant>,
}

impl FallCorrelator {
    pub fn new(gyro_threshold: f64, window: Duration, cooldown: Duration) -> Self {
        Self {
            gyro_threshold,
            window,
            cooldown,
            last_fall_at: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.gyro_threshold, config.window(), config.cooldown())
    }

    pub fn evaluate(
        &mut self,
        gyro_magnitude: f64,
        at: Instant,
        impact: &ImpactTracker,
    ) -> Option<FallEvent> {
        if gyro_magnitude <= self.gyro_threshold {
            return None;
        }

        let gap = impact
            .last_impact_at()
            .and_then(|impact_at| at.checked_duration_since(impact_at));
        match gap {
            Some(gap) if gap <= self.window => {}
            Some(gap) => {
                log::debug!(
                    "Rotation spike {:.2} rad/s outside window ({} ms after impact)",
                    gyro_magnitude,
                    gap.as_millis()
                );
                return None;
            }
            None => return None,
        }

        if let Some(last_fall_at) = self.last_fall_at {
            // An out-of-order timestamp counts as inside the cooldown.
            let cooling = at
                .checked_duration_since(last_fall_at)
                .map_or(true, |since| since <= self.cooldown);
            if cooling {
                log::debug!("Fall suppressed: inside cooldown");
                return None;
            }
        }

        self.last_fall_at = Some(at);
        Some(FallEvent { detected_at: at })
    }

    pub fn last_fall_at(&self) -> Option<Instant> {
        self.last_fall_at
    }

    pub fn clear(&mut self) {
        self.last_fall_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (ImpactTracker, FallCorrelator, Instant) {
        let config = EngineConfig::default();
        (
            ImpactTracker::new(config.impact_threshold),
            FallCorrelator::from_config(&config),
            Instant::now(),
        )
    }

    #[test]
    fn impact_then_rotation_inside_window_is_a_fall() {
        let (mut impact, mut correlator, t0) = setup();
        impact.record_if_impact(12.0, t0);
        let event = correlator.evaluate(1.5, t0 + ms(200), &impact);
        assert_eq!(event, Some(FallEvent { detected_at: t0 + ms(200) }));
    }

    #[test]
    fn rotation_after_window_is_ignored() {
        let (mut impact, mut correlator, t0) = setup();
        impact.record_if_impact(12.0, t0);
        assert_eq!(correlator.evaluate(1.5, t0 + ms(600), &impact), None);
        assert_eq!(correlator.last_fall_at(), None);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let (mut impact, mut correlator, t0) = setup();
        impact.record_if_impact(12.0, t0);
        assert!(correlator.evaluate(1.5, t0 + ms(501), &impact).is_none());
        assert!(correlator.evaluate(1.5, t0 + ms(500), &impact).is_some());
    }

    #[test]
    fn same_tick_correlates() {
        let (mut impact, mut correlator, t0) = setup();
        impact.record_if_impact(12.0, t0);
        assert!(correlator.evaluate(1.5, t0, &impact).is_some());
    }

    #[test]
    fn weak_rotation_or_missing_impact_is_ignored() {
        let (mut impact, mut correlator, t0) = setup();
        assert!(correlator.evaluate(5.0, t0, &impact).is_none());
        impact.record_if_impact(12.0, t0);
        assert!(correlator.evaluate(1.0, t0 + ms(10), &impact).is_none());
    }

    #[test]
    fn rotation_before_impact_does_not_correlate() {
        let (mut impact, mut correlator, t0) = setup();
        let gyro_at = t0;
        impact.record_if_impact(12.0, t0 + ms(100));
        assert!(correlator.evaluate(1.5, gyro_at, &impact).is_none());
    }

    #[test]
    fn cooldown_suppresses_repeat_falls() {
        let (mut impact, mut correlator, t0) = setup();
        impact.record_if_impact(12.0, t0);
        assert!(correlator.evaluate(1.5, t0, &impact).is_some());

        impact.record_if_impact(12.0, t0 + ms(3000));
        assert!(correlator.evaluate(1.5, t0 + ms(3000), &impact).is_none());

        impact.record_if_impact(12.0, t0 + ms(6000));
        let event = correlator.evaluate(1.5, t0 + ms(6000), &impact);
        assert_eq!(event, Some(FallEvent { detected_at: t0 + ms(6000) }));
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        let (mut impact, mut correlator, t0) = setup();
        impact.record_if_impact(12.0, t0);
        assert!(correlator.evaluate(1.5, t0, &impact).is_some());

        impact.record_if_impact(12.0, t0 + ms(5000));
        assert!(correlator.evaluate(1.5, t0 + ms(5000), &impact).is_none());
        assert!(correlator.evaluate(1.5, t0 + ms(5001), &impact).is_some());
    }

    #[test]
    fn suppressed_spike_does_not_extend_cooldown() {
        let (mut impact, mut correlator, t0) = setup();
        impact.record_if_impact(12.0, t0);
        correlator.evaluate(1.5, t0, &impact);
        impact.record_if_impact(12.0, t0 + ms(4900));
        correlator.evaluate(1.5, t0 + ms(4900), &impact);
        assert_eq!(correlator.last_fall_at(), Some(t0));
    }

    #[test]
    fn every_offset_pair_follows_the_window_rule() {
        let offsets = [0, 1, 100, 299, 300, 499, 500, 501, 799, 800, 801, 1300, 1301];
        for impact_ms in offsets {
            for gyro_ms in offsets {
                let (mut impact, mut correlator, t0) = setup();
                impact.record_if_impact(12.0, t0 + ms(impact_ms));
                let fell = correlator.evaluate(1.5, t0 + ms(gyro_ms), &impact).is_some();
                let expected = gyro_ms >= impact_ms && gyro_ms - impact_ms <= 500;
                assert_eq!(fell, expected, "impact at {impact_ms} ms, rotation at {gyro_ms} ms");
            }
        }
    }

    #[test]
    fn every_repeat_delay_follows_the_cooldown_rule() {
        for delay_ms in [1, 200, 2500, 4999, 5000, 5001, 5200, 9000] {
            for gap_ms in [0, 250, 500] {
                let (mut impact, mut correlator, t0) = setup();
                impact.record_if_impact(12.0, t0);
                assert!(correlator.evaluate(1.5, t0 + ms(gap_ms), &impact).is_some());

                let second = t0 + ms(delay_ms);
                impact.record_if_impact(12.0, second);
                let fell = correlator.evaluate(1.5, second + ms(gap_ms), &impact).is_some();
                assert_eq!(
                    fell,
                    delay_ms > 5000,
                    "second fall {delay_ms} ms later, rotation gap {gap_ms} ms"
                );
            }
        }
    }
}
