// FallWatch: Impact Tracker
//
// Holds the single most recent impact candidate. No history: a newer
// impact always replaces the older one.

use std::time::Instant;

pub struct ImpactTracker {
    threshold: f64,
    last_impact_at: Option<Instant>,
}

impl ImpactTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_impact_at: None,
        }
    }

    /// Record `at` as the impact candidate if `magnitude` is strictly above
    /// the threshold.
    pub fn record_if_impact(&mut self, magnitude: f64, at: Instant) {
        if magnitude > self.threshold {
            log::trace!("Impact candidate ({:.2} m/s²)", magnitude);
            self.last_impact_at = Some(at);
        }
    }

    pub fn last_impact_at(&self) -> Option<Instant> {
        self.last_impact_at
    }

    pub fn clear(&mut self) {
        self.last_impact_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn threshold_is_exclusive() {
        let mut tracker = ImpactTracker::new(9.81);
        let t0 = Instant::now();
        tracker.record_if_impact(9.81, t0);
        assert_eq!(tracker.last_impact_at(), None);
        tracker.record_if_impact(9.82, t0);
        assert_eq!(tracker.last_impact_at(), Some(t0));
    }

    #[test]
    fn newest_impact_wins_and_quiet_samples_do_not_clear() {
        let mut tracker = ImpactTracker::new(9.81);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(120);
        tracker.record_if_impact(15.0, t0);
        tracker.record_if_impact(11.0, t1);
        tracker.record_if_impact(2.0, t1 + Duration::from_millis(10));
        assert_eq!(tracker.last_impact_at(), Some(t1));
    }
}
