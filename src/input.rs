// FallWatch: Emergency Button Input
//
// Hold-to-activate tracking for the manual SOS button. The press must be
// held continuously for the configured hold time; releasing early aborts.
// Driven by explicit instants from the engine loop, which polls `deadline`
// alongside the escalation timer.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SosProgress {
    /// Button not held.
    Idle,
    /// Held; whole seconds left before activation, for a countdown label.
    Counting { remaining_secs: u64 },
    /// Hold completed on this poll. Reported once per press.
    Triggered,
}

pub struct SosHold {
    hold: Duration,
    press_start: Option<Instant>,
    fired: bool,
}

impl SosHold {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            press_start: None,
            fired: false,
        }
    }

    pub fn press(&mut self, at: Instant) {
        // Repeated press edges while held keep the first start.
        if self.press_start.is_none() {
            self.press_start = Some(at);
            self.fired = false;
        }
    }

    /// Release the button. Returns true if this aborted a countdown.
    pub fn release(&mut self, at: Instant) -> bool {
        let aborted = match self.press_start.take() {
            Some(start) => !self.fired && at.duration_since(start) < self.hold,
            None => false,
        };
        self.fired = false;
        aborted
    }

    pub fn poll(&mut self, now: Instant) -> SosProgress {
        let Some(start) = self.press_start else {
            return SosProgress::Idle;
        };
        if self.fired {
            return SosProgress::Idle;
        }

        let held = now.saturating_duration_since(start);
        if held >= self.hold {
            self.fired = true;
            SosProgress::Triggered
        } else {
            SosProgress::Counting {
                remaining_secs: (self.hold - held).as_secs(),
            }
        }
    }

    /// When the current hold will complete, if a countdown is running.
    pub fn deadline(&self) -> Option<Instant> {
        match self.press_start {
            Some(start) if !self.fired => Some(start + self.hold),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn full_hold_triggers_once() {
        let mut sos = SosHold::new(ms(4000));
        let t0 = Instant::now();
        sos.press(t0);
        assert_eq!(sos.poll(t0 + ms(1500)), SosProgress::Counting { remaining_secs: 2 });
        assert_eq!(sos.deadline(), Some(t0 + ms(4000)));
        assert_eq!(sos.poll(t0 + ms(4000)), SosProgress::Triggered);
        assert_eq!(sos.poll(t0 + ms(6000)), SosProgress::Idle);
        assert_eq!(sos.deadline(), None);
        assert!(!sos.release(t0 + ms(7000)));
    }

    #[test]
    fn early_release_aborts() {
        let mut sos = SosHold::new(ms(4000));
        let t0 = Instant::now();
        sos.press(t0);
        assert!(sos.release(t0 + ms(3999)));
        assert_eq!(sos.poll(t0 + ms(5000)), SosProgress::Idle);
    }

    #[test]
    fn repeated_press_keeps_first_start() {
        let mut sos = SosHold::new(ms(4000));
        let t0 = Instant::now();
        sos.press(t0);
        sos.press(t0 + ms(2000));
        assert_eq!(sos.poll(t0 + ms(4000)), SosProgress::Triggered);
    }

    #[test]
    fn new_press_after_trigger_counts_again() {
        let mut sos = SosHold::new(ms(4000));
        let t0 = Instant::now();
        sos.press(t0);
        sos.poll(t0 + ms(4000));
        sos.release(t0 + ms(4500));
        sos.press(t0 + ms(5000));
        assert_eq!(sos.poll(t0 + ms(5000)), SosProgress::Counting { remaining_secs: 4 });
    }
}
