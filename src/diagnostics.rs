// FallWatch: Runtime Counters
//
// Written by the engine loop, read from any thread.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::SensorKind;

#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub samples_processed: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub falls_detected: AtomicU64,
    pub alerts_opened: AtomicU64,
    pub escalations: AtomicU64,
    pub emergencies_sent: AtomicU64,
    pub permission_denials: AtomicU64,
    pub send_failures: AtomicU64,
}

impl Diagnostics {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        DiagnosticsSnapshot {
            samples_processed: load(&self.samples_processed),
            samples_dropped: load(&self.samples_dropped),
            falls_detected: load(&self.falls_detected),
            alerts_opened: load(&self.alerts_opened),
            escalations: load(&self.escalations),
            emergencies_sent: load(&self.emergencies_sent),
            permission_denials: load(&self.permission_denials),
            send_failures: load(&self.send_failures),
            unavailable_sensors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub samples_processed: u64,
    /// NaN or infinite samples discarded by the sampler.
    pub samples_dropped: u64,
    pub falls_detected: u64,
    pub alerts_opened: u64,
    pub escalations: u64,
    pub emergencies_sent: u64,
    pub permission_denials: u64,
    pub send_failures: u64,
    /// Motion sensors reported missing when the engine started.
    pub unavailable_sensors: Vec<SensorKind>,
}
