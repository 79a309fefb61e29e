// FallWatch: Foreground-State Oracle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Queried synchronously when a fall is detected.
pub trait ForegroundOracle: Send {
    fn is_foregrounded(&self) -> bool;
}

/// Shared flag the host flips from its own lifecycle callbacks.
#[derive(Debug, Clone, Default)]
pub struct ForegroundFlag(Arc<AtomicBool>);

impl ForegroundFlag {
    pub fn new(foregrounded: bool) -> Self {
        Self(Arc::new(AtomicBool::new(foregrounded)))
    }

    pub fn set(&self, foregrounded: bool) {
        self.0.store(foregrounded, Ordering::SeqCst);
    }
}

impl ForegroundOracle for ForegroundFlag {
    fn is_foregrounded(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
