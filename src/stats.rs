//! Connection statistics for the status endpoints.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one protocol surface.
#[derive(Debug, Default)]
pub struct ConnectionCounters {
    total: AtomicU64,
    active: AtomicU64,
}

impl ConnectionCounters {
    pub fn opened(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn closed(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// Process-wide connection statistics, split per protocol surface.
#[derive(Debug, Default)]
pub struct FabricStats {
    robotics: ConnectionCounters,
    video: ConnectionCounters,
}

impl FabricStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn robotics(&self) -> &ConnectionCounters {
        &self.robotics
    }

    pub fn video(&self) -> &ConnectionCounters {
        &self.video
    }
}
