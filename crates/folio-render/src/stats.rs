use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for the render supervisor (mounts, faults, recovery).
///
/// Cheap to bump from the frame callback; snapshots can be exported to a diagnostics
/// overlay as JSON.
#[derive(Debug, Default)]
pub struct RenderStats {
    mounts_attempted: AtomicU64,
    mounts_succeeded: AtomicU64,
    frames_rendered: AtomicU64,
    faults_observed: AtomicU64,
    compat_faults: AtomicU64,
    recoveries_attempted: AtomicU64,
    recoveries_succeeded: AtomicU64,
    context_losses: AtomicU64,
    context_restores: AtomicU64,
    fallbacks: AtomicU64,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_mounts_attempted(&self) {
        self.mounts_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_mounts_succeeded(&self) {
        self.mounts_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_frames_rendered(&self) {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_faults_observed(&self, compat: bool) {
        self.faults_observed.fetch_add(1, Ordering::Relaxed);
        if compat {
            self.compat_faults.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_recoveries_attempted(&self) {
        self.recoveries_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_recoveries_succeeded(&self) {
        self.recoveries_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_context_losses(&self) {
        self.context_losses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_context_restores(&self) {
        self.context_restores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallbacks(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RenderStatsSnapshot {
        RenderStatsSnapshot {
            mounts_attempted: self.mounts_attempted.load(Ordering::Relaxed),
            mounts_succeeded: self.mounts_succeeded.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            faults_observed: self.faults_observed.load(Ordering::Relaxed),
            compat_faults: self.compat_faults.load(Ordering::Relaxed),
            recoveries_attempted: self.recoveries_attempted.load(Ordering::Relaxed),
            recoveries_succeeded: self.recoveries_succeeded.load(Ordering::Relaxed),
            context_losses: self.context_losses.load(Ordering::Relaxed),
            context_restores: self.context_restores.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStatsSnapshot {
    pub mounts_attempted: u64,
    pub mounts_succeeded: u64,
    pub frames_rendered: u64,
    pub faults_observed: u64,
    pub compat_faults: u64,
    pub recoveries_attempted: u64,
    pub recoveries_succeeded: u64,
    pub context_losses: u64,
    pub context_restores: u64,
    pub fallbacks: u64,
}

impl RenderStatsSnapshot {
    pub fn to_json(self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self)
    }
}
