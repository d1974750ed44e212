//! Shared health state for the /health endpoint.
//! Updated by the supervisor, read by the API task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Shared health metrics. Updated between pipeline stages, read by API.
pub struct HealthState {
    /// Epoch seconds at process start, for uptime reporting.
    started_at: u64,
    /// True while a pass is in flight.
    pass_running: AtomicBool,
    /// Epoch seconds of the last completed pass (0 = never).
    last_pass_at: AtomicU64,
    /// Completed passes by outcome.
    passes_ok: AtomicU64,
    passes_failed: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            started_at: now_epoch_secs(),
            pass_running: AtomicBool::new(false),
            last_pass_at: AtomicU64::new(0),
            passes_ok: AtomicU64::new(0),
            passes_failed: AtomicU64::new(0),
        }
    }

    pub fn set_pass_running(&self, v: bool) {
        self.pass_running.store(v, Ordering::Relaxed);
    }

    pub fn record_pass(&self, succeeded: bool) {
        self.last_pass_at.store(now_epoch_secs(), Ordering::Relaxed);
        if succeeded {
            self.passes_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.passes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn pass_running(&self) -> bool {
        self.pass_running.load(Ordering::Relaxed)
    }

    pub fn last_pass_at(&self) -> u64 {
        self.last_pass_at.load(Ordering::Relaxed)
    }

    pub fn passes_ok(&self) -> u64 {
        self.passes_ok.load(Ordering::Relaxed)
    }

    pub fn passes_failed(&self) -> u64 {
        self.passes_failed.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        now_epoch_secs().saturating_sub(self.started_at)
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
