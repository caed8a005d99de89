use std::sync::atomic::{AtomicU64, Ordering};
use crate::stores::sessions::RegistrationSessions;
use chrono::Utc;
use serde::Serialize;

pub struct Metrics {
    pub events_handled: AtomicU64,
    pub handler_errors: AtomicU64,
    pub checkins_recorded: AtomicU64,
    pub duplicate_checkins: AtomicU64,
    pub registrations_completed: AtomicU64,
    pub deliveries_ok: AtomicU64,
    pub deliveries_failed: AtomicU64,
    pub jobs_run: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub events_handled: u64,
    pub handler_errors: u64,
    pub checkins_recorded: u64,
    pub duplicate_checkins: u64,
    pub registrations_completed: u64,
    pub registrations_in_progress: usize,
    pub deliveries_ok: u64,
    pub deliveries_failed: u64,
    pub delivery_success_rate: f64,
    pub jobs_run: u64,
    pub uptime_seconds: i64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_handled: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            checkins_recorded: AtomicU64::new(0),
            duplicate_checkins: AtomicU64::new(0),
            registrations_completed: AtomicU64::new(0),
            deliveries_ok: AtomicU64::new(0),
            deliveries_failed: AtomicU64::new(0),
            jobs_run: AtomicU64::new(0),
            start_time: Utc::now().timestamp(),
        }
    }

    pub fn increment_events(&self) {
        self.events_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_handler_errors(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a check-in attempt that reached the store
    pub fn record_checkin(&self, newly_recorded: bool) {
        if newly_recorded {
            self.checkins_recorded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.duplicate_checkins.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_registrations(&self) {
        self.registrations_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self, ok: bool) {
        if ok {
            self.deliveries_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deliveries_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn increment_jobs(&self) {
        self.jobs_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self, sessions: &RegistrationSessions) -> MetricsSnapshot {
        let deliveries_ok = self.deliveries_ok.load(Ordering::Relaxed);
        let deliveries_failed = self.deliveries_failed.load(Ordering::Relaxed);
        let total_deliveries = deliveries_ok + deliveries_failed;

        let delivery_success_rate = if total_deliveries > 0 {
            (deliveries_ok as f64 / total_deliveries as f64) * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            events_handled: self.events_handled.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            checkins_recorded: self.checkins_recorded.load(Ordering::Relaxed),
            duplicate_checkins: self.duplicate_checkins.load(Ordering::Relaxed),
            registrations_completed: self.registrations_completed.load(Ordering::Relaxed),
            registrations_in_progress: sessions.len(),
            deliveries_ok,
            deliveries_failed,
            delivery_success_rate,
            jobs_run: self.jobs_run.load(Ordering::Relaxed),
            uptime_seconds: Utc::now().timestamp() - self.start_time,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
