use std::time::Instant;

use log::{info, warn};

use crate::ReplicationConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanAction {
    Full,
    Additive,
}

/// Decides when the registry rescans: explicit full scans, backoff retries
/// after an empty scene, periodic additive scans and near-term additive
/// scans requested by the rebind path.
#[derive(Debug, Default)]
pub struct ScanSchedule {
    full_requested: bool,
    retry_at: Option<Instant>,
    retries_used: u32,
    next_periodic: Option<Instant>,
    additive_at: Option<Instant>,
}

impl ScanSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_full_scan(&mut self) {
        self.full_requested = true;
        self.retries_used = 0;
        self.retry_at = None;
    }

    /// Asks for an additive scan no later than `at`.
    pub fn request_additive_scan(&mut self, at: Instant) {
        self.additive_at = Some(match self.additive_at {
            Some(existing) if existing <= at => existing,
            _ => at,
        });
    }

    pub fn full_scan_pending(&self) -> bool {
        self.full_requested || self.retry_at.is_some()
    }

    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }

    pub fn due(&self, now: &Instant) -> Option<ScanAction> {
        if self.full_requested {
            return Some(ScanAction::Full);
        }
        if let Some(retry_at) = &self.retry_at {
            if retry_at <= now {
                return Some(ScanAction::Full);
            }
        }
        let additive_due = self.additive_at.map_or(false, |at| at <= *now)
            || self.next_periodic.map_or(false, |at| at <= *now);
        if additive_due {
            return Some(ScanAction::Additive);
        }
        None
    }

    pub fn on_full_scan(&mut self, now: &Instant, found: usize, config: &ReplicationConfig) {
        self.full_requested = false;
        self.additive_at = None;
        self.next_periodic = Some(*now + config.additive_scan_interval);

        if found > 0 {
            self.retry_at = None;
            self.retries_used = 0;
            return;
        }

        if self.retries_used >= config.scan_retry_limit {
            warn!(
                "no candidates after {} scan retries, waiting for an explicit rescan",
                self.retries_used
            );
            self.retry_at = None;
            return;
        }

        let delay = config.scan_retry_delay(self.retries_used);
        self.retries_used += 1;
        info!(
            "scheduling scan retry {}/{} in {:?}",
            self.retries_used, config.scan_retry_limit, delay
        );
        self.retry_at = Some(*now + delay);
    }

    pub fn on_additive_scan(&mut self, now: &Instant, config: &ReplicationConfig) {
        self.additive_at = None;
        self.next_periodic = Some(*now + config.additive_scan_interval);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
