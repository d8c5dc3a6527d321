//! # `ReplicationConfig` – tuning knobs
//!
//! Numeric parameters shared by every component of a session. They are
//! fixed when the session is built and cloned into it; nothing mutates them
//! at run time.

use std::time::Duration;

use crate::{EntityKind, KindTable};

#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    /// Minimum time between two outgoing state updates for one entity.
    pub send_interval: KindTable<Duration>,
    /// Dead-band on position, in world units.
    pub position_threshold: f32,
    /// Dead-band on rotation, in radians.
    pub rotation_threshold: f32,
    /// Positional gap beyond which smoothing snaps instead of sliding.
    pub snap_distance: f32,
    /// Smoothing speed, per second. Each physics tick blends by `rate * dt`, clamped to 1.
    pub convergence_rate: f32,
    /// Gap (units / radians) under which smoothing lands exactly on the target.
    pub settle_epsilon: f32,
    /// Maximum candidate distance accepted by a rebind, per kind.
    pub rebind_tolerance: KindTable<f32>,
    /// Minimum time between repeated ownership requests for one entity.
    pub request_repeat_interval: Duration,
    /// First retry delay after a scan that found nothing. Doubles per attempt.
    pub scan_retry_base: Duration,
    /// Retries after an empty scan before giving up until the next explicit request.
    pub scan_retry_limit: u32,
    /// Period of the background additive scan.
    pub additive_scan_interval: Duration,
    /// Delay of the additive scan scheduled after a failed rebind.
    pub rebind_rescan_delay: Duration,
    /// Collision suffixes tried before a structural key is rejected.
    pub max_key_suffix_attempts: u32,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        let send_interval = KindTable::splat(Duration::from_millis(100))
            .with(EntityKind::Vehicle, Duration::from_millis(50));

        // vehicles can cover a lot of ground between two updates
        let rebind_tolerance = KindTable::splat(3.0)
            .with(EntityKind::Door, 1.0)
            .with(EntityKind::Pickup, 2.0)
            .with(EntityKind::Vehicle, 20.0)
            .with(EntityKind::NpcVehicle, 20.0);

        Self {
            send_interval,
            position_threshold: 0.01,
            rotation_threshold: 0.5_f32.to_radians(),
            snap_distance: 5.0,
            convergence_rate: 10.0,
            settle_epsilon: 0.001,
            rebind_tolerance,
            request_repeat_interval: Duration::from_millis(500),
            scan_retry_base: Duration::from_millis(500),
            scan_retry_limit: 6,
            additive_scan_interval: Duration::from_secs(5),
            rebind_rescan_delay: Duration::from_millis(250),
            max_key_suffix_attempts: 8,
        }
    }
}

impl ReplicationConfig {
    /// Per-tick blend factor for a physics step of `dt` seconds.
    pub fn blend_factor(&self, dt: f32) -> f32 {
        (self.convergence_rate * dt).clamp(0.0, 1.0)
    }

    /// Delay before retry number `attempt` (0-based) of an empty scan.
    pub fn scan_retry_delay(&self, attempt: u32) -> Duration {
        self.scan_retry_base * 2_u32.saturating_pow(attempt.min(16))
    }
}
