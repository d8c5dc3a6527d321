use std::time::Instant;

use log::{debug, warn};

use crate::{
    messages::message::{EntityStateUpdate, Message},
    world::{
        entity::replicated_entity::ReplicatedEntity,
        registry::entity_registry::EntityRegistry,
        world_type::{EntityHandle, PoseSource},
    },
    Pose, ReplicationConfig, Role, Vec3,
};

cfg_if! {
    if #[cfg(feature = "trace_updates")] {
        macro_rules! trace_update {
            ($($arg:tt)*) => { log::debug!($($arg)*) };
        }
    } else {
        macro_rules! trace_update {
            ($($arg:tt)*) => {};
        }
    }
}

/// What happened to one incoming state update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// First accepted update: written straight to the object.
    Snapped,
    /// Stored as the smoothing target.
    Queued,
    /// Not newer than the last accepted sequence.
    Stale,
    /// The local side is authoritative for this entity.
    LocallyAuthoritative,
    /// Stamped with another session's id.
    SessionMismatch,
    /// The entity cannot be written to.
    CapabilityMissing,
    /// No tracked entity has this id.
    UnknownEntity,
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Snapped | ApplyOutcome::Queued)
    }
}

/// Moves poses between the local engine and the wire.
///
/// Outgoing, for entities the local side is authoritative for: rate limited
/// per kind and dead-banded against the last pose sent. Incoming, for
/// everything else: sequence gated, snapped on first contact and smoothed
/// afterwards.
pub struct ReplicationChannel {
    role: Role,
    session_id: u64,
}

impl ReplicationChannel {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            session_id: 0,
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn set_session_id(&mut self, session_id: u64) {
        self.session_id = session_id;
    }

    // Outgoing

    pub fn collect_changes<H, W>(
        &self,
        registry: &mut EntityRegistry<H>,
        world: &W,
        config: &ReplicationConfig,
        now: &Instant,
        timestamp_ms: i64,
    ) -> Vec<Message>
    where
        H: EntityHandle,
        W: PoseSource<H>,
    {
        let mut outgoing = Vec::new();

        for id in registry.authoritative_ids(self.role) {
            let Some(entity) = registry.get_mut(&id) else {
                continue;
            };
            if entity.capability_missing() {
                continue;
            }
            if let Some(last_sent_at) = entity.last_sent_at() {
                if now.saturating_duration_since(*last_sent_at)
                    < config.send_interval.get(entity.kind())
                {
                    continue;
                }
            }

            let Some(mut pose) = world.read_pose(entity.handle()) else {
                Self::mark_capability_missing(entity, "readable");
                continue;
            };
            if !entity.kind().has_velocity() {
                pose.velocity = Vec3::ZERO;
                pose.angular_velocity = Vec3::ZERO;
            }
            if let Some(last_sent) = entity.last_sent_pose() {
                if !pose.differs_from(last_sent, config.position_threshold, config.rotation_threshold)
                {
                    continue;
                }
            }

            let sequence = entity.record_sent(pose, now);
            trace_update!("sending {} #{} seq {}", entity.kind().name(), id, sequence);
            outgoing.push(Message::StateUpdate(EntityStateUpdate::new(
                self.session_id,
                sequence,
                timestamp_ms,
                entity.kind(),
                id,
                &pose,
            )));
        }

        outgoing
    }

    // Incoming

    /// Applies one remote state update. Unknown ids are reported, not
    /// resolved; rebinding is the caller's job.
    pub fn apply_remote<H, W>(
        &self,
        registry: &mut EntityRegistry<H>,
        world: &mut W,
        update: &EntityStateUpdate,
    ) -> ApplyOutcome
    where
        H: EntityHandle,
        W: PoseSource<H>,
    {
        if self.session_id != 0 && update.session_id != self.session_id {
            debug!(
                "dropping update for {} from session {} (local {})",
                update.entity_id, update.session_id, self.session_id
            );
            return ApplyOutcome::SessionMismatch;
        }

        let Some(entity) = registry.get_mut(&update.entity_id) else {
            return ApplyOutcome::UnknownEntity;
        };

        // never let the network override local simulation
        if entity.is_locally_authoritative(self.role) {
            debug!(
                "ignoring update for {}, locally authoritative as {:?}",
                update.entity_id, self.role
            );
            return ApplyOutcome::LocallyAuthoritative;
        }
        if entity.capability_missing() {
            return ApplyOutcome::CapabilityMissing;
        }

        let first_contact = !entity.has_remote_state();
        if !entity.accept_sequence(update.sequence) {
            debug!(
                "dropping stale update for {}: seq {} <= {}",
                update.entity_id,
                update.sequence,
                entity.last_remote_sequence()
            );
            return ApplyOutcome::Stale;
        }

        let pose = update.pose();
        trace_update!(
            "applying {} seq {} at {:?}",
            update.entity_id,
            update.sequence,
            pose.position
        );

        if !first_contact {
            entity.set_pending_target(pose);
            return ApplyOutcome::Queued;
        }

        // no prior pose to slide from
        entity.clear_pending_target();
        if !world.write_pose(entity.handle(), &pose) {
            Self::mark_capability_missing(entity, "writable");
            // snap again once the object becomes writable
            entity.reset_remote_state();
            return ApplyOutcome::CapabilityMissing;
        }
        ApplyOutcome::Snapped
    }

    // Smoothing

    /// One physics-rate smoothing step for every entity with a pending target.
    pub fn smooth<H, W>(
        &self,
        registry: &mut EntityRegistry<H>,
        world: &mut W,
        dt: f32,
        config: &ReplicationConfig,
    ) where
        H: EntityHandle,
        W: PoseSource<H>,
    {
        let blend = config.blend_factor(dt);

        for entity in registry.iter_mut() {
            let Some(target) = entity.pending_target().copied() else {
                continue;
            };
            if entity.is_locally_authoritative(self.role) || entity.capability_missing() {
                entity.clear_pending_target();
                continue;
            }
            let Some(current) = world.read_pose(entity.handle()) else {
                Self::mark_capability_missing(entity, "readable");
                continue;
            };

            let (next, settled) = smoothing_step(&current, &target, blend, config);
            if settled {
                entity.clear_pending_target();
            }
            if !world.write_pose(entity.handle(), &next) {
                Self::mark_capability_missing(entity, "writable");
            }
        }
    }

    fn mark_capability_missing<H: EntityHandle>(entity: &mut ReplicatedEntity<H>, capability: &str) {
        if !entity.capability_missing() {
            warn!(
                "{} {} ({:?}) has no {} pose, excluding it until the next scan",
                entity.kind().name(),
                entity.id(),
                entity.key(),
                capability
            );
        }
        entity.set_capability_missing(true);
        entity.clear_pending_target();
    }
}

/// Computes the pose one smoothing step moves `current` to. Returns the
/// pose and whether it landed on `target`.
pub fn smoothing_step(
    current: &Pose,
    target: &Pose,
    blend: f32,
    config: &ReplicationConfig,
) -> (Pose, bool) {
    if current.position.distance(target.position) > config.snap_distance {
        return (*target, true);
    }

    let next = current.blend_toward(target, blend);
    let settled = next.position.distance(target.position) <= config.settle_epsilon
        && next.rotation.angle_to(target.rotation) <= config.settle_epsilon;
    if settled {
        return (*target, true);
    }
    (next, false)
}
