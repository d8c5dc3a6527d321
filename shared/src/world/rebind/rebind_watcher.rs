use std::collections::HashSet;

use log::{info, warn};

use crate::{
    messages::message::{EntityStateUpdate, Message},
    world::{
        ownership::ownership_arbiter::OwnershipArbiter,
        registry::entity_registry::EntityRegistry,
        world_type::{AuthorityHook, Candidate, CandidateScanner, EntityHandle, PoseSource},
    },
    EntityId, EntityKind, ReplicationConfig, Vec3,
};

/// Result of trying to resolve an id the remote peer knows and we don't.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebindOutcome {
    /// An untracked candidate now lives under the remote id.
    Bound,
    /// An already tracked candidate was moved from `from` to the remote id.
    Rekeyed { from: EntityId },
    /// Nothing matched. The message is dropped and a rescan should follow.
    Deferred,
}

impl RebindOutcome {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, RebindOutcome::Deferred)
    }
}

/// Recovers from entity ids that stopped matching between peers (pooled
/// objects, reparented nodes, late spawns) by pairing the remote id with
/// the nearest local candidate of the same kind.
#[derive(Default)]
pub struct RebindWatcher {
    // one warning per id until the next successful scan
    warned: HashSet<EntityId>,
}

impl RebindWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A rekeyed entity loses its owner. The reset goes through `arbiter`
    /// so the engine is told, and anything the peer must hear about it is
    /// pushed to `outgoing`.
    pub fn try_rebind<H, W>(
        &mut self,
        registry: &mut EntityRegistry<H>,
        world: &mut W,
        arbiter: &OwnershipArbiter,
        update: &EntityStateUpdate,
        config: &ReplicationConfig,
        outgoing: &mut Vec<Message>,
    ) -> RebindOutcome
    where
        H: EntityHandle,
        W: CandidateScanner<H> + PoseSource<H> + AuthorityHook<H>,
    {
        let id = update.entity_id;
        let kind = update.entity_kind;
        let tolerance = config.rebind_tolerance.get(kind);

        let Some((candidate, distance)) = Self::nearest_candidate(&*world, kind, update.position())
            .filter(|(_, distance)| *distance <= tolerance)
        else {
            self.warn_unknown(id, kind.name());
            return RebindOutcome::Deferred;
        };

        let outcome = match registry.id_for_handle(&candidate.handle) {
            Some(existing) => {
                outgoing.extend(arbiter.reset_owner(registry, world, &existing));
                registry
                    .rekey(existing, id)
                    .map(|_| RebindOutcome::Rekeyed { from: existing })
            }
            None => registry
                .bind(id, kind, &candidate.key, candidate.handle)
                .map(|_| RebindOutcome::Bound),
        };

        match outcome {
            Ok(outcome) => {
                info!(
                    "rebound {} {:?} to id {} ({:.2} units away): {:?}",
                    kind.name(),
                    candidate.key,
                    id,
                    distance,
                    outcome
                );
                self.warned.remove(&id);
                outcome
            }
            Err(err) => {
                warn!("could not rebind {} to id {}: {}", kind.name(), id, err);
                RebindOutcome::Deferred
            }
        }
    }

    fn nearest_candidate<H, W>(
        world: &W,
        kind: EntityKind,
        target: Vec3,
    ) -> Option<(Candidate<H>, f32)>
    where
        H: EntityHandle,
        W: CandidateScanner<H> + PoseSource<H>,
    {
        world
            .scan_all(kind)
            .into_iter()
            .filter_map(|candidate| {
                let pose = world.read_pose(&candidate.handle)?;
                let distance = pose.position.distance(target);
                Some((candidate, distance))
            })
            .min_by(|(a_candidate, a), (b_candidate, b)| {
                a.total_cmp(b)
                    .then_with(|| a_candidate.key.cmp(&b_candidate.key))
            })
    }

    /// Logs an unresolvable id, once until [`Self::on_scan_succeeded`].
    pub fn warn_unknown(&mut self, id: EntityId, context: &str) {
        if self.warned.insert(id) {
            warn!("received {} message for unknown entity {}, waiting for a rescan", context, id);
        }
    }

    pub fn on_scan_succeeded(&mut self) {
        self.warned.clear();
    }

    pub fn clear(&mut self) {
        self.warned.clear();
    }
}
