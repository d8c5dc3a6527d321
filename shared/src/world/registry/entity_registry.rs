use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use crate::{
    sequence::SequenceCounter,
    world::{
        entity::replicated_entity::ReplicatedEntity,
        registry::{
            error::RegistryError,
            structural_key::{hash_structural_key, suffixed_key},
        },
        world_type::{Candidate, CandidateScanner, EntityHandle},
    },
    EntityId, EntityKind, Role,
};

/// Outcome of one scan pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Candidates returned by the scanner, across all kinds.
    pub candidates: usize,
    /// Ids of newly tracked entities, in registration order.
    pub added: Vec<EntityId>,
    /// Candidates dropped because their key could not be disambiguated.
    pub rejected: usize,
}

impl ScanReport {
    pub fn found_nothing(&self) -> bool {
        self.candidates == 0
    }
}

/// The single id → entity map of a session.
pub struct EntityRegistry<H: EntityHandle> {
    entities: HashMap<EntityId, ReplicatedEntity<H>>,
    handle_to_id: HashMap<H, EntityId>,
    // outgoing counters of ids no longer tracked; the peer's gate still
    // remembers them, so a re-registered id continues where it stopped
    sent_sequences: HashMap<EntityId, SequenceCounter>,
    max_key_suffix_attempts: u32,
}

impl<H: EntityHandle> EntityRegistry<H> {
    pub fn new(max_key_suffix_attempts: u32) -> Self {
        Self {
            entities: HashMap::new(),
            handle_to_id: HashMap::new(),
            sent_sequences: HashMap::new(),
            max_key_suffix_attempts,
        }
    }

    // Registration

    /// Hashes `key` into an id and starts tracking `handle` under it.
    ///
    /// On collision the key is suffixed deterministically (`key#1`, `key#2`, ...)
    /// so two peers registering the same candidates in the same order agree on ids.
    pub fn register(
        &mut self,
        key: &str,
        kind: EntityKind,
        handle: H,
    ) -> Result<EntityId, RegistryError> {
        if let Some(entity_id) = self.handle_to_id.get(&handle) {
            return Err(RegistryError::HandleAlreadyTracked {
                entity_id: *entity_id,
            });
        }

        for attempt in 0..=self.max_key_suffix_attempts {
            let id = hash_structural_key(&suffixed_key(key, attempt));
            // 0 doubles as "no entity" in collaborator logs
            if id == 0 || self.entities.contains_key(&id) {
                continue;
            }
            if attempt > 0 {
                debug!("key {:?} collided, registered with suffix #{}", key, attempt);
            }
            self.insert(ReplicatedEntity::new(id, kind, key.to_string(), handle));
            return Ok(id);
        }

        Err(RegistryError::DuplicateKey {
            key: key.to_string(),
            attempts: self.max_key_suffix_attempts,
        })
    }

    /// Tracks `handle` under an id chosen by the remote peer.
    pub fn bind(
        &mut self,
        id: EntityId,
        kind: EntityKind,
        key: &str,
        handle: H,
    ) -> Result<(), RegistryError> {
        if self.entities.contains_key(&id) {
            return Err(RegistryError::IdAlreadyTracked { entity_id: id });
        }
        if let Some(entity_id) = self.handle_to_id.get(&handle) {
            return Err(RegistryError::HandleAlreadyTracked {
                entity_id: *entity_id,
            });
        }
        self.insert(ReplicatedEntity::new(id, kind, key.to_string(), handle));
        Ok(())
    }

    /// Moves a tracked entity to `new_id`, dropping its sequence and ownership state.
    pub fn rekey(&mut self, old_id: EntityId, new_id: EntityId) -> Result<(), RegistryError> {
        if old_id == new_id {
            return Ok(());
        }
        if self.entities.contains_key(&new_id) {
            return Err(RegistryError::IdAlreadyTracked { entity_id: new_id });
        }
        let mut entity = self
            .entities
            .remove(&old_id)
            .ok_or(RegistryError::EntityNotFound { entity_id: old_id })?;
        self.retire_sequence(&entity);
        entity.rekey(new_id);
        self.insert(entity);
        Ok(())
    }

    fn insert(&mut self, mut entity: ReplicatedEntity<H>) {
        if let Some(counter) = self.sent_sequences.remove(&entity.id()) {
            entity.resume_outgoing_sequence(counter);
        }
        self.handle_to_id.insert(*entity.handle(), entity.id());
        self.entities.insert(entity.id(), entity);
    }

    fn retire_sequence(&mut self, entity: &ReplicatedEntity<H>) {
        if entity.outgoing_sequence().current() > 0 {
            self.sent_sequences
                .insert(entity.id(), entity.outgoing_sequence());
        }
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<ReplicatedEntity<H>> {
        let entity = self.entities.remove(id)?;
        self.handle_to_id.remove(entity.handle());
        self.retire_sequence(&entity);
        Some(entity)
    }

    /// Stops tracking everything. Outgoing sequences are kept until
    /// [`Self::forget_sent_sequences`].
    pub fn clear(&mut self) {
        let entities = std::mem::take(&mut self.entities);
        for entity in entities.values() {
            self.retire_sequence(entity);
        }
        self.handle_to_id.clear();
    }

    /// Starts every id's outgoing sequence from scratch. Only safe once the
    /// peer has dropped its own state too, i.e. for a new session.
    pub fn forget_sent_sequences(&mut self) {
        self.sent_sequences.clear();
    }

    // Scanning

    /// Drops every tracked entity, with its ownership and sequence state,
    /// and rediscovers all candidates.
    pub fn full_scan(&mut self, scanner: &dyn CandidateScanner<H>) -> ScanReport {
        self.clear();
        let report = self.scan_into(scanner);
        if report.found_nothing() {
            info!("full scan found no candidates, scene may still be loading");
        } else {
            info!(
                "full scan tracked {} of {} candidates ({} rejected)",
                report.added.len(),
                report.candidates,
                report.rejected
            );
        }
        report
    }

    /// Tracks candidates whose handles are not tracked yet, leaving existing
    /// entities untouched.
    pub fn additive_scan(&mut self, scanner: &dyn CandidateScanner<H>) -> ScanReport {
        let report = self.scan_into(scanner);
        if !report.added.is_empty() {
            info!("additive scan picked up {} new entities", report.added.len());
        }
        report
    }

    fn scan_into(&mut self, scanner: &dyn CandidateScanner<H>) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen: HashSet<H> = HashSet::new();

        for kind in EntityKind::ALL {
            let mut candidates: Vec<Candidate<H>> = scanner.scan_all(kind);
            report.candidates += candidates.len();

            // both peers must register in the same order to derive the same ids
            candidates.sort_by(|a, b| a.key.cmp(&b.key));

            for candidate in candidates {
                if !seen.insert(candidate.handle) || self.handle_to_id.contains_key(&candidate.handle)
                {
                    continue;
                }
                match self.register(&candidate.key, kind, candidate.handle) {
                    Ok(id) => report.added.push(id),
                    Err(err) => {
                        warn!("skipping {} candidate: {}", kind.name(), err);
                        report.rejected += 1;
                    }
                }
            }
        }

        report
    }

    /// Removes entities whose handle the scanner no longer considers alive.
    pub fn prune(&mut self, scanner: &dyn CandidateScanner<H>) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| !scanner.is_alive(entity.handle()))
            .map(|entity| entity.id())
            .collect();

        for id in &dead {
            self.remove(id);
        }
        if !dead.is_empty() {
            info!("pruned {} entities with invalid handles", dead.len());
        }

        dead
    }

    // Sequence gate

    /// Records `sequence` for `id` if it is newer than anything accepted
    /// before. Unknown ids are never accepted.
    pub fn accept_sequence(&mut self, id: &EntityId, sequence: u32) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) => entity.accept_sequence(sequence),
            None => false,
        }
    }

    // Queries

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&ReplicatedEntity<H>> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut ReplicatedEntity<H>> {
        self.entities.get_mut(id)
    }

    pub fn try_get(&self, id: &EntityId) -> Result<&ReplicatedEntity<H>, RegistryError> {
        self.entities
            .get(id)
            .ok_or(RegistryError::EntityNotFound { entity_id: *id })
    }

    pub fn id_for_handle(&self, handle: &H) -> Option<EntityId> {
        self.handle_to_id.get(handle).copied()
    }

    /// Tracked ids in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplicatedEntity<H>> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ReplicatedEntity<H>> {
        self.entities.values_mut()
    }

    /// Ids the local side originates state for.
    pub fn authoritative_ids(&self, role: Role) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| entity.is_locally_authoritative(role))
            .map(|entity| entity.id())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
