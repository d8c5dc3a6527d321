use std::time::Instant;

use crate::{
    sequence::{SequenceCounter, SequenceGate},
    world::world_type::EntityHandle,
    EntityId, EntityKind, OwnerKind, Pose, Role,
};

/// One tracked replicable object.
///
/// The same record serves every [`EntityKind`]; what differs per kind is
/// only configuration (send rate, rebind tolerance) and what the engine's
/// [`PoseSource`](crate::PoseSource) chooses to put in a [`Pose`].
#[derive(Clone, Debug)]
pub struct ReplicatedEntity<H: EntityHandle> {
    id: EntityId,
    kind: EntityKind,
    key: String,
    handle: H,
    owner: OwnerKind,

    // incoming
    sequence_gate: SequenceGate,
    pending_target: Option<Pose>,

    // outgoing
    outgoing_sequence: SequenceCounter,
    last_sent_pose: Option<Pose>,
    last_sent_at: Option<Instant>,

    // ownership polling (client)
    last_request_at: Option<Instant>,

    capability_missing: bool,
}

impl<H: EntityHandle> ReplicatedEntity<H> {
    pub fn new(id: EntityId, kind: EntityKind, key: String, handle: H) -> Self {
        Self {
            id,
            kind,
            key,
            handle,
            owner: OwnerKind::None,
            sequence_gate: SequenceGate::new(),
            pending_target: None,
            outgoing_sequence: SequenceCounter::new(),
            last_sent_pose: None,
            last_sent_at: None,
            last_request_at: None,
            capability_missing: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn owner(&self) -> OwnerKind {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: OwnerKind) {
        self.owner = owner;
    }

    pub fn is_locally_authoritative(&self, role: Role) -> bool {
        self.owner.grants_authority_to(role)
    }

    pub fn last_remote_sequence(&self) -> u32 {
        self.sequence_gate.last()
    }

    pub fn has_remote_state(&self) -> bool {
        self.sequence_gate.has_prior()
    }

    pub(crate) fn accept_sequence(&mut self, sequence: u32) -> bool {
        self.sequence_gate.accept(sequence)
    }

    pub fn pending_target(&self) -> Option<&Pose> {
        self.pending_target.as_ref()
    }

    pub fn has_pending_target(&self) -> bool {
        self.pending_target.is_some()
    }

    pub(crate) fn set_pending_target(&mut self, pose: Pose) {
        self.pending_target = Some(pose);
    }

    pub(crate) fn clear_pending_target(&mut self) {
        self.pending_target = None;
    }

    pub fn last_sent_pose(&self) -> Option<&Pose> {
        self.last_sent_pose.as_ref()
    }

    pub(crate) fn last_sent_at(&self) -> Option<&Instant> {
        self.last_sent_at.as_ref()
    }

    /// Records an outgoing snapshot and returns its sequence.
    pub(crate) fn record_sent(&mut self, pose: Pose, now: &Instant) -> u32 {
        self.last_sent_pose = Some(pose);
        self.last_sent_at = Some(*now);
        self.outgoing_sequence.next()
    }

    pub(crate) fn outgoing_sequence(&self) -> SequenceCounter {
        self.outgoing_sequence
    }

    /// Continues numbering from an earlier record of the same id.
    pub(crate) fn resume_outgoing_sequence(&mut self, counter: SequenceCounter) {
        self.outgoing_sequence = counter;
    }

    pub(crate) fn last_request_at(&self) -> Option<&Instant> {
        self.last_request_at.as_ref()
    }

    pub(crate) fn set_last_request_at(&mut self, now: Option<Instant>) {
        self.last_request_at = now;
    }

    pub fn capability_missing(&self) -> bool {
        self.capability_missing
    }

    pub(crate) fn set_capability_missing(&mut self, missing: bool) {
        self.capability_missing = missing;
    }

    /// Moves the entity to a new id, keeping kind and handle. Sequence,
    /// ownership and smoothing state belonged to the old identity and are dropped.
    pub(crate) fn rekey(&mut self, id: EntityId) {
        let handle = self.handle;
        let kind = self.kind;
        let key = std::mem::take(&mut self.key);
        *self = Self::new(id, kind, key, handle);
    }

    /// Forget everything learned from the network, so the next accepted
    /// update counts as first contact.
    pub(crate) fn reset_remote_state(&mut self) {
        self.sequence_gate.reset();
        self.pending_target = None;
    }

    /// Local simulation takes over: drop any half-applied remote target and
    /// force the next collection pass to send a fresh snapshot.
    pub(crate) fn on_authority_gained(&mut self) {
        self.pending_target = None;
        self.last_sent_pose = None;
        self.last_sent_at = None;
        self.last_request_at = None;
    }
}
