//! Engine-facing seams. The replication core never touches the scene graph
//! directly; everything it needs goes through these traits, implemented by
//! the engine integration layer.

use std::{fmt::Debug, hash::Hash};

use crate::{world::events::state_event_sink::StateEventSink, EntityId, EntityKind, OwnerKind, Pose};

/// Opaque engine reference to one object (scene node, pooled actor, ...).
pub trait EntityHandle: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> EntityHandle for T {}

/// One object found by a [`CandidateScanner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate<H> {
    /// Structural key (path / type / discriminator). Hashed into an [`EntityId`].
    pub key: String,
    pub handle: H,
}

impl<H> Candidate<H> {
    pub fn new(key: impl Into<String>, handle: H) -> Self {
        Self {
            key: key.into(),
            handle,
        }
    }
}

pub trait PoseSource<H: EntityHandle> {
    /// `None` when the object exposes no readable transform.
    fn read_pose(&self, handle: &H) -> Option<Pose>;

    /// Returns `false` when the object exposes no writable transform.
    fn write_pose(&mut self, handle: &H, pose: &Pose) -> bool;
}

pub trait CandidateScanner<H: EntityHandle> {
    fn scan_all(&self, kind: EntityKind) -> Vec<Candidate<H>>;

    /// Whether the handle still refers to a live object.
    fn is_alive(&self, handle: &H) -> bool;
}

pub trait AuthorityHook<H: EntityHandle> {
    /// Called whenever the local view of an entity's owner changes.
    /// `locally_authoritative` tells the engine whether local simulation
    /// should now drive the object (physics on) or follow the network
    /// (kinematic).
    fn on_ownership_changed(
        &mut self,
        entity_id: EntityId,
        handle: &H,
        owner: OwnerKind,
        locally_authoritative: bool,
    );
}

pub trait InteractionPredicate<H: EntityHandle> {
    /// Whether the local participant is actively using the object.
    fn wants_ownership(&self, entity_id: EntityId, kind: EntityKind, handle: &H) -> bool;
}

pub trait StateEventBridge<H: EntityHandle> {
    /// Start forwarding the object's scripted state events into `sink`.
    fn subscribe(&mut self, entity_id: EntityId, handle: &H, sink: StateEventSink);

    /// Fire a named scripted event on the object. Returns `false` if the
    /// object does not know the event.
    ///
    /// A triggered event is expected to come back through the subscribed
    /// sink before the next frame tick, like any local firing would. The
    /// relay swallows exactly that echo; an echo arriving later is sent to
    /// the peer as a new event.
    fn trigger(&mut self, handle: &H, event: &str) -> bool;
}

/// Everything a session needs from the engine, in one bound.
pub trait EngineWorld<H: EntityHandle>:
    PoseSource<H>
    + CandidateScanner<H>
    + AuthorityHook<H>
    + InteractionPredicate<H>
    + StateEventBridge<H>
{
}

impl<H, W> EngineWorld<H> for W
where
    H: EntityHandle,
    W: PoseSource<H>
        + CandidateScanner<H>
        + AuthorityHook<H>
        + InteractionPredicate<H>
        + StateEventBridge<H>,
{
}
