//! # Tandem Shared
//! Replicated entity state with host-arbitrated ownership, shared by both
//! sides of a two-peer session.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

mod config;
mod messages;
mod sequence;
mod session;
mod types;
mod world;

pub use config::ReplicationConfig;
pub use messages::{
    codec,
    error::CodecError,
    message::{
        EntityEvent, EntityRemoved, EntityStateUpdate, Message, OwnershipAction,
        OwnershipRequest, OwnershipUpdate,
    },
    transport::Transport,
};
pub use sequence::{is_newer_sequence, SequenceCounter, SequenceGate};
pub use session::ReplicationSession;
pub use types::{EntityId, EntityKind, KindTable, OwnerKind, Role, Sequence};
pub use world::{
    entity::replicated_entity::ReplicatedEntity,
    events::{
        error::StateEventError,
        event_relay::EventRelay,
        state_event_sink::{state_event_channel, StateEventQueue, StateEventSink},
    },
    ownership::{error::OwnershipError, ownership_arbiter::OwnershipArbiter},
    pose::{Pose, Quat, Vec3},
    rebind::rebind_watcher::{RebindOutcome, RebindWatcher},
    registry::{
        entity_registry::{EntityRegistry, ScanReport},
        error::RegistryError,
        scan_schedule::{ScanAction, ScanSchedule},
        structural_key::hash_structural_key,
    },
    replication::replication_channel::{smoothing_step, ApplyOutcome, ReplicationChannel},
    world_type::{
        AuthorityHook, Candidate, CandidateScanner, EngineWorld, EntityHandle,
        InteractionPredicate, PoseSource, StateEventBridge,
    },
};
