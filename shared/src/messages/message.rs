use serde::{Deserialize, Serialize};

use crate::{EntityId, EntityKind, OwnerKind, Pose, Quat, Sequence, Vec3};

/// Full snapshot of one entity, sent by the side that owns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityStateUpdate {
    pub session_id: u64,
    pub sequence: Sequence,
    pub timestamp_ms: i64,
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
    pub aux_flags: u8,
}

impl EntityStateUpdate {
    pub fn new(
        session_id: u64,
        sequence: Sequence,
        timestamp_ms: i64,
        entity_kind: EntityKind,
        entity_id: EntityId,
        pose: &Pose,
    ) -> Self {
        Self {
            session_id,
            sequence,
            timestamp_ms,
            entity_kind,
            entity_id,
            position: pose.position.to_array(),
            rotation: pose.rotation.to_array(),
            velocity: pose.velocity.to_array(),
            angular_velocity: pose.angular_velocity.to_array(),
            aux_flags: pose.aux_flags,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: Vec3::from(self.position),
            rotation: Quat::from(self.rotation).normalize(),
            velocity: Vec3::from(self.velocity),
            angular_velocity: Vec3::from(self.angular_velocity),
            aux_flags: self.aux_flags,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnershipAction {
    Request,
    Release,
}

/// Client → host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRequest {
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub action: OwnershipAction,
}

/// Host → client. The host's own table is the source of these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipUpdate {
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub owner: OwnerKind,
}

/// A scripted state event observed on one peer and replayed on the other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEvent {
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub event: String,
}

/// The entity was consumed or destroyed and should stop being tracked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRemoved {
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Message {
    StateUpdate(EntityStateUpdate),
    OwnershipRequest(OwnershipRequest),
    OwnershipUpdate(OwnershipUpdate),
    EntityEvent(EntityEvent),
    EntityRemoved(EntityRemoved),
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::StateUpdate(_) => "StateUpdate",
            Message::OwnershipRequest(_) => "OwnershipRequest",
            Message::OwnershipUpdate(_) => "OwnershipUpdate",
            Message::EntityEvent(_) => "EntityEvent",
            Message::EntityRemoved(_) => "EntityRemoved",
        }
    }
}
