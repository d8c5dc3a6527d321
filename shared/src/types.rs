use serde::{Deserialize, Serialize};

/// Stable identifier of a replicated entity, shared by both peers.
pub type EntityId = u32;

/// Per-entity update counter. `0` means "no sequence".
pub type Sequence = u32;

/// Which side of the session this process is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Host,
    Client,
}

impl Role {
    pub fn as_owner(self) -> OwnerKind {
        match self {
            Role::Host => OwnerKind::Host,
            Role::Client => OwnerKind::Client,
        }
    }
}

/// Who currently originates truth for an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerKind {
    #[default]
    None,
    Host,
    Client,
}

impl OwnerKind {
    pub fn is_none(&self) -> bool {
        *self == OwnerKind::None
    }

    /// Whether `role` may originate state for an entity owned by `self`.
    /// Unowned entities are simulated by the host.
    pub fn grants_authority_to(&self, role: Role) -> bool {
        match self {
            OwnerKind::None => role == Role::Host,
            OwnerKind::Host => role == Role::Host,
            OwnerKind::Client => role == Role::Client,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Door,
    Vehicle,
    Pickup,
    NpcActor,
    NpcVehicle,
}

impl EntityKind {
    pub const COUNT: usize = 5;

    /// Scan order. Both peers must iterate kinds identically so ids line up.
    pub const ALL: [EntityKind; EntityKind::COUNT] = [
        EntityKind::Door,
        EntityKind::Vehicle,
        EntityKind::Pickup,
        EntityKind::NpcActor,
        EntityKind::NpcVehicle,
    ];

    pub fn index(self) -> usize {
        match self {
            EntityKind::Door => 0,
            EntityKind::Vehicle => 1,
            EntityKind::Pickup => 2,
            EntityKind::NpcActor => 3,
            EntityKind::NpcVehicle => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Door => "door",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Pickup => "pickup",
            EntityKind::NpcActor => "npc_actor",
            EntityKind::NpcVehicle => "npc_vehicle",
        }
    }

    /// Kinds that carry a physics body and therefore replicate velocities.
    pub fn has_velocity(self) -> bool {
        !matches!(self, EntityKind::Door)
    }
}

/// A fixed table with one slot per [`EntityKind`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KindTable<T> {
    slots: [T; EntityKind::COUNT],
}

impl<T: Copy> KindTable<T> {
    pub fn splat(value: T) -> Self {
        Self {
            slots: [value; EntityKind::COUNT],
        }
    }

    pub fn get(&self, kind: EntityKind) -> T {
        self.slots[kind.index()]
    }

    pub fn set(&mut self, kind: EntityKind, value: T) {
        self.slots[kind.index()] = value;
    }

    pub fn with(mut self, kind: EntityKind, value: T) -> Self {
        self.set(kind, value);
        self
    }
}
