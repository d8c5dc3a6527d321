//! Ownership Arbitration
//! =====================
//!
//! Decides, per entity, which peer may originate its state. The host holds
//! the authoritative table and is the only side that ever grants; the
//! client mirrors it from `OwnershipUpdate` messages.
//!
//! ## State machine
//! ```text
//!              +----------+
//!     +------->|   None   |<-------+
//!     |        +----+-----+        |
//!     | release     |     release  |
//!     |      claim  |  grant       |
//!     |     +-------+-------+      |
//!     |     v               v      |
//! +---+------+         +----------+--+
//! |   Host   |         |   Client    |
//! +----------+         +-------------+
//! ```
//! There is no edge between `Host` and `Client`. A host claim on a
//! client-owned entity is performed as `Client -> None -> Host`, and the
//! client applies an update that skips `None` the same way, so every
//! observer sees the intermediate state.
//!
//! ## Host precedence
//! The host's own claim is unconditional and a client `Request` is denied
//! while the host owns the entity. Whichever order the two arrive in within
//! one host tick, the result is `Host`.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::{
    messages::message::{Message, OwnershipAction, OwnershipRequest, OwnershipUpdate},
    world::{
        entity::replicated_entity::ReplicatedEntity,
        ownership::error::OwnershipError,
        registry::entity_registry::EntityRegistry,
        world_type::{AuthorityHook, EntityHandle, InteractionPredicate},
    },
    EntityId, OwnerKind, Role,
};

pub struct OwnershipArbiter {
    role: Role,
    request_repeat_interval: Duration,
}

impl OwnershipArbiter {
    pub fn new(role: Role, request_repeat_interval: Duration) -> Self {
        Self {
            role,
            request_repeat_interval,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    // Polling

    /// Evaluates the local "wants ownership" predicate for every tracked
    /// entity and returns the messages that result: requests/releases on the
    /// client, update broadcasts on the host.
    pub fn poll<H, W>(
        &self,
        registry: &mut EntityRegistry<H>,
        world: &mut W,
        now: &Instant,
    ) -> Vec<Message>
    where
        H: EntityHandle,
        W: InteractionPredicate<H> + AuthorityHook<H>,
    {
        let mut outgoing = Vec::new();

        for id in registry.ids() {
            let Some(entity) = registry.get_mut(&id) else {
                continue;
            };
            let wants = world.wants_ownership(id, entity.kind(), entity.handle());
            match self.role {
                Role::Host => self.poll_host(entity, wants, world, &mut outgoing),
                Role::Client => self.poll_client(entity, wants, now, &mut outgoing),
            }
        }

        outgoing
    }

    fn poll_host<H, W>(
        &self,
        entity: &mut ReplicatedEntity<H>,
        wants: bool,
        world: &mut W,
        outgoing: &mut Vec<Message>,
    ) where
        H: EntityHandle,
        W: AuthorityHook<H>,
    {
        let owner = entity.owner();
        if wants && owner != OwnerKind::Host {
            // host never asks permission
            self.transition(entity, OwnerKind::Host, world);
            outgoing.push(Self::update_message(entity));
        } else if !wants && owner == OwnerKind::Host {
            self.transition(entity, OwnerKind::None, world);
            outgoing.push(Self::update_message(entity));
        }
    }

    fn poll_client<H: EntityHandle>(
        &self,
        entity: &mut ReplicatedEntity<H>,
        wants: bool,
        now: &Instant,
        outgoing: &mut Vec<Message>,
    ) {
        let owner = entity.owner();
        let action = if wants && owner != OwnerKind::Client {
            OwnershipAction::Request
        } else if !wants && owner == OwnerKind::Client {
            OwnershipAction::Release
        } else {
            // settled, or the request was abandoned
            entity.set_last_request_at(None);
            return;
        };

        if let Some(last) = entity.last_request_at() {
            if now.saturating_duration_since(*last) < self.request_repeat_interval {
                return;
            }
        }
        entity.set_last_request_at(Some(*now));

        outgoing.push(Message::OwnershipRequest(OwnershipRequest {
            entity_kind: entity.kind(),
            entity_id: entity.id(),
            action,
        }));
    }

    // Incoming

    /// Host side: answers a client's request. Returns the update to
    /// broadcast, or `None` when the request is denied or a no-op.
    pub fn try_handle_request<H, W>(
        &self,
        registry: &mut EntityRegistry<H>,
        world: &mut W,
        request: &OwnershipRequest,
    ) -> Result<Option<Message>, OwnershipError>
    where
        H: EntityHandle,
        W: AuthorityHook<H>,
    {
        if self.role != Role::Host {
            return Err(OwnershipError::WrongRole {
                role: self.role,
                operation: "answer an ownership request",
            });
        }
        let entity = registry
            .get_mut(&request.entity_id)
            .ok_or(OwnershipError::EntityNotTracked {
                entity_id: request.entity_id,
                operation: "answer an ownership request",
            })?;

        let owner = entity.owner();
        match request.action {
            OwnershipAction::Request => match owner {
                OwnerKind::Host => {
                    debug!("denied ownership of {} to client, host owns it", entity.id());
                    return Ok(None);
                }
                // re-announce, the client may have missed the first update
                OwnerKind::Client => {}
                OwnerKind::None => {
                    self.transition(entity, OwnerKind::Client, world);
                    info!("granted ownership of {} to client", entity.id());
                }
            },
            OwnershipAction::Release => {
                if owner != OwnerKind::Client {
                    debug!("ignored release of {} not held by client", entity.id());
                    return Ok(None);
                }
                self.transition(entity, OwnerKind::None, world);
            }
        }

        Ok(Some(Self::update_message(entity)))
    }

    /// Client side: mirrors the host's ownership table.
    pub fn try_handle_update<H, W>(
        &self,
        registry: &mut EntityRegistry<H>,
        world: &mut W,
        update: &OwnershipUpdate,
    ) -> Result<(), OwnershipError>
    where
        H: EntityHandle,
        W: AuthorityHook<H>,
    {
        if self.role != Role::Client {
            return Err(OwnershipError::WrongRole {
                role: self.role,
                operation: "apply an ownership update",
            });
        }
        let entity = registry
            .get_mut(&update.entity_id)
            .ok_or(OwnershipError::EntityNotTracked {
                entity_id: update.entity_id,
                operation: "apply an ownership update",
            })?;

        self.transition(entity, update.owner, world);
        Ok(())
    }

    // Resets

    /// Drops `id` back to `None` ahead of a rekey or rescan that would
    /// otherwise discard its owner silently. Returns what the peer needs to
    /// hear: the new owner from the host, a release from a client that held it.
    pub fn reset_owner<H, W>(
        &self,
        registry: &mut EntityRegistry<H>,
        world: &mut W,
        id: &EntityId,
    ) -> Option<Message>
    where
        H: EntityHandle,
        W: AuthorityHook<H>,
    {
        let entity = registry.get_mut(id)?;
        let owner = entity.owner();
        if owner.is_none() {
            return None;
        }
        self.transition(entity, OwnerKind::None, world);

        match self.role {
            Role::Host => Some(Self::update_message(entity)),
            Role::Client if owner == OwnerKind::Client => {
                Some(Message::OwnershipRequest(OwnershipRequest {
                    entity_kind: entity.kind(),
                    entity_id: entity.id(),
                    action: OwnershipAction::Release,
                }))
            }
            Role::Client => None,
        }
    }

    /// [`Self::reset_owner`] for every tracked entity.
    pub fn reset_all<H, W>(&self, registry: &mut EntityRegistry<H>, world: &mut W) -> Vec<Message>
    where
        H: EntityHandle,
        W: AuthorityHook<H>,
    {
        registry
            .ids()
            .iter()
            .filter_map(|id| self.reset_owner(registry, world, id))
            .collect()
    }

    // Transitions

    fn transition<H, W>(&self, entity: &mut ReplicatedEntity<H>, to: OwnerKind, world: &mut W)
    where
        H: EntityHandle,
        W: AuthorityHook<H>,
    {
        let from = entity.owner();
        if from == to {
            return;
        }
        if !from.is_none() && !to.is_none() {
            self.apply(entity, OwnerKind::None, world);
        }
        self.apply(entity, to, world);
    }

    fn apply<H, W>(&self, entity: &mut ReplicatedEntity<H>, owner: OwnerKind, world: &mut W)
    where
        H: EntityHandle,
        W: AuthorityHook<H>,
    {
        let was_authoritative = entity.is_locally_authoritative(self.role);
        entity.set_owner(owner);
        let is_authoritative = entity.is_locally_authoritative(self.role);

        if is_authoritative && !was_authoritative {
            entity.on_authority_gained();
        }

        world.on_ownership_changed(entity.id(), entity.handle(), owner, is_authoritative);
    }

    fn update_message<H: EntityHandle>(entity: &ReplicatedEntity<H>) -> Message {
        Message::OwnershipUpdate(OwnershipUpdate {
            entity_kind: entity.kind(),
            entity_id: entity.id(),
            owner: entity.owner(),
        })
    }
}
