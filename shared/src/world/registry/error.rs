use thiserror::Error;

use crate::EntityId;

/// Errors that can occur while tracking entities
///
/// None of these are fatal for a session: the caller logs and skips the
/// affected candidate or message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Every suffixed variant of the structural key collided with a tracked id
    #[error("Structural key {key:?} still collides after {attempts} suffix attempts")]
    DuplicateKey { key: String, attempts: u32 },

    /// No entity is tracked under the given id
    #[error("Entity {entity_id} is not tracked")]
    EntityNotFound { entity_id: EntityId },

    /// Attempted to bind an id that is already in use
    #[error("Entity id {entity_id} is already tracked")]
    IdAlreadyTracked { entity_id: EntityId },

    /// Attempted to bind a handle that already belongs to another entity
    #[error("Handle is already tracked as entity {entity_id}")]
    HandleAlreadyTracked { entity_id: EntityId },
}
