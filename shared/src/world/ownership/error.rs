use thiserror::Error;

use crate::{EntityId, Role};

/// Errors that can occur while arbitrating ownership
///
/// These are reported to the caller for logging; an ownership message that
/// cannot be processed is dropped and the next poll re-evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnershipError {
    /// The message names an entity that is not tracked locally
    #[error("Cannot {operation} for entity {entity_id} - entity not tracked")]
    EntityNotTracked {
        entity_id: EntityId,
        operation: &'static str,
    },

    /// The message is only meaningful on the other side of the session
    #[error("Cannot {operation} as {role:?}")]
    WrongRole {
        role: Role,
        operation: &'static str,
    },
}
