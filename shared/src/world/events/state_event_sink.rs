use std::{
    collections::VecDeque,
    sync::{Arc, RwLock},
};

use log::warn;

use crate::{world::events::error::StateEventError, EntityId};

// StateEventChannel
#[derive(Clone)]
struct StateEventChannel {
    data: Arc<RwLock<VecDeque<(EntityId, String)>>>,
}

impl StateEventChannel {
    fn new_channel() -> (StateEventSink, StateEventQueue) {
        let channel = Self {
            data: Arc::new(RwLock::new(VecDeque::new())),
        };

        let sink = StateEventSink {
            channel: channel.clone(),
        };
        let queue = StateEventQueue { channel };

        (sink, queue)
    }

    fn try_push(&self, entity_id: EntityId, event: String) -> Result<(), StateEventError> {
        let mut data = self
            .data
            .as_ref()
            .write()
            .map_err(|_| StateEventError::SinkLockPoisoned)?;
        data.push_back((entity_id, event));
        Ok(())
    }

    fn try_drain(&self) -> Result<Vec<(EntityId, String)>, StateEventError> {
        let mut data = self
            .data
            .as_ref()
            .write()
            .map_err(|_| StateEventError::SinkLockPoisoned)?;
        Ok(data.drain(..).collect())
    }

    fn try_len(&self) -> Result<usize, StateEventError> {
        let data = self
            .data
            .as_ref()
            .read()
            .map_err(|_| StateEventError::SinkLockPoisoned)?;
        Ok(data.len())
    }
}

/// Creates a connected sink/queue pair.
pub fn state_event_channel() -> (StateEventSink, StateEventQueue) {
    StateEventChannel::new_channel()
}

// StateEventSink

/// Writer half, handed to the engine layer through
/// [`StateEventBridge::subscribe`](crate::StateEventBridge::subscribe).
/// Cloning it is cheap and every clone feeds the same queue.
#[derive(Clone)]
pub struct StateEventSink {
    channel: StateEventChannel,
}

impl StateEventSink {
    /// Report that `event` fired on `entity_id`.
    ///
    /// Returns an error if the lock is poisoned.
    pub fn try_push(&self, entity_id: EntityId, event: impl Into<String>) -> Result<(), StateEventError> {
        self.channel.try_push(entity_id, event.into())
    }

    /// Report that `event` fired on `entity_id`, logging instead of failing
    /// if the queue is unusable.
    pub fn push(&self, entity_id: EntityId, event: impl Into<String>) {
        if let Err(err) = self.try_push(entity_id, event) {
            warn!("dropped state event for entity {}: {}", entity_id, err);
        }
    }
}

// StateEventQueue

/// Reader half, owned by the relay.
pub struct StateEventQueue {
    channel: StateEventChannel,
}

impl StateEventQueue {
    /// Takes every queued event, oldest first.
    pub fn try_drain(&self) -> Result<Vec<(EntityId, String)>, StateEventError> {
        self.channel.try_drain()
    }

    pub fn try_len(&self) -> Result<usize, StateEventError> {
        self.channel.try_len()
    }
}
