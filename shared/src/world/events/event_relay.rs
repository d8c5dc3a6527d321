use std::collections::HashMap;

use log::{debug, warn};

use crate::{
    messages::message::{EntityEvent, Message},
    world::{
        events::state_event_sink::{state_event_channel, StateEventQueue, StateEventSink},
        registry::entity_registry::EntityRegistry,
        world_type::{EntityHandle, StateEventBridge},
    },
    EntityId,
};

/// Forwards scripted state events between peers.
///
/// Events fired locally arrive through the [`StateEventSink`] handed to the
/// engine at subscription time and leave as [`EntityEvent`] messages.
/// Events arriving from the remote peer are replayed with
/// [`StateEventBridge::trigger`]; the engine reporting that replay back
/// into the sink is swallowed once per replay.
pub struct EventRelay {
    sink: StateEventSink,
    queue: StateEventQueue,
    echo_guard: HashMap<(EntityId, String), u32>,
}

impl EventRelay {
    pub fn new() -> Self {
        let (sink, queue) = state_event_channel();
        Self {
            sink,
            queue,
            echo_guard: HashMap::new(),
        }
    }

    /// Hands the engine a sink for `id`.
    pub fn subscribe<H, W>(&self, world: &mut W, id: EntityId, handle: &H)
    where
        H: EntityHandle,
        W: StateEventBridge<H>,
    {
        world.subscribe(id, handle, self.sink.clone());
    }

    /// Drains locally fired events into outgoing messages.
    pub fn collect<H: EntityHandle>(&mut self, registry: &EntityRegistry<H>) -> Vec<Message> {
        let events = match self.queue.try_drain() {
            Ok(events) => events,
            Err(err) => {
                warn!("state events lost: {}", err);
                return Vec::new();
            }
        };

        let mut outgoing = Vec::new();
        for (entity_id, event) in events {
            if self.take_echo(entity_id, &event) {
                continue;
            }
            let Some(entity) = registry.get(&entity_id) else {
                debug!("state event {:?} for untracked entity {}", event, entity_id);
                continue;
            };
            outgoing.push(Message::EntityEvent(EntityEvent {
                entity_kind: entity.kind(),
                entity_id,
                event,
            }));
        }

        // replays the engine never echoed must not eat a later local firing
        if !self.echo_guard.is_empty() {
            debug!("expiring {} unechoed replays", self.echo_guard.len());
            self.echo_guard.clear();
        }
        outgoing
    }

    /// Replays a remote event on the local object.
    pub fn apply<H, W>(&mut self, registry: &EntityRegistry<H>, world: &mut W, message: &EntityEvent)
    where
        H: EntityHandle,
        W: StateEventBridge<H>,
    {
        let Some(entity) = registry.get(&message.entity_id) else {
            debug!(
                "dropping event {:?} for untracked entity {}",
                message.event, message.entity_id
            );
            return;
        };

        *self
            .echo_guard
            .entry((message.entity_id, message.event.clone()))
            .or_insert(0) += 1;

        if !world.trigger(entity.handle(), &message.event) {
            // nothing will fire, so nothing to swallow
            self.take_echo(message.entity_id, &message.event);
            debug!(
                "entity {} has no event {:?}",
                message.entity_id, message.event
            );
        }
    }

    fn take_echo(&mut self, entity_id: EntityId, event: &str) -> bool {
        let key = (entity_id, event.to_string());
        let Some(count) = self.echo_guard.get_mut(&key) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.echo_guard.remove(&key);
        }
        true
    }

    /// Forgets pending echoes for `id`.
    pub fn forget(&mut self, id: &EntityId) {
        self.echo_guard.retain(|(entity_id, _), _| entity_id != id);
    }

    pub fn clear(&mut self) {
        self.echo_guard.clear();
        if let Err(err) = self.queue.try_drain() {
            warn!("could not flush state events: {}", err);
        }
    }
}

impl Default for EventRelay {
    fn default() -> Self {
        Self::new()
    }
}
