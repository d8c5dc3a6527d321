use std::time::Instant;

use log::{debug, info};

use crate::{
    messages::{
        message::{EntityRemoved, EntityStateUpdate, Message, OwnershipRequest, OwnershipUpdate},
        transport::Transport,
    },
    world::{
        events::event_relay::EventRelay,
        ownership::{error::OwnershipError, ownership_arbiter::OwnershipArbiter},
        rebind::rebind_watcher::RebindWatcher,
        registry::{
            entity_registry::EntityRegistry,
            scan_schedule::{ScanAction, ScanSchedule},
        },
        replication::replication_channel::{ApplyOutcome, ReplicationChannel},
        world_type::{EngineWorld, EntityHandle},
    },
    EntityId, OwnerKind, ReplicationConfig, Role,
};

/// One side of a replication session.
///
/// Owns every piece of session-scoped state and drives it from two entry
/// points: [`frame_tick`](Self::frame_tick) at frame rate and
/// [`physics_tick`](Self::physics_tick) at the fixed physics rate. The
/// engine is reached only through the `world` argument, the peer only
/// through the `transport` argument.
pub struct ReplicationSession<H: EntityHandle> {
    role: Role,
    config: ReplicationConfig,
    registry: EntityRegistry<H>,
    arbiter: OwnershipArbiter,
    channel: ReplicationChannel,
    rebind_watcher: RebindWatcher,
    event_relay: EventRelay,
    scan_schedule: ScanSchedule,
    outbox: Vec<Message>,
    epoch: Option<Instant>,
}

impl<H: EntityHandle> ReplicationSession<H> {
    /// Creates a session with a full scan pending for the first frame tick.
    pub fn new(role: Role, config: ReplicationConfig) -> Self {
        let mut scan_schedule = ScanSchedule::new();
        scan_schedule.request_full_scan();

        Self {
            role,
            registry: EntityRegistry::new(config.max_key_suffix_attempts),
            arbiter: OwnershipArbiter::new(role, config.request_repeat_interval),
            channel: ReplicationChannel::new(role),
            rebind_watcher: RebindWatcher::new(),
            event_relay: EventRelay::new(),
            scan_schedule,
            outbox: Vec::new(),
            epoch: None,
            config,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    pub fn session_id(&self) -> u64 {
        self.channel.session_id()
    }

    pub fn set_session_id(&mut self, session_id: u64) {
        self.channel.set_session_id(session_id);
    }

    // Ticks

    pub fn frame_tick<W, T>(&mut self, now: &Instant, world: &mut W, transport: &mut T)
    where
        W: EngineWorld<H>,
        T: Transport,
    {
        let timestamp_ms = self.timestamp_ms(now);

        self.run_scheduled_scans(now, world);

        let mut outgoing = std::mem::take(&mut self.outbox);
        outgoing.extend(self.arbiter.poll(&mut self.registry, world, now));
        outgoing.extend(self.channel.collect_changes(
            &mut self.registry,
            world,
            &self.config,
            now,
            timestamp_ms,
        ));
        outgoing.extend(self.event_relay.collect(&self.registry));

        for message in outgoing {
            transport.send(message);
        }

        while let Some(message) = transport.try_receive() {
            self.receive_message(now, world, message);
        }

        // answers produced while dispatching
        for message in std::mem::take(&mut self.outbox) {
            transport.send(message);
        }
    }

    pub fn physics_tick<W: EngineWorld<H>>(&mut self, dt: f32, world: &mut W) {
        self.channel
            .smooth(&mut self.registry, world, dt, &self.config);
    }

    fn timestamp_ms(&mut self, now: &Instant) -> i64 {
        let epoch = *self.epoch.get_or_insert(*now);
        i64::try_from(now.saturating_duration_since(epoch).as_millis()).unwrap_or(i64::MAX)
    }

    // Scans

    fn run_scheduled_scans<W: EngineWorld<H>>(&mut self, now: &Instant, world: &mut W) {
        let Some(action) = self.scan_schedule.due(now) else {
            return;
        };

        let report = match action {
            ScanAction::Full => {
                // the scan rebuilds every entity as unowned
                let released = self.arbiter.reset_all(&mut self.registry, world);
                self.outbox.extend(released);
                self.event_relay.clear();
                let report = self.registry.full_scan(&*world);
                self.scan_schedule
                    .on_full_scan(now, report.candidates, &self.config);
                report
            }
            ScanAction::Additive => {
                for id in self.registry.prune(&*world) {
                    self.event_relay.forget(&id);
                }
                let report = self.registry.additive_scan(&*world);
                self.scan_schedule.on_additive_scan(now, &self.config);
                // give entities without a pose source another chance
                for entity in self.registry.iter_mut() {
                    entity.set_capability_missing(false);
                }
                report
            }
        };

        self.on_entities_tracked(world, &report.added);
        if !report.found_nothing() {
            self.rebind_watcher.on_scan_succeeded();
        }
    }

    fn on_entities_tracked<W: EngineWorld<H>>(&self, world: &mut W, ids: &[EntityId]) {
        for id in ids {
            if let Some(entity) = self.registry.get(id) {
                self.event_relay.subscribe(world, *id, entity.handle());
            }
        }
    }

    /// Schedules a full rescan on the next frame tick. The scan drops every
    /// tracked entity with its ownership and incoming sequence state; owned
    /// entities are released first, and outgoing sequences carry over.
    pub fn request_full_scan(&mut self) {
        self.scan_schedule.request_full_scan();
    }

    /// The scene was replaced: forget everything and rediscover. Handles of
    /// the old scene are gone, so the engine gets no ownership callbacks.
    pub fn on_scene_change(&mut self, now: &Instant) {
        info!("scene changed, dropping {} entities", self.registry.len());
        self.reset_tracking();
        self.epoch = Some(*now);
        self.scan_schedule.request_full_scan();
    }

    pub fn on_disconnect(&mut self) {
        info!("session disconnected, dropping {} entities", self.registry.len());
        self.reset_tracking();
        self.registry.forget_sent_sequences();
        self.epoch = None;
        self.channel.set_session_id(0);
    }

    fn reset_tracking(&mut self) {
        self.registry.clear();
        self.rebind_watcher.clear();
        self.event_relay.clear();
        self.scan_schedule.reset();
        self.outbox.clear();
    }

    // Incoming

    fn receive_message<W: EngineWorld<H>>(&mut self, now: &Instant, world: &mut W, message: Message) {
        match message {
            Message::StateUpdate(update) => self.receive_state_update(now, world, &update),
            Message::OwnershipRequest(request) => self.receive_ownership_request(now, world, &request),
            Message::OwnershipUpdate(update) => self.receive_ownership_update(now, world, &update),
            Message::EntityEvent(event) => self.event_relay.apply(&self.registry, world, &event),
            Message::EntityRemoved(removed) => self.receive_entity_removed(&removed),
        }
    }

    fn receive_state_update<W: EngineWorld<H>>(
        &mut self,
        now: &Instant,
        world: &mut W,
        update: &EntityStateUpdate,
    ) {
        let mut outcome = self
            .channel
            .apply_remote(&mut self.registry, world, update);

        if outcome == ApplyOutcome::UnknownEntity {
            let rebind = self.rebind_watcher.try_rebind(
                &mut self.registry,
                world,
                &self.arbiter,
                update,
                &self.config,
                &mut self.outbox,
            );
            if !rebind.is_resolved() {
                self.scan_schedule
                    .request_additive_scan(*now + self.config.rebind_rescan_delay);
                return;
            }
            self.on_entities_tracked(world, &[update.entity_id]);
            outcome = self
                .channel
                .apply_remote(&mut self.registry, world, update);
        }

        if !outcome.is_applied() {
            debug!("state update for {} not applied: {:?}", update.entity_id, outcome);
        }
    }

    fn receive_ownership_request<W: EngineWorld<H>>(
        &mut self,
        now: &Instant,
        world: &mut W,
        request: &OwnershipRequest,
    ) {
        match self
            .arbiter
            .try_handle_request(&mut self.registry, world, request)
        {
            Ok(Some(update)) => self.outbox.push(update),
            Ok(None) => {}
            Err(err) => self.on_ownership_error(now, err),
        }
    }

    fn receive_ownership_update<W: EngineWorld<H>>(
        &mut self,
        now: &Instant,
        world: &mut W,
        update: &OwnershipUpdate,
    ) {
        if let Err(err) = self
            .arbiter
            .try_handle_update(&mut self.registry, world, update)
        {
            self.on_ownership_error(now, err);
        }
    }

    fn on_ownership_error(&mut self, now: &Instant, err: OwnershipError) {
        match err {
            OwnershipError::EntityNotTracked { entity_id, .. } => {
                self.rebind_watcher.warn_unknown(entity_id, "ownership");
                self.scan_schedule
                    .request_additive_scan(*now + self.config.rebind_rescan_delay);
            }
            OwnershipError::WrongRole { .. } => debug!("{}", err),
        }
    }

    fn receive_entity_removed(&mut self, removed: &EntityRemoved) {
        if self.forget_entity(&removed.entity_id) {
            info!(
                "{} {} removed by peer",
                removed.entity_kind.name(),
                removed.entity_id
            );
        }
    }

    fn forget_entity(&mut self, id: &EntityId) -> bool {
        self.event_relay.forget(id);
        self.registry.remove(id).is_some()
    }

    // Entities

    /// Stops tracking `id` and tells the peer to do the same. Returns
    /// `false` if the entity was not tracked.
    pub fn despawn_entity(&mut self, id: &EntityId) -> bool {
        let Some(kind) = self.registry.get(id).map(|entity| entity.kind()) else {
            return false;
        };
        self.forget_entity(id);
        self.outbox.push(Message::EntityRemoved(EntityRemoved {
            entity_kind: kind,
            entity_id: *id,
        }));
        true
    }

    pub fn owner(&self, id: &EntityId) -> Option<OwnerKind> {
        self.registry.get(id).map(|entity| entity.owner())
    }

    pub fn is_locally_authoritative(&self, id: &EntityId) -> bool {
        self.registry
            .get(id)
            .map_or(false, |entity| entity.is_locally_authoritative(self.role))
    }

    pub fn registry(&self) -> &EntityRegistry<H> {
        &self.registry
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    pub fn scan_schedule(&self) -> &ScanSchedule {
        &self.scan_schedule
    }
}
