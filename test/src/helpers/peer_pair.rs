use std::time::{Duration, Instant};

use tandem_shared::{
    hash_structural_key, EntityId, EntityKind, Message, OwnerKind, ReplicationConfig,
    ReplicationSession, Role, Transport, Vec3,
};

use crate::{
    local_transport::{LinkConditions, LocalTransportPair},
    test_world::{TestEntity, TestWorld},
};

/// Frame length used by [`PeerPair::tick`].
pub const FRAME: Duration = Duration::from_millis(20);

/// Physics step used by [`PeerPair::settle`], in seconds.
pub const PHYSICS_DT: f32 = 0.02;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A host and a client session wired together over a [`LocalTransportPair`],
/// each with its own [`TestWorld`], driven by a shared simulated clock.
pub struct PeerPair {
    pub host: ReplicationSession<TestEntity>,
    pub client: ReplicationSession<TestEntity>,
    pub host_world: TestWorld,
    pub client_world: TestWorld,
    pub link: LocalTransportPair,
    pub now: Instant,
}

impl PeerPair {
    pub fn new() -> Self {
        Self::with_config(ReplicationConfig::default())
    }

    pub fn with_config(config: ReplicationConfig) -> Self {
        init_logging();
        Self {
            host: ReplicationSession::new(Role::Host, config.clone()),
            client: ReplicationSession::new(Role::Client, config),
            host_world: TestWorld::with_handle_base(1000),
            client_world: TestWorld::with_handle_base(2000),
            link: LocalTransportPair::new(),
            now: Instant::now(),
        }
    }

    pub fn set_conditions(&mut self, conditions: LinkConditions) {
        self.link.host.set_conditions(conditions);
        self.link.client.set_conditions(conditions);
    }

    pub fn set_session_id(&mut self, session_id: u64) {
        self.host.set_session_id(session_id);
        self.client.set_session_id(session_id);
    }

    // Scene

    /// Spawns the same logical object in both worlds.
    pub fn spawn_both(&mut self, kind: EntityKind, key: &str, position: Vec3) -> (TestEntity, TestEntity) {
        (
            self.host_world.spawn(kind, key, position),
            self.client_world.spawn(kind, key, position),
        )
    }

    // Clock

    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }

    /// One frame on each side, host first.
    pub fn tick(&mut self) {
        self.host
            .frame_tick(&self.now, &mut self.host_world, &mut self.link.host);
        self.client
            .frame_tick(&self.now, &mut self.client_world, &mut self.link.client);
        self.advance(FRAME);
    }

    /// One frame on each side, client first.
    pub fn tick_client_first(&mut self) {
        self.client
            .frame_tick(&self.now, &mut self.client_world, &mut self.link.client);
        self.host
            .frame_tick(&self.now, &mut self.host_world, &mut self.link.host);
        self.advance(FRAME);
    }

    pub fn tick_n(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    pub fn physics(&mut self, dt: f32) {
        self.host.physics_tick(dt, &mut self.host_world);
        self.client.physics_tick(dt, &mut self.client_world);
    }

    /// Frames interleaved with physics steps, long enough for smoothing to land.
    pub fn settle(&mut self, frames: usize) {
        for _ in 0..frames {
            self.tick();
            self.physics(PHYSICS_DT);
        }
    }

    // Injection

    /// Delivers `message` to the client as if the host had sent it.
    pub fn send_to_client(&mut self, message: Message) {
        self.link.host.send(message);
    }

    /// Delivers `message` to the host as if the client had sent it.
    pub fn send_to_host(&mut self, message: Message) {
        self.link.client.send(message);
    }

    pub fn client_tick_only(&mut self) {
        self.client
            .frame_tick(&self.now, &mut self.client_world, &mut self.link.client);
        self.advance(FRAME);
    }

    pub fn host_tick_only(&mut self) {
        self.host
            .frame_tick(&self.now, &mut self.host_world, &mut self.link.host);
        self.advance(FRAME);
    }

    // Queries

    pub fn id_of(key: &str) -> EntityId {
        hash_structural_key(key)
    }

    pub fn owners(&self, id: &EntityId) -> (Option<OwnerKind>, Option<OwnerKind>) {
        (self.host.owner(id), self.client.owner(id))
    }
}

impl Default for PeerPair {
    fn default() -> Self {
        Self::new()
    }
}
