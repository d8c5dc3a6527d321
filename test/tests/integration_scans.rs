//! Integration tests for entity discovery: initial scan, empty-scene retries,
//! periodic additive scans and pruning

use std::time::Duration;

use tandem_shared::{
    EntityKind, EntityStateUpdate, Message, OwnerKind, Pose, ReplicationConfig, Vec3,
};
use tandem_test::{assert_near, assert_owner, PeerPair};

#[test]
fn both_peers_derive_the_same_ids() {
    let mut pair = PeerPair::new();
    pair.spawn_both(EntityKind::Door, "house/door", Vec3::new(0.0, 0.0, 0.0));
    pair.spawn_both(EntityKind::Vehicle, "garage/car", Vec3::new(5.0, 0.0, 0.0));
    pair.spawn_both(EntityKind::Pickup, "shelf/can", Vec3::new(1.0, 1.0, 0.0));

    pair.tick();

    assert_eq!(pair.host.registry().ids(), pair.client.registry().ids());
    assert_eq!(pair.host.entity_count(), 3);
}

#[test]
fn duplicate_keys_are_suffixed_the_same_way() {
    let mut pair = PeerPair::new();
    for x in 0..3 {
        pair.spawn_both(EntityKind::Pickup, "shelf/can", Vec3::new(x as f32, 0.0, 0.0));
    }

    pair.tick();

    let ids = pair.host.registry().ids();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids, pair.client.registry().ids());
    assert!(ids.contains(&PeerPair::id_of("shelf/can")));
    assert!(ids.contains(&PeerPair::id_of("shelf/can#1")));
    assert!(ids.contains(&PeerPair::id_of("shelf/can#2")));
}

#[test]
fn empty_scene_is_rescanned_after_backoff() {
    let mut pair = PeerPair::new();
    pair.client_tick_only();
    assert_eq!(pair.client.entity_count(), 0);
    assert!(pair.client.scan_schedule().full_scan_pending());

    pair.client_world
        .spawn(EntityKind::Door, "door", Vec3::new(0.0, 0.0, 0.0));

    // first retry fires 500ms after the empty scan
    for _ in 0..24 {
        pair.client_tick_only();
    }
    assert_eq!(pair.client.entity_count(), 0);

    pair.client_tick_only();
    assert_eq!(pair.client.entity_count(), 1);
    assert!(!pair.client.scan_schedule().full_scan_pending());
}

#[test]
fn retries_stop_at_the_limit() {
    let config = ReplicationConfig {
        scan_retry_limit: 2,
        ..ReplicationConfig::default()
    };
    let mut pair = PeerPair::with_config(config);

    // empty scan, then retries at 500ms and 1500ms
    pair.client_tick_only();
    pair.advance(Duration::from_millis(480));
    pair.client_tick_only();
    assert_eq!(pair.client.scan_schedule().retries_used(), 2);
    pair.advance(Duration::from_millis(980));
    pair.client_tick_only();

    assert_eq!(pair.client.scan_schedule().retries_used(), 2);
    assert!(!pair.client.scan_schedule().full_scan_pending());
}

#[test]
fn late_spawn_is_picked_up_by_periodic_scan() {
    let mut pair = PeerPair::new();
    pair.spawn_both(EntityKind::Door, "door", Vec3::new(0.0, 0.0, 0.0));
    pair.tick();

    let (late, _) = pair.spawn_both(EntityKind::NpcActor, "npc/late", Vec3::new(3.0, 0.0, 0.0));
    pair.advance(Duration::from_millis(4900));
    pair.tick();
    assert_eq!(pair.host.registry().id_for_handle(&late), None);

    pair.advance(Duration::from_millis(60));
    pair.tick();
    assert_eq!(
        pair.host.registry().id_for_handle(&late),
        Some(PeerPair::id_of("npc/late"))
    );
    assert_eq!(pair.client.entity_count(), 2);
}

#[test]
fn additive_scan_keeps_existing_state() {
    let mut pair = PeerPair::new();
    let (_, car_client) = pair.spawn_both(EntityKind::Vehicle, "car", Vec3::new(0.0, 0.0, 0.0));
    pair.tick();
    let id = PeerPair::id_of("car");
    pair.client_world.set_wants(&car_client, true);
    pair.tick_n(2);
    assert_owner!(pair, id, OwnerKind::Client);

    pair.advance(Duration::from_secs(5));
    pair.tick();

    assert_owner!(pair, id, OwnerKind::Client);
    assert_eq!(pair.client.entity_count(), 1);
    assert_eq!(pair.client.registry().id_for_handle(&car_client), Some(id));
}

#[test]
fn despawned_objects_are_pruned() {
    let mut pair = PeerPair::new();
    let (_, can_client) = pair.spawn_both(EntityKind::Pickup, "can", Vec3::new(0.0, 0.0, 0.0));
    pair.spawn_both(EntityKind::Door, "door", Vec3::new(0.0, 0.0, 0.0));
    pair.tick();
    let id = PeerPair::id_of("can");

    pair.client_world.despawn(&can_client);
    pair.advance(Duration::from_secs(5));
    pair.tick();

    assert!(!pair.client.registry().contains(&id));
    assert_eq!(pair.client.entity_count(), 1);
    assert!(pair.host.registry().contains(&id));
}

#[test]
fn unresolved_update_schedules_a_quick_rescan() {
    let mut pair = PeerPair::new();
    pair.client_world
        .spawn(EntityKind::Door, "door", Vec3::new(0.0, 0.0, 0.0));
    pair.client_tick_only();

    // nothing near the reported position, so the rebind defers
    pair.client_world
        .spawn(EntityKind::Pickup, "shelf/can", Vec3::new(100.0, 0.0, 0.0));
    pair.send_to_client(Message::StateUpdate(EntityStateUpdate::new(
        0,
        1,
        0,
        EntityKind::Vehicle,
        4242,
        &Pose::at(Vec3::new(0.0, 0.0, 0.0)),
    )));
    pair.client_tick_only();
    assert_eq!(pair.client.entity_count(), 1);

    // rescan due 250ms later, well before the periodic one
    pair.advance(Duration::from_millis(240));
    pair.client_tick_only();
    assert_eq!(pair.client.entity_count(), 2);
}

#[test]
fn scene_change_rediscovers_everything() {
    let mut pair = PeerPair::new();
    pair.spawn_both(EntityKind::Door, "door", Vec3::new(0.0, 0.0, 0.0));
    pair.tick();

    let (old, _) = pair.spawn_both(EntityKind::Door, "door/other", Vec3::new(1.0, 0.0, 0.0));
    let now = pair.now;
    pair.client.on_scene_change(&now);
    assert_eq!(pair.client.entity_count(), 0);

    pair.tick();

    assert_eq!(pair.client.entity_count(), 2);
    assert_eq!(pair.host.registry().id_for_handle(&old), None);
}

fn remote_sequence(pair: &PeerPair, id: u32) -> u32 {
    pair.client
        .registry()
        .get(&id)
        .map(|entity| entity.last_remote_sequence())
        .unwrap_or_default()
}

#[test]
fn host_rescan_keeps_updates_flowing() {
    let mut pair = PeerPair::new();
    let (door_host, door_client) = pair.spawn_both(EntityKind::Door, "door", Vec3::new(0.0, 0.0, 0.0));
    pair.tick();
    let id = PeerPair::id_of("door");

    for step in 1..=20 {
        pair.host_world.set_position(&door_host, Vec3::new(0.0, step as f32 * 0.1, 0.0));
        pair.settle(5);
    }
    let before = remote_sequence(&pair, id);
    assert!(before > 20, "door only reached sequence {before}");

    pair.host.request_full_scan();
    for step in 1..=10 {
        pair.host_world.set_position(&door_host, Vec3::new(step as f32 * 0.3, 2.0 + step as f32 * 0.7, 0.0));
        pair.settle(5);
    }
    pair.settle(60);

    assert!(remote_sequence(&pair, id) > before);
    assert_near!(pair.client_world, door_client, Vec3::new(3.0, 9.0, 0.0));
}

#[test]
fn client_rescan_takes_the_next_update_as_is() {
    let mut pair = PeerPair::new();
    let (door_host, door_client) = pair.spawn_both(EntityKind::Door, "door", Vec3::new(0.0, 0.0, 0.0));
    pair.tick();
    let id = PeerPair::id_of("door");
    pair.host_world.set_position(&door_host, Vec3::new(0.5, 0.0, 0.0));
    pair.settle(10);

    pair.client.request_full_scan();
    pair.host_world.set_position(&door_host, Vec3::new(1.0, 0.0, 0.0));
    pair.advance(Duration::from_millis(100));
    pair.tick();

    // fresh gate, so the first update snaps without smoothing
    assert!(remote_sequence(&pair, id) > 1);
    assert_eq!(pair.client_world.position(&door_client), Some(Vec3::new(1.0, 0.0, 0.0)));
}
