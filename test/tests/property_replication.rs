use proptest::prelude::*;
use tandem_shared::{
    smoothing_step, EntityKind, EntityRegistry, OwnerKind, Pose, Quat, ReplicationConfig, Vec3,
};
use tandem_test::{assert_routed_through_none, PeerPair, TestEntity, TestWorld, PHYSICS_DT};

// Property tests for ownership arbitration, smoothing and entity discovery

#[derive(Clone, Copy, Debug)]
struct Step {
    host_wants: bool,
    client_wants: bool,
    client_first: bool,
}

fn step() -> impl Strategy<Value = Step> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(host_wants, client_wants, client_first)| Step {
        host_wants,
        client_wants,
        client_first,
    })
}

fn position() -> impl Strategy<Value = Vec3> {
    (-4.0_f32..4.0, -4.0_f32..4.0, -4.0_f32..4.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn keys() -> impl Strategy<Value = Vec<(usize, String)>> {
    proptest::collection::vec((0_usize..3, prop::sample::select(vec!["a", "b", "c", "d"])), 1..10)
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(kind, key)| (kind, format!("scene/{}", key)))
                .collect()
        })
}

const KINDS: [EntityKind; 3] = [EntityKind::Door, EntityKind::Pickup, EntityKind::Vehicle];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn ownership_never_skips_none_and_settles(steps in proptest::collection::vec(step(), 1..40)) {
        let mut pair = PeerPair::new();
        let (car_host, car_client) = pair.spawn_both(EntityKind::Vehicle, "car", Vec3::ZERO);
        pair.tick();
        let id = PeerPair::id_of("car");

        for step in &steps {
            pair.host_world.set_wants(&car_host, step.host_wants);
            pair.client_world.set_wants(&car_client, step.client_wants);
            if step.client_first {
                pair.tick_client_first();
            } else {
                pair.tick();
            }
        }

        pair.tick_n(100);

        assert_routed_through_none!(pair.host_world, id);
        assert_routed_through_none!(pair.client_world, id);
        let (host_owner, client_owner) = pair.owners(&id);
        prop_assert_eq!(host_owner, client_owner);

        let last = steps[steps.len() - 1];
        let expected = if last.host_wants {
            OwnerKind::Host
        } else if last.client_wants {
            OwnerKind::Client
        } else {
            OwnerKind::None
        };
        prop_assert_eq!(host_owner, Some(expected));
    }

    #[test]
    fn smoothing_lands_on_target(
        start in position(),
        target in position(),
        start_yaw in -3.0_f32..3.0,
        target_yaw in -3.0_f32..3.0,
    ) {
        let config = ReplicationConfig::default();
        let blend = config.blend_factor(PHYSICS_DT);
        let goal = Pose::at(target).with_rotation(Quat::from_yaw(target_yaw));
        let mut current = Pose::at(start).with_rotation(Quat::from_yaw(start_yaw));

        let mut settled = false;
        for _ in 0..200 {
            let (next, done) = smoothing_step(&current, &goal, blend, &config);
            prop_assert!(
                next.position.distance(goal.position) <= current.position.distance(goal.position) + 1e-4
            );
            current = next;
            if done {
                settled = true;
                break;
            }
        }

        prop_assert!(settled);
        prop_assert_eq!(current, goal);
    }

    #[test]
    fn full_scan_ids_do_not_depend_on_spawn_order(entries in keys()) {
        let mut forward = TestWorld::new();
        let mut backward = TestWorld::with_handle_base(500);
        for (kind, key) in &entries {
            forward.spawn(KINDS[*kind], key, Vec3::ZERO);
        }
        for (kind, key) in entries.iter().rev() {
            backward.spawn(KINDS[*kind], key, Vec3::ZERO);
        }

        let mut a: EntityRegistry<TestEntity> = EntityRegistry::new(ReplicationConfig::default().max_key_suffix_attempts);
        let mut b: EntityRegistry<TestEntity> = EntityRegistry::new(ReplicationConfig::default().max_key_suffix_attempts);
        a.full_scan(&forward);
        b.full_scan(&backward);

        prop_assert_eq!(a.len(), entries.len());
        prop_assert_eq!(a.ids(), b.ids());
    }

    #[test]
    fn additive_scan_is_idempotent(entries in keys()) {
        let mut world = TestWorld::new();
        for (kind, key) in &entries {
            world.spawn(KINDS[*kind], key, Vec3::ZERO);
        }

        let mut registry: EntityRegistry<TestEntity> = EntityRegistry::new(ReplicationConfig::default().max_key_suffix_attempts);
        registry.full_scan(&world);
        let ids = registry.ids();

        let report = registry.additive_scan(&world);
        prop_assert!(report.added.is_empty());
        prop_assert_eq!(registry.ids(), ids);
    }
}
