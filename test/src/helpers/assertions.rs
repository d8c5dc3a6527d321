/// Assert that both peers agree on an entity's owner
#[macro_export]
macro_rules! assert_owner {
    ($pair:expr, $id:expr, $owner:expr) => {
        assert_eq!(
            $pair.owners(&$id),
            (Some($owner), Some($owner)),
            "host and client should both see {:?} owning entity {}",
            $owner,
            $id
        );
    };
}

/// Assert that an object sits within `eps` of a position
#[macro_export]
macro_rules! assert_near {
    ($world:expr, $entity:expr, $position:expr) => {
        $crate::assert_near!($world, $entity, $position, 1e-3)
    };
    ($world:expr, $entity:expr, $position:expr, $eps:expr) => {{
        let actual = $world
            .position(&$entity)
            .expect("object should exist in the world");
        assert!(
            actual.distance($position) <= $eps,
            "expected {:?} near {:?}, found {:?}",
            $entity,
            $position,
            actual
        );
    }};
}

/// Assert that no Host <-> Client transition was reported without None in between
#[macro_export]
macro_rules! assert_routed_through_none {
    ($world:expr, $id:expr) => {{
        let owners = $world.owners_seen($id);
        for pair in owners.windows(2) {
            assert!(
                pair[0].is_none() || pair[1].is_none() || pair[0] == pair[1],
                "entity {} went {:?} -> {:?} directly (history {:?})",
                $id,
                pair[0],
                pair[1],
                owners
            );
        }
    }};
}
