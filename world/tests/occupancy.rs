use std::{collections::HashSet, time::Duration};

use proptest::prelude::*;
use virtual_world_core::{
    BackgroundTile, Behavior, Entity, EntityId, EntityKind, ImageHandle, ImageSequence,
    PlacementError, Point,
};
use virtual_world_world::{query, WorldModel};

fn empty_world(rows: u32, columns: u32) -> WorldModel {
    WorldModel::new(
        rows,
        columns,
        BackgroundTile::new("background_default", ImageHandle::new(1)),
    )
}

fn goomab(id: u32, at: Point) -> Entity {
    Entity::new(
        EntityId::new(id),
        EntityKind::Goomab,
        at,
        ImageSequence::placeholder(),
        Duration::from_millis(100),
        Duration::from_millis(100),
        Behavior::Inert,
    )
}

fn assert_invariant(world: &WorldModel) {
    let view = query::occupancy_view(world);
    let mut claimed = HashSet::new();

    for entity in world.entities() {
        assert!(
            world.within_bounds(entity.position()),
            "placed entity {} lies outside the grid",
            entity.id()
        );
        assert_eq!(
            view.occupant(entity.position()),
            Some(entity.id()),
            "stored position of {} does not match its claimed cell",
            entity.id()
        );
        assert!(claimed.insert(entity.position()), "cell claimed twice");
    }

    let occupied_cells = view.iter().flatten().count();
    assert_eq!(occupied_cells, world.len(), "orphaned occupancy entries");
}

#[test]
fn second_add_on_same_cell_leaves_world_unchanged() {
    let mut world = empty_world(4, 4);
    let target = Point::new(1, 1);

    let first = world
        .try_add_entity(goomab(1, target))
        .expect("empty cell accepts the first entity");
    let before = query::entity_view(&world).into_vec();

    let rejected = world
        .try_add_entity(goomab(2, target))
        .expect_err("occupied cell must reject the second entity");

    assert_eq!(rejected.reason(), PlacementError::Occupied);
    assert_eq!(rejected.entity().id(), EntityId::new(2));
    assert_eq!(world.occupant(target).map(Entity::id), Some(first));
    assert_eq!(query::entity_view(&world).into_vec(), before);
    assert_invariant(&world);
}

#[test]
fn successful_move_clears_old_cell_and_claims_new_one() {
    let mut world = empty_world(3, 3);
    let id = world
        .try_add_entity(goomab(1, Point::new(0, 0)))
        .expect("free cell");

    world
        .try_move_entity(id, Point::new(1, 0))
        .expect("neighbouring cell is free");

    assert!(!world.is_occupied(Point::new(0, 0)));
    assert_eq!(world.occupant(Point::new(1, 0)).map(Entity::id), Some(id));
    assert_eq!(world.entity(id).map(Entity::position), Some(Point::new(1, 0)));
    assert_invariant(&world);
}

#[test]
fn failed_move_changes_nothing() {
    let mut world = empty_world(3, 3);
    let mover = world
        .try_add_entity(goomab(1, Point::new(0, 0)))
        .expect("free cell");
    let blocker = world
        .try_add_entity(goomab(2, Point::new(1, 0)))
        .expect("free cell");

    assert_eq!(
        world.try_move_entity(mover, Point::new(1, 0)),
        Err(PlacementError::Occupied)
    );
    assert_eq!(
        world.try_move_entity(mover, Point::new(0, -1)),
        Err(PlacementError::OutOfBounds)
    );

    assert_eq!(world.entity(mover).map(Entity::position), Some(Point::new(0, 0)));
    assert_eq!(world.occupant(Point::new(0, 0)).map(Entity::id), Some(mover));
    assert_eq!(world.occupant(Point::new(1, 0)).map(Entity::id), Some(blocker));
    assert_invariant(&world);
}

#[derive(Clone, Debug)]
enum Operation {
    Add { id: u32, col: i32, row: i32 },
    Move { id: u32, col: i32, row: i32 },
    Remove { id: u32 },
}

fn operation() -> impl Strategy<Value = Operation> {
    let id = 0u32..8;
    let coordinate = -1i32..6;
    prop_oneof![
        (id.clone(), coordinate.clone(), coordinate.clone())
            .prop_map(|(id, col, row)| Operation::Add { id, col, row }),
        (id.clone(), coordinate.clone(), coordinate)
            .prop_map(|(id, col, row)| Operation::Move { id, col, row }),
        id.prop_map(|id| Operation::Remove { id }),
    ]
}

proptest! {
    #[test]
    fn occupancy_invariant_holds_after_every_operation(
        operations in prop::collection::vec(operation(), 1..64)
    ) {
        let mut world = empty_world(5, 5);

        for operation in operations {
            match operation {
                Operation::Add { id, col, row } => {
                    let before = world.len();
                    match world.try_add_entity(goomab(id, Point::new(col, row))) {
                        Ok(_) => prop_assert_eq!(world.len(), before + 1),
                        Err(_) => prop_assert_eq!(world.len(), before),
                    }
                }
                Operation::Move { id, col, row } => {
                    let entity_id = EntityId::new(id);
                    let before = world.entity(entity_id).map(Entity::position);
                    let destination = Point::new(col, row);
                    match world.try_move_entity(entity_id, destination) {
                        Ok(()) => prop_assert_eq!(
                            world.entity(entity_id).map(Entity::position),
                            Some(destination)
                        ),
                        Err(_) => prop_assert_eq!(
                            world.entity(entity_id).map(Entity::position),
                            before
                        ),
                    }
                }
                Operation::Remove { id } => {
                    let _ = world.remove_entity(EntityId::new(id));
                }
            }
            assert_invariant(&world);
        }
    }
}
