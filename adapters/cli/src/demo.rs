use virtual_world_core::{EntityKind, ImageHandle, ImageStore, Point};
use virtual_world_system_bootstrap::{Config, Placement};

/// Image handles standing in for the sprites a windowed host would load.
pub(crate) fn images() -> ImageStore {
    let mut images = ImageStore::new();
    images.insert(Config::DEFAULT_BACKGROUND_KEY, vec![ImageHandle::new(1)]);
    images.insert(
        EntityKind::Goomab.key(),
        vec![ImageHandle::new(10), ImageHandle::new(11)],
    );
    images.insert(
        EntityKind::Fire.key(),
        vec![
            ImageHandle::new(20),
            ImageHandle::new(21),
            ImageHandle::new(22),
        ],
    );
    images.insert(EntityKind::Obstacle.key(), vec![ImageHandle::new(30)]);
    images
}

/// Starting population: a wall across the middle and a wanderer on each side.
///
/// Cells that do not fit the requested grid are left out.
pub(crate) fn placements(columns: u32, rows: u32) -> Vec<Placement> {
    let columns = i32::try_from(columns).unwrap_or(i32::MAX);
    let rows = i32::try_from(rows).unwrap_or(i32::MAX);
    let middle = rows / 2;

    let wall = (columns / 4..columns - columns / 4)
        .map(|col| Placement::new(EntityKind::Obstacle.key(), Point::new(col, middle)));
    let wanderers = [
        Point::new(1, 1),
        Point::new(columns - 2, rows - 2),
    ]
    .into_iter()
    .map(|at| Placement::new(EntityKind::Goomab.key(), at));

    wall.chain(wanderers)
        .filter(|placement| {
            let at = placement.at();
            (0..columns).contains(&at.col()) && (0..rows).contains(&at.row())
        })
        .collect()
}
