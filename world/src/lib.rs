#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Virtual World.
//!
//! The [`WorldModel`] owns every placed entity together with two independent
//! layers: a dense occupancy grid that holds at most one entity per cell and a
//! background layer that always holds exactly one tile per cell. All movement
//! goes through [`WorldModel::try_move_entity`], which keeps the occupancy
//! invariant intact. The world knows nothing about scheduling; callers that
//! remove entities are responsible for cancelling their pending actions.

use std::{collections::BTreeMap, error::Error, fmt};

use tracing::{debug, trace};
use virtual_world_core::{
    BackgroundTile, Behavior, Entity, EntityId, ImageHandle, PlacementError, Point,
};

/// Represents the authoritative grid of cells and the entities placed on it.
#[derive(Debug)]
pub struct WorldModel {
    occupancy: OccupancyGrid,
    backgrounds: Vec<BackgroundTile>,
    entities: BTreeMap<EntityId, Entity>,
}

impl WorldModel {
    /// Creates an empty world with every cell set to `background`.
    #[must_use]
    pub fn new(rows: u32, columns: u32, background: BackgroundTile) -> Self {
        let occupancy = OccupancyGrid::new(columns, rows);
        let backgrounds = vec![background; occupancy.capacity()];
        Self {
            occupancy,
            backgrounds,
            entities: BTreeMap::new(),
        }
    }

    /// Number of columns and rows of the grid.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.occupancy.dimensions()
    }

    /// Reports whether the point lies inside the grid.
    #[must_use]
    pub fn within_bounds(&self, point: Point) -> bool {
        self.occupancy.index(point).is_some()
    }

    /// Reports whether an entity claims the cell at `point`.
    #[must_use]
    pub fn is_occupied(&self, point: Point) -> bool {
        self.occupancy
            .index(point)
            .and_then(|index| self.occupancy.occupant_at(index))
            .is_some()
    }

    /// Returns the entity claiming the cell at `point`, if any.
    #[must_use]
    pub fn occupant(&self, point: Point) -> Option<&Entity> {
        let index = self.occupancy.index(point)?;
        let id = self.occupancy.occupant_at(index)?;
        self.entities.get(&id)
    }

    /// Returns the placed entity carrying `id`, if any.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Places the entity at its stored position.
    ///
    /// Succeeds only when the position is inside the grid and unclaimed. On
    /// failure the world is left untouched and the entity is handed back to
    /// the caller through [`Rejected`].
    pub fn try_add_entity(&mut self, entity: Entity) -> Result<EntityId, Rejected> {
        let id = entity.id();
        let position = entity.position();

        if self.entities.contains_key(&id) {
            return Err(Rejected::new(entity, PlacementError::AlreadyPlaced));
        }
        let Some(index) = self.occupancy.index(position) else {
            return Err(Rejected::new(entity, PlacementError::OutOfBounds));
        };
        if self.occupancy.occupant_at(index).is_some() {
            return Err(Rejected::new(entity, PlacementError::Occupied));
        }

        self.occupancy.occupy(index, id);
        let _ = self.entities.insert(id, entity);
        trace!(%id, %position, "entity placed");
        Ok(id)
    }

    /// Removes the entity from the world and returns its record.
    ///
    /// The entity's cell is cleared only when the entity still owns it.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Some(index) = self.occupancy.index(entity.position()) {
            if self.occupancy.occupant_at(index) == Some(id) {
                self.occupancy.vacate(index);
            }
        }
        trace!(%id, position = %entity.position(), "entity removed");
        Some(entity)
    }

    /// Moves the entity to `destination`.
    ///
    /// Succeeds when the destination is inside the grid and either free or
    /// already owned by the same entity, in which case nothing changes. On
    /// success the old cell is cleared, the new cell is claimed and the
    /// entity's stored position is updated together; on failure nothing
    /// changes.
    pub fn try_move_entity(
        &mut self,
        id: EntityId,
        destination: Point,
    ) -> Result<(), PlacementError> {
        let origin = self
            .entities
            .get(&id)
            .map(Entity::position)
            .ok_or(PlacementError::MissingEntity)?;
        let to_index = self
            .occupancy
            .index(destination)
            .ok_or(PlacementError::OutOfBounds)?;

        match self.occupancy.occupant_at(to_index) {
            Some(occupant) if occupant == id => return Ok(()),
            Some(_) => return Err(PlacementError::Occupied),
            None => {}
        }

        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(PlacementError::MissingEntity)?;
        if let Some(from_index) = self.occupancy.index(origin) {
            if self.occupancy.occupant_at(from_index) == Some(id) {
                self.occupancy.vacate(from_index);
            }
        }
        self.occupancy.occupy(to_index, id);
        entity.relocate(destination);
        debug!(%id, from = %origin, to = %destination, "entity moved");
        Ok(())
    }

    /// Advances the entity's animation and returns the newly displayed image.
    pub fn advance_image(&mut self, id: EntityId) -> Option<ImageHandle> {
        self.entities.get_mut(&id).map(Entity::advance_image)
    }

    /// Mutable access to the behavior state of a placed entity.
    ///
    /// Spatial state stays private to the world; only the descriptor is exposed.
    pub fn behavior_mut(&mut self, id: EntityId) -> Option<&mut Behavior> {
        self.entities.get_mut(&id).map(Entity::behavior_mut)
    }

    /// Background tile of the cell at `point`.
    #[must_use]
    pub fn background(&self, point: Point) -> Option<&BackgroundTile> {
        self.occupancy
            .index(point)
            .and_then(|index| self.backgrounds.get(index))
    }

    /// Replaces the background tile of the cell at `point`.
    pub fn set_background(
        &mut self,
        point: Point,
        tile: BackgroundTile,
    ) -> Result<(), PlacementError> {
        let slot = self
            .occupancy
            .index(point)
            .and_then(|index| self.backgrounds.get_mut(index))
            .ok_or(PlacementError::OutOfBounds)?;
        *slot = tile;
        Ok(())
    }

    /// Iterates over every placed entity in identifier order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Number of placed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Reports whether no entity is placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Entity handed back by a failed [`WorldModel::try_add_entity`] call.
#[derive(Debug)]
pub struct Rejected {
    entity: Entity,
    reason: PlacementError,
}

impl Rejected {
    fn new(entity: Entity, reason: PlacementError) -> Self {
        Self { entity, reason }
    }

    /// Specific reason the placement failed.
    #[must_use]
    pub const fn reason(&self) -> PlacementError {
        self.reason
    }

    /// Borrows the rejected entity.
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Returns ownership of the rejected entity to the caller.
    #[must_use]
    pub fn into_entity(self) -> Entity {
        self.entity
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entity {} rejected at {}: {}",
            self.entity.id(),
            self.entity.position(),
            self.reason
        )
    }
}

impl Error for Rejected {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.reason)
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{OccupancyGrid, WorldModel};
    use virtual_world_core::{EntityId, EntitySnapshot, ImageHandle, Point};

    /// Captures a read-only view of the entities inhabiting the world.
    #[must_use]
    pub fn entity_view(world: &WorldModel) -> EntityView {
        EntityView {
            snapshots: world.entities().map(|entity| entity.snapshot()).collect(),
        }
    }

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &WorldModel) -> OccupancyView<'_> {
        OccupancyView {
            grid: &world.occupancy,
        }
    }

    /// Describes what a renderer should draw for the cell at `point`.
    #[must_use]
    pub fn cell_view(world: &WorldModel, point: Point) -> Option<CellView> {
        let background = world.background(point)?.image();
        let occupant = world.occupant(point).map(|entity| entity.snapshot());
        Some(CellView {
            point,
            background,
            occupant,
        })
    }

    /// Read-only snapshot describing all placed entities.
    #[derive(Clone, Debug, Default)]
    pub struct EntityView {
        snapshots: Vec<EntitySnapshot>,
    }

    impl EntityView {
        /// Iterator over the captured snapshots in identifier order.
        pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<EntitySnapshot> {
            self.snapshots
        }
    }

    /// Background and occupant of a single cell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CellView {
        /// Cell described by the view.
        pub point: Point,
        /// Background image of the cell.
        pub background: ImageHandle,
        /// Entity claiming the cell, if any.
        pub occupant: Option<EntitySnapshot>,
    }

    /// Read-only view into the dense occupancy grid.
    #[derive(Clone, Copy, Debug)]
    pub struct OccupancyView<'a> {
        grid: &'a OccupancyGrid,
    }

    impl<'a> OccupancyView<'a> {
        /// Returns the entity claiming the provided cell, if any.
        #[must_use]
        pub fn occupant(&self, point: Point) -> Option<EntityId> {
            self.grid
                .index(point)
                .and_then(|index| self.grid.occupant_at(index))
        }

        /// Reports whether the cell is inside the grid and unclaimed.
        #[must_use]
        pub fn is_free(&self, point: Point) -> bool {
            self.grid
                .index(point)
                .is_some_and(|index| self.grid.occupant_at(index).is_none())
        }

        /// Returns an iterator over all cells in row-major order.
        pub fn iter(&self) -> impl Iterator<Item = Option<EntityId>> + 'a {
            self.grid.cells.iter().copied()
        }

        /// Provides the dimensions of the underlying occupancy grid.
        #[must_use]
        pub fn dimensions(&self) -> (u32, u32) {
            self.grid.dimensions()
        }
    }
}

#[derive(Clone, Debug)]
struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<EntityId>>,
}

impl OccupancyGrid {
    fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn occupant_at(&self, index: usize) -> Option<EntityId> {
        self.cells.get(index).copied().flatten()
    }

    fn occupy(&mut self, index: usize, id: EntityId) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = Some(id);
        }
    }

    fn vacate(&mut self, index: usize) {
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = None;
        }
    }

    fn index(&self, point: Point) -> Option<usize> {
        let column = u32::try_from(point.col()).ok()?;
        let row = u32::try_from(point.row()).ok()?;
        if column < self.columns && row < self.rows {
            let row = usize::try_from(row).ok()?;
            let column = usize::try_from(column).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }
}
