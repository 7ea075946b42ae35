#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Virtual World engine.
//!
//! This crate defines the value types that connect the authoritative world
//! model, the event scheduler, the entity factory and the behavior system.
//! Entities are tagged records: an [`EntityKind`] discriminator plus a
//! [`Behavior`] descriptor that the behavior system dispatches on. Adapters
//! talk to the simulation through [`Command`] values and observe its effects
//! through the [`Event`] log.

use std::{collections::HashMap, error::Error, fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Virtual World.";

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed so that neighbours of edge cells remain
/// representable; such points are simply out of bounds for the world.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Point {
    col: i32,
    row: i32,
}

impl Point {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Zero-based column index of the point.
    #[must_use]
    pub const fn col(&self) -> i32 {
        self.col
    }

    /// Zero-based row index of the point.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Returns the point shifted by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, delta_col: i32, delta_row: i32) -> Self {
        Self::new(
            self.col.saturating_add(delta_col),
            self.row.saturating_add(delta_row),
        )
    }

    /// Returns the adjacent point in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (delta_col, delta_row) = direction.offset();
        self.offset(delta_col, delta_row)
    }

    /// Orthogonally adjacent points in [`Direction::ALL`] order.
    #[must_use]
    pub fn neighbors(self) -> [Point; 4] {
        Direction::ALL.map(|direction| self.step(direction))
    }

    /// All eight points surrounding this one.
    ///
    /// Ordered as east, west, north, south, then the diagonals south-east,
    /// north-west, north-east and south-west.
    #[must_use]
    pub const fn surrounding(self) -> [Point; 8] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, -1),
            self.offset(0, 1),
            self.offset(1, 1),
            self.offset(-1, -1),
            self.offset(1, -1),
            self.offset(-1, 1),
        ]
    }

    /// Computes the Manhattan distance between two points.
    #[must_use]
    pub fn manhattan_distance(self, other: Point) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Cardinal movement directions available to wandering entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Column and row delta of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Direction obtained by turning a quarter clockwise.
    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }
}

/// Unique identifier assigned to an entity by the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminator for the concrete entity kinds known to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Wandering actor that steps to neighbouring cells.
    Goomab,
    /// Spreading hazard that ignites its neighbours and burns out.
    Fire,
    /// Static obstacle that only claims its cell.
    Obstacle,
}

impl EntityKind {
    /// Every kind known to the engine.
    pub const ALL: [EntityKind; 3] = [Self::Goomab, Self::Fire, Self::Obstacle];

    /// Canonical key used for catalog and image lookups.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Goomab => "goomab",
            Self::Fire => "fire",
            Self::Obstacle => "obstacle",
        }
    }

    /// Resolves a canonical key back into a kind.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Reports whether entities of this kind are drawn by the view.
    #[must_use]
    pub const fn renders(self) -> bool {
        true
    }

    /// Reports whether entities of this kind install recurring scheduled behavior.
    #[must_use]
    pub const fn animates(self) -> bool {
        match self {
            Self::Goomab | Self::Fire => true,
            Self::Obstacle => false,
        }
    }

    /// Reports whether entities of this kind claim a grid cell.
    #[must_use]
    pub const fn collides(self) -> bool {
        true
    }
}

/// Opaque handle referring to an image owned by the host's resource provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageHandle(u32);

impl ImageHandle {
    /// Handle substituted whenever the provider has no image data for a key.
    pub const PLACEHOLDER: ImageHandle = ImageHandle(0);

    /// Creates a new image handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Ordered, never-empty list of image handles with a looping cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSequence {
    handles: Vec<ImageHandle>,
    cursor: usize,
}

impl ImageSequence {
    /// Creates a sequence from the provided handles.
    ///
    /// An empty list degrades to the placeholder sequence.
    #[must_use]
    pub fn new(handles: Vec<ImageHandle>) -> Self {
        if handles.is_empty() {
            return Self::placeholder();
        }
        Self { handles, cursor: 0 }
    }

    /// Sequence containing only [`ImageHandle::PLACEHOLDER`].
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            handles: vec![ImageHandle::PLACEHOLDER],
            cursor: 0,
        }
    }

    /// Handle currently selected by the cursor.
    #[must_use]
    pub fn current(&self) -> ImageHandle {
        self.handles[self.cursor]
    }

    /// Moves the cursor to the next handle, wrapping at the end.
    pub fn advance(&mut self) -> ImageHandle {
        self.cursor = (self.cursor + 1) % self.handles.len();
        self.current()
    }

    /// Every handle in display order.
    #[must_use]
    pub fn handles(&self) -> &[ImageHandle] {
        &self.handles
    }

    /// Returns a copy of the sequence with the cursor rewound.
    #[must_use]
    pub fn rewound(&self) -> Self {
        Self {
            handles: self.handles.clone(),
            cursor: 0,
        }
    }
}

/// Resource provider that maps kind keys to image sequences.
pub trait ImageProvider {
    /// Returns the image sequence registered for `key`.
    ///
    /// Implementations must substitute the placeholder sequence when the key
    /// is unknown so that simulation logic never fails on missing visuals.
    fn image_list(&self, key: &str) -> ImageSequence;
}

/// In-memory [`ImageProvider`] populated by the host's image loader.
#[derive(Clone, Debug, Default)]
pub struct ImageStore {
    images: HashMap<String, Vec<ImageHandle>>,
}

impl ImageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handles for `key`, replacing any previous entry.
    pub fn insert<K>(&mut self, key: K, handles: Vec<ImageHandle>)
    where
        K: Into<String>,
    {
        let _ = self.images.insert(key.into(), handles);
    }

    /// Finds the key whose sequence contains `handle`.
    #[must_use]
    pub fn key_of(&self, handle: ImageHandle) -> Option<&str> {
        self.images
            .iter()
            .find(|(_, handles)| handles.contains(&handle))
            .map(|(key, _)| key.as_str())
    }
}

impl ImageProvider for ImageStore {
    fn image_list(&self, key: &str) -> ImageSequence {
        self.images
            .get(key)
            .map(|handles| ImageSequence::new(handles.clone()))
            .unwrap_or_else(ImageSequence::placeholder)
    }
}

/// Background tile drawn beneath the entity layer of a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundTile {
    key: String,
    image: ImageHandle,
}

impl BackgroundTile {
    /// Creates a new background tile.
    #[must_use]
    pub fn new<K>(key: K, image: ImageHandle) -> Self
    where
        K: Into<String>,
    {
        Self {
            key: key.into(),
            image,
        }
    }

    /// Resolves the tile's first image through the provider.
    #[must_use]
    pub fn from_provider(key: &str, provider: &dyn ImageProvider) -> Self {
        Self::new(key, provider.image_list(key).current())
    }

    /// Key the tile was created from.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Image displayed for the tile.
    #[must_use]
    pub const fn image(&self) -> ImageHandle {
        self.image
    }
}

/// Cell selection policy used by wandering entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepPolicy {
    /// Pick uniformly among free neighbouring cells.
    Random,
    /// Keep walking in a heading, turning clockwise when blocked.
    Heading(Direction),
}

/// Kind-specific behavior descriptor attached to every entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    /// Never enters the scheduler.
    Inert,
    /// Periodically steps to a neighbouring cell.
    Wander {
        /// Policy used to pick the next cell.
        policy: StepPolicy,
    },
    /// Periodically ignites free neighbours, then burns out.
    Spread {
        /// Remaining generations of offspring this hazard may create.
        radius: u32,
        /// Spread firings left before the hazard removes itself.
        cycles_remaining: u32,
        /// Cycle budget granted to every offspring.
        lifetime: u32,
    },
}

impl Behavior {
    /// Creates a spreading descriptor with a full cycle budget.
    #[must_use]
    pub const fn spread(radius: u32, lifetime: u32) -> Self {
        Self::Spread {
            radius,
            cycles_remaining: lifetime,
            lifetime,
        }
    }

    /// Descriptor inherited by an entity created from this one.
    ///
    /// Spreading hazards hand down one less generation of radius and a fresh
    /// cycle budget; other descriptors are copied unchanged.
    #[must_use]
    pub const fn offspring(self) -> Self {
        match self {
            Self::Spread {
                radius, lifetime, ..
            } => Self::Spread {
                radius: radius.saturating_sub(1),
                cycles_remaining: lifetime,
                lifetime,
            },
            other => other,
        }
    }
}

/// Recurring action an animating entity can have scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Kind-specific periodic behavior (wander step, spread).
    Act,
    /// Advance to the next image of the entity's sequence.
    Animate,
}

/// Simulated actor or object occupying a single grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    position: Point,
    images: ImageSequence,
    action_period: Duration,
    animation_period: Duration,
    behavior: Behavior,
}

impl Entity {
    /// Creates a fully initialised entity that is not yet placed.
    #[must_use]
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        position: Point,
        images: ImageSequence,
        animation_period: Duration,
        action_period: Duration,
        behavior: Behavior,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            images,
            action_period,
            animation_period,
            behavior,
        }
    }

    /// Identifier assigned by the factory.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Kind discriminator of the entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Cell the entity occupies, or will occupy once placed.
    #[must_use]
    pub const fn position(&self) -> Point {
        self.position
    }

    /// Image sequence bound to the entity.
    #[must_use]
    pub fn images(&self) -> &ImageSequence {
        &self.images
    }

    /// Image currently displayed for the entity.
    #[must_use]
    pub fn current_image(&self) -> ImageHandle {
        self.images.current()
    }

    /// Delay between two kind-specific actions.
    #[must_use]
    pub const fn action_period(&self) -> Duration {
        self.action_period
    }

    /// Delay between two animation frames.
    #[must_use]
    pub const fn animation_period(&self) -> Duration {
        self.animation_period
    }

    /// Behavior descriptor dispatched on by the behavior system.
    #[must_use]
    pub const fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Mutable access to the behavior descriptor's state.
    pub fn behavior_mut(&mut self) -> &mut Behavior {
        &mut self.behavior
    }

    /// Updates the stored position.
    ///
    /// Placed entities are relocated exclusively by the world model, which
    /// never hands out mutable entity references.
    pub fn relocate(&mut self, position: Point) {
        self.position = position;
    }

    /// Advances the animation cursor and returns the new image.
    pub fn advance_image(&mut self) -> ImageHandle {
        self.images.advance()
    }

    /// Captures an immutable snapshot of the entity.
    #[must_use]
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            image: self.current_image(),
        }
    }
}

/// Immutable representation of a single entity's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Kind discriminator of the entity.
    pub kind: EntityKind,
    /// Grid cell currently occupied by the entity.
    pub position: Point,
    /// Image currently displayed for the entity.
    pub image: ImageHandle,
}

/// Reasons a placement or movement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The requested cell is claimed by another entity.
    Occupied,
    /// No placed entity carries the provided identifier.
    MissingEntity,
    /// An entity with the same identifier is already placed.
    AlreadyPlaced,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::OutOfBounds => "cell lies outside the world",
            Self::Occupied => "cell is already occupied",
            Self::MissingEntity => "entity is not placed in the world",
            Self::AlreadyPlaced => "entity is already placed in the world",
        };
        f.write_str(message)
    }
}

impl Error for PlacementError {}

/// Requests submitted to the simulation by external collaborators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the virtual clock to the provided wall-clock instant.
    Tick {
        /// Wall-clock time in milliseconds.
        real_millis: u64,
    },
    /// Creates an entity of the provided kind at a cell.
    Spawn {
        /// Catalog key of the requested kind.
        key: String,
        /// Cell the entity should occupy.
        at: Point,
    },
    /// Ignites spreading hazards on the cells surrounding a point.
    Ignite {
        /// Centre of the ignition ring.
        at: Point,
    },
}

/// Effects broadcast by the simulation after processing commands and actions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Indicates that the virtual clock advanced.
    TimeAdvanced {
        /// Virtual time after the advance.
        now: Duration,
        /// Number of scheduled actions fired during the advance.
        fired: usize,
    },
    /// Confirms that an entity was placed into the world.
    EntitySpawned {
        /// Identifier of the new entity.
        id: EntityId,
        /// Kind of the new entity.
        kind: EntityKind,
        /// Cell the entity occupies.
        at: Point,
    },
    /// Reports that a spawn request could not be placed.
    SpawnRejected {
        /// Catalog key of the requested kind.
        key: String,
        /// Cell requested for the entity.
        at: Point,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that an entity moved between two cells.
    EntityMoved {
        /// Identifier of the entity that moved.
        id: EntityId,
        /// Cell the entity occupied before moving.
        from: Point,
        /// Cell the entity occupies after moving.
        to: Point,
    },
    /// Confirms that an entity left the world.
    EntityRemoved {
        /// Identifier of the removed entity.
        id: EntityId,
        /// Cell the entity occupied.
        at: Point,
    },
}
