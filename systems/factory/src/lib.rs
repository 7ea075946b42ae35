#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Entity factory that turns kind keys into fully initialised entities.
//!
//! Entities leave the factory with an identifier, position, image sequence
//! and behavior descriptor, but they are neither placed in the world nor
//! scheduled. Callers decide whether to place them and, on success, install
//! their behavior.

use std::{collections::BTreeMap, time::Duration};

use tracing::trace;
use virtual_world_core::{
    Behavior, Entity, EntityId, EntityKind, ImageSequence, Point, StepPolicy,
};

/// Spread radius granted to fire created from the default catalog.
pub const FIRE_SPREAD_RADIUS: u32 = 1;
/// Spread firings a fire survives before burning out.
pub const FIRE_LIFETIME_CYCLES: u32 = 3;

/// Errors raised while constructing entities.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    /// No catalog entry is registered for the requested key.
    #[error("unknown entity kind `{0}`")]
    UnknownKind(String),
}

/// Catalog entry describing how to build entities for one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindSpec {
    kind: EntityKind,
    behavior: Behavior,
}

impl KindSpec {
    /// Creates a new catalog entry.
    #[must_use]
    pub const fn new(kind: EntityKind, behavior: Behavior) -> Self {
        Self { kind, behavior }
    }

    /// Kind discriminator assigned to built entities.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Behavior descriptor every built entity starts with.
    #[must_use]
    pub const fn behavior(&self) -> Behavior {
        self.behavior
    }
}

/// Lookup table from kind keys to [`KindSpec`] entries.
#[derive(Clone, Debug)]
pub struct Catalog {
    entries: BTreeMap<String, KindSpec>,
}

impl Catalog {
    /// Creates a catalog without any entries.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers `spec` under `key`, replacing any previous entry.
    pub fn register<K>(&mut self, key: K, spec: KindSpec)
    where
        K: Into<String>,
    {
        let _ = self.entries.insert(key.into(), spec);
    }

    /// Entry registered for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KindSpec> {
        self.entries.get(key)
    }

    /// Registered keys in lexical order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.register(
            EntityKind::Goomab.key(),
            KindSpec::new(
                EntityKind::Goomab,
                Behavior::Wander {
                    policy: StepPolicy::Random,
                },
            ),
        );
        catalog.register(
            EntityKind::Fire.key(),
            KindSpec::new(
                EntityKind::Fire,
                Behavior::spread(FIRE_SPREAD_RADIUS, FIRE_LIFETIME_CYCLES),
            ),
        );
        catalog.register(
            EntityKind::Obstacle.key(),
            KindSpec::new(EntityKind::Obstacle, Behavior::Inert),
        );
        catalog
    }
}

/// Builds entities and allocates their identifiers.
#[derive(Debug)]
pub struct Factory {
    catalog: Catalog,
    next_id: u32,
}

impl Factory {
    /// Creates a factory backed by the provided catalog.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            next_id: 1,
        }
    }

    /// Catalog consulted by [`Factory::create`].
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Builds an unplaced, unscheduled entity of the kind registered for `key`.
    pub fn create(
        &mut self,
        key: &str,
        position: Point,
        images: ImageSequence,
        animation_period: Duration,
        action_period: Duration,
    ) -> Result<Entity, FactoryError> {
        let spec = *self
            .catalog
            .get(key)
            .ok_or_else(|| FactoryError::UnknownKind(key.to_owned()))?;
        let id = self.allocate_id();
        trace!(%id, key, %position, "entity created");
        Ok(Entity::new(
            id,
            spec.kind(),
            position,
            images,
            animation_period,
            action_period,
            spec.behavior(),
        ))
    }

    /// Builds a child of `parent` at `position`.
    ///
    /// The child shares the parent's kind, images and periods; its behavior
    /// descriptor is derived through [`Behavior::offspring`].
    pub fn offspring(&mut self, parent: &Entity, position: Point) -> Entity {
        let id = self.allocate_id();
        trace!(%id, parent = %parent.id(), %position, "offspring created");
        Entity::new(
            id,
            parent.kind(),
            position,
            parent.images().rewound(),
            parent.animation_period(),
            parent.action_period(),
            parent.behavior().offspring(),
        )
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}
