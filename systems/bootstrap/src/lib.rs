#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Simulation orchestrator that wires the world, factory, scheduler and
//! behavior system into a single owner.
//!
//! The [`Simulation`] is the only place where the world and the scheduler are
//! mutated together. Hosts feed it wall-clock samples through
//! [`Simulation::update_on_time`] (usually gated by a [`TickDriver`]) and
//! external requests through [`Simulation::apply`].

mod driver;

use std::{collections::VecDeque, time::Duration};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use virtual_world_core::{
    Action, BackgroundTile, Command, Entity, EntityId, EntityKind, EntitySnapshot, Event,
    ImageProvider, ImageStore, Point,
};
use virtual_world_system_behavior::{perform, schedule_actions, ActionContext};
use virtual_world_system_factory::{Factory, FactoryError};
use virtual_world_system_scheduler::{Config as SchedulerConfig, EventScheduler, TimeScale};
use virtual_world_world::WorldModel;

pub use driver::TickDriver;

/// Errors that abort simulation setup.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// A startup placement named a kind the factory cannot build.
    #[error("cannot populate world: {0}")]
    Factory(#[from] FactoryError),
}

/// Tunable parameters of a simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    rows: u32,
    columns: u32,
    time_scale: TimeScale,
    rng_seed: u64,
    tick_period: Duration,
    action_period: Duration,
    animation_period: Duration,
    max_events: usize,
    default_background_key: String,
}

impl Config {
    /// Rows of the default world.
    pub const DEFAULT_ROWS: u32 = 30;
    /// Columns of the default world.
    pub const DEFAULT_COLUMNS: u32 = 40;
    /// Image key used for the background of every cell.
    pub const DEFAULT_BACKGROUND_KEY: &'static str = "background_default";

    /// Creates a configuration for a world of the provided size.
    #[must_use]
    pub fn new(rows: u32, columns: u32) -> Self {
        Self {
            rows,
            columns,
            time_scale: TimeScale::NORMAL,
            rng_seed: 0,
            tick_period: Duration::from_millis(100),
            action_period: Duration::from_millis(100),
            animation_period: Duration::from_millis(100),
            max_events: 4_096,
            default_background_key: Self::DEFAULT_BACKGROUND_KEY.to_owned(),
        }
    }

    /// Replaces the scale applied to wall-clock deltas.
    #[must_use]
    pub fn with_time_scale(mut self, time_scale: TimeScale) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Replaces the seed of the random source used by wander policies.
    #[must_use]
    pub fn with_rng_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }

    /// Replaces the cadence at which hosts should tick the simulation.
    #[must_use]
    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    /// Replaces the action and animation periods given to new entities.
    #[must_use]
    pub fn with_entity_periods(mut self, action_period: Duration, animation_period: Duration) -> Self {
        self.action_period = action_period;
        self.animation_period = animation_period;
        self
    }

    /// Replaces the number of events retained in the event log.
    ///
    /// Zero keeps every event.
    #[must_use]
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Replaces the image key used for the background of every cell.
    #[must_use]
    pub fn with_default_background_key<K>(mut self, key: K) -> Self
    where
        K: Into<String>,
    {
        self.default_background_key = key.into();
        self
    }

    /// Number of grid rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of grid columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Scale applied to wall-clock deltas.
    #[must_use]
    pub const fn time_scale(&self) -> TimeScale {
        self.time_scale
    }

    /// Seed of the random source.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Cadence at which hosts should tick the simulation.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Action period given to new entities.
    #[must_use]
    pub const fn action_period(&self) -> Duration {
        self.action_period
    }

    /// Animation period given to new entities.
    #[must_use]
    pub const fn animation_period(&self) -> Duration {
        self.animation_period
    }

    /// Number of events retained in the event log.
    #[must_use]
    pub const fn max_events(&self) -> usize {
        self.max_events
    }

    /// Image key used for the background of every cell.
    #[must_use]
    pub fn default_background_key(&self) -> &str {
        &self.default_background_key
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROWS, Self::DEFAULT_COLUMNS)
    }
}

/// Startup request to place an entity of a kind at a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    key: String,
    at: Point,
}

impl Placement {
    /// Creates a new placement request.
    #[must_use]
    pub fn new<K>(key: K, at: Point) -> Self
    where
        K: Into<String>,
    {
        Self {
            key: key.into(),
            at,
        }
    }

    /// Catalog key of the requested kind.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Requested cell.
    #[must_use]
    pub const fn at(&self) -> Point {
        self.at
    }
}

/// Owner of the world and the scheduler driving it.
#[derive(Debug)]
pub struct Simulation {
    config: Config,
    images: ImageStore,
    world: WorldModel,
    factory: Factory,
    scheduler: EventScheduler<Action>,
    rng: ChaCha8Rng,
    log: VecDeque<Event>,
}

impl Simulation {
    /// Creates an empty simulation backed by the default catalog.
    #[must_use]
    pub fn new(config: Config, images: ImageStore, origin_real_millis: u64) -> Self {
        Self::with_factory(config, images, Factory::default(), origin_real_millis)
    }

    /// Creates an empty simulation backed by a caller-provided factory.
    #[must_use]
    pub fn with_factory(
        config: Config,
        images: ImageStore,
        factory: Factory,
        origin_real_millis: u64,
    ) -> Self {
        let background = BackgroundTile::from_provider(config.default_background_key(), &images);
        let world = WorldModel::new(config.rows(), config.columns(), background);
        let scheduler = EventScheduler::new(
            SchedulerConfig::new(config.time_scale()),
            origin_real_millis,
        );
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed());
        info!(
            rows = config.rows(),
            columns = config.columns(),
            time_scale = config.time_scale().get(),
            "simulation created"
        );
        Self {
            config,
            images,
            world,
            factory,
            scheduler,
            rng,
            log: VecDeque::new(),
        }
    }

    /// Places the startup entities without scheduling them.
    ///
    /// Unknown kinds abort the load. Placements that conflict with the grid
    /// are skipped with a warning. Returns the number of entities placed.
    pub fn populate<I>(&mut self, placements: I) -> Result<usize, SimulationError>
    where
        I: IntoIterator<Item = Placement>,
    {
        let mut placed = 0;
        for placement in placements {
            let entity = self.build(placement.key(), placement.at())?;
            match self.world.try_add_entity(entity) {
                Ok(id) => {
                    placed += 1;
                    self.record_spawn(id);
                }
                Err(rejected) => {
                    warn!(key = placement.key(), %rejected, "startup placement skipped");
                    self.record(Event::SpawnRejected {
                        key: placement.key,
                        at: placement.at,
                        reason: rejected.reason(),
                    });
                }
            }
        }
        info!(placed, "world populated");
        Ok(placed)
    }

    /// Installs the recurring actions of every placed entity.
    ///
    /// Meant to run once after [`Simulation::populate`]; entities added later
    /// through [`Simulation::spawn`] schedule themselves.
    pub fn schedule_all(&mut self) -> usize {
        let directives: Vec<_> = self.world.entities().flat_map(schedule_actions).collect();
        let installed = directives.len();
        self.scheduler.apply(directives);
        debug!(installed, "startup actions scheduled");
        installed
    }

    /// Creates, places and schedules an entity of the kind registered for `key`.
    ///
    /// Unknown kinds are logged and ignored. A conflicting placement is
    /// discarded without touching the world or the scheduler.
    pub fn spawn(&mut self, key: &str, at: Point) -> Option<EntityId> {
        let entity = match self.build(key, at) {
            Ok(entity) => entity,
            Err(error) => {
                warn!(%error, %at, "spawn request ignored");
                return None;
            }
        };

        match self.world.try_add_entity(entity) {
            Ok(id) => {
                self.record_spawn(id);
                let directives = self
                    .world
                    .entity(id)
                    .map(schedule_actions)
                    .unwrap_or_default();
                self.scheduler.apply(directives);
                Some(id)
            }
            Err(rejected) => {
                debug!(key, %rejected, "spawn discarded");
                self.record(Event::SpawnRejected {
                    key: key.to_owned(),
                    at,
                    reason: rejected.reason(),
                });
                None
            }
        }
    }

    /// Ignites spreading hazards on the eight cells surrounding `at`.
    ///
    /// Cells that are occupied or out of bounds are skipped. Returns the
    /// identifiers of the hazards that were placed.
    pub fn ignite_around(&mut self, at: Point) -> Vec<EntityId> {
        at.surrounding()
            .into_iter()
            .filter_map(|point| self.spawn(EntityKind::Fire.key(), point))
            .collect()
    }

    /// Applies an external command.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Tick { real_millis } => {
                let _ = self.update_on_time(real_millis);
            }
            Command::Spawn { key, at } => {
                let _ = self.spawn(&key, at);
            }
            Command::Ignite { at } => {
                let _ = self.ignite_around(at);
            }
        }
    }

    /// Advances the virtual clock to `now_real_millis` and runs every due action.
    ///
    /// Returns the number of actions fired.
    pub fn update_on_time(&mut self, now_real_millis: u64) -> usize {
        let mut events = Vec::new();
        let fired = {
            let Self {
                world,
                factory,
                scheduler,
                rng,
                ..
            } = self;
            let mut ctx = ActionContext {
                world,
                factory,
                rng,
                events: &mut events,
            };
            scheduler.update_on_time(now_real_millis, |id, action| perform(id, action, &mut ctx))
        };

        for event in events {
            self.record(event);
        }
        self.record(Event::TimeAdvanced {
            now: self.scheduler.now(),
            fired,
        });
        fired
    }

    /// Snapshot of the entity occupying `point`, if any.
    pub fn inspect(&self, point: Point) -> Option<EntitySnapshot> {
        let snapshot = self.world.occupant(point).map(Entity::snapshot);
        match &snapshot {
            Some(entity) => info!(id = %entity.id, kind = ?entity.kind, %point, "cell inspected"),
            None => debug!(%point, "inspected cell is empty"),
        }
        snapshot
    }

    /// World owned by the simulation.
    #[must_use]
    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    /// Scheduler owned by the simulation.
    #[must_use]
    pub fn scheduler(&self) -> &EventScheduler<Action> {
        &self.scheduler
    }

    /// Configuration the simulation was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.log.iter()
    }

    /// Removes and returns every retained event, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.log.drain(..).collect()
    }

    /// Driver gating ticks at the configured cadence.
    #[must_use]
    pub fn tick_driver(&self, start_millis: u64) -> TickDriver {
        TickDriver::new(self.config.tick_period(), start_millis)
    }

    fn build(&mut self, key: &str, at: Point) -> Result<Entity, FactoryError> {
        let images = self.images.image_list(key);
        self.factory.create(
            key,
            at,
            images,
            self.config.animation_period(),
            self.config.action_period(),
        )
    }

    fn record_spawn(&mut self, id: EntityId) {
        let Some(entity) = self.world.entity(id) else {
            return;
        };
        let (kind, at) = (entity.kind(), entity.position());
        info!(%id, ?kind, %at, "entity spawned");
        self.record(Event::EntitySpawned { id, kind, at });
    }

    fn record(&mut self, event: Event) {
        let capacity = self.config.max_events();
        while capacity > 0 && self.log.len() >= capacity {
            let _ = self.log.pop_front();
        }
        self.log.push_back(event);
    }
}
