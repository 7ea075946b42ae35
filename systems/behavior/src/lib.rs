#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Behavior system that installs and performs entity actions.
//!
//! Every entity carries a [`Behavior`] descriptor. [`schedule_actions`] turns
//! that descriptor into the initial set of scheduled actions and [`perform`]
//! runs one fired action against the world. Neither function touches the
//! scheduler: both return [`Directive`] values describing what should be
//! scheduled or cancelled next.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};
use virtual_world_core::{
    Action, Behavior, Direction, Entity, EntityId, Event, Point, StepPolicy,
};
use virtual_world_system_factory::Factory;
use virtual_world_system_scheduler::Directive;
use virtual_world_world::WorldModel;

/// Mutable state an action may touch while it runs.
pub struct ActionContext<'a> {
    /// World the action mutates.
    pub world: &'a mut WorldModel,
    /// Factory used to create offspring.
    pub factory: &'a mut Factory,
    /// Deterministic random source for selection policies.
    pub rng: &'a mut ChaCha8Rng,
    /// Log receiving the world-visible effects of the action.
    pub events: &'a mut Vec<Event>,
}

/// Initial actions for a freshly placed entity.
///
/// Entities without the animates capability produce nothing and never enter
/// the scheduler.
#[must_use]
pub fn schedule_actions(entity: &Entity) -> Vec<Directive<Action>> {
    if !entity.kind().animates() {
        return Vec::new();
    }
    match entity.behavior() {
        Behavior::Inert => Vec::new(),
        Behavior::Wander { .. } | Behavior::Spread { .. } => vec![
            Directive::schedule(entity.id(), Action::Act, entity.action_period()),
            Directive::schedule(entity.id(), Action::Animate, entity.animation_period()),
        ],
    }
}

/// Runs one fired action and returns its follow-up directives.
///
/// An identifier that no longer resolves to a placed entity yields no
/// directives, which lets the stale action lapse.
pub fn perform(
    id: EntityId,
    action: Action,
    ctx: &mut ActionContext<'_>,
) -> Vec<Directive<Action>> {
    let Some(entity) = ctx.world.entity(id) else {
        warn!(%id, ?action, "action fired for an entity that is no longer placed");
        return Vec::new();
    };
    let behavior = entity.behavior();
    let position = entity.position();
    let action_period = entity.action_period();
    let animation_period = entity.animation_period();

    match (action, behavior) {
        (_, Behavior::Inert) => Vec::new(),
        (Action::Animate, _) => animate(id, animation_period, ctx),
        (Action::Act, Behavior::Wander { policy }) => {
            wander(id, position, policy, action_period, ctx)
        }
        (
            Action::Act,
            Behavior::Spread {
                radius,
                cycles_remaining,
                ..
            },
        ) => spread(id, radius, cycles_remaining, action_period, ctx),
    }
}

fn animate(id: EntityId, period: Duration, ctx: &mut ActionContext<'_>) -> Vec<Directive<Action>> {
    if let Some(image) = ctx.world.advance_image(id) {
        trace!(%id, image = image.get(), "animation advanced");
    }
    vec![Directive::schedule(id, Action::Animate, period)]
}

fn wander(
    id: EntityId,
    from: Point,
    policy: StepPolicy,
    period: Duration,
    ctx: &mut ActionContext<'_>,
) -> Vec<Directive<Action>> {
    let step = match policy {
        StepPolicy::Random => random_step(ctx.world, from, ctx.rng),
        StepPolicy::Heading(heading) => heading_step(ctx.world, from, heading),
    };

    if let Some((to, heading)) = step {
        match ctx.world.try_move_entity(id, to) {
            Ok(()) => {
                ctx.events.push(Event::EntityMoved { id, from, to });
                if let (Some(heading), Some(Behavior::Wander { policy })) =
                    (heading, ctx.world.behavior_mut(id))
                {
                    *policy = StepPolicy::Heading(heading);
                }
            }
            Err(reason) => debug!(%id, %to, %reason, "step rejected"),
        }
    }

    vec![Directive::schedule(id, Action::Act, period)]
}

fn is_free(world: &WorldModel, point: Point) -> bool {
    world.within_bounds(point) && !world.is_occupied(point)
}

fn random_step(
    world: &WorldModel,
    from: Point,
    rng: &mut ChaCha8Rng,
) -> Option<(Point, Option<Direction>)> {
    let candidates: Vec<Point> = from
        .neighbors()
        .into_iter()
        .filter(|point| is_free(world, *point))
        .collect();
    candidates.choose(rng).map(|point| (*point, None))
}

fn heading_step(
    world: &WorldModel,
    from: Point,
    heading: Direction,
) -> Option<(Point, Option<Direction>)> {
    let mut direction = heading;
    for _ in 0..Direction::ALL.len() {
        let candidate = from.step(direction);
        if is_free(world, candidate) {
            return Some((candidate, Some(direction)));
        }
        direction = direction.clockwise();
    }
    None
}

fn spread(
    id: EntityId,
    radius: u32,
    cycles_remaining: u32,
    period: Duration,
    ctx: &mut ActionContext<'_>,
) -> Vec<Directive<Action>> {
    let mut directives = Vec::new();

    if radius > 0 {
        if let Some(parent) = ctx.world.entity(id).cloned() {
            for neighbor in parent.position().neighbors() {
                if !is_free(ctx.world, neighbor) {
                    continue;
                }
                let child = ctx.factory.offspring(&parent, neighbor);
                match ctx.world.try_add_entity(child) {
                    Ok(child_id) => {
                        ctx.events.push(Event::EntitySpawned {
                            id: child_id,
                            kind: parent.kind(),
                            at: neighbor,
                        });
                        if let Some(child) = ctx.world.entity(child_id) {
                            directives.extend(schedule_actions(child));
                        }
                    }
                    Err(rejected) => trace!(%rejected, "offspring discarded"),
                }
            }
        }
    }

    let remaining = cycles_remaining.saturating_sub(1);
    if remaining == 0 {
        if let Some(removed) = ctx.world.remove_entity(id) {
            info!(%id, at = %removed.position(), "entity burned out");
            ctx.events.push(Event::EntityRemoved {
                id,
                at: removed.position(),
            });
        }
        directives.push(Directive::unschedule_all(id));
    } else {
        if let Some(Behavior::Spread {
            cycles_remaining, ..
        }) = ctx.world.behavior_mut(id)
        {
            *cycles_remaining = remaining;
        }
        directives.push(Directive::schedule(id, Action::Act, period));
    }

    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use virtual_world_core::{BackgroundTile, EntityKind, ImageHandle, ImageSequence};

    fn world(rows: u32, columns: u32) -> WorldModel {
        WorldModel::new(
            rows,
            columns,
            BackgroundTile::new("background_default", ImageHandle::new(1)),
        )
    }

    fn place(world: &mut WorldModel, factory: &mut Factory, key: &str, at: Point) -> EntityId {
        let entity = factory
            .create(
                key,
                at,
                ImageSequence::new(vec![ImageHandle::new(20), ImageHandle::new(21)]),
                Duration::from_millis(40),
                Duration::from_millis(100),
            )
            .expect("registered kind");
        world.try_add_entity(entity).expect("free cell")
    }

    #[test]
    fn inert_entities_install_nothing() {
        let mut world = world(2, 2);
        let mut factory = Factory::default();
        let id = place(&mut world, &mut factory, "obstacle", Point::new(0, 0));

        let entity = world.entity(id).expect("placed");
        assert!(schedule_actions(entity).is_empty());
    }

    #[test]
    fn animating_entities_install_act_and_animate() {
        let mut world = world(2, 2);
        let mut factory = Factory::default();
        let id = place(&mut world, &mut factory, "goomab", Point::new(0, 0));

        let entity = world.entity(id).expect("placed");
        assert_eq!(
            schedule_actions(entity),
            vec![
                Directive::schedule(id, Action::Act, Duration::from_millis(100)),
                Directive::schedule(id, Action::Animate, Duration::from_millis(40)),
            ]
        );
    }

    #[test]
    fn animate_loops_and_reschedules() {
        let mut world = world(1, 1);
        let mut factory = Factory::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut events = Vec::new();
        let id = place(&mut world, &mut factory, "goomab", Point::new(0, 0));
        let mut ctx = ActionContext {
            world: &mut world,
            factory: &mut factory,
            rng: &mut rng,
            events: &mut events,
        };

        let first = perform(id, Action::Animate, &mut ctx);
        let _ = perform(id, Action::Animate, &mut ctx);

        assert_eq!(
            first,
            vec![Directive::schedule(id, Action::Animate, Duration::from_millis(40))]
        );
        assert_eq!(
            world.entity(id).map(Entity::current_image),
            Some(ImageHandle::new(20))
        );
        assert!(events.is_empty());
    }

    #[test]
    fn stale_identifier_yields_no_directives() {
        let mut world = world(1, 1);
        let mut factory = Factory::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut events = Vec::new();
        let mut ctx = ActionContext {
            world: &mut world,
            factory: &mut factory,
            rng: &mut rng,
            events: &mut events,
        };

        assert!(perform(EntityId::new(99), Action::Act, &mut ctx).is_empty());
    }

    #[test]
    fn heading_turns_clockwise_when_blocked() {
        let mut world = world(3, 3);
        let mut factory = Factory::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut events = Vec::new();
        let id = place(&mut world, &mut factory, "goomab", Point::new(2, 1));
        if let Some(Behavior::Wander { policy }) = world.behavior_mut(id) {
            *policy = StepPolicy::Heading(Direction::East);
        }
        let mut ctx = ActionContext {
            world: &mut world,
            factory: &mut factory,
            rng: &mut rng,
            events: &mut events,
        };

        let _ = perform(id, Action::Act, &mut ctx);

        let entity = world.entity(id).expect("placed");
        assert_eq!(entity.kind(), EntityKind::Goomab);
        assert_eq!(entity.position(), Point::new(2, 2));
        assert_eq!(
            entity.behavior(),
            Behavior::Wander {
                policy: StepPolicy::Heading(Direction::South)
            }
        );
    }
}
