#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Virtual-time event scheduler.
//!
//! The scheduler keeps every pending action in a priority queue ordered by
//! due time and then by insertion order, so two actions due at the same
//! virtual instant fire in the order they were scheduled. Actions never call
//! back into the scheduler: the handler passed to
//! [`EventScheduler::update_on_time`] returns [`Directive`] values that the
//! sweep applies on its behalf.

mod clock;

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

use tracing::{debug, trace};
use virtual_world_core::EntityId;

pub use clock::{TimeScale, VirtualClock};

/// Errors raised while validating scheduler configuration.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The time scale must be a finite, strictly positive factor.
    #[error("time scale must be finite and positive (received {factor})")]
    InvalidTimeScale {
        /// Factor that failed validation.
        factor: f64,
    },
}

/// Configuration parameters required to construct the scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Config {
    time_scale: TimeScale,
}

impl Config {
    /// Creates a new configuration using the provided time scale.
    #[must_use]
    pub const fn new(time_scale: TimeScale) -> Self {
        Self { time_scale }
    }

    /// Scale applied to wall-clock deltas.
    #[must_use]
    pub const fn time_scale(&self) -> TimeScale {
        self.time_scale
    }
}

/// Follow-up returned by a fired action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive<A> {
    /// Queue a new action for `entity` after `delay` of virtual time.
    Schedule {
        /// Entity owning the new action.
        entity: EntityId,
        /// Action to perform.
        action: A,
        /// Virtual delay measured from the current virtual time.
        delay: Duration,
    },
    /// Drop every pending action owned by `entity`.
    UnscheduleAll {
        /// Entity whose actions are cancelled.
        entity: EntityId,
    },
}

impl<A> Directive<A> {
    /// Shorthand for [`Directive::Schedule`].
    #[must_use]
    pub const fn schedule(entity: EntityId, action: A, delay: Duration) -> Self {
        Self::Schedule {
            entity,
            action,
            delay,
        }
    }

    /// Shorthand for [`Directive::UnscheduleAll`].
    #[must_use]
    pub const fn unschedule_all(entity: EntityId) -> Self {
        Self::UnscheduleAll { entity }
    }

    /// Entity the directive applies to.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::Schedule { entity, .. } | Self::UnscheduleAll { entity } => *entity,
        }
    }
}

/// Priority queue of pending actions driven by a virtual clock.
#[derive(Debug)]
pub struct EventScheduler<A> {
    clock: VirtualClock,
    next_sequence: u64,
    pending: BinaryHeap<PendingEvent<A>>,
}

impl<A> EventScheduler<A> {
    /// Creates an empty scheduler whose clock starts at `origin_real_millis`.
    #[must_use]
    pub fn new(config: Config, origin_real_millis: u64) -> Self {
        Self {
            clock: VirtualClock::new(config.time_scale(), origin_real_millis),
            next_sequence: 0,
            pending: BinaryHeap::new(),
        }
    }

    /// Queues `action` for `entity`, due `after_delay` past the current virtual time.
    pub fn schedule(&mut self, entity: EntityId, action: A, after_delay: Duration) {
        let due = self.clock.now().saturating_add(after_delay);
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        trace!(%entity, ?due, sequence, "event scheduled");
        self.pending.push(PendingEvent {
            due,
            sequence,
            entity,
            action,
        });
    }

    /// Cancels every pending action owned by `entity` and returns how many were dropped.
    pub fn unschedule_all_events(&mut self, entity: EntityId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|event| event.entity != entity);
        let removed = before - self.pending.len();
        if removed > 0 {
            trace!(%entity, removed, "events cancelled");
        }
        removed
    }

    /// Applies directives produced outside of a sweep, such as behavior installers.
    pub fn apply<I>(&mut self, directives: I)
    where
        I: IntoIterator<Item = Directive<A>>,
    {
        for directive in directives {
            match directive {
                Directive::Schedule {
                    entity,
                    action,
                    delay,
                } => self.schedule(entity, action, delay),
                Directive::UnscheduleAll { entity } => {
                    let _ = self.unschedule_all_events(entity);
                }
            }
        }
    }

    /// Advances the virtual clock to `now_real_millis` and fires every due action.
    ///
    /// Actions fire in due-time order, ties resolved by scheduling order. Each
    /// event leaves the queue before `handler` runs, and the directives the
    /// handler returns are applied before the next event is considered.
    /// Actions scheduled during the sweep wait for the next call even when
    /// their delay is zero. Returns the number of actions fired.
    pub fn update_on_time<F>(&mut self, now_real_millis: u64, mut handler: F) -> usize
    where
        F: FnMut(EntityId, A) -> Vec<Directive<A>>,
    {
        let _ = self.clock.advance_to(now_real_millis);
        let now = self.clock.now();
        let barrier = self.next_sequence;
        let mut deferred: Vec<PendingEvent<A>> = Vec::new();
        let mut fired = 0;

        loop {
            match self.pending.peek() {
                Some(event) if event.due <= now => {}
                _ => break,
            }
            let Some(event) = self.pending.pop() else {
                break;
            };
            if event.sequence >= barrier {
                deferred.push(event);
                continue;
            }

            fired += 1;
            let entity = event.entity;
            for directive in handler(entity, event.action) {
                self.apply_during_sweep(directive, &mut deferred);
            }
        }

        self.pending.extend(deferred);
        debug!(?now, fired, pending = self.pending.len(), "scheduler advanced");
        fired
    }

    fn apply_during_sweep(&mut self, directive: Directive<A>, deferred: &mut Vec<PendingEvent<A>>) {
        match directive {
            Directive::Schedule {
                entity,
                action,
                delay,
            } => self.schedule(entity, action, delay),
            Directive::UnscheduleAll { entity } => {
                deferred.retain(|event| event.entity != entity);
                let _ = self.unschedule_all_events(entity);
            }
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Scale applied to wall-clock deltas.
    #[must_use]
    pub fn time_scale(&self) -> TimeScale {
        self.clock.time_scale()
    }

    /// Number of pending actions.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of pending actions owned by `entity`.
    #[must_use]
    pub fn pending_for(&self, entity: EntityId) -> usize {
        self.pending
            .iter()
            .filter(|event| event.entity == entity)
            .count()
    }

    /// Due time of the earliest pending action.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.peek().map(|event| event.due)
    }
}

#[derive(Debug)]
struct PendingEvent<A> {
    due: Duration,
    sequence: u64,
    entity: EntityId,
    action: A,
}

impl<A> PartialEq for PendingEvent<A> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.sequence == other.sequence
    }
}

impl<A> Eq for PendingEvent<A> {}

impl<A> PartialOrd for PendingEvent<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap yields the earliest (due, sequence) first.
impl<A> Ord for PendingEvent<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(value: u32) -> EntityId {
        EntityId::new(value)
    }

    #[test]
    fn fired_event_leaves_queue_before_rescheduling() {
        let mut scheduler = EventScheduler::new(Config::default(), 0);
        scheduler.schedule(entity(1), "tick", Duration::from_millis(10));

        let fired = scheduler.update_on_time(10, |owner, action| {
            vec![Directive::schedule(owner, action, Duration::from_millis(10))]
        });

        assert_eq!(fired, 1);
        assert_eq!(scheduler.pending_len(), 1);
        assert_eq!(scheduler.next_due(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn zero_delay_reschedule_waits_for_next_advance() {
        let mut scheduler = EventScheduler::new(Config::default(), 0);
        scheduler.schedule(entity(1), (), Duration::ZERO);

        let mut handler = |owner: EntityId, action: ()| {
            vec![Directive::schedule(owner, action, Duration::ZERO)]
        };

        assert_eq!(scheduler.update_on_time(0, &mut handler), 1);
        assert_eq!(scheduler.update_on_time(0, &mut handler), 1);
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn unschedule_without_pending_events_is_harmless() {
        let mut scheduler: EventScheduler<()> = EventScheduler::new(Config::default(), 0);
        assert_eq!(scheduler.unschedule_all_events(entity(3)), 0);
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn apply_installs_and_cancels() {
        let mut scheduler = EventScheduler::new(Config::default(), 0);
        scheduler.apply([
            Directive::schedule(entity(1), 'a', Duration::from_millis(5)),
            Directive::schedule(entity(2), 'b', Duration::from_millis(5)),
            Directive::unschedule_all(entity(1)),
        ]);

        assert_eq!(scheduler.pending_for(entity(1)), 0);
        assert_eq!(scheduler.pending_for(entity(2)), 1);
    }

    #[test]
    fn directive_reports_owner() {
        assert_eq!(Directive::schedule(entity(4), (), Duration::ZERO).entity(), entity(4));
        assert_eq!(Directive::<()>::unschedule_all(entity(5)).entity(), entity(5));
    }
}
