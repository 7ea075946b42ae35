use std::time::Duration;

use virtual_world_core::EntityId;
use virtual_world_system_scheduler::{Config, Directive, EventScheduler, TimeScale};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Probe {
    Act,
    Animate,
    Label(u32),
}

fn scheduler(time_scale: TimeScale) -> EventScheduler<Probe> {
    EventScheduler::new(Config::new(time_scale), 0)
}

fn record(log: &mut Vec<(EntityId, Probe)>) -> impl FnMut(EntityId, Probe) -> Vec<Directive<Probe>> + '_ {
    move |entity, action| {
        log.push((entity, action));
        Vec::new()
    }
}

#[test]
fn earlier_due_time_fires_first_regardless_of_call_order() {
    let mut scheduler = scheduler(TimeScale::NORMAL);
    scheduler.schedule(EntityId::new(1), Probe::Label(2), Duration::from_millis(20));
    scheduler.schedule(EntityId::new(2), Probe::Label(1), Duration::from_millis(10));

    let mut log = Vec::new();
    let fired = scheduler.update_on_time(30, record(&mut log));

    assert_eq!(fired, 2);
    assert_eq!(
        log,
        vec![
            (EntityId::new(2), Probe::Label(1)),
            (EntityId::new(1), Probe::Label(2)),
        ]
    );
}

#[test]
fn equal_due_times_fire_in_scheduling_order() {
    let mut scheduler = scheduler(TimeScale::NORMAL);
    for label in 0..5 {
        scheduler.schedule(
            EntityId::new(10 - label),
            Probe::Label(label),
            Duration::from_millis(15),
        );
    }

    let mut log = Vec::new();
    let _ = scheduler.update_on_time(15, record(&mut log));

    let labels: Vec<Probe> = log.into_iter().map(|(_, probe)| probe).collect();
    assert_eq!(labels, (0..5).map(Probe::Label).collect::<Vec<_>>());
}

#[test]
fn events_not_yet_due_stay_pending() {
    let mut scheduler = scheduler(TimeScale::NORMAL);
    scheduler.schedule(EntityId::new(1), Probe::Act, Duration::from_millis(100));

    let mut log = Vec::new();
    assert_eq!(scheduler.update_on_time(99, record(&mut log)), 0);
    assert!(log.is_empty());
    assert_eq!(scheduler.pending_len(), 1);
}

#[test]
fn periodic_action_fires_once_across_three_short_advances() {
    let mut scheduler = scheduler(TimeScale::NORMAL);
    let owner = EntityId::new(1);
    let period = Duration::from_millis(50);
    scheduler.schedule(owner, Probe::Act, period);

    let mut acts = 0;
    for now in [20, 40, 60] {
        acts += scheduler.update_on_time(now, |entity, action| {
            assert_eq!(action, Probe::Act);
            vec![Directive::schedule(entity, action, period)]
        });
    }

    assert_eq!(acts, 1);
    assert_eq!(scheduler.pending_for(owner), 1);
}

#[test]
fn cancelling_removes_every_pending_event_of_the_entity() {
    let mut scheduler = scheduler(TimeScale::NORMAL);
    let doomed = EntityId::new(1);
    let survivor = EntityId::new(2);
    scheduler.schedule(doomed, Probe::Act, Duration::from_millis(10));
    scheduler.schedule(doomed, Probe::Animate, Duration::from_millis(20));
    scheduler.schedule(survivor, Probe::Act, Duration::from_millis(15));

    assert_eq!(scheduler.unschedule_all_events(doomed), 2);

    let mut log = Vec::new();
    let _ = scheduler.update_on_time(100, record(&mut log));

    assert_eq!(log, vec![(survivor, Probe::Act)]);
    assert_eq!(scheduler.pending_len(), 0);
}

#[test]
fn cancellation_inside_a_sweep_skips_events_already_due() {
    let mut scheduler = scheduler(TimeScale::NORMAL);
    let killer = EntityId::new(1);
    let victim = EntityId::new(2);
    scheduler.schedule(killer, Probe::Act, Duration::from_millis(5));
    scheduler.schedule(victim, Probe::Act, Duration::from_millis(5));
    scheduler.schedule(victim, Probe::Animate, Duration::from_millis(8));

    let mut fired_for = Vec::new();
    let fired = scheduler.update_on_time(10, |entity, _| {
        fired_for.push(entity);
        if entity == killer {
            vec![Directive::unschedule_all(victim)]
        } else {
            Vec::new()
        }
    });

    assert_eq!(fired, 1);
    assert_eq!(fired_for, vec![killer]);
    assert_eq!(scheduler.pending_for(victim), 0);
}

#[test]
fn self_cancellation_discards_reschedules_from_the_same_sweep() {
    let mut scheduler = scheduler(TimeScale::NORMAL);
    let owner = EntityId::new(7);
    scheduler.schedule(owner, Probe::Act, Duration::ZERO);

    let _ = scheduler.update_on_time(1, |entity, action| {
        vec![
            Directive::schedule(entity, action, Duration::ZERO),
            Directive::unschedule_all(entity),
        ]
    });

    assert_eq!(scheduler.pending_len(), 0);
}

#[test]
fn handler_may_schedule_other_entities() {
    let mut scheduler = scheduler(TimeScale::NORMAL);
    let parent = EntityId::new(1);
    let child = EntityId::new(2);
    scheduler.schedule(parent, Probe::Act, Duration::from_millis(10));

    let _ = scheduler.update_on_time(10, |entity, _| {
        if entity == parent {
            vec![Directive::schedule(child, Probe::Act, Duration::from_millis(10))]
        } else {
            Vec::new()
        }
    });

    let mut log = Vec::new();
    let _ = scheduler.update_on_time(20, record(&mut log));
    assert_eq!(log, vec![(child, Probe::Act)]);
}

fn advances_needed(time_scale: TimeScale, target: Duration) -> u64 {
    let mut scheduler = scheduler(time_scale);
    scheduler.schedule(EntityId::new(1), Probe::Act, target);

    let mut calls = 0;
    let mut now = 0;
    loop {
        now += 100;
        calls += 1;
        if scheduler.update_on_time(now, |_, _| Vec::new()) > 0 {
            return calls;
        }
        assert!(calls < 10_000, "target never reached");
    }
}

#[test]
fn doubling_the_time_scale_halves_the_advances_needed() {
    let target = Duration::from_millis(2_000);
    let normal = advances_needed(TimeScale::NORMAL, target);
    let doubled = advances_needed(TimeScale::new(2.0).expect("valid scale"), target);
    let halved = advances_needed(TimeScale::FAST, target);

    assert_eq!(normal, 20);
    assert_eq!(doubled, normal / 2);
    assert_eq!(halved, normal * 2);
}

#[test]
fn virtual_time_tracks_scaled_real_time() {
    let mut scheduler = scheduler(TimeScale::FASTER);
    let _ = scheduler.update_on_time(400, |_, _| Vec::new());
    assert_eq!(scheduler.now(), Duration::from_millis(100));
    assert_eq!(scheduler.time_scale(), TimeScale::FASTER);
}
