//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Each step pops the next event from [SimulationClock], inserts it as
//! [CurrentEvent], then runs the schedule. The host inserts a [Dispatcher], a
//! [DispatchLog] and optionally a [DispatchTrigger] and [SimulationEndTime].

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, Event, EventKind, EventSubject, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::systems::{
    dispatch_tick::dispatch_tick_system, submission::submit_request_system, DispatchLog,
    DispatchTrigger, SimulationEndTime,
};

fn is_submit_request(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SubmitRequest)
        .unwrap_or(false)
}

fn is_dispatch_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::DispatchTick)
        .unwrap_or(false)
}

/// Runs one step. Returns `false` when the clock is empty or the next event is at or
/// past [SimulationEndTime].
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    run_next_event_with_hook(world, schedule, |_, _| {})
}

/// Runs one step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let stop_at = world.get_resource::<SimulationEndTime>().map(|e| e.0);
    let next_ts = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time());
    if let (Some(end), Some(ts)) = (stop_at, next_ts) {
        if ts >= end {
            return false;
        }
    }

    let Some(event) = world
        .get_resource_mut::<SimulationClock>()
        .and_then(|mut clock| clock.pop_next())
    else {
        return false;
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        submit_request_system.run_if(is_submit_request),
        dispatch_tick_system.run_if(is_dispatch_tick),
    ));
    schedule
}

/// Insert the resources the dispatch systems need around `dispatcher`.
pub fn build_world(dispatcher: Dispatcher, trigger: DispatchTrigger) -> World {
    let mut world = World::new();
    world.insert_resource(SimulationClock::default());
    world.insert_resource(DispatchLog::default());
    world.insert_resource(trigger);
    world.insert_resource(dispatcher);
    world
}

/// Queue the first interval tick (if configured). Call once before running events.
pub fn initialize_dispatch(world: &mut World) {
    let interval = world
        .get_resource::<DispatchTrigger>()
        .and_then(|trigger| trigger.interval_secs);
    if interval.is_some() {
        world.resource_mut::<SimulationClock>().schedule_at(
            0,
            EventKind::DispatchTick,
            Some(EventSubject::Interval),
        );
    }
}
