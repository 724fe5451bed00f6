//! Dispatch tick: bring schedules up to date, run one pass and log its commits.
//!
//! Interval ticks re-arm themselves; ticks raised by submissions do not.

use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::dispatcher::Dispatcher;

use super::{DispatchLog, DispatchTrigger};

pub fn dispatch_tick_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut dispatcher: ResMut<Dispatcher>,
    mut log: ResMut<DispatchLog>,
    trigger: Option<Res<DispatchTrigger>>,
) {
    if event.0.kind != EventKind::DispatchTick {
        return;
    }

    let now = clock.now();
    dispatcher.advance_to(now);
    let assignments = dispatcher.dispatch(now);
    log.record_pass(now, assignments);

    if event.0.subject == Some(EventSubject::Interval) {
        if let Some(interval) = trigger.as_deref().and_then(|t| t.interval_secs) {
            clock.schedule_in(interval.max(1), EventKind::DispatchTick, Some(EventSubject::Interval));
        }
    }
}
