//! Request submission: a SubmitRequest event makes its request UNPLANNED.

use bevy_ecs::prelude::{Res, ResMut};
use tracing::warn;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::dispatcher::Dispatcher;

use super::DispatchTrigger;

pub fn submit_request_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut dispatcher: ResMut<Dispatcher>,
    trigger: Option<Res<DispatchTrigger>>,
) {
    if event.0.kind != EventKind::SubmitRequest {
        return;
    }
    let Some(EventSubject::Request(request)) = event.0.subject else {
        return;
    };

    if let Err(err) = dispatcher.submit_request(request) {
        warn!(%request, %err, "submission ignored");
        return;
    }

    let on_submission = trigger.as_deref().is_some_and(|t| t.on_submission);
    let now = clock.now();
    if on_submission && !clock.is_scheduled(now, EventKind::DispatchTick) {
        clock.schedule_at(now, EventKind::DispatchTick, None);
    }
}
