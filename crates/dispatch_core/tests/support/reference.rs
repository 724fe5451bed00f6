//! Exhaustive MIN_WAIT_TIME pass used as ground truth for the pruned search.

use std::collections::BTreeMap;

use dispatch_core::dispatcher::Dispatcher;
use dispatch_core::model::{SimTime, VehicleId};
use dispatch_core::optimizer::Assignment;
use dispatch_core::schedule::{InsertionDelta, Schedule, Timing};

/// Request by request in processing order, try every slot of every vehicle and
/// commit the global minimum `(added cost, vehicle id, slot)` on a private copy of
/// the fleet. The dispatcher itself is left untouched.
pub fn exhaustive_min_wait_pass(dispatcher: &Dispatcher, now: SimTime) -> Vec<Assignment> {
    let params = dispatcher.params();
    let timing = Timing::new(
        dispatcher.travel_time(),
        params.pickup_duration,
        params.dropoff_duration,
    );
    let mut schedules: BTreeMap<VehicleId, Schedule> = dispatcher
        .fleet()
        .schedules()
        .map(|schedule| (schedule.vehicle_id(), schedule.clone()))
        .collect();

    let mut assignments = Vec::new();
    for request in dispatcher.registry().unplanned(dispatcher.fleet()) {
        let spec = request.serve_spec();
        let mut best: Option<((u64, VehicleId, usize), InsertionDelta)> = None;
        for (vehicle, schedule) in &schedules {
            if !schedule.vehicle().in_service(now) {
                continue;
            }
            for position in schedule.insertion_slots() {
                let Ok(delta) = schedule.evaluate_insertion(&spec, position, now, &timing) else {
                    continue;
                };
                let key = (delta.cost().added_cost(), *vehicle, position);
                if best.as_ref().map_or(true, |(best_key, _)| key < *best_key) {
                    best = Some((key, delta));
                }
            }
        }
        if let Some(((_, vehicle, _), delta)) = best {
            schedules
                .get_mut(&vehicle)
                .expect("known vehicle")
                .commit_insertion(&delta)
                .expect("fresh delta");
            assignments.push(Assignment {
                request: request.id(),
                vehicle,
                delta: delta.summary(),
            });
        }
    }
    assignments
}
