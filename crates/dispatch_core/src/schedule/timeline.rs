//! Forward simulation of a planned task suffix.
//!
//! Timing is a pure function of the anchor (where and when the vehicle becomes free),
//! the ordered serve stops and the travel-time oracle. Every stop is approached by a
//! drive (skipped when already there), followed by a wait until the window opens and
//! the serve itself. Rebuilding from the same inputs reproduces the same timings,
//! which is what makes removal an exact revert of insertion.

use crate::error::Infeasibility;
use crate::model::{SimTime, VehicleId, Vertex};
use crate::travel_time::TravelTime;

use super::{ServeSpec, TaskId, TaskKind};

/// Leg durations used while simulating a schedule.
#[derive(Clone, Copy)]
pub struct Timing<'a> {
    pub travel: &'a dyn TravelTime,
    pub pickup_duration: u64,
    pub dropoff_duration: u64,
}

impl<'a> Timing<'a> {
    pub fn new(travel: &'a dyn TravelTime, pickup_duration: u64, dropoff_duration: u64) -> Self {
        Self {
            travel,
            pickup_duration,
            dropoff_duration,
        }
    }

    /// Pickup service, occupied ride and dropoff service.
    pub fn serve_duration(&self, spec: &ServeSpec) -> u64 {
        self.pickup_duration
            + self.travel.duration(&spec.pickup, &spec.dropoff)
            + self.dropoff_duration
    }
}

/// A task that has been timed but not yet spliced into a schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    /// Existing serve tasks keep their id; new tasks get one at commit.
    pub(crate) id: Option<TaskId>,
    pub kind: TaskKind,
    pub begin: SimTime,
    pub end: SimTime,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Stop {
    pub task: Option<TaskId>,
    pub spec: ServeSpec,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Anchor {
    pub location: Vertex,
    pub time: SimTime,
}

#[derive(Debug)]
pub(crate) struct Timeline {
    pub drafts: Vec<TaskDraft>,
    /// Serve begin/end per stop, parallel to the simulated stops.
    pub serves: Vec<(SimTime, SimTime)>,
    pub empty_drive: u64,
    /// First constraint the timeline breaks, if any.
    pub violation: Option<Infeasibility>,
}

pub(crate) fn simulate(
    vehicle: VehicleId,
    service_end: SimTime,
    anchor: Anchor,
    stops: &[Stop],
    timing: &Timing<'_>,
) -> Timeline {
    let mut drafts = Vec::with_capacity(stops.len() * 3);
    let mut serves = Vec::with_capacity(stops.len());
    let mut empty_drive = 0;
    let mut violation = None;
    let mut location = anchor.location;
    let mut t = anchor.time;

    for stop in stops {
        let spec = &stop.spec;
        if !location.same_place(&spec.pickup) {
            let leg = timing.travel.duration(&location, &spec.pickup);
            drafts.push(TaskDraft {
                id: None,
                kind: TaskKind::Drive {
                    from: location,
                    to: spec.pickup,
                },
                begin: t,
                end: t + leg,
            });
            empty_drive += leg;
            t += leg;
        }
        if t < spec.window.earliest() {
            drafts.push(TaskDraft {
                id: None,
                kind: TaskKind::Wait { at: spec.pickup },
                begin: t,
                end: spec.window.earliest(),
            });
            t = spec.window.earliest();
        }
        if t > spec.window.latest() && violation.is_none() {
            violation = Some(Infeasibility::OutsideTimeWindow {
                request: spec.request,
                begin: t,
                earliest: spec.window.earliest(),
                latest: spec.window.latest(),
            });
        }
        let end = t + timing.serve_duration(spec);
        drafts.push(TaskDraft {
            id: stop.task,
            kind: TaskKind::Serve(*spec),
            begin: t,
            end,
        });
        serves.push((t, end));
        t = end;
        location = spec.dropoff;
    }

    if t > service_end && violation.is_none() {
        violation = Some(Infeasibility::BeyondServiceEnd {
            vehicle,
            end: t,
            service_end,
        });
    }

    Timeline {
        drafts,
        serves,
        empty_drive,
        violation,
    }
}
