//! Side-effect-free evaluation of a tentative serve insertion.

use serde::{Deserialize, Serialize};

use crate::error::Infeasibility;
use crate::model::{RequestId, SimTime, VehicleId};

use super::timeline::{simulate, Stop, TaskDraft, Timing};
use super::{Schedule, ServeSpec};

/// What an insertion adds on top of the schedule as it would run without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertionCost {
    /// Seconds between the earliest pickup time and the planned pickup.
    pub wait: u64,
    /// Sum of the pickup delays pushed onto requests already in the schedule.
    pub downstream_delay: u64,
    /// Extra empty driving.
    pub detour: u64,
}

impl InsertionCost {
    pub fn added_cost(&self) -> u64 {
        self.wait + self.downstream_delay + self.detour
    }
}

/// A feasible insertion, ready for [Schedule::commit_insertion].
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionDelta {
    vehicle: VehicleId,
    request: RequestId,
    position: usize,
    revision: u64,
    suffix: Vec<TaskDraft>,
    serve_begin: SimTime,
    serve_end: SimTime,
    cost: InsertionCost,
}

impl InsertionDelta {
    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    pub fn request(&self) -> RequestId {
        self.request
    }

    /// Index among the planned serves at which the new serve lands.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Schedule revision the delta was computed against.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The planned tasks the schedule will hold after the commit.
    pub fn suffix(&self) -> &[TaskDraft] {
        &self.suffix
    }

    pub fn serve_begin(&self) -> SimTime {
        self.serve_begin
    }

    pub fn serve_end(&self) -> SimTime {
        self.serve_end
    }

    pub fn cost(&self) -> InsertionCost {
        self.cost
    }

    pub fn summary(&self) -> ScheduleDelta {
        ScheduleDelta {
            position: self.position,
            serve_begin: self.serve_begin,
            serve_end: self.serve_end,
            cost: self.cost,
        }
    }
}

/// Compact, serializable record of a committed insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDelta {
    pub position: usize,
    pub serve_begin: SimTime,
    pub serve_end: SimTime,
    pub cost: InsertionCost,
}

impl Schedule {
    /// Time a new serve at `position` among the planned serves, departing no earlier
    /// than `now`. Never mutates the schedule.
    pub fn evaluate_insertion(
        &self,
        spec: &ServeSpec,
        position: usize,
        now: SimTime,
        timing: &Timing<'_>,
    ) -> Result<InsertionDelta, Infeasibility> {
        let vehicle = self.vehicle.id;
        if spec.quantity > self.vehicle.capacity {
            return Err(Infeasibility::CapacityExceeded {
                vehicle,
                capacity: self.vehicle.capacity,
                quantity: spec.quantity,
            });
        }
        if !self.insertion_slots().contains(&position) {
            return Err(Infeasibility::SlotUnavailable { vehicle, position });
        }

        let anchor = self.anchor(now);
        let service_end = self.vehicle.service.latest();
        let stops = self.stops();
        let baseline = simulate(vehicle, service_end, anchor, &stops, timing);

        let mut with_new = stops;
        with_new.insert(
            position,
            Stop {
                task: None,
                spec: *spec,
            },
        );
        let candidate = simulate(vehicle, service_end, anchor, &with_new, timing);
        if let Some(violation) = candidate.violation {
            return Err(violation);
        }

        let (serve_begin, serve_end) = candidate.serves[position];
        let downstream_delay = candidate
            .serves
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != position)
            .map(|(idx, (begin, _))| {
                let before = if idx < position { idx } else { idx - 1 };
                begin.saturating_sub(baseline.serves[before].0)
            })
            .sum();

        Ok(InsertionDelta {
            vehicle,
            request: spec.request,
            position,
            revision: self.revision,
            suffix: candidate.drafts,
            serve_begin,
            serve_end,
            cost: InsertionCost {
                wait: serve_begin.saturating_sub(spec.window.earliest()),
                downstream_delay,
                detour: candidate.empty_drive.saturating_sub(baseline.empty_drive),
            },
        })
    }
}
