//! Rule-based insertion heuristic.
//!
//! One pass walks the driving side picked by the goal (always requests for
//! MIN_WAIT_TIME; for DEMAND_SUPPLY_EQUIL idle vehicles while requests outnumber
//! them, requests otherwise), finds the best feasible insertion among the nearest
//! eligible candidates and commits it before moving on. Committing revalidates
//! the request status and the schedule revision, so a candidate that went stale
//! between search and commit is dropped without side effects.

use tracing::{debug, info, instrument, trace, warn};

use crate::dispatcher::DispatchState;
use crate::error::DispatchError;
use crate::model::{RequestId, SimTime, VehicleId};
use crate::params::{DispatchParams, Goal};
use crate::request::{Request, RequestStatus};
use crate::schedule::{Schedule, Timing};

use super::goal::{strategy_for, GoalStrategy, SearchSide};
use super::policy::{build_zone_counts, ZoneBalance};
use super::types::{Assignment, Candidate, Proposal};

#[derive(Debug)]
pub struct RuleBasedInserter {
    strategy: Box<dyn GoalStrategy>,
    nearest_requests_limit: usize,
    nearest_vehicles_limit: usize,
}

/// Keep `candidate` if it scores lower than `best`, breaking ties on `tie_break`.
fn keep_better(
    best: &mut Option<Proposal>,
    candidate: Proposal,
    tie_break: impl Fn(&Proposal) -> (u64, usize),
) {
    let better = match best.as_ref() {
        None => true,
        Some(current) => candidate
            .score
            .total_cmp(&current.score)
            .then_with(|| tie_break(&candidate).cmp(&tie_break(current)))
            .is_lt(),
    };
    if better {
        *best = Some(candidate);
    }
}

fn can_carry(schedule: &Schedule, request: &Request, now: SimTime) -> bool {
    let vehicle = schedule.vehicle();
    vehicle.in_service(now) && vehicle.capacity >= request.quantity()
}

impl RuleBasedInserter {
    pub fn new(params: &DispatchParams) -> Self {
        Self::with_strategy(
            strategy_for(params),
            params.nearest_requests_limit,
            params.nearest_vehicles_limit,
        )
    }

    pub fn with_strategy(
        strategy: Box<dyn GoalStrategy>,
        nearest_requests_limit: usize,
        nearest_vehicles_limit: usize,
    ) -> Self {
        Self {
            strategy,
            nearest_requests_limit,
            nearest_vehicles_limit,
        }
    }

    pub fn goal(&self) -> Goal {
        self.strategy.goal()
    }

    pub fn strategy(&self) -> &dyn GoalStrategy {
        self.strategy.as_ref()
    }

    /// Cheapest feasible insertion of `request` among its nearest vehicles, ordered by
    /// `(score, vehicle id, slot)`.
    pub(crate) fn best_vehicle_for(
        &self,
        request: &Request,
        now: SimTime,
        state: &DispatchState,
        zones: &ZoneBalance,
        timing: &Timing<'_>,
    ) -> Option<Proposal> {
        let spec = request.serve_spec();
        let request_cell = state.request_index.cell_key(&spec.pickup.point);
        let mut best = None;

        let eligible = |id: VehicleId| {
            state
                .fleet
                .schedule(id)
                .is_some_and(|schedule| can_carry(schedule, request, now))
        };
        for neighbor in state.vehicle_index.k_nearest_filtered(
            &spec.pickup.point,
            self.nearest_vehicles_limit,
            eligible,
        ) {
            let Some(schedule) = state.fleet.schedule(neighbor.id) else {
                continue;
            };
            let vehicle_cell = state
                .vehicle_index
                .cell_key(&schedule.projected_location().point);
            for position in schedule.insertion_slots() {
                match schedule.evaluate_insertion(&spec, position, now, timing) {
                    Ok(delta) => {
                        let candidate = Candidate {
                            request: request.id(),
                            vehicle: neighbor.id,
                            cost: delta.cost(),
                            request_cell,
                            vehicle_cell,
                        };
                        let score = self.strategy.score(&candidate, zones);
                        keep_better(
                            &mut best,
                            Proposal {
                                request: request.id(),
                                vehicle: neighbor.id,
                                delta,
                                score,
                            },
                            |p| (p.vehicle.0, p.delta.position()),
                        );
                    }
                    Err(reason) => {
                        trace!(request = %request.id(), vehicle = %neighbor.id, position, %reason, "infeasible");
                    }
                }
            }
        }
        best
    }

    /// Best feasible request for `schedule` among the nearest unplanned ones, ordered by
    /// `(score, request id, slot)`.
    pub(crate) fn best_request_for(
        &self,
        schedule: &Schedule,
        now: SimTime,
        state: &DispatchState,
        zones: &ZoneBalance,
        timing: &Timing<'_>,
    ) -> Option<Proposal> {
        let origin = schedule.projected_location();
        let vehicle = schedule.vehicle_id();
        let vehicle_cell = state.vehicle_index.cell_key(&origin.point);
        let mut best = None;

        let eligible = |id: RequestId| {
            state.registry.get(id).is_some_and(|request| {
                request.status(&state.fleet) == RequestStatus::Unplanned
                    && can_carry(schedule, request, now)
            })
        };
        for neighbor in state.request_index.k_nearest_filtered(
            &origin.point,
            self.nearest_requests_limit,
            eligible,
        ) {
            let Some(request) = state.registry.get(neighbor.id) else {
                continue;
            };
            let spec = request.serve_spec();
            let request_cell = state.request_index.cell_key(&spec.pickup.point);
            for position in schedule.insertion_slots() {
                match schedule.evaluate_insertion(&spec, position, now, timing) {
                    Ok(delta) => {
                        let candidate = Candidate {
                            request: request.id(),
                            vehicle,
                            cost: delta.cost(),
                            request_cell,
                            vehicle_cell,
                        };
                        let score = self.strategy.score(&candidate, zones);
                        keep_better(
                            &mut best,
                            Proposal {
                                request: request.id(),
                                vehicle,
                                delta,
                                score,
                            },
                            |p| (p.request.0, p.delta.position()),
                        );
                    }
                    Err(reason) => {
                        trace!(request = %request.id(), %vehicle, position, %reason, "infeasible");
                    }
                }
            }
        }
        best
    }

    /// Driving side of a pass at `now`, from the goal and the current market.
    pub(crate) fn search_side(&self, now: SimTime, state: &DispatchState) -> SearchSide {
        let unplanned = state.request_index.len();
        let idle = state.fleet.idle_vehicles(now).count();
        self.strategy.search_side(unplanned, idle)
    }

    /// Zone counts for goals that score with them; empty otherwise.
    pub(crate) fn zones_for(&self, now: SimTime, state: &DispatchState) -> ZoneBalance {
        match self.goal() {
            Goal::MinWaitTime => ZoneBalance::default(),
            Goal::DemandSupplyEquil => self.zone_balance(now, state),
        }
    }

    /// Unmatched demand and idle supply per cell at `now`.
    pub(crate) fn zone_balance(&self, now: SimTime, state: &DispatchState) -> ZoneBalance {
        let supply = build_zone_counts(state.fleet.idle_vehicles(now).map(|schedule| {
            state
                .vehicle_index
                .cell_key(&schedule.projected_location().point)
        }));
        ZoneBalance::new(state.request_index.cell_counts(), supply)
    }

    /// Sequential pass: search and commit one driving unit at a time.
    #[instrument(level = "debug", skip_all, fields(now = now, goal = %self.goal()))]
    pub(crate) fn run_pass(
        &self,
        now: SimTime,
        state: &mut DispatchState,
        timing: &Timing<'_>,
    ) -> Vec<Assignment> {
        let mut assignments = Vec::new();
        let mut examined = 0usize;

        let side = self.search_side(now, state);
        let mut zones = self.zones_for(now, state);

        match side {
            SearchSide::Requests => {
                let order: Vec<RequestId> = state
                    .registry
                    .unplanned(&state.fleet)
                    .iter()
                    .map(|request| request.id())
                    .collect();
                for id in order {
                    examined += 1;
                    let Some(request) = state.registry.get(id) else {
                        continue;
                    };
                    let Some(proposal) = self.best_vehicle_for(request, now, state, &zones, timing)
                    else {
                        debug!(request = %id, "no feasible vehicle, left unplanned");
                        continue;
                    };
                    if let Some(assignment) =
                        commit_recording_zones(&proposal, now, state, &mut zones, timing)
                    {
                        assignments.push(assignment);
                    }
                }
            }
            SearchSide::Vehicles => {
                let idle: Vec<VehicleId> = state
                    .fleet
                    .idle_vehicles(now)
                    .map(Schedule::vehicle_id)
                    .collect();
                for vehicle in idle {
                    examined += 1;
                    let Some(schedule) = state.fleet.schedule(vehicle) else {
                        continue;
                    };
                    let Some(proposal) = self.best_request_for(schedule, now, state, &zones, timing)
                    else {
                        trace!(%vehicle, "no feasible request");
                        continue;
                    };
                    if let Some(assignment) =
                        commit_recording_zones(&proposal, now, state, &mut zones, timing)
                    {
                        assignments.push(assignment);
                    }
                }
            }
        }

        info!(examined, committed = assignments.len(), "dispatch pass finished");
        assignments
    }

    /// Commit proposals in the given order, dropping those invalidated on the way.
    #[instrument(level = "debug", skip_all, fields(now = now, proposals = proposals.len()))]
    pub(crate) fn apply(
        &self,
        proposals: Vec<Proposal>,
        now: SimTime,
        state: &mut DispatchState,
        timing: &Timing<'_>,
    ) -> Vec<Assignment> {
        let offered = proposals.len();
        let assignments: Vec<Assignment> = proposals
            .iter()
            .filter_map(|proposal| try_commit(proposal, now, state, timing))
            .collect();
        info!(
            offered,
            committed = assignments.len(),
            "proposals applied"
        );
        assignments
    }
}

/// Commit, then take the matched request and (if it was idle) the vehicle out of the
/// zone counts so later candidates in the pass see the updated balance.
fn commit_recording_zones(
    proposal: &Proposal,
    now: SimTime,
    state: &mut DispatchState,
    zones: &mut ZoneBalance,
    timing: &Timing<'_>,
) -> Option<Assignment> {
    let request_cell = state.request_index.cell_of(proposal.request);
    let idle_cell = state
        .fleet
        .schedule(proposal.vehicle)
        .filter(|schedule| schedule.is_idle())
        .and_then(|_| state.vehicle_index.cell_of(proposal.vehicle));
    let assignment = try_commit(proposal, now, state, timing)?;
    if let Some(request_cell) = request_cell {
        zones.record_assignment(request_cell, idle_cell);
    }
    Some(assignment)
}

fn try_commit(
    proposal: &Proposal,
    now: SimTime,
    state: &mut DispatchState,
    timing: &Timing<'_>,
) -> Option<Assignment> {
    match commit(proposal, now, state, timing) {
        Ok(assignment) => Some(assignment),
        Err(err) => {
            warn!(request = %proposal.request, vehicle = %proposal.vehicle, %err, "candidate discarded");
            None
        }
    }
}

/// Revalidate, splice into the schedule, bind the request, then refresh both indices.
/// Any failure leaves every component as it was.
pub(crate) fn commit(
    proposal: &Proposal,
    now: SimTime,
    state: &mut DispatchState,
    timing: &Timing<'_>,
) -> Result<Assignment, DispatchError> {
    let DispatchState {
        registry,
        fleet,
        vehicle_index,
        request_index,
    } = state;

    let status = registry.status(proposal.request, &*fleet)?;
    if status != RequestStatus::Unplanned {
        return Err(DispatchError::StaleCandidate {
            request: proposal.request,
            status,
        });
    }

    let handle = fleet
        .schedule_mut(proposal.vehicle)?
        .commit_insertion(&proposal.delta)?;

    let bound = registry
        .get_mut(proposal.request)
        .and_then(|request| Ok(request.bind_to_serve_task(handle, &*fleet)?));
    if let Err(err) = bound {
        fleet
            .schedule_mut(proposal.vehicle)?
            .remove_serve_task(handle.task, now, timing)?;
        return Err(err);
    }

    request_index.remove(proposal.request);
    if let Some(schedule) = fleet.schedule(proposal.vehicle) {
        vehicle_index.update(proposal.vehicle, schedule.projected_location().point);
    }

    let delta = proposal.delta.summary();
    debug!(
        request = %proposal.request,
        vehicle = %proposal.vehicle,
        task = %handle.task,
        serve_begin = delta.serve_begin,
        added_cost = delta.cost.added_cost(),
        "insertion committed"
    );
    Ok(Assignment {
        request: proposal.request,
        vehicle: proposal.vehicle,
        delta,
    })
}
