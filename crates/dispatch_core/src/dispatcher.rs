//! Dispatcher facade: the single authority over requests, schedules and indices.
//!
//! Every mutation of a request's binding or a vehicle's schedule goes through here,
//! which keeps the two spatial indices in step with them:
//!
//! - the vehicle index holds every vehicle at its projected position (where it will
//!   stand once its current schedule is carried out)
//! - the request index holds UNPLANNED requests only, at their pickup vertex

use std::fmt;

use bevy_ecs::prelude::Resource;
use tracing::{debug, instrument};

use crate::error::{DispatchError, InvalidTransition};
use crate::fleet::Fleet;
use crate::model::{RequestId, SimTime, Vehicle, VehicleId};
use crate::optimizer::{Assignment, Proposal, RuleBasedInserter};
use crate::params::{DispatchParams, Goal};
use crate::registry::RequestRegistry;
use crate::request::{Request, RequestStatus, Transition};
use crate::schedule::{Schedule, TaskHandle, Timing};
use crate::spatial::SpatialIndex;
use crate::travel_time::TravelTime;

/// Everything a dispatch pass reads, and everything a commit writes.
#[derive(Debug, Clone)]
pub struct DispatchState {
    pub(crate) registry: RequestRegistry,
    pub(crate) fleet: Fleet,
    pub(crate) vehicle_index: SpatialIndex<VehicleId>,
    pub(crate) request_index: SpatialIndex<RequestId>,
}

impl DispatchState {
    pub fn new(cell_size: f64) -> Self {
        Self {
            registry: RequestRegistry::new(),
            fleet: Fleet::new(),
            vehicle_index: SpatialIndex::new(cell_size),
            request_index: SpatialIndex::new(cell_size),
        }
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.fleet.clear();
        self.vehicle_index.clear();
        self.request_index.clear();
    }

    fn reindex_vehicle(&mut self, vehicle: VehicleId) {
        if let Some(schedule) = self.fleet.schedule(vehicle) {
            self.vehicle_index
                .update(vehicle, schedule.projected_location().point);
        }
    }

    fn reindex_request(&mut self, id: RequestId) {
        let unplanned = self
            .registry
            .get(id)
            .filter(|request| request.status(&self.fleet) == RequestStatus::Unplanned);
        match unplanned {
            Some(request) => {
                let point = request.from_vertex().point;
                self.request_index.insert(id, point);
            }
            None => {
                self.request_index.remove(id);
            }
        }
    }
}

fn timing<'a>(travel: &'a dyn TravelTime, params: &DispatchParams) -> Timing<'a> {
    Timing::new(travel, params.pickup_duration, params.dropoff_duration)
}

#[derive(Resource)]
pub struct Dispatcher {
    params: DispatchParams,
    state: DispatchState,
    travel: Box<dyn TravelTime>,
    inserter: RuleBasedInserter,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("params", &self.params)
            .field("requests", &self.state.registry.len())
            .field("vehicles", &self.state.fleet.len())
            .field("inserter", &self.inserter)
            .finish()
    }
}

impl Dispatcher {
    /// Validate `params` and build an empty dispatcher around `travel`.
    pub fn new(params: DispatchParams, travel: Box<dyn TravelTime>) -> Result<Self, DispatchError> {
        params.validate()?;
        Ok(Self {
            inserter: RuleBasedInserter::new(&params),
            state: DispatchState::new(params.cell_size),
            params,
            travel,
        })
    }

    pub fn params(&self) -> &DispatchParams {
        &self.params
    }

    pub fn goal(&self) -> Goal {
        self.inserter.goal()
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.state.registry
    }

    pub fn fleet(&self) -> &Fleet {
        &self.state.fleet
    }

    pub fn schedule(&self, vehicle: VehicleId) -> Option<&Schedule> {
        self.state.fleet.schedule(vehicle)
    }

    pub fn vehicle_index(&self) -> &SpatialIndex<VehicleId> {
        &self.state.vehicle_index
    }

    /// Positions of the UNPLANNED requests.
    pub fn request_index(&self) -> &SpatialIndex<RequestId> {
        &self.state.request_index
    }

    pub fn travel_time(&self) -> &dyn TravelTime {
        self.travel.as_ref()
    }

    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<(), DispatchError> {
        let (id, point) = (vehicle.id, vehicle.start.point);
        self.state.fleet.add(vehicle)?;
        self.state.vehicle_index.insert(id, point);
        Ok(())
    }

    /// Register an INACTIVE request.
    pub fn add_request(&mut self, request: Request) -> Result<(), DispatchError> {
        self.state.registry.insert(request)
    }

    pub fn request(&self, id: RequestId) -> Option<&Request> {
        self.state.registry.get(id)
    }

    pub fn request_status(&self, id: RequestId) -> Result<RequestStatus, DispatchError> {
        self.state.registry.status(id, &self.state.fleet)
    }

    /// INACTIVE → UNPLANNED; the request becomes visible to the next pass.
    pub fn submit_request(&mut self, id: RequestId) -> Result<(), DispatchError> {
        let state = &mut self.state;
        state.registry.get_mut(id)?.submit(&state.fleet)?;
        state.reindex_request(id);
        Ok(())
    }

    pub fn reject_request(&mut self, id: RequestId) -> Result<(), DispatchError> {
        let state = &mut self.state;
        state.registry.get_mut(id)?.reject(&state.fleet)?;
        state.reindex_request(id);
        Ok(())
    }

    pub fn cancel_request(&mut self, id: RequestId) -> Result<(), DispatchError> {
        let state = &mut self.state;
        state.registry.get_mut(id)?.cancel(&state.fleet)?;
        state.reindex_request(id);
        Ok(())
    }

    /// Take a PLANNED request off its vehicle. The request returns to UNPLANNED and
    /// the remaining planned tasks are re-timed from `now`.
    #[instrument(level = "debug", skip(self))]
    pub fn unschedule_request(&mut self, id: RequestId, now: SimTime) -> Result<(), DispatchError> {
        let handle = self.unbind_in(id, RequestStatus::Planned)?;
        let timing = timing(self.travel.as_ref(), &self.params);
        let removed = self
            .state
            .fleet
            .schedule_mut(handle.vehicle)
            .and_then(|schedule| Ok(schedule.remove_serve_task(handle.task, now, &timing)?));
        self.settle_unbind(id, handle, removed.map(|_| ()))
    }

    /// Abandon a STARTED request: its serve task is cut short at `now` and the request
    /// returns to UNPLANNED.
    #[instrument(level = "debug", skip(self))]
    pub fn abort_request(&mut self, id: RequestId, now: SimTime) -> Result<(), DispatchError> {
        let handle = self.unbind_in(id, RequestStatus::Started)?;
        let timing = timing(self.travel.as_ref(), &self.params);
        let aborted = self
            .state
            .fleet
            .schedule_mut(handle.vehicle)
            .and_then(|schedule| Ok(schedule.abort_serve_task(handle.task, now, &timing)?));
        self.settle_unbind(id, handle, aborted.map(|_| ()))
    }

    /// Unbind `id` if it is currently in `expected`.
    fn unbind_in(&mut self, id: RequestId, expected: RequestStatus) -> Result<TaskHandle, DispatchError> {
        let state = &mut self.state;
        let request = state.registry.get_mut(id)?;
        let status = request.status(&state.fleet);
        if status != expected {
            return Err(InvalidTransition {
                request: id,
                operation: Transition::Unbind,
                status,
            }
            .into());
        }
        Ok(request.unbind(&state.fleet)?)
    }

    /// Finish an unbind: rebind on schedule failure, otherwise refresh both indices.
    fn settle_unbind(
        &mut self,
        id: RequestId,
        handle: TaskHandle,
        outcome: Result<(), DispatchError>,
    ) -> Result<(), DispatchError> {
        let state = &mut self.state;
        if let Err(err) = outcome {
            state
                .registry
                .get_mut(id)?
                .bind_to_serve_task(handle, &state.fleet)?;
            return Err(err);
        }
        state.reindex_request(id);
        state.reindex_vehicle(handle.vehicle);
        debug!(request = %id, vehicle = %handle.vehicle, "request unbound");
        Ok(())
    }

    /// Telemetry: mark tasks performed or started as of `now`. Returns the vehicles
    /// whose schedules changed.
    pub fn advance_to(&mut self, now: SimTime) -> Vec<VehicleId> {
        self.state.fleet.advance_to(now)
    }

    /// Run one dispatch pass at `now` and return the committed insertions.
    pub fn dispatch(&mut self, now: SimTime) -> Vec<Assignment> {
        let timing = timing(self.travel.as_ref(), &self.params);
        if self.params.parallel {
            let proposals = self.inserter.plan(now, &self.state, &timing, true);
            self.inserter.apply(proposals, now, &mut self.state, &timing)
        } else {
            self.inserter.run_pass(now, &mut self.state, &timing)
        }
    }

    /// Search without committing: the best proposal per driving unit, in processing
    /// order, against the current state.
    pub fn plan(&self, now: SimTime) -> Vec<Proposal> {
        let timing = timing(self.travel.as_ref(), &self.params);
        self.inserter
            .plan(now, &self.state, &timing, self.params.parallel)
    }

    /// Commit proposals from [Dispatcher::plan] in order. Proposals invalidated since
    /// planning are discarded.
    pub fn apply(&mut self, proposals: Vec<Proposal>, now: SimTime) -> Vec<Assignment> {
        let timing = timing(self.travel.as_ref(), &self.params);
        self.inserter
            .apply(proposals, now, &mut self.state, &timing)
    }

    /// Drop every request and vehicle, e.g. between simulation runs.
    pub fn clear(&mut self) {
        self.state.clear();
    }
}
