//! The fleet: every vehicle together with the schedule it exclusively owns.

use std::collections::BTreeMap;

use crate::error::DispatchError;
use crate::model::{SimTime, Vehicle, VehicleId};
use crate::request::TaskStatusLookup;
use crate::schedule::{Schedule, TaskHandle, TaskStatus};

#[derive(Debug, Clone, Default)]
pub struct Fleet {
    schedules: BTreeMap<VehicleId, Schedule>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, vehicle: Vehicle) -> Result<(), DispatchError> {
        if self.schedules.contains_key(&vehicle.id) {
            return Err(DispatchError::DuplicateVehicle(vehicle.id));
        }
        self.schedules.insert(vehicle.id, Schedule::new(vehicle));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn schedule(&self, id: VehicleId) -> Option<&Schedule> {
        self.schedules.get(&id)
    }

    pub(crate) fn schedule_mut(&mut self, id: VehicleId) -> Result<&mut Schedule, DispatchError> {
        self.schedules
            .get_mut(&id)
            .ok_or(DispatchError::UnknownVehicle(id))
    }

    /// Schedules in ascending vehicle id.
    pub fn schedules(&self) -> impl Iterator<Item = &Schedule> {
        self.schedules.values()
    }

    /// Vehicles with nothing planned or under way that can still take work at `now`.
    pub fn idle_vehicles(&self, now: SimTime) -> impl Iterator<Item = &Schedule> {
        self.schedules
            .values()
            .filter(move |schedule| schedule.is_idle() && schedule.vehicle().in_service(now))
    }

    /// Apply telemetry to every schedule; returns the vehicles whose tasks changed.
    pub fn advance_to(&mut self, now: SimTime) -> Vec<VehicleId> {
        self.schedules
            .iter_mut()
            .filter_map(|(id, schedule)| schedule.advance_to(now).then_some(*id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.schedules.clear();
    }
}

impl TaskStatusLookup for Fleet {
    fn serve_task_status(&self, handle: TaskHandle) -> Option<TaskStatus> {
        self.schedules
            .get(&handle.vehicle)?
            .task(handle.task)
            .map(|task| task.status())
    }
}
