//! Error taxonomy for the dispatch core.
//!
//! Each concern owns a small error type; [DispatchError] aggregates them for the
//! [Dispatcher](crate::dispatcher::Dispatcher) facade.

use crate::model::{RequestId, SimTime, VehicleId};
use crate::request::{RequestStatus, Transition};
use crate::schedule::{TaskId, TaskStatus};

/// A request state-machine operation was called outside its legal source state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request {request}: cannot {operation} while {status}")]
pub struct InvalidTransition {
    pub request: RequestId,
    pub operation: Transition,
    pub status: RequestStatus,
}

/// Why a tentative insertion cannot be applied. A normal negative search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Infeasibility {
    #[error("request {request} would be served at {begin}, outside [{earliest}, {latest}]")]
    OutsideTimeWindow {
        request: RequestId,
        begin: SimTime,
        earliest: SimTime,
        latest: SimTime,
    },
    #[error("vehicle {vehicle} would finish at {end}, after its service end {service_end}")]
    BeyondServiceEnd {
        vehicle: VehicleId,
        end: SimTime,
        service_end: SimTime,
    },
    #[error("vehicle {vehicle} capacity {capacity} cannot carry quantity {quantity}")]
    CapacityExceeded {
        vehicle: VehicleId,
        capacity: u32,
        quantity: u32,
    },
    #[error("slot {position} is not open for insertion on vehicle {vehicle}")]
    SlotUnavailable { vehicle: VehicleId, position: usize },
}

/// Failures of schedule mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Infeasible(#[from] Infeasibility),
    #[error("schedule of vehicle {vehicle} changed since evaluation (revision {expected} != {actual})")]
    StaleDelta {
        vehicle: VehicleId,
        expected: u64,
        actual: u64,
    },
    #[error("vehicle {vehicle} has no task {task}")]
    UnknownTask { vehicle: VehicleId, task: TaskId },
    #[error("task {task} of vehicle {vehicle} is not a serve task")]
    NotAServeTask { vehicle: VehicleId, task: TaskId },
    #[error("task {task} of vehicle {vehicle} is {status} and cannot be changed this way")]
    TaskLocked {
        vehicle: VehicleId,
        task: TaskId,
        status: TaskStatus,
    },
}

/// Invalid dispatch configuration. Raised before any dispatch pass runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown goal '{0}' (expected MIN_WAIT_TIME or DEMAND_SUPPLY_EQUIL)")]
    UnknownGoal(String),
    #[error("unrecognized option '{0}'")]
    UnknownOption(String),
    #[error("option {key} has unparsable value '{value}'")]
    Unparsable { key: &'static str, value: String },
    #[error("option {key} must be positive, got {value}")]
    NotPositive { key: &'static str, value: String },
}

/// Invalid entity data handed to the registry or fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("time window [{earliest}, {latest}] is empty")]
    EmptyTimeWindow { earliest: SimTime, latest: SimTime },
    #[error("request {0} has zero quantity")]
    ZeroQuantity(RequestId),
    #[error("vehicle {0} has zero capacity")]
    ZeroCapacity(VehicleId),
}

/// Umbrella error returned by the dispatcher facade.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("unknown request {0}")]
    UnknownRequest(RequestId),
    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleId),
    #[error("request {0} is already registered")]
    DuplicateRequest(RequestId),
    #[error("vehicle {0} is already registered")]
    DuplicateVehicle(VehicleId),
    #[error("request {request} is {status}, candidate discarded")]
    StaleCandidate {
        request: RequestId,
        status: RequestStatus,
    },
}
