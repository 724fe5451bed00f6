use serde::{Deserialize, Serialize};

use crate::model::{RequestId, VehicleId};
use crate::schedule::{InsertionCost, InsertionDelta, ScheduleDelta};
use crate::spatial::CellKey;

/// A feasible request-vehicle pairing under evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub request: RequestId,
    pub vehicle: VehicleId,
    pub cost: InsertionCost,
    /// Cell of the request's pickup vertex.
    pub request_cell: CellKey,
    /// Cell of the vehicle's projected position.
    pub vehicle_cell: CellKey,
}

/// Best candidate found for one search unit, waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub request: RequestId,
    pub vehicle: VehicleId,
    pub delta: InsertionDelta,
    pub score: f64,
}

/// A committed insertion, reported to the host simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub request: RequestId,
    pub vehicle: VehicleId,
    pub delta: ScheduleDelta,
}
