//! Core value types shared by every dispatch component: ids, network vertices,
//! time windows and vehicles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Simulation time in seconds.
pub type SimTime = u64;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a transport request.
    RequestId,
    "r"
);
id_type!(
    /// Identity of a fleet vehicle.
    VehicleId,
    "v"
);
id_type!(
    /// Identity of a network vertex.
    VertexId,
    "n"
);
id_type!(
    /// Opaque identity of the customer owning a request.
    CustomerId,
    "c"
);

/// Planar coordinate in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A network location. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub point: Point,
}

impl Vertex {
    pub const fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id: VertexId(id),
            point: Point::new(x, y),
        }
    }

    /// Two vertices are the same place when their ids match.
    pub fn same_place(&self, other: &Vertex) -> bool {
        self.id == other.id
    }
}

/// Closed interval `[earliest, latest]` of simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    earliest: SimTime,
    latest: SimTime,
}

impl TimeWindow {
    pub fn new(earliest: SimTime, latest: SimTime) -> Result<Self, ModelError> {
        if earliest > latest {
            return Err(ModelError::EmptyTimeWindow { earliest, latest });
        }
        Ok(Self { earliest, latest })
    }

    /// Window open from `earliest` with no practical upper bound.
    pub fn open_from(earliest: SimTime) -> Self {
        Self {
            earliest,
            latest: SimTime::MAX,
        }
    }

    pub fn earliest(&self) -> SimTime {
        self.earliest
    }

    pub fn latest(&self) -> SimTime {
        self.latest
    }

    pub fn contains(&self, time: SimTime) -> bool {
        self.earliest <= time && time <= self.latest
    }
}

/// A fleet vehicle. Its schedule lives in the [Fleet](crate::fleet::Fleet).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub capacity: u32,
    /// Where the vehicle enters service.
    pub start: Vertex,
    /// Operating hours: the schedule opens at `earliest` and must close by `latest`.
    pub service: TimeWindow,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        capacity: u32,
        start: Vertex,
        service: TimeWindow,
    ) -> Result<Self, ModelError> {
        if capacity == 0 {
            return Err(ModelError::ZeroCapacity(id));
        }
        Ok(Self {
            id,
            capacity,
            start,
            service,
        })
    }

    /// Whether the vehicle may still accept work at `now`.
    pub fn in_service(&self, now: SimTime) -> bool {
        now < self.service.latest()
    }
}
