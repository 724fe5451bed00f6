//! Dispatch configuration.
//!
//! Parameters arrive either as a serde document (JSON, TOML, ...) with
//! `SCREAMING_SNAKE_CASE` keys or as the string map the host simulation passes
//! around. Both paths end in [DispatchParams::validate], which the dispatcher runs
//! before any pass.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const GOAL: &str = "GOAL";
pub const NEAREST_REQUESTS_LIMIT: &str = "NEAREST_REQUESTS_LIMIT";
pub const NEAREST_VEHICLES_LIMIT: &str = "NEAREST_VEHICLES_LIMIT";
pub const CELL_SIZE: &str = "CELL_SIZE";
pub const PICKUP_DURATION: &str = "PICKUP_DURATION";
pub const DROPOFF_DURATION: &str = "DROPOFF_DURATION";
pub const HOTSPOT_WEIGHT: &str = "HOTSPOT_WEIGHT";
pub const IMBALANCE_WEIGHT: &str = "IMBALANCE_WEIGHT";
pub const PARALLEL: &str = "PARALLEL";

/// Optimization objective of the rule-based inserter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Goal {
    /// Requests pick the vehicle that serves them soonest.
    #[default]
    MinWaitTime,
    /// Idle vehicles pick requests so as to even out demand and supply per cell.
    DemandSupplyEquil,
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::MinWaitTime => f.write_str("MIN_WAIT_TIME"),
            Goal::DemandSupplyEquil => f.write_str("DEMAND_SUPPLY_EQUIL"),
        }
    }
}

impl FromStr for Goal {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "MIN_WAIT_TIME" => Ok(Goal::MinWaitTime),
            "DEMAND_SUPPLY_EQUIL" => Ok(Goal::DemandSupplyEquil),
            other => Err(ConfigError::UnknownGoal(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default, deny_unknown_fields)]
pub struct DispatchParams {
    pub goal: Goal,
    /// Candidate requests examined per vehicle. Large values disable filtering.
    pub nearest_requests_limit: usize,
    /// Candidate vehicles examined per request. Large values disable filtering.
    pub nearest_vehicles_limit: usize,
    /// Grid cell edge in metres. Large values collapse the grid to one cell.
    pub cell_size: f64,
    pub pickup_duration: u64,
    pub dropoff_duration: u64,
    /// Seconds credited per unmatched request in the target cell.
    pub hotspot_weight: f64,
    /// Seconds charged per unit of demand left uncovered in the source cell.
    pub imbalance_weight: f64,
    /// Search partitions concurrently, then commit serially.
    pub parallel: bool,
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            goal: Goal::MinWaitTime,
            nearest_requests_limit: 30,
            nearest_vehicles_limit: 30,
            cell_size: 1_000.0,
            pickup_duration: 120,
            dropoff_duration: 60,
            hotspot_weight: 60.0,
            imbalance_weight: 120.0,
            parallel: false,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Unparsable {
        key,
        value: value.to_string(),
    })
}

impl DispatchParams {
    /// Build from string-keyed options; omitted keys keep their defaults.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut out = Self::default();
        for (key, value) in params {
            match key.as_str() {
                GOAL => out.goal = value.parse()?,
                NEAREST_REQUESTS_LIMIT => {
                    out.nearest_requests_limit = parse(NEAREST_REQUESTS_LIMIT, value)?
                }
                NEAREST_VEHICLES_LIMIT => {
                    out.nearest_vehicles_limit = parse(NEAREST_VEHICLES_LIMIT, value)?
                }
                CELL_SIZE => out.cell_size = parse(CELL_SIZE, value)?,
                PICKUP_DURATION => out.pickup_duration = parse(PICKUP_DURATION, value)?,
                DROPOFF_DURATION => out.dropoff_duration = parse(DROPOFF_DURATION, value)?,
                HOTSPOT_WEIGHT => out.hotspot_weight = parse(HOTSPOT_WEIGHT, value)?,
                IMBALANCE_WEIGHT => out.imbalance_weight = parse(IMBALANCE_WEIGHT, value)?,
                PARALLEL => out.parallel = parse(PARALLEL, value)?,
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
        }
        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nearest_requests_limit == 0 {
            return Err(ConfigError::NotPositive {
                key: NEAREST_REQUESTS_LIMIT,
                value: self.nearest_requests_limit.to_string(),
            });
        }
        if self.nearest_vehicles_limit == 0 {
            return Err(ConfigError::NotPositive {
                key: NEAREST_VEHICLES_LIMIT,
                value: self.nearest_vehicles_limit.to_string(),
            });
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::NotPositive {
                key: CELL_SIZE,
                value: self.cell_size.to_string(),
            });
        }
        for (key, weight) in [
            (HOTSPOT_WEIGHT, self.hotspot_weight),
            (IMBALANCE_WEIGHT, self.imbalance_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::NotPositive {
                    key,
                    value: weight.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_limits(mut self, nearest_requests: usize, nearest_vehicles: usize) -> Self {
        self.nearest_requests_limit = nearest_requests;
        self.nearest_vehicles_limit = nearest_vehicles;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_service_durations(mut self, pickup: u64, dropoff: u64) -> Self {
        self.pickup_duration = pickup;
        self.dropoff_duration = dropoff;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
