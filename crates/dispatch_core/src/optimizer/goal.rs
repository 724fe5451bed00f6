use std::fmt;

use crate::params::{DispatchParams, Goal};

use super::policy::{score_candidate, ZoneBalance};
use super::types::Candidate;

/// Which side of the market drives the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSide {
    /// Each unplanned request looks for vehicles.
    Requests,
    /// Each idle vehicle looks for requests.
    Vehicles,
}

/// Trait for dispatch objectives. Lower scores are better.
pub trait GoalStrategy: Send + Sync + fmt::Debug {
    fn goal(&self) -> Goal;

    /// Driving side of a pass that starts with `unplanned` requests and `idle` vehicles.
    fn search_side(&self, unplanned: usize, idle: usize) -> SearchSide;

    fn score(&self, candidate: &Candidate, zones: &ZoneBalance) -> f64;
}

/// Serve every request as soon as possible: the score is the added cost of the
/// insertion.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinWaitTimeGoal;

impl GoalStrategy for MinWaitTimeGoal {
    fn goal(&self) -> Goal {
        Goal::MinWaitTime
    }

    fn search_side(&self, _unplanned: usize, _idle: usize) -> SearchSide {
        SearchSide::Requests
    }

    fn score(&self, candidate: &Candidate, _zones: &ZoneBalance) -> f64 {
        candidate.cost.added_cost() as f64
    }
}

/// Send idle vehicles where unmatched demand is concentrated, without stripping
/// their own cell bare.
#[derive(Debug, Clone, Copy)]
pub struct DemandSupplyGoal {
    pub imbalance_weight: f64,
    pub hotspot_weight: f64,
}

impl GoalStrategy for DemandSupplyGoal {
    fn goal(&self) -> Goal {
        Goal::DemandSupplyEquil
    }

    /// Idle vehicles choose only while they are the scarce side; otherwise each
    /// request picks its best-scoring vehicle.
    fn search_side(&self, unplanned: usize, idle: usize) -> SearchSide {
        if unplanned > idle {
            SearchSide::Vehicles
        } else {
            SearchSide::Requests
        }
    }

    fn score(&self, candidate: &Candidate, zones: &ZoneBalance) -> f64 {
        score_candidate(candidate, zones, self.imbalance_weight, self.hotspot_weight).total()
    }
}

pub fn strategy_for(params: &DispatchParams) -> Box<dyn GoalStrategy> {
    match params.goal {
        Goal::MinWaitTime => Box::new(MinWaitTimeGoal),
        Goal::DemandSupplyEquil => Box::new(DemandSupplyGoal {
            imbalance_weight: params.imbalance_weight,
            hotspot_weight: params.hotspot_weight,
        }),
    }
}
