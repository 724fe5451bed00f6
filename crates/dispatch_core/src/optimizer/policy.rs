//! Demand/supply bookkeeping per grid cell and the score built on it.

use std::collections::HashMap;

use crate::spatial::CellKey;

use super::types::Candidate;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComponents {
    /// Seconds the assignment adds: wait, detour and delays pushed downstream.
    pub pickup_time_cost: f64,
    pub imbalance_penalty: f64,
    pub hotspot_bonus: f64,
}

impl ScoreComponents {
    pub fn total(&self) -> f64 {
        self.pickup_time_cost + self.imbalance_penalty - self.hotspot_bonus
    }
}

/// Unmatched demand and idle supply per cell, kept current within a pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneBalance {
    demand: HashMap<CellKey, usize>,
    supply: HashMap<CellKey, usize>,
}

pub fn build_zone_counts(cells: impl Iterator<Item = CellKey>) -> HashMap<CellKey, usize> {
    let mut counts = HashMap::new();
    for cell in cells {
        *counts.entry(cell).or_insert(0) += 1;
    }
    counts
}

fn decrement(counts: &mut HashMap<CellKey, usize>, cell: CellKey) {
    if let Some(count) = counts.get_mut(&cell) {
        *count -= 1;
        if *count == 0 {
            counts.remove(&cell);
        }
    }
}

impl ZoneBalance {
    pub fn new(demand: HashMap<CellKey, usize>, supply: HashMap<CellKey, usize>) -> Self {
        Self { demand, supply }
    }

    pub fn demand(&self, cell: CellKey) -> usize {
        self.demand.get(&cell).copied().unwrap_or(0)
    }

    pub fn supply(&self, cell: CellKey) -> usize {
        self.supply.get(&cell).copied().unwrap_or(0)
    }

    /// A request in `request_cell` was matched. `idle_cell` is the cell of the vehicle
    /// when it was idle supply; busy vehicles were never counted.
    pub fn record_assignment(&mut self, request_cell: CellKey, idle_cell: Option<CellKey>) {
        decrement(&mut self.demand, request_cell);
        if let Some(cell) = idle_cell {
            decrement(&mut self.supply, cell);
        }
    }
}

/// Score one candidate: the time it costs, plus the demand it would leave uncovered
/// in the vehicle's cell, minus a bonus for draining a crowded request cell.
pub fn score_candidate(
    candidate: &Candidate,
    zones: &ZoneBalance,
    imbalance_weight: f64,
    hotspot_weight: f64,
) -> ScoreComponents {
    let pickup_time_cost = candidate.cost.added_cost() as f64;

    let source = candidate.vehicle_cell;
    let served_locally = usize::from(candidate.request_cell == source);
    let demand_left = zones.demand(source).saturating_sub(served_locally);
    let supply_left = zones.supply(source).saturating_sub(1);
    let imbalance_penalty = demand_left.saturating_sub(supply_left) as f64 * imbalance_weight;

    let hotspot_bonus = zones.demand(candidate.request_cell) as f64 * hotspot_weight;

    ScoreComponents {
        pickup_time_cost,
        imbalance_penalty,
        hotspot_bonus,
    }
}
