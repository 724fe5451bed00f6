//! Snapshot search: every driving unit is searched against the same read-only
//! state, optionally in parallel, and nothing is committed.
//!
//! Units are grouped by grid cell and the groups fan out over rayon's pool. The
//! resulting proposals come back in processing order (`(t0, id)` for requests,
//! ascending id for vehicles) so [RuleBasedInserter::apply] can commit them
//! deterministically. Proposals that collide on one vehicle or one request are
//! caught there by revalidation.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::dispatcher::DispatchState;
use crate::model::SimTime;
use crate::schedule::Timing;
use crate::spatial::CellKey;

use super::goal::SearchSide;
use super::inserter::RuleBasedInserter;
use super::types::Proposal;

/// Group `(rank, unit)` pairs by cell, keeping ranks ascending inside each group.
fn partition_by_cell<T>(units: impl Iterator<Item = (CellKey, usize, T)>) -> Vec<Vec<(usize, T)>> {
    let mut groups: BTreeMap<CellKey, Vec<(usize, T)>> = BTreeMap::new();
    for (cell, rank, unit) in units {
        groups.entry(cell).or_default().push((rank, unit));
    }
    groups.into_values().collect()
}

fn search_partitions<T, F>(
    partitions: &[Vec<(usize, T)>],
    parallel: bool,
    search: F,
) -> Vec<Proposal>
where
    T: Sync,
    F: Fn(&T) -> Option<Proposal> + Sync + Send,
{
    let find = |(rank, unit): &(usize, T)| search(unit).map(|proposal| (*rank, proposal));
    let mut ranked: Vec<(usize, Proposal)> = if parallel {
        partitions
            .par_iter()
            .flat_map_iter(|group| group.iter().filter_map(&find))
            .collect()
    } else {
        partitions
            .iter()
            .flat_map(|group| group.iter().filter_map(&find))
            .collect()
    };
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, proposal)| proposal).collect()
}

impl RuleBasedInserter {
    /// Best proposal per driving unit against the current state, in processing order.
    #[instrument(level = "debug", skip_all, fields(now = now, parallel = parallel))]
    pub(crate) fn plan(
        &self,
        now: SimTime,
        state: &DispatchState,
        timing: &Timing<'_>,
        parallel: bool,
    ) -> Vec<Proposal> {
        let zones = self.zones_for(now, state);
        let proposals = match self.search_side(now, state) {
            SearchSide::Requests => {
                let partitions = partition_by_cell(
                    state
                        .registry
                        .unplanned(&state.fleet)
                        .into_iter()
                        .enumerate()
                        .map(|(rank, request)| {
                            let cell = state.request_index.cell_key(&request.from_vertex().point);
                            (cell, rank, request)
                        }),
                );
                search_partitions(&partitions, parallel, |request| {
                    self.best_vehicle_for(request, now, state, &zones, timing)
                })
            }
            SearchSide::Vehicles => {
                let partitions = partition_by_cell(state.fleet.idle_vehicles(now).enumerate().map(
                    |(rank, schedule)| {
                        let cell = state
                            .vehicle_index
                            .cell_key(&schedule.projected_location().point);
                        (cell, rank, schedule)
                    },
                ));
                search_partitions(&partitions, parallel, |schedule| {
                    self.best_request_for(schedule, now, state, &zones, timing)
                })
            }
        };
        debug!(proposals = proposals.len(), "snapshot search finished");
        proposals
    }
}
