//! Test helpers for common test setup and utilities.
//!
//! Seeded scenario generation shared by unit tests, integration tests, benchmarks
//! and the demo. The same seed always yields the same vehicles and requests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::model::{CustomerId, RequestId, SimTime, TimeWindow, Vehicle, VehicleId, Vertex};
use crate::params::DispatchParams;
use crate::request::Request;
use crate::travel_time::StraightLineTravelTime;

/// Shape of a random scenario on a square map.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioParams {
    pub seed: u64,
    pub vehicles: usize,
    pub requests: usize,
    /// Map edge in metres; every vertex lies in `[0, extent)²`.
    pub extent: f64,
    /// Requests become pickable uniformly within `[0, horizon)`.
    pub horizon: SimTime,
    /// Width of each pickup window.
    pub window_slack: SimTime,
    /// Lead time between submission and the pickup window opening.
    pub lead_time: SimTime,
    pub capacity: u32,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: 42,
            vehicles: 20,
            requests: 100,
            extent: 10_000.0,
            horizon: 3_600,
            window_slack: 900,
            lead_time: 300,
            capacity: 4,
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_size(mut self, vehicles: usize, requests: usize) -> Self {
        self.vehicles = vehicles;
        self.requests = requests;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub vehicles: Vec<Vehicle>,
    /// Sorted by submission time, then id.
    pub requests: Vec<Request>,
}

/// Vertex ids: vehicle starts from 0, request pickups and dropoffs after them.
pub fn generate_scenario(params: &ScenarioParams) -> Scenario {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut next_vertex = 0u64;
    let mut vertex = |rng: &mut StdRng| {
        let v = Vertex::new(
            next_vertex,
            rng.gen_range(0.0..params.extent),
            rng.gen_range(0.0..params.extent),
        );
        next_vertex += 1;
        v
    };

    let vehicles = (0..params.vehicles as u64)
        .filter_map(|id| {
            let start = vertex(&mut rng);
            Vehicle::new(
                VehicleId(id),
                params.capacity.max(1),
                start,
                TimeWindow::open_from(0),
            )
            .ok()
        })
        .collect();

    let mut requests: Vec<Request> = (0..params.requests as u64)
        .filter_map(|id| {
            let from = vertex(&mut rng);
            let to = vertex(&mut rng);
            let t0 = rng.gen_range(0..params.horizon.max(1));
            let submission = t0.saturating_sub(params.lead_time);
            let quantity = rng.gen_range(1..=params.capacity.max(1));
            Request::new(
                RequestId(id),
                CustomerId(id),
                from,
                to,
                quantity,
                t0,
                t0 + params.window_slack,
                submission,
            )
            .ok()
        })
        .collect();
    requests.sort_by_key(|r| (r.submission_time(), r.id()));

    Scenario { vehicles, requests }
}

/// A dispatcher on straight-line travel at urban speed.
///
/// # Panics
///
/// Panics if `params` fail validation.
pub fn test_dispatcher(params: DispatchParams) -> Dispatcher {
    Dispatcher::new(params, Box::new(StraightLineTravelTime::urban()))
        .expect("test params should be valid")
}

/// Register every vehicle and request of `scenario`; requests stay INACTIVE.
pub fn load_scenario(dispatcher: &mut Dispatcher, scenario: &Scenario) -> Result<(), DispatchError> {
    for vehicle in &scenario.vehicles {
        dispatcher.add_vehicle(*vehicle)?;
    }
    for request in &scenario.requests {
        dispatcher.add_request(request.clone())?;
    }
    Ok(())
}

/// Register and submit everything at once.
pub fn submit_all(dispatcher: &mut Dispatcher, scenario: &Scenario) -> Result<(), DispatchError> {
    load_scenario(dispatcher, scenario)?;
    for request in &scenario.requests {
        dispatcher.submit_request(request.id())?;
    }
    Ok(())
}
