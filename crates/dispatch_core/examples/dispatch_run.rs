//! Run a seeded 40 vehicle / 400 request scenario through the ECS runner and
//! print a summary plus the dispatch log as JSON.
//!
//! Run with: cargo run -p dispatch_core --example dispatch_run [MIN_WAIT_TIME|DEMAND_SUPPLY_EQUIL]

use dispatch_core::clock::{EventKind, EventSubject, SimulationClock};
use dispatch_core::dispatcher::Dispatcher;
use dispatch_core::params::{DispatchParams, Goal};
use dispatch_core::request::RequestStatus;
use dispatch_core::runner::{build_world, dispatch_schedule, initialize_dispatch, run_until_empty};
use dispatch_core::systems::{DispatchLog, DispatchTrigger, SimulationEndTime};
use dispatch_core::test_helpers::{generate_scenario, load_scenario, test_dispatcher, ScenarioParams};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let goal: Goal = match std::env::args().nth(1) {
        Some(arg) => match arg.parse() {
            Ok(goal) => goal,
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(2);
            }
        },
        None => Goal::MinWaitTime,
    };

    let scenario_params = ScenarioParams::default().with_size(40, 400).with_seed(123);
    let scenario = generate_scenario(&scenario_params);
    let mut dispatcher = test_dispatcher(DispatchParams::default().with_goal(goal));
    load_scenario(&mut dispatcher, &scenario).expect("scenario ids are unique");

    let mut world = build_world(
        dispatcher,
        DispatchTrigger {
            interval_secs: Some(30),
            on_submission: false,
        },
    );
    let end_time = scenario_params.horizon + scenario_params.window_slack + 3_600;
    world.insert_resource(SimulationEndTime(end_time));
    {
        let mut clock = world.resource_mut::<SimulationClock>();
        for request in &scenario.requests {
            clock.schedule_at(
                request.submission_time(),
                EventKind::SubmitRequest,
                Some(EventSubject::Request(request.id())),
            );
        }
    }
    initialize_dispatch(&mut world);

    let mut schedule = dispatch_schedule();
    let steps = run_until_empty(&mut world, &mut schedule, 1_000_000);

    let dispatcher = world.resource::<Dispatcher>();
    let mut by_status = [0usize; 3];
    for request in &scenario.requests {
        match dispatcher.request_status(request.id()) {
            Ok(RequestStatus::Performed) => by_status[0] += 1,
            Ok(RequestStatus::Planned | RequestStatus::Started) => by_status[1] += 1,
            _ => by_status[2] += 1,
        }
    }
    let log = world.resource::<DispatchLog>();
    let mean_wait = if log.records.is_empty() {
        0.0
    } else {
        log.records
            .iter()
            .map(|r| r.assignment.delta.cost.wait as f64)
            .sum::<f64>()
            / log.records.len() as f64
    };

    eprintln!(
        "--- {goal}: {} vehicles, {} requests, seed {} ---",
        scenario.vehicles.len(),
        scenario.requests.len(),
        scenario_params.seed
    );
    eprintln!("Steps executed: {steps}");
    eprintln!("Passes: {}  commits: {}", log.passes, log.records.len());
    eprintln!(
        "Performed: {}  still planned: {}  never served: {}",
        by_status[0], by_status[1], by_status[2]
    );
    eprintln!("Mean wait at commit: {mean_wait:.1} s");

    match serde_json::to_string_pretty(log) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to serialize dispatch log: {err}"),
    }
}
