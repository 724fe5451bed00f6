mod support;

use dispatch_core::error::{DispatchError, Infeasibility, ScheduleError};
use dispatch_core::model::{RequestId, TimeWindow, Vehicle, VehicleId, Vertex};
use dispatch_core::params::Goal;
use dispatch_core::request::RequestStatus;
use dispatch_core::schedule::TaskKind;

use support::{submit, unit_dispatcher, unit_params, vehicle_at, RequestBuilder};

#[test]
fn single_request_is_served_inside_its_window() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher.add_vehicle(vehicle_at(1, origin, 50)).expect("vehicle");
    let r1 = submit(
        &mut dispatcher,
        RequestBuilder::new(1, origin).window(100, 200).submitted(50).build(),
    );

    let assignments = dispatcher.dispatch(60);

    assert_eq!(assignments.len(), 1);
    let assignment = assignments[0];
    assert_eq!(assignment.request, r1);
    assert_eq!(assignment.vehicle, VehicleId(1));
    assert!((100..=200).contains(&assignment.delta.serve_begin));
    assert_eq!(assignment.delta.serve_begin, 100);
    assert_eq!(assignment.delta.cost.detour, 0);
    assert_eq!(dispatcher.request_status(r1), Ok(RequestStatus::Planned));

    // Already at the pickup: no drive, just a wait until the window opens.
    let schedule = dispatcher.schedule(VehicleId(1)).expect("schedule");
    let kinds: Vec<_> = schedule.tasks().iter().map(|t| (t.begin(), t.end())).collect();
    assert!(matches!(schedule.tasks()[0].kind(), TaskKind::Wait { .. }));
    assert_eq!(kinds[0], (60, 100));
}

#[test]
fn competing_requests_commit_one_and_keep_the_other_unplanned() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher.add_vehicle(vehicle_at(1, origin, 0)).expect("vehicle");
    // Equal cost, and neither can be served after the other.
    let r2 = submit(
        &mut dispatcher,
        RequestBuilder::new(2, origin).window(100, 100).build(),
    );
    let r1 = submit(
        &mut dispatcher,
        RequestBuilder::new(1, origin).window(100, 100).build(),
    );

    let first = dispatcher.dispatch(60);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].request, r1);
    assert_eq!(dispatcher.request_status(r1), Ok(RequestStatus::Planned));
    assert_eq!(dispatcher.request_status(r2), Ok(RequestStatus::Unplanned));
    assert!(dispatcher.request_index().contains(r2));

    // Reconsidered once another vehicle shows up.
    dispatcher
        .add_vehicle(vehicle_at(2, origin, 70))
        .expect("vehicle");
    let second = dispatcher.dispatch(70);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].request, r2);
    assert_eq!(second[0].vehicle, VehicleId(2));
}

#[test]
fn earlier_request_keeps_the_vehicle_over_a_cheaper_later_one() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let far = RequestBuilder::new(1, Vertex::new(11, 50.0, 0.0)).window(10, 60);
    let near = RequestBuilder::new(2, Vertex::new(12, 5.0, 0.0)).window(20, 60);

    // On its own the later request is the cheaper one.
    let mut alone = unit_dispatcher(unit_params());
    alone.add_vehicle(vehicle_at(1, origin, 0)).expect("vehicle");
    submit(&mut alone, near.clone().build());
    let near_cost = alone.dispatch(0)[0].delta.cost.added_cost();

    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher.add_vehicle(vehicle_at(1, origin, 0)).expect("vehicle");
    let r2 = submit(&mut dispatcher, near.build());
    let r1 = submit(&mut dispatcher, far.build());

    let assignments = dispatcher.dispatch(0);
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].request, r1);
    assert!(assignments[0].delta.cost.added_cost() > near_cost);
    assert_eq!(dispatcher.request_status(r1), Ok(RequestStatus::Planned));
    assert_eq!(dispatcher.request_status(r2), Ok(RequestStatus::Unplanned));
}

#[test]
fn out_of_service_neighbour_does_not_hide_the_next_vehicle() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params().with_limits(1, 1));
    let retired = Vehicle::new(
        VehicleId(1),
        1,
        Vertex::new(10, 1.0, 0.0),
        TimeWindow::new(0, 10).expect("window"),
    )
    .expect("vehicle");
    dispatcher.add_vehicle(retired).expect("vehicle");
    dispatcher
        .add_vehicle(vehicle_at(2, Vertex::new(20, 50.0, 0.0), 0))
        .expect("vehicle");
    let r1 = submit(&mut dispatcher, RequestBuilder::new(1, origin).build());

    let assignments = dispatcher.dispatch(50);
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].request, r1);
    assert_eq!(assignments[0].vehicle, VehicleId(2));
    assert_eq!(assignments[0].delta.serve_begin, 100);
}

#[test]
fn cheaper_vehicle_wins_and_ties_go_to_lower_id() {
    let pickup = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher
        .add_vehicle(vehicle_at(3, Vertex::new(30, 50.0, 0.0), 0))
        .expect("vehicle");
    dispatcher
        .add_vehicle(vehicle_at(2, Vertex::new(20, 0.0, 50.0), 0))
        .expect("vehicle");
    dispatcher
        .add_vehicle(vehicle_at(1, Vertex::new(10, 0.0, 80.0), 0))
        .expect("vehicle");
    let r1 = submit(&mut dispatcher, RequestBuilder::new(1, pickup).build());

    let assignments = dispatcher.dispatch(0);
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].request, r1);
    assert_eq!(assignments[0].vehicle, VehicleId(2));
    assert_eq!(assignments[0].delta.cost.added_cost(), 100);
}

#[test]
fn cancellation_between_selection_and_commit_is_caught() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher.add_vehicle(vehicle_at(1, origin, 0)).expect("vehicle");
    let r1 = submit(
        &mut dispatcher,
        RequestBuilder::new(1, origin).window(100, 200).build(),
    );

    let proposals = dispatcher.plan(60);
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].request, r1);

    dispatcher.cancel_request(r1).expect("cancel");
    let committed = dispatcher.apply(proposals, 60);

    assert!(committed.is_empty());
    assert_eq!(dispatcher.request_status(r1), Ok(RequestStatus::Cancelled));
    let schedule = dispatcher.schedule(VehicleId(1)).expect("schedule");
    assert!(schedule.tasks().is_empty());
    assert_eq!(schedule.revision(), 0);
}

#[test]
fn stale_schedule_discards_the_later_proposal() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher.add_vehicle(vehicle_at(1, origin, 0)).expect("vehicle");
    let r1 = submit(&mut dispatcher, RequestBuilder::new(1, origin).window(0, 500).build());
    let r2 = submit(&mut dispatcher, RequestBuilder::new(2, origin).window(0, 500).build());

    // Both proposals were computed against the same empty schedule.
    let proposals = dispatcher.plan(0);
    assert_eq!(proposals.len(), 2);
    let committed = dispatcher.apply(proposals, 0);

    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].request, r1);
    assert_eq!(dispatcher.request_status(r2), Ok(RequestStatus::Unplanned));

    // The next pass chains it behind the first one.
    let next = dispatcher.dispatch(0);
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].request, r2);
    assert_eq!(next[0].delta.position, 1);
}

#[test]
fn unschedule_reverts_the_schedule_exactly() {
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher
        .add_vehicle(vehicle_at(1, Vertex::new(0, 0.0, 0.0), 0))
        .expect("vehicle");
    let r1 = submit(
        &mut dispatcher,
        RequestBuilder::new(1, Vertex::new(1, 300.0, 0.0)).window(0, 2_000).build(),
    );
    let r2 = submit(
        &mut dispatcher,
        RequestBuilder::new(2, Vertex::new(2, 600.0, 0.0)).window(0, 2_000).build(),
    );
    dispatcher.dispatch(0);
    let before: Vec<_> = dispatcher
        .schedule(VehicleId(1))
        .expect("schedule")
        .tasks()
        .iter()
        .map(|t| (*t.kind(), t.begin(), t.end()))
        .collect();

    let r3 = submit(
        &mut dispatcher,
        RequestBuilder::new(3, Vertex::new(3, 150.0, 40.0)).window(0, 2_000).build(),
    );
    assert_eq!(dispatcher.dispatch(0).len(), 1);
    dispatcher.unschedule_request(r3, 0).expect("unschedule");

    let after: Vec<_> = dispatcher
        .schedule(VehicleId(1))
        .expect("schedule")
        .tasks()
        .iter()
        .map(|t| (*t.kind(), t.begin(), t.end()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(dispatcher.request_status(r1), Ok(RequestStatus::Planned));
    assert_eq!(dispatcher.request_status(r2), Ok(RequestStatus::Planned));
    assert_eq!(dispatcher.request_status(r3), Ok(RequestStatus::Unplanned));
}

#[test]
fn abort_is_refused_when_a_later_window_would_break() {
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher
        .add_vehicle(vehicle_at(1, Vertex::new(0, 0.0, 0.0), 0))
        .expect("vehicle");
    let r1 = submit(
        &mut dispatcher,
        RequestBuilder::new(1, Vertex::new(1, 10.0, 0.0))
            .to(Vertex::new(11, 110.0, 0.0))
            .build(),
    );
    let r2 = submit(
        &mut dispatcher,
        RequestBuilder::new(2, Vertex::new(2, 120.0, 0.0)).window(0, 125).build(),
    );
    let assignments = dispatcher.dispatch(0);
    assert_eq!(assignments.len(), 2);
    // r1 is served 10..110, r2 is chained right behind it.
    assert_eq!(assignments[1].request, r2);
    assert_eq!(assignments[1].delta.serve_begin, 120);

    dispatcher.advance_to(100);
    assert_eq!(dispatcher.request_status(r1), Ok(RequestStatus::Started));
    let before = dispatcher.schedule(VehicleId(1)).expect("schedule").clone();

    // Restarting from r1's pickup at 100 reaches r2 at 210.
    let err = dispatcher.abort_request(r1, 100).expect_err("r2 would be late");
    assert_eq!(
        err,
        DispatchError::Schedule(ScheduleError::Infeasible(Infeasibility::OutsideTimeWindow {
            request: r2,
            begin: 210,
            earliest: 0,
            latest: 125,
        }))
    );
    assert_eq!(dispatcher.request_status(r1), Ok(RequestStatus::Started));
    assert_eq!(dispatcher.request_status(r2), Ok(RequestStatus::Planned));
    let after = dispatcher.schedule(VehicleId(1)).expect("schedule");
    assert_eq!(after.tasks(), before.tasks());
    for task in after.tasks() {
        if let TaskKind::Serve(spec) = task.kind() {
            assert!(spec.window.contains(task.begin()));
        }
    }
}

#[test]
fn demand_supply_goal_leaves_a_lone_request_to_the_closest_vehicle() {
    let params = unit_params().with_goal(Goal::DemandSupplyEquil);
    let mut dispatcher = unit_dispatcher(params);
    dispatcher
        .add_vehicle(vehicle_at(1, Vertex::new(1, 900.0, 0.0), 0))
        .expect("vehicle");
    dispatcher
        .add_vehicle(vehicle_at(2, Vertex::new(2, 0.0, 0.0), 0))
        .expect("vehicle");
    let r1 = submit(
        &mut dispatcher,
        RequestBuilder::new(1, Vertex::new(10, 1.0, 0.0)).build(),
    );

    // Fewer requests than idle vehicles: the request picks its vehicle.
    let assignments = dispatcher.dispatch(0);
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].request, r1);
    assert_eq!(assignments[0].vehicle, VehicleId(2));
    assert_eq!(assignments[0].delta.serve_begin, 1);
}

#[test]
fn demand_supply_goal_sends_idle_vehicles_to_crowded_cells() {
    let mut params = unit_params()
        .with_goal(Goal::DemandSupplyEquil)
        .with_cell_size(100.0);
    params.hotspot_weight = 300.0;
    let mut dispatcher = unit_dispatcher(params);
    dispatcher
        .add_vehicle(vehicle_at(1, Vertex::new(0, 50.0, 50.0), 0))
        .expect("vehicle");

    // A lone request right next door, and three requests crowding a cell further east.
    let lone = submit(
        &mut dispatcher,
        RequestBuilder::new(1, Vertex::new(1, 60.0, 50.0)).build(),
    );
    for id in 2..=4 {
        submit(
            &mut dispatcher,
            RequestBuilder::new(id, Vertex::new(id, 250.0 + id as f64, 50.0)).build(),
        );
    }

    let assignments = dispatcher.dispatch(0);
    assert_eq!(assignments.len(), 1);
    assert_ne!(assignments[0].request, lone);
    assert_eq!(assignments[0].request, RequestId(2));
    assert_eq!(dispatcher.request_status(lone), Ok(RequestStatus::Unplanned));
}

#[test]
fn demand_supply_goal_serves_each_idle_vehicle_once() {
    let params = unit_params().with_goal(Goal::DemandSupplyEquil);
    let mut dispatcher = unit_dispatcher(params);
    for id in 1..=2 {
        dispatcher
            .add_vehicle(vehicle_at(id, Vertex::new(id, id as f64 * 10.0, 0.0), 0))
            .expect("vehicle");
    }
    for id in 1..=3 {
        submit(
            &mut dispatcher,
            RequestBuilder::new(id, Vertex::new(100 + id, id as f64 * 10.0, 5.0)).build(),
        );
    }

    let assignments = dispatcher.dispatch(0);
    assert_eq!(assignments.len(), 2);
    assert_eq!(assignments[0].vehicle, VehicleId(1));
    assert_eq!(assignments[1].vehicle, VehicleId(2));
    assert_eq!(dispatcher.request_index().len(), 1);
}

#[test]
fn oversized_and_out_of_service_requests_stay_unplanned() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher.add_vehicle(vehicle_at(1, origin, 0)).expect("vehicle");
    let heavy = submit(
        &mut dispatcher,
        RequestBuilder::new(1, origin).quantity(3).build(),
    );
    let late = submit(
        &mut dispatcher,
        RequestBuilder::new(2, Vertex::new(2, 500.0, 0.0)).window(0, 100).build(),
    );

    assert!(dispatcher.dispatch(0).is_empty());
    assert_eq!(dispatcher.request_status(heavy), Ok(RequestStatus::Unplanned));
    assert_eq!(dispatcher.request_status(late), Ok(RequestStatus::Unplanned));

    // Still considered, still infeasible: no retry limit, no admission control.
    assert!(dispatcher.dispatch(50).is_empty());
    assert_eq!(dispatcher.request_status(late), Ok(RequestStatus::Unplanned));
}

#[test]
fn invalid_transitions_fail_only_the_call() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher.add_vehicle(vehicle_at(1, origin, 0)).expect("vehicle");
    let r1 = submit(&mut dispatcher, RequestBuilder::new(1, origin).build());
    dispatcher.dispatch(0);

    assert!(matches!(
        dispatcher.cancel_request(r1),
        Err(DispatchError::InvalidTransition(_))
    ));
    assert!(matches!(
        dispatcher.submit_request(r1),
        Err(DispatchError::InvalidTransition(_))
    ));
    assert_eq!(
        dispatcher.submit_request(RequestId(99)),
        Err(DispatchError::UnknownRequest(RequestId(99)))
    );
    assert_eq!(dispatcher.request_status(r1), Ok(RequestStatus::Planned));
}

#[test]
fn stale_delta_error_is_reported_by_the_schedule() {
    let origin = Vertex::new(1, 0.0, 0.0);
    let mut dispatcher = unit_dispatcher(unit_params());
    dispatcher.add_vehicle(vehicle_at(1, origin, 0)).expect("vehicle");
    submit(&mut dispatcher, RequestBuilder::new(1, origin).window(0, 500).build());
    let proposals = dispatcher.plan(0);
    dispatcher.advance_to(0);
    dispatcher.dispatch(0);

    let mut schedule = dispatcher.schedule(VehicleId(1)).expect("schedule").clone();
    assert!(matches!(
        schedule.commit_insertion(&proposals[0].delta),
        Err(ScheduleError::StaleDelta { .. })
    ));
}
