#![allow(dead_code)]

pub mod reference;

use dispatch_core::dispatcher::Dispatcher;
use dispatch_core::model::{
    CustomerId, RequestId, SimTime, TimeWindow, Vehicle, VehicleId, Vertex,
};
use dispatch_core::params::DispatchParams;
use dispatch_core::request::Request;
use dispatch_core::travel_time::StraightLineTravelTime;

/// Params for hand-computed timings: 1 m/s travel and instant pickup/dropoff.
pub fn unit_params() -> DispatchParams {
    DispatchParams::default().with_service_durations(0, 0)
}

/// Dispatcher on straight-line travel at 1 m/s, so metres read as seconds.
pub fn unit_dispatcher(params: DispatchParams) -> Dispatcher {
    Dispatcher::new(params, Box::new(StraightLineTravelTime::new(1.0))).expect("valid params")
}

pub fn vehicle_at(id: u64, start: Vertex, since: SimTime) -> Vehicle {
    Vehicle::new(VehicleId(id), 1, start, TimeWindow::open_from(since)).expect("vehicle")
}

/// Builder for request fixtures. Dropoff defaults to 100 m north of the pickup.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    id: u64,
    from: Vertex,
    to: Option<Vertex>,
    quantity: u32,
    t0: SimTime,
    t1: SimTime,
    submitted: SimTime,
}

impl RequestBuilder {
    pub fn new(id: u64, from: Vertex) -> Self {
        Self {
            id,
            from,
            to: None,
            quantity: 1,
            t0: 0,
            t1: SimTime::MAX,
            submitted: 0,
        }
    }

    pub fn window(mut self, t0: SimTime, t1: SimTime) -> Self {
        self.t0 = t0;
        self.t1 = t1;
        self
    }

    pub fn to(mut self, to: Vertex) -> Self {
        self.to = Some(to);
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn submitted(mut self, at: SimTime) -> Self {
        self.submitted = at;
        self
    }

    pub fn build(self) -> Request {
        let to = self.to.unwrap_or_else(|| {
            Vertex::new(
                10_000 + self.id,
                self.from.point.x,
                self.from.point.y + 100.0,
            )
        });
        Request::new(
            RequestId(self.id),
            CustomerId(self.id),
            self.from,
            to,
            self.quantity,
            self.t0,
            self.t1,
            self.submitted,
        )
        .expect("request")
    }
}

/// Register and submit a request.
pub fn submit(dispatcher: &mut Dispatcher, request: Request) -> RequestId {
    let id = request.id();
    dispatcher.add_request(request).expect("add request");
    dispatcher.submit_request(id).expect("submit request");
    id
}
