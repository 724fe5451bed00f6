//! Online fleet dispatch for transport simulations.
//!
//! Pending requests are matched to vehicles pass by pass: a goal strategy picks the
//! search side and scores candidates, vehicle schedules evaluate and commit
//! time-window-feasible insertions, and a grid index keeps the candidate search
//! local. [dispatcher::Dispatcher] is the entry point.

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod fleet;
pub mod model;
pub mod optimizer;
pub mod params;
pub mod registry;
pub mod request;
pub mod runner;
pub mod schedule;
pub mod spatial;
pub mod systems;
pub mod travel_time;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
