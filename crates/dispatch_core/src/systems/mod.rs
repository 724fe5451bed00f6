pub mod dispatch_tick;
pub mod submission;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::model::SimTime;
use crate::optimizer::Assignment;

/// When the ECS adapter runs dispatch passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Resource)]
pub struct DispatchTrigger {
    /// Run a pass every `interval_secs`, starting at time 0.
    pub interval_secs: Option<SimTime>,
    /// Run a pass right after each submission.
    pub on_submission: bool,
}

impl Default for DispatchTrigger {
    fn default() -> Self {
        Self {
            interval_secs: Some(60),
            on_submission: false,
        }
    }
}

/// Stop processing events at or after this time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct SimulationEndTime(pub SimTime);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub time: SimTime,
    #[serde(flatten)]
    pub assignment: Assignment,
}

/// Committed assignments of every pass run through the ECS, in commit order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Resource)]
pub struct DispatchLog {
    pub passes: usize,
    pub records: Vec<DispatchRecord>,
}

impl DispatchLog {
    pub fn record_pass(&mut self, time: SimTime, assignments: Vec<Assignment>) {
        self.passes += 1;
        self.records.extend(
            assignments
                .into_iter()
                .map(|assignment| DispatchRecord { time, assignment }),
        );
    }
}
