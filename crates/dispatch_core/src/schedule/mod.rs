//! Per-vehicle task timeline.
//!
//! A [Schedule] owns its tasks in an ordered vector. Statuses always form a prefix of
//! performed tasks, at most one started task, then planned tasks. Only the planned
//! suffix is ever re-timed; it is rebuilt from the ordered serve stops whenever work
//! is inserted, removed or aborted. Serve task ids are never reused, so a
//! [TaskHandle] held by a request cannot silently point at another task.

pub mod insertion;
pub mod timeline;

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::model::{RequestId, SimTime, TimeWindow, Vehicle, VehicleId, Vertex};

pub use insertion::{InsertionCost, InsertionDelta, ScheduleDelta};
pub use timeline::{TaskDraft, Timing};

use timeline::{simulate, Anchor, Stop};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Non-owning reference to a task inside a vehicle's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    pub vehicle: VehicleId,
    pub task: TaskId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Planned,
    Started,
    Performed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Planned => "planned",
            TaskStatus::Started => "started",
            TaskStatus::Performed => "performed",
        };
        f.write_str(name)
    }
}

/// Everything a schedule needs to time and check the service of one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServeSpec {
    pub request: RequestId,
    pub pickup: Vertex,
    pub dropoff: Vertex,
    pub window: TimeWindow,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TaskKind {
    Wait { at: Vertex },
    Drive { from: Vertex, to: Vertex },
    /// Pickup, occupied ride and dropoff of one request.
    Serve(ServeSpec),
}

impl TaskKind {
    /// Where the vehicle stands once the task is over.
    pub fn end_location(&self) -> Vertex {
        match self {
            TaskKind::Wait { at } => *at,
            TaskKind::Drive { to, .. } => *to,
            TaskKind::Serve(spec) => spec.dropoff,
        }
    }

    pub fn as_serve(&self) -> Option<&ServeSpec> {
        match self {
            TaskKind::Serve(spec) => Some(spec),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    begin: SimTime,
    end: SimTime,
    status: TaskStatus,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn begin(&self) -> SimTime {
        self.begin
    }

    pub fn end(&self) -> SimTime {
        self.end
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }
}

#[derive(Debug, Clone)]
pub struct Schedule {
    vehicle: Vehicle,
    tasks: Vec<Task>,
    next_task_id: u64,
    revision: u64,
}

impl Schedule {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            tasks: Vec::new(),
            next_task_id: 0,
            revision: 0,
        }
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle.id
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Bumped by every mutation; used to detect stale insertion deltas.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Serve tasks that are still planned, in schedule order.
    pub fn planned_serves(&self) -> impl Iterator<Item = &Task> {
        self.tasks[self.planned_start()..]
            .iter()
            .filter(|task| matches!(task.kind, TaskKind::Serve(_)))
    }

    /// True when no task is planned or under way.
    pub fn is_idle(&self) -> bool {
        self.tasks
            .last()
            .map_or(true, |task| task.status == TaskStatus::Performed)
    }

    /// Location once every task has been carried out.
    pub fn projected_location(&self) -> Vertex {
        self.tasks
            .last()
            .map_or(self.vehicle.start, |task| task.kind.end_location())
    }

    /// Time at which every task has been carried out.
    pub fn projected_end_time(&self) -> SimTime {
        self.tasks
            .last()
            .map_or(self.vehicle.service.earliest(), |task| task.end)
    }

    /// Serve positions (indices into the planned serves) open for insertion.
    ///
    /// Slot 0 closes once the approach to the first planned serve is under way.
    pub fn insertion_slots(&self) -> RangeInclusive<usize> {
        let stops = self.planned_serves().count();
        let first_open = match self.tasks.get(self.planned_start()) {
            Some(task) if stops > 0 && !matches!(task.kind, TaskKind::Drive { .. }) => 1,
            _ => 0,
        };
        first_open..=stops
    }

    /// Index of the first planned task (or `tasks.len()`).
    fn planned_start(&self) -> usize {
        self.tasks
            .iter()
            .rposition(|task| task.status != TaskStatus::Planned)
            .map_or(0, |idx| idx + 1)
    }

    fn anchor(&self, now: SimTime) -> Anchor {
        let planned_start = self.planned_start();
        let (location, time) = match planned_start.checked_sub(1).map(|idx| &self.tasks[idx]) {
            Some(task) => (task.kind.end_location(), task.end),
            None => (self.vehicle.start, self.vehicle.service.earliest()),
        };
        Anchor {
            location,
            time: time.max(now),
        }
    }

    fn stops(&self) -> Vec<Stop> {
        self.planned_serves()
            .filter_map(|task| {
                task.kind.as_serve().map(|spec| Stop {
                    task: Some(task.id),
                    spec: *spec,
                })
            })
            .collect()
    }

    fn allocate_id(&mut self) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        id
    }

    /// Swap the planned suffix for `drafts`. Returns the id given to a new serve task.
    fn replace_planned_suffix(&mut self, drafts: Vec<TaskDraft>) -> Option<TaskId> {
        let planned_start = self.planned_start();
        self.tasks.truncate(planned_start);
        let mut new_serve = None;
        for draft in drafts {
            let id = match draft.id {
                Some(id) => id,
                None => {
                    let id = self.allocate_id();
                    if matches!(draft.kind, TaskKind::Serve(_)) {
                        new_serve = Some(id);
                    }
                    id
                }
            };
            self.tasks.push(Task {
                id,
                kind: draft.kind,
                begin: draft.begin,
                end: draft.end,
                status: TaskStatus::Planned,
            });
        }
        self.revision += 1;
        new_serve
    }

    /// Re-time the planned suffix from the current anchor. Leaves the planned suffix
    /// untouched when the new timing breaks a window or the service end.
    fn retime(
        &mut self,
        stops: &[Stop],
        now: SimTime,
        timing: &Timing<'_>,
    ) -> Result<(), ScheduleError> {
        let timeline = simulate(
            self.vehicle.id,
            self.vehicle.service.latest(),
            self.anchor(now),
            stops,
            timing,
        );
        if let Some(violation) = timeline.violation {
            return Err(ScheduleError::Infeasible(violation));
        }
        self.replace_planned_suffix(timeline.drafts);
        Ok(())
    }

    fn position_of(&self, task: TaskId) -> Result<usize, ScheduleError> {
        self.tasks
            .iter()
            .position(|t| t.id == task)
            .ok_or(ScheduleError::UnknownTask {
                vehicle: self.vehicle.id,
                task,
            })
    }

    /// Apply a delta produced by [Schedule::evaluate_insertion], all or nothing.
    pub fn commit_insertion(&mut self, delta: &InsertionDelta) -> Result<TaskHandle, ScheduleError> {
        let stale = ScheduleError::StaleDelta {
            vehicle: self.vehicle.id,
            expected: delta.revision(),
            actual: self.revision,
        };
        let adds_serve = delta
            .suffix()
            .iter()
            .any(|draft| draft.id.is_none() && matches!(draft.kind, TaskKind::Serve(_)));
        if delta.vehicle() != self.vehicle.id || delta.revision() != self.revision || !adds_serve {
            return Err(stale);
        }
        let task = self
            .replace_planned_suffix(delta.suffix().to_vec())
            .ok_or(stale)?;
        Ok(TaskHandle {
            vehicle: self.vehicle.id,
            task,
        })
    }

    /// Remove a planned serve task together with its approach, re-timing the rest.
    /// Fails with [ScheduleError::Infeasible], changing nothing, if a remaining serve
    /// would then miss its window.
    pub fn remove_serve_task(
        &mut self,
        task: TaskId,
        now: SimTime,
        timing: &Timing<'_>,
    ) -> Result<RequestId, ScheduleError> {
        let idx = self.position_of(task)?;
        let target = &self.tasks[idx];
        let Some(spec) = target.kind.as_serve() else {
            return Err(ScheduleError::NotAServeTask {
                vehicle: self.vehicle.id,
                task,
            });
        };
        if target.status != TaskStatus::Planned {
            return Err(ScheduleError::TaskLocked {
                vehicle: self.vehicle.id,
                task,
                status: target.status,
            });
        }
        let request = spec.request;
        let stops: Vec<Stop> = self
            .stops()
            .into_iter()
            .filter(|stop| stop.task != Some(task))
            .collect();
        self.retime(&stops, now, timing)?;
        Ok(request)
    }

    /// Cut a started serve short at `now`. The task is kept as a performed wait so the
    /// history stays contiguous; the planned remainder is re-timed from the pickup.
    /// Fails with [ScheduleError::Infeasible], changing nothing, if a remaining serve
    /// would then miss its window.
    pub fn abort_serve_task(
        &mut self,
        task: TaskId,
        now: SimTime,
        timing: &Timing<'_>,
    ) -> Result<RequestId, ScheduleError> {
        let idx = self.position_of(task)?;
        let vehicle = self.vehicle.id;
        let target = &mut self.tasks[idx];
        let Some(spec) = target.kind.as_serve().copied() else {
            return Err(ScheduleError::NotAServeTask { vehicle, task });
        };
        if target.status != TaskStatus::Started {
            return Err(ScheduleError::TaskLocked {
                vehicle,
                task,
                status: target.status,
            });
        }
        let started = target.clone();
        target.kind = TaskKind::Wait { at: spec.pickup };
        target.end = now.max(target.begin);
        target.status = TaskStatus::Performed;

        let stops = self.stops();
        if let Err(err) = self.retime(&stops, now, timing) {
            self.tasks[idx] = started;
            return Err(err);
        }
        Ok(spec.request)
    }

    /// Telemetry update: tasks over by `now` are performed, the one spanning `now` is
    /// started. Returns whether any status changed.
    pub fn advance_to(&mut self, now: SimTime) -> bool {
        let mut changed = false;
        for task in self.tasks.iter_mut() {
            if task.status == TaskStatus::Performed {
                continue;
            }
            let next = if task.end <= now {
                TaskStatus::Performed
            } else if task.begin <= now {
                TaskStatus::Started
            } else {
                break;
            };
            if next != task.status {
                task.status = next;
                changed = true;
            }
            if next == TaskStatus::Started {
                break;
            }
        }
        if changed {
            self.revision += 1;
        }
        changed
    }
}
