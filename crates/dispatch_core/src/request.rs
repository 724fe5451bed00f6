//! Transport requests and their status state machine.
//!
//! A request is INACTIVE until submitted, then UNPLANNED until the inserter binds it
//! to a serve task. While bound, its status is read through from that task
//! (PLANNED, STARTED or PERFORMED) instead of being stored.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidTransition, ModelError};
use crate::model::{CustomerId, RequestId, SimTime, TimeWindow, Vertex};
use crate::schedule::{ServeSpec, TaskHandle, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Inactive,
    Unplanned,
    Planned,
    Started,
    Performed,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    fn from_task(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Planned => RequestStatus::Planned,
            TaskStatus::Started => RequestStatus::Started,
            TaskStatus::Performed => RequestStatus::Performed,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStatus::Inactive => "INACTIVE",
            RequestStatus::Unplanned => "UNPLANNED",
            RequestStatus::Planned => "PLANNED",
            RequestStatus::Started => "STARTED",
            RequestStatus::Performed => "PERFORMED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// State-machine operations, named in [InvalidTransition] errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Reject,
    Cancel,
    Bind,
    Unbind,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::Submit => "submit",
            Transition::Reject => "reject",
            Transition::Cancel => "cancel",
            Transition::Bind => "bind to a serve task",
            Transition::Unbind => "unbind",
        };
        f.write_str(name)
    }
}

/// Read access to the status of serve tasks, by handle.
pub trait TaskStatusLookup {
    fn serve_task_status(&self, handle: TaskHandle) -> Option<TaskStatus>;
}

impl TaskStatusLookup for HashMap<TaskHandle, TaskStatus> {
    fn serve_task_status(&self, handle: TaskHandle) -> Option<TaskStatus> {
        self.get(&handle).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id: RequestId,
    customer: CustomerId,
    from: Vertex,
    to: Vertex,
    quantity: u32,
    window: TimeWindow,
    submission_time: SimTime,
    /// Meaningful only while `serve_task` is `None`.
    status: RequestStatus,
    serve_task: Option<TaskHandle>,
}

impl Request {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RequestId,
        customer: CustomerId,
        from: Vertex,
        to: Vertex,
        quantity: u32,
        t0: SimTime,
        t1: SimTime,
        submission_time: SimTime,
    ) -> Result<Self, ModelError> {
        if quantity == 0 {
            return Err(ModelError::ZeroQuantity(id));
        }
        Ok(Self {
            id,
            customer,
            from,
            to,
            quantity,
            window: TimeWindow::new(t0, t1)?,
            submission_time,
            status: RequestStatus::Inactive,
            serve_task: None,
        })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn customer(&self) -> CustomerId {
        self.customer
    }

    pub fn from_vertex(&self) -> Vertex {
        self.from
    }

    pub fn to_vertex(&self) -> Vertex {
        self.to
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Earliest pickup time.
    pub fn t0(&self) -> SimTime {
        self.window.earliest()
    }

    /// Latest pickup time.
    pub fn t1(&self) -> SimTime {
        self.window.latest()
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn submission_time(&self) -> SimTime {
        self.submission_time
    }

    pub fn serve_task(&self) -> Option<TaskHandle> {
        self.serve_task
    }

    /// What a schedule needs to know to serve this request.
    pub fn serve_spec(&self) -> ServeSpec {
        ServeSpec {
            request: self.id,
            pickup: self.from,
            dropoff: self.to,
            window: self.window,
            quantity: self.quantity,
        }
    }

    /// Effective status. Reads through to the bound task when there is one.
    pub fn status<T: TaskStatusLookup + ?Sized>(&self, tasks: &T) -> RequestStatus {
        match self.serve_task {
            Some(handle) => {
                let task_status = tasks.serve_task_status(handle);
                debug_assert!(
                    task_status.is_some(),
                    "request {} is bound to a missing task {:?}",
                    self.id,
                    handle
                );
                RequestStatus::from_task(task_status.unwrap_or(TaskStatus::Planned))
            }
            None => self.status,
        }
    }

    fn require<T: TaskStatusLookup + ?Sized>(
        &self,
        tasks: &T,
        operation: Transition,
        legal: &[RequestStatus],
    ) -> Result<(), InvalidTransition> {
        let status = self.status(tasks);
        if legal.contains(&status) {
            Ok(())
        } else {
            Err(InvalidTransition {
                request: self.id,
                operation,
                status,
            })
        }
    }

    /// INACTIVE → UNPLANNED.
    pub fn submit<T: TaskStatusLookup + ?Sized>(
        &mut self,
        tasks: &T,
    ) -> Result<(), InvalidTransition> {
        self.require(tasks, Transition::Submit, &[RequestStatus::Inactive])?;
        self.status = RequestStatus::Unplanned;
        Ok(())
    }

    /// UNPLANNED → REJECTED. A scheduled request must be unbound first.
    pub fn reject<T: TaskStatusLookup + ?Sized>(
        &mut self,
        tasks: &T,
    ) -> Result<(), InvalidTransition> {
        self.require(tasks, Transition::Reject, &[RequestStatus::Unplanned])?;
        self.status = RequestStatus::Rejected;
        Ok(())
    }

    /// UNPLANNED → CANCELLED. A scheduled request must be unbound first.
    pub fn cancel<T: TaskStatusLookup + ?Sized>(
        &mut self,
        tasks: &T,
    ) -> Result<(), InvalidTransition> {
        self.require(tasks, Transition::Cancel, &[RequestStatus::Unplanned])?;
        self.status = RequestStatus::Cancelled;
        Ok(())
    }

    pub fn bind_to_serve_task<T: TaskStatusLookup + ?Sized>(
        &mut self,
        handle: TaskHandle,
        tasks: &T,
    ) -> Result<(), InvalidTransition> {
        self.require(tasks, Transition::Bind, &[RequestStatus::Unplanned])?;
        self.serve_task = Some(handle);
        Ok(())
    }

    /// PLANNED or STARTED → UNPLANNED. Returns the handle that was cleared.
    ///
    /// Unbinding a STARTED request is only legal as part of aborting its serve task.
    pub fn unbind<T: TaskStatusLookup + ?Sized>(
        &mut self,
        tasks: &T,
    ) -> Result<TaskHandle, InvalidTransition> {
        let status = self.status(tasks);
        match (status, self.serve_task) {
            (RequestStatus::Planned | RequestStatus::Started, Some(handle)) => {
                self.serve_task = None;
                self.status = RequestStatus::Unplanned;
                Ok(handle)
            }
            _ => Err(InvalidTransition {
                request: self.id,
                operation: Transition::Unbind,
                status,
            }),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Request {} [{} -> {}, window {}..{}]",
            self.id,
            self.from.id,
            self.to.id,
            self.window.earliest(),
            self.window.latest()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VehicleId;
    use crate::schedule::TaskId;

    fn request() -> Request {
        Request::new(
            RequestId(1),
            CustomerId(1),
            Vertex::new(1, 0.0, 0.0),
            Vertex::new(2, 100.0, 0.0),
            1,
            100,
            200,
            50,
        )
        .expect("valid request")
    }

    fn handle() -> TaskHandle {
        TaskHandle {
            vehicle: VehicleId(1),
            task: TaskId(3),
        }
    }

    #[test]
    fn new_request_is_inactive_and_unbound() {
        let tasks: HashMap<TaskHandle, TaskStatus> = HashMap::new();
        let r = request();
        assert_eq!(r.status(&tasks), RequestStatus::Inactive);
        assert!(r.serve_task().is_none());
    }

    #[test]
    fn rejects_inverted_window_and_zero_quantity() {
        let a = Vertex::new(1, 0.0, 0.0);
        assert!(matches!(
            Request::new(RequestId(1), CustomerId(1), a, a, 1, 201, 200, 0),
            Err(ModelError::EmptyTimeWindow { .. })
        ));
        assert_eq!(
            Request::new(RequestId(1), CustomerId(1), a, a, 0, 0, 200, 0),
            Err(ModelError::ZeroQuantity(RequestId(1)))
        );
    }

    #[test]
    fn bound_status_mirrors_task_status() {
        let mut tasks: HashMap<TaskHandle, TaskStatus> = HashMap::new();
        let mut r = request();
        r.submit(&tasks).expect("submit");
        tasks.insert(handle(), TaskStatus::Planned);
        r.bind_to_serve_task(handle(), &tasks).expect("bind");
        assert_eq!(r.status(&tasks), RequestStatus::Planned);

        tasks.insert(handle(), TaskStatus::Started);
        assert_eq!(r.status(&tasks), RequestStatus::Started);

        tasks.insert(handle(), TaskStatus::Performed);
        assert_eq!(r.status(&tasks), RequestStatus::Performed);
    }

    #[test]
    fn submit_twice_fails_without_change() {
        let tasks: HashMap<TaskHandle, TaskStatus> = HashMap::new();
        let mut r = request();
        r.submit(&tasks).expect("submit");
        let err = r.submit(&tasks).expect_err("second submit");
        assert_eq!(err.operation, Transition::Submit);
        assert_eq!(err.status, RequestStatus::Unplanned);
        assert_eq!(r.status(&tasks), RequestStatus::Unplanned);
    }

    #[test]
    fn cancel_of_planned_request_requires_unbind_first() {
        let mut tasks: HashMap<TaskHandle, TaskStatus> = HashMap::new();
        tasks.insert(handle(), TaskStatus::Planned);
        let mut r = request();
        r.submit(&tasks).expect("submit");
        r.bind_to_serve_task(handle(), &tasks).expect("bind");

        let err = r.cancel(&tasks).expect_err("cancel while planned");
        assert_eq!(err.status, RequestStatus::Planned);

        assert_eq!(r.unbind(&tasks), Ok(handle()));
        assert_eq!(r.status(&tasks), RequestStatus::Unplanned);
        r.cancel(&tasks).expect("cancel");
        assert_eq!(r.status(&tasks), RequestStatus::Cancelled);
    }

    #[test]
    fn unbind_is_refused_for_performed_and_unbound_requests() {
        let mut tasks: HashMap<TaskHandle, TaskStatus> = HashMap::new();
        let mut r = request();
        assert!(r.unbind(&tasks).is_err());

        r.submit(&tasks).expect("submit");
        assert!(r.unbind(&tasks).is_err());

        tasks.insert(handle(), TaskStatus::Performed);
        r.bind_to_serve_task(handle(), &tasks).expect("bind");
        let err = r.unbind(&tasks).expect_err("performed");
        assert_eq!(err.status, RequestStatus::Performed);
        assert_eq!(r.serve_task(), Some(handle()));
    }

    #[test]
    fn started_request_can_be_unbound() {
        let mut tasks: HashMap<TaskHandle, TaskStatus> = HashMap::new();
        tasks.insert(handle(), TaskStatus::Started);
        let mut r = request();
        r.submit(&tasks).expect("submit");
        r.bind_to_serve_task(handle(), &tasks).expect("bind");
        assert_eq!(r.unbind(&tasks), Ok(handle()));
        assert_eq!(r.status(&tasks), RequestStatus::Unplanned);
    }
}
