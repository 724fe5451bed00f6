//! Request registry: owns every request of a simulation run.
//!
//! Created at simulation start and cleared between runs; lookups are keyed by
//! [RequestId] and iterate in ascending id.

use std::collections::BTreeMap;

use crate::error::DispatchError;
use crate::model::RequestId;
use crate::request::{Request, RequestStatus, TaskStatusLookup};

#[derive(Debug, Clone, Default)]
pub struct RequestRegistry {
    requests: BTreeMap<RequestId, Request>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new (INACTIVE) request.
    pub fn insert(&mut self, request: Request) -> Result<(), DispatchError> {
        if self.requests.contains_key(&request.id()) {
            return Err(DispatchError::DuplicateRequest(request.id()));
        }
        self.requests.insert(request.id(), request);
        Ok(())
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: RequestId) -> Result<&mut Request, DispatchError> {
        self.requests
            .get_mut(&id)
            .ok_or(DispatchError::UnknownRequest(id))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.requests.values()
    }

    pub fn status<T: TaskStatusLookup + ?Sized>(
        &self,
        id: RequestId,
        tasks: &T,
    ) -> Result<RequestStatus, DispatchError> {
        self.get(id)
            .map(|request| request.status(tasks))
            .ok_or(DispatchError::UnknownRequest(id))
    }

    /// UNPLANNED requests in processing order: ascending `t0`, then ascending id.
    pub fn unplanned<T: TaskStatusLookup + ?Sized>(&self, tasks: &T) -> Vec<&Request> {
        let mut unplanned: Vec<&Request> = self
            .requests
            .values()
            .filter(|request| request.status(tasks) == RequestStatus::Unplanned)
            .collect();
        unplanned.sort_by_key(|request| (request.t0(), request.id()));
        unplanned
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }
}
