use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Employee, Event, EventDetail, NewEvent, RosterEntry};

/// Read side of the training backend, injected into a viewer session.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Short name used in logs.
    fn source_tag(&self) -> &'static str;

    async fn list_events(&self) -> Result<Vec<Event>>;

    /// Fails with `NotFound` when the id is unknown.
    async fn event_detail(&self, id: &str) -> Result<EventDetail>;

    async fn employee_directory(&self) -> Result<Vec<Employee>>;
}

/// Write side: calendar edits and roster submission.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create_event(&self, event: NewEvent) -> Result<Event>;

    async fn delete_event(&self, id: &str) -> Result<()>;

    /// Upserts employees by number and returns how many were accepted.
    async fn submit_roster(&self, entries: Vec<RosterEntry>) -> Result<usize>;
}
